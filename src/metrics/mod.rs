//! # Métricas
//!
//! Contadores de conexiones, bytes enviados y errores.

pub mod collector;

pub use collector::{MetricsSnapshot, StreamMetrics};
