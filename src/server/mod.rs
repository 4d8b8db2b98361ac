//! # Módulo del Servidor
//! src/server/mod.rs
//!
//! - `tcp`: socket de escucha, ciclo de vida y loop de accept
//! - `connection`: una conexión de principio a fin (headers, respuesta, streaming)
//! - `shutdown`: señal de stop que corta accept y streaming
//! - `events`: canal observable de estado

pub mod connection;
pub mod events;
pub mod shutdown;
pub mod tcp;

// Re-exportar para facilitar el uso
pub use connection::LoopMode;
pub use events::{ConnectionOutcome, ServerEvent};
pub use tcp::StreamServer;
