//! # Módulo HTTP
//!
//! Implementa a mano el subconjunto de HTTP que necesita un reproductor de
//! medios para hacer streaming y seek sobre un único archivo:
//!
//! - Decodificación de porcentaje (`%XX`, `+`)
//! - Framing del bloque de headers y parsing del request
//! - Interpretación del header `Range`
//! - Status codes y cabeceras de respuesta
//!
//! No hay keep-alive, chunked encoding ni pipelining: una conexión, un
//! request, una respuesta y luego se cierra.

pub mod decode;    // Decodificación %XX / +
pub mod range;     // Header Range -> RangeState
pub mod request;   // Framing + parsing del request
pub mod response;  // Cabeceras de respuesta
pub mod status;    // Códigos de estado HTTP

pub use range::{RangeParseError, RangeState};
pub use request::{FramingError, ParseError, Request};
pub use response::ResponseHead;
pub use status::StatusCode;
