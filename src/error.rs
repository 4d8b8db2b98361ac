//! # Errores del Servidor
//! src/error.rs
//!
//! Dos niveles de error:
//!
//! - [`ServerError`]: ciclo de vida (`init`, `start`). Se devuelven al
//!   llamador.
//! - [`ConnectionError`]: todo lo que puede salir mal dentro de una conexión.
//!   Nunca sale del thread del servidor; se registra, se reporta como evento
//!   y la conexión se cierra.

use crate::http::{FramingError, ParseError, RangeParseError};
use crate::source::SourceOpenError;
use std::io;

/// Fallo al preparar el socket de escucha
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    /// El host no se pudo resolver
    #[error("cannot resolve bind address {address}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: io::Error,
    },

    /// La resolución no devolvió ninguna dirección
    #[error("bind address {address} resolved to nothing")]
    NoAddress { address: String },

    /// bind() o la configuración del socket fallaron
    #[error("cannot listen on {address}: {source}")]
    Socket {
        address: String,
        #[source]
        source: io::Error,
    },
}

/// Errores de ciclo de vida
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Bind(#[from] BindError),

    /// `start()` llamado con el servidor ya corriendo
    #[error("server is already running")]
    AlreadyRunning,

    /// `start()` llamado antes de `init()`
    #[error("server has not been initialized; call init() first")]
    NotInitialized,

    /// No se pudo crear el thread del servidor
    #[error("cannot spawn server thread: {0}")]
    Spawn(#[source] io::Error),

    /// El thread del servidor terminó con panic
    #[error("server thread panicked")]
    ThreadPanicked,
}

/// Errores de una conexión
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Bloque de headers incompleto, demasiado grande o ilegible
    #[error(transparent)]
    Framing(#[from] FramingError),

    /// Request line o encoding inválidos
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Header Range inválido
    #[error(transparent)]
    Range(#[from] RangeParseError),

    /// El inicio del rango cae fuera del archivo
    #[error("range start {start} is beyond content length {length}")]
    RangeOutOfBounds { start: u64, length: u64 },

    /// Método distinto de GET
    #[error("method {0} not allowed")]
    MethodNotAllowed(String),

    /// La fuente no se pudo abrir
    #[error(transparent)]
    Source(#[from] SourceOpenError),

    /// Reabrir la fuente en EOF volvió a dar EOF
    #[error("error re-opening data source for looping: source is empty")]
    LoopReopen,

    /// Error de I/O durante el streaming
    #[error("I/O error while streaming: {0}")]
    Io(#[from] io::Error),
}

/// ¿El error indica que el cliente se fue?
///
/// Cerrar el reproductor o hacer seek produce resets y pipes rotos; eso es
/// una terminación normal, no un fallo.
pub fn is_disconnect(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::WriteZero
    )
}
