//! # Fuente de Contenido
//! src/source/mod.rs
//!
//! Abstracción sobre un recurso que se puede abrir como stream de bytes.
//!
//! La fuente reporta dos largos distintos:
//!
//! - `length(false)`: el largo que se anuncia en un 200. Siempre es
//!   [`UNKNOWN_LENGTH`] para simular un stream en vivo sin fin.
//! - `length(true)`: el largo real en disco, usado para `Content-Range` y
//!   para el `Content-Length` de un 206.

use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};

/// Centinela "largo desconocido" que se envía en `Content-Length`
pub const UNKNOWN_LENGTH: i64 = -1;

/// No se pudo abrir la fuente
#[derive(Debug, thiserror::Error)]
#[error("cannot open {path}: {source}")]
pub struct SourceOpenError {
    pub path: String,
    #[source]
    pub source: io::Error,
}

/// Recurso que el handler de conexión transmite
pub trait ContentSource {
    /// Stream posicionable que devuelve `open_stream`
    type Stream: Read + Seek;

    /// MIME type que se envía en `Content-Type`
    fn content_type(&self) -> &str;

    /// Abre un stream nuevo posicionado al inicio
    ///
    /// Cada llamada debe devolver un stream independiente: el loop de
    /// streaming cierra y reabre la fuente al llegar a EOF.
    fn open_stream(&mut self) -> Result<Self::Stream, SourceOpenError>;

    /// Largo anunciado (`false`) o largo real (`true`)
    fn length(&self, true_length: bool) -> i64;
}

/// Fuente respaldada por un archivo local
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    content_type: String,
    true_length: u64,
}

impl FileSource {
    /// Crea la fuente; el archivo no se toca hasta `open_stream`
    pub fn new(path: impl Into<PathBuf>, content_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content_type: content_type.into(),
            true_length: 0,
        }
    }

    /// Ruta del archivo
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Último componente de la ruta, usado en la URL pública
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl ContentSource for FileSource {
    type Stream = File;

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn open_stream(&mut self) -> Result<File, SourceOpenError> {
        let open_error = |source| SourceOpenError {
            path: self.path.display().to_string(),
            source,
        };

        let file = File::open(&self.path).map_err(open_error)?;
        let metadata = file.metadata().map_err(open_error)?;

        if metadata.is_dir() {
            return Err(open_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                "path is a directory",
            )));
        }

        // El archivo puede haber crecido desde la última apertura
        self.true_length = metadata.len();
        tracing::debug!(path = %self.path.display(), length = self.true_length, "fuente abierta");

        Ok(file)
    }

    fn length(&self, true_length: bool) -> i64 {
        if !true_length {
            return UNKNOWN_LENGTH;
        }
        i64::try_from(self.true_length).unwrap_or(i64::MAX)
    }
}
