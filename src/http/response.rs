//! # Construcción de Cabeceras de Respuesta
//!
//! El body de este servidor nunca vive en memoria: se transmite desde la
//! fuente de contenido. Por eso aquí solo se arma la cabecera (status line
//! más headers); el streaming lo hace `server::connection`.
//!
//! ## Formato
//!
//! ```text
//! HTTP/1.1 206 Partial Content\r\n
//! Content-Type: video/mp4\r\n
//! Accept-Ranges: bytes\r\n
//! Content-Length: 900\r\n
//! Content-Range: bytes 100-1000/*\r\n
//! Connection: close\r\n
//! \r\n
//! ```

use super::range::RangeState;
use super::StatusCode;

/// Versión usada en la status line
const HTTP_VERSION: &str = "HTTP/1.1";

/// Cabecera de una respuesta HTTP, headers en orden de inserción
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    status: StatusCode,
    headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// Crea una cabecera sin headers
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    /// Agrega un header; si ya existe, se sobrescribe
    pub fn with_header(mut self, name: &str, value: impl ToString) -> Self {
        self.add_header(name, value);
        self
    }

    /// Versión mutable de `with_header`
    pub fn add_header(&mut self, name: &str, value: impl ToString) {
        let value = value.to_string();
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1 = value,
            None => self.headers.push((name.to_string(), value)),
        }
    }

    /// Respuesta de error sin body
    ///
    /// # Ejemplo
    /// ```
    /// use filestream::http::{ResponseHead, StatusCode};
    ///
    /// let bytes = ResponseHead::empty(StatusCode::BadRequest).to_bytes();
    /// assert!(bytes.starts_with(b"HTTP/1.1 400 Bad Request\r\n"));
    /// assert!(bytes.ends_with(b"Content-Length: 0\r\nConnection: close\r\n\r\n"));
    /// ```
    pub fn empty(status: StatusCode) -> Self {
        Self::new(status)
            .with_header("Content-Length", 0)
            .with_header("Connection", "close")
    }

    /// Cabecera de streaming (200 o 206)
    ///
    /// `declared_length` es el largo "simulado" (-1 = desconocido) que se
    /// anuncia en una respuesta completa; `true_length` es el largo real en
    /// disco, usado para `Content-Range` y el `Content-Length` de un 206.
    pub fn stream(
        range: &RangeState,
        content_type: &str,
        declared_length: i64,
        true_length: u64,
    ) -> Self {
        let status = if range.is_range_request {
            StatusCode::PartialContent
        } else {
            StatusCode::Ok
        };

        let mut head = Self::new(status)
            .with_header("Content-Type", content_type)
            .with_header("Accept-Ranges", "bytes");

        if range.is_range_request {
            head.add_header(
                "Content-Length",
                true_length.saturating_sub(range.skip_bytes),
            );
            head.add_header(
                "Content-Range",
                format!("bytes {}-{}/*", range.skip_bytes, true_length),
            );
        } else {
            head.add_header("Content-Length", declared_length);
        }

        head.with_header("Connection", "close")
    }

    /// Serializa status line y headers, terminando en `\r\n\r\n`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = format!("{} {}\r\n", HTTP_VERSION, self.status);
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out.into_bytes()
    }

    /// Código de estado
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Header por nombre, sin importar mayúsculas
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Todos los headers en orden
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}
