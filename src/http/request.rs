//! # Framing y Parsing de Requests
//! src/http/request.rs
//!
//! Este módulo lee el bloque de headers desde el socket y lo parsea.
//!
//! ## Formato de un Request
//!
//! ```text
//! GET /movie.mp4?quality=hd HTTP/1.1\r\n
//! Host: 192.168.1.20:41235\r\n
//! Range: bytes=1048576-\r\n
//! \r\n
//! ```
//!
//! ## Etapas
//!
//! 1. **Framing**: leer bytes a un buffer acotado hasta encontrar `\r\n\r\n`
//! 2. **Request Line**: `METHOD URI [VERSION]`
//! 3. **Headers**: pares `Name: Value`, nombres en minúsculas
//!
//! Solo los bytes hasta el terminador llegan al parser; el resto se descarta
//! (no hay body ni pipelining).

use super::decode::{decode, DecodeError};
use std::collections::HashMap;
use std::io::{self, Read};

/// Terminador del bloque de headers
const HEADER_TERMINATOR: &[u8; 4] = b"\r\n\r\n";

/// Errores al delimitar el bloque de headers
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    /// El peer cerró sin enviar nada
    #[error("peer closed the connection before sending a request")]
    PeerClosed,

    /// El peer cerró a mitad del bloque de headers
    #[error("connection closed after {received} bytes without a header terminator")]
    Incomplete { received: usize },

    /// El buffer se llenó sin encontrar el terminador
    #[error("header block exceeds {limit} bytes")]
    TooLarge { limit: usize },

    /// Error de I/O del socket
    #[error("I/O error while reading headers: {0}")]
    Io(#[from] io::Error),
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Request vacío
    #[error("Empty request")]
    EmptyRequest,

    /// El bloque de headers no es UTF-8
    #[error("Request head is not valid UTF-8")]
    InvalidEncoding,

    /// La request line no tiene método
    #[error("Missing method in request line")]
    MissingMethod,

    /// La request line no tiene URI
    #[error("Missing URI in request line")]
    MissingUri,

    /// Path con percent-encoding inválido
    #[error("Bad percent-encoding in path: {0}")]
    InvalidPath(DecodeError),

    /// Query string con percent-encoding inválido
    #[error("Bad percent-encoding in query: {0}")]
    InvalidQuery(DecodeError),
}

/// Posición justo después de `\r\n\r\n`, si existe
pub fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_TERMINATOR.len())
        .position(|w| w == HEADER_TERMINATOR)
        .map(|pos| pos + HEADER_TERMINATOR.len())
}

/// Lee del socket hasta tener el bloque de headers completo
///
/// Devuelve únicamente los bytes hasta el terminador (inclusive).
/// Nunca lee más de `limit` bytes.
///
/// # Ejemplo
/// ```
/// use filestream::http::request::read_header_block;
///
/// let mut raw: &[u8] = b"GET / HTTP/1.0\r\n\r\ntrailing";
/// let block = read_header_block(&mut raw, 8192).unwrap();
/// assert_eq!(block, b"GET / HTTP/1.0\r\n\r\n");
/// ```
pub fn read_header_block<R: Read>(reader: &mut R, limit: usize) -> Result<Vec<u8>, FramingError> {
    let mut buf = vec![0u8; limit];
    let mut filled = 0;

    loop {
        if filled == limit {
            return Err(FramingError::TooLarge { limit });
        }

        let read = match reader.read(&mut buf[filled..]) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(FramingError::Io(e)),
        };

        if read == 0 {
            return Err(if filled == 0 {
                FramingError::PeerClosed
            } else {
                FramingError::Incomplete { received: filled }
            });
        }

        // El terminador puede quedar partido entre dos lecturas
        let scan_from = filled.saturating_sub(HEADER_TERMINATOR.len() - 1);
        filled += read;

        if let Some(end) = find_header_end(&buf[scan_from..filled]) {
            buf.truncate(scan_from + end);
            return Ok(buf);
        }
    }
}

/// Request parseado, válido solo durante una conexión
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Método tal como llegó (ej: "GET")
    method: String,

    /// Path ya decodificado (ej: "/movie.mp4")
    path: String,

    /// Query parameters decodificados
    query_params: HashMap<String, String>,

    /// Headers con nombre en minúsculas
    headers: HashMap<String, String>,

    /// Versión del protocolo, si vino
    version: Option<String>,
}

impl Request {
    /// Parsea un bloque de headers ya delimitado
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use filestream::http::Request;
    ///
    /// let raw = b"GET /f.mp4 HTTP/1.1\r\nRange: bytes=50-\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.method(), "GET");
    /// assert_eq!(request.path(), "/f.mp4");
    /// assert_eq!(request.header("range"), Some("bytes=50-"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(buffer).map_err(|_| ParseError::InvalidEncoding)?;

        if text.trim().is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        let mut lines = text.split("\r\n");
        let request_line = lines.next().unwrap_or_default();

        let mut tokens = request_line.split_whitespace();
        let method = tokens.next().ok_or(ParseError::MissingMethod)?.to_string();
        let raw_uri = tokens.next().ok_or(ParseError::MissingUri)?;
        let version = tokens.next().map(str::to_string);

        let (path, query_params) = Self::parse_uri(raw_uri)?;

        // Sin versión no hay headers (estilo HTTP/0.9)
        let headers = if version.is_some() {
            Self::parse_headers(lines)
        } else {
            HashMap::new()
        };

        Ok(Request {
            method,
            path,
            query_params,
            headers,
            version,
        })
    }

    /// Separa y decodifica path y query
    fn parse_uri(raw_uri: &str) -> Result<(String, HashMap<String, String>), ParseError> {
        match raw_uri.split_once('?') {
            Some((path, query)) => {
                let query_params = Self::parse_query_string(query)?;
                let path = decode(path).map_err(ParseError::InvalidPath)?;
                Ok((path, query_params))
            }
            None => Ok((decode(raw_uri).map_err(ParseError::InvalidPath)?, HashMap::new())),
        }
    }

    /// Parsea `a=1&b=two%20words`; segmentos sin `=` se ignoran
    fn parse_query_string(query: &str) -> Result<HashMap<String, String>, ParseError> {
        let mut params = HashMap::new();

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            if let Some((key, value)) = pair.split_once('=') {
                let key = decode(key).map_err(ParseError::InvalidQuery)?;
                let value = decode(value).map_err(ParseError::InvalidQuery)?;
                params.insert(key.trim().to_string(), value);
            }
        }

        Ok(params)
    }

    /// Parsea headers hasta la línea vacía; líneas sin `:` se saltan
    fn parse_headers<'a>(lines: impl Iterator<Item = &'a str>) -> HashMap<String, String> {
        let mut headers = HashMap::new();

        for line in lines {
            if line.trim().is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                headers.insert(name.trim().to_lowercase(), value.trim().to_string());
            }
        }

        headers
    }

    // === Métodos públicos para acceder a los campos ===

    /// Método HTTP
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Path decodificado
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Todos los query parameters
    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// Un query parameter específico
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(|s| s.as_str())
    }

    /// Todos los headers (nombres en minúsculas)
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Un header por nombre, sin importar mayúsculas
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|s| s.as_str())
    }

    /// Versión del protocolo, si vino en la request line
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Reader que entrega los datos en trozos fijos
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(self.data.len()).min(out.len());
            out[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_parse_range_request() {
        let raw = b"GET /f.mp4 HTTP/1.1\r\nRange: bytes=50-\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.method(), "GET");
        assert_eq!(request.path(), "/f.mp4");
        assert_eq!(request.version(), Some("HTTP/1.1"));
        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.headers().get("range"), Some(&"bytes=50-".to_string()));
    }

    #[test]
    fn test_parse_query_params() {
        let raw = b"GET /stream?a=1&b=two%20words HTTP/1.0\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.path(), "/stream");
        assert_eq!(request.query_params().len(), 2);
        assert_eq!(request.query_param("a"), Some("1"));
        assert_eq!(request.query_param("b"), Some("two words"));
    }

    #[test]
    fn test_query_segment_without_value_ignored() {
        let raw = b"GET /x?debug&n=3&&+k+=v+w HTTP/1.0\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.query_param("debug"), None);
        assert_eq!(request.query_param("n"), Some("3"));
        assert_eq!(request.query_param("k"), Some("v w"));
    }

    #[test]
    fn test_path_is_decoded() {
        let raw = b"GET /my%20movie+clip.mp4 HTTP/1.1\r\n\r\n";
        let request = Request::parse(raw).unwrap();
        assert_eq!(request.path(), "/my movie clip.mp4");
    }

    #[test]
    fn test_headers_lowercased_and_trimmed() {
        let raw = b"GET / HTTP/1.1\r\nUSER-Agent:   vlc/3.0  \r\nHost: a\r\nhost: b\r\nnocolon\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.header("user-agent"), Some("vlc/3.0"));
        assert_eq!(request.header("User-Agent"), Some("vlc/3.0"));
        assert_eq!(request.header("host"), Some("b"));
        assert_eq!(request.headers().len(), 2);
    }

    #[test]
    fn test_header_value_keeps_later_colons() {
        let raw = b"GET / HTTP/1.1\r\nHost: 10.0.0.2:8080\r\n\r\n";
        let request = Request::parse(raw).unwrap();
        assert_eq!(request.header("host"), Some("10.0.0.2:8080"));
    }

    #[test]
    fn test_no_version_skips_headers() {
        let raw = b"GET /movie.mp4\r\nRange: bytes=5-\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.version(), None);
        assert!(request.headers().is_empty());
    }

    #[test]
    fn test_empty_request() {
        assert_eq!(Request::parse(b""), Err(ParseError::EmptyRequest));
        assert_eq!(Request::parse(b"\r\n\r\n"), Err(ParseError::EmptyRequest));
    }

    #[test]
    fn test_missing_uri() {
        assert_eq!(Request::parse(b"GET\r\n\r\n"), Err(ParseError::MissingUri));
    }

    #[test]
    fn test_missing_method() {
        assert_eq!(Request::parse(b"\r\nHost: x\r\n\r\n"), Err(ParseError::MissingMethod));
    }

    #[test]
    fn test_bad_percent_encoding() {
        assert!(matches!(
            Request::parse(b"GET /a%zz HTTP/1.1\r\n\r\n"),
            Err(ParseError::InvalidPath(_))
        ));
        assert!(matches!(
            Request::parse(b"GET /a?x=%4 HTTP/1.1\r\n\r\n"),
            Err(ParseError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        assert_eq!(
            Request::parse(b"GET /\xff HTTP/1.1\r\n\r\n"),
            Err(ParseError::InvalidEncoding)
        );
    }

    #[test]
    fn test_find_header_end() {
        assert_eq!(find_header_end(b"GET / HTTP/1.0\r\n\r\n"), Some(18));
        assert_eq!(find_header_end(b"GET / HTTP/1.0\r\n"), None);
        assert_eq!(find_header_end(b""), None);
    }

    #[test]
    fn test_read_header_block_discards_rest() {
        let mut reader = Cursor::new(b"GET / HTTP/1.1\r\nA: b\r\n\r\nBODY".to_vec());
        let block = read_header_block(&mut reader, 8192).unwrap();
        assert_eq!(block, b"GET / HTTP/1.1\r\nA: b\r\n\r\n");
    }

    #[test]
    fn test_read_header_block_split_terminator() {
        let data = b"GET /movie.mp4 HTTP/1.1\r\nRange: bytes=0-\r\n\r\n";
        for step in 1..6 {
            let mut reader = Trickle { data, step };
            let block = read_header_block(&mut reader, 8192).unwrap();
            assert_eq!(block, data);
        }
    }

    #[test]
    fn test_read_header_block_peer_closed() {
        let mut reader = Cursor::new(Vec::new());
        assert!(matches!(
            read_header_block(&mut reader, 8192),
            Err(FramingError::PeerClosed)
        ));
    }

    #[test]
    fn test_read_header_block_incomplete() {
        let mut reader = Cursor::new(b"GET / HTTP/1.1\r\nHost: x\r\n".to_vec());
        assert!(matches!(
            read_header_block(&mut reader, 8192),
            Err(FramingError::Incomplete { received: 25 })
        ));
    }

    #[test]
    fn test_read_header_block_too_large() {
        let mut data = b"GET / HTTP/1.1\r\nX-Pad: ".to_vec();
        data.extend(std::iter::repeat(b'a').take(100));
        data.extend_from_slice(b"\r\n\r\n");

        let mut reader = Cursor::new(data);
        assert!(matches!(
            read_header_block(&mut reader, 64),
            Err(FramingError::TooLarge { limit: 64 })
        ));
    }

    #[test]
    fn test_read_header_block_exact_fit() {
        let data = b"GET / HTTP/1.0\r\n\r\n";
        let mut reader = Cursor::new(data.to_vec());
        let block = read_header_block(&mut reader, data.len()).unwrap();
        assert_eq!(block, data);
    }
}
