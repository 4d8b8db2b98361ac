//! # Resolución del Header Range
//! src/http/range.rs
//!
//! Decide si la respuesta es parcial (206) o completa (200) y desde qué byte
//! empezar a enviar. Solo se respeta el inicio del rango: `bytes=START-[END]`.

use std::collections::HashMap;

/// Estado de rango de un request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeState {
    /// Hubo header `Range`
    pub is_range_request: bool,

    /// Bytes a saltar antes de empezar a enviar
    pub skip_bytes: u64,
}

impl RangeState {
    /// Respuesta completa desde el byte 0
    pub fn full() -> Self {
        Self::default()
    }

    /// Respuesta parcial desde `skip_bytes`
    pub fn from_offset(skip_bytes: u64) -> Self {
        Self {
            is_range_request: true,
            skip_bytes,
        }
    }
}

/// Valor de `Range` que no se puede interpretar
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported Range header value: {value:?}")]
pub struct RangeParseError {
    pub value: String,
}

/// Resuelve el rango a partir de los headers (nombres en minúsculas)
///
/// # Ejemplo
/// ```
/// use std::collections::HashMap;
/// use filestream::http::range::resolve;
///
/// let mut headers = HashMap::new();
/// headers.insert("range".to_string(), "bytes=100-".to_string());
///
/// let state = resolve(&headers).unwrap();
/// assert!(state.is_range_request);
/// assert_eq!(state.skip_bytes, 100);
/// ```
pub fn resolve(headers: &HashMap<String, String>) -> Result<RangeState, RangeParseError> {
    match headers.get("range") {
        Some(value) => parse_start(value).map(RangeState::from_offset),
        None => Ok(RangeState::full()),
    }
}

/// Extrae START de `bytes=START-[END]`
fn parse_start(value: &str) -> Result<u64, RangeParseError> {
    let invalid = || RangeParseError {
        value: value.to_string(),
    };

    let (unit, ranges) = value.trim().split_once('=').ok_or_else(invalid)?;
    if !unit.trim().eq_ignore_ascii_case("bytes") {
        return Err(invalid());
    }

    // Multi-rango no soportado
    if ranges.contains(',') {
        return Err(invalid());
    }

    let (start, end) = ranges.split_once('-').ok_or_else(invalid)?;
    let start = start.trim();
    let end = end.trim();

    // Rangos sufijo (`bytes=-500`) no tienen inicio
    if start.is_empty() || !start.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let start: u64 = start.parse().map_err(|_| invalid())?;

    if !end.is_empty() {
        let end: u64 = end.parse().map_err(|_| invalid())?;
        if end < start {
            return Err(invalid());
        }
    }

    Ok(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_range(value: &str) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("range".to_string(), value.to_string());
        headers
    }

    #[test]
    fn test_no_range_header() {
        let state = resolve(&HashMap::new()).unwrap();
        assert_eq!(state, RangeState { is_range_request: false, skip_bytes: 0 });
    }

    #[test]
    fn test_open_ended_range() {
        let state = resolve(&headers_with_range("bytes=100-")).unwrap();
        assert_eq!(state, RangeState::from_offset(100));
    }

    #[test]
    fn test_closed_range_only_start_used() {
        let state = resolve(&headers_with_range("bytes=50-99")).unwrap();
        assert_eq!(state.skip_bytes, 50);
    }

    #[test]
    fn test_zero_start_is_still_ranged() {
        let state = resolve(&headers_with_range("bytes=0-")).unwrap();
        assert!(state.is_range_request);
        assert_eq!(state.skip_bytes, 0);
    }

    #[test]
    fn test_whitespace_and_case() {
        let state = resolve(&headers_with_range("  Bytes = 7 - ")).unwrap();
        assert_eq!(state.skip_bytes, 7);
    }

    #[test]
    fn test_malformed_values() {
        for value in [
            "",
            "bytes",
            "bytes=",
            "bytes=-500",
            "bytes=abc-",
            "bytes=+5-",
            "bytes=10",
            "bytes=10-5",
            "bytes=0-1,5-9",
            "items=0-",
            "bytes=99999999999999999999999-",
        ] {
            let err = resolve(&headers_with_range(value)).unwrap_err();
            assert_eq!(err.value, value);
        }
    }
}
