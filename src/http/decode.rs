//! # Decodificación de Porcentaje
//! src/http/decode.rs
//!
//! Decodifica segmentos de URI codificados con `%XX` y `+`.
//!
//! ```text
//! "an+example%20string"  ->  "an example string"
//! ```
//!
//! A diferencia de un decoder tolerante, una secuencia `%` mal formada es un
//! error explícito: el llamador rechaza el request en vez de seguir con un
//! valor vacío.

/// Errores de decodificación
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// `%` sin dos caracteres detrás
    #[error("truncated percent escape at byte {index}")]
    Truncated { index: usize },

    /// `%` seguido de algo que no es hexadecimal
    #[error("invalid percent escape at byte {index}")]
    InvalidHex { index: usize },

    /// Los bytes decodificados no forman UTF-8 válido
    #[error("percent-decoded bytes are not valid UTF-8")]
    InvalidUtf8,
}

/// Decodifica un string con el esquema de porcentaje
///
/// - `+` se convierte en espacio
/// - `%XX` se convierte en el byte `0xXX`
/// - cualquier otro carácter pasa sin cambios
///
/// # Ejemplo
/// ```
/// use filestream::http::decode::decode;
///
/// assert_eq!(decode("two%20words").unwrap(), "two words");
/// assert_eq!(decode("a+b").unwrap(), "a b");
/// assert!(decode("bad%2").is_err());
/// ```
pub fn decode(input: &str) -> Result<String, DecodeError> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => {
                if i + 2 >= bytes.len() {
                    return Err(DecodeError::Truncated { index: i });
                }
                let hi = hex_value(bytes[i + 1]).ok_or(DecodeError::InvalidHex { index: i })?;
                let lo = hex_value(bytes[i + 2]).ok_or(DecodeError::InvalidHex { index: i })?;
                out.push((hi << 4) | lo);
                i += 3;
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }

    String::from_utf8(out).map_err(|_| DecodeError::InvalidUtf8)
}

/// Valor de un dígito hexadecimal ASCII
fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
