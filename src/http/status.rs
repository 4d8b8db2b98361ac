//! # Códigos de Estado HTTP
//!
//! Solo los códigos que este servidor emite:
//!
//! - **2xx**: 200 OK (archivo completo), 206 Partial Content (seek)
//! - **4xx**: 400 (request mal formado), 405 (método distinto de GET),
//!   416 (Range inválido o fuera del archivo)

/// Códigos de estado que soporta el servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum StatusCode {
    /// 200 OK - Stream completo
    Ok = 200,

    /// 206 Partial Content - Stream desde un offset
    PartialContent = 206,

    /// 400 Bad Request - Framing, request line o encoding inválidos
    BadRequest = 400,

    /// 405 Method Not Allowed
    MethodNotAllowed = 405,

    /// 416 Range Not Satisfiable
    RangeNotSatisfiable = 416,
}

impl StatusCode {
    /// Valor numérico
    ///
    /// # Ejemplo
    /// ```
    /// use filestream::http::StatusCode;
    /// assert_eq!(StatusCode::PartialContent.as_u16(), 206);
    /// ```
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Reason phrase estándar
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::PartialContent => "Partial Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::RangeNotSatisfiable => "Range Not Satisfiable",
        }
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        matches!(self, StatusCode::Ok | StatusCode::PartialContent)
    }

    /// 4xx
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.as_u16())
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "206 Partial Content"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_values() {
        assert_eq!(StatusCode::Ok.as_u16(), 200);
        assert_eq!(StatusCode::PartialContent.as_u16(), 206);
        assert_eq!(StatusCode::BadRequest.as_u16(), 400);
        assert_eq!(StatusCode::MethodNotAllowed.as_u16(), 405);
        assert_eq!(StatusCode::RangeNotSatisfiable.as_u16(), 416);
    }

    #[test]
    fn test_classes() {
        assert!(StatusCode::Ok.is_success());
        assert!(StatusCode::PartialContent.is_success());
        assert!(!StatusCode::BadRequest.is_success());
        assert!(StatusCode::RangeNotSatisfiable.is_client_error());
        assert!(!StatusCode::PartialContent.is_client_error());
    }

    #[test]
    fn test_display() {
        assert_eq!(StatusCode::Ok.to_string(), "200 OK");
        assert_eq!(StatusCode::PartialContent.to_string(), "206 Partial Content");
        assert_eq!(
            StatusCode::RangeNotSatisfiable.to_string(),
            "416 Range Not Satisfiable"
        );
    }
}
