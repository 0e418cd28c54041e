//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! ```text
//! HTTP/1.0 200 OK\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 13\r\n
//! \r\n
//! {"ok": true}
//! ```
//!
//! Las descargas no pasan por `Response` completo: el servidor escribe
//! primero la cabecera (`head_bytes`) y luego el archivo por bloques.

use super::StatusCode;
use serde::Serialize;
use serde_json::json;

/// Respuesta HTTP/1.0
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    /// Headers en orden de inserción; un nombre repetido reemplaza al anterior
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    pub fn add_header(&mut self, name: &str, value: &str) {
        match self.headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    /// Cuerpo binario; actualiza `Content-Length`
    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        let len = self.body.len().to_string();
        self.add_header("Content-Length", &len);
        self
    }

    pub fn with_body(self, body: &str) -> Self {
        self.with_body_bytes(body.as_bytes().to_vec())
    }

    /// Respuesta JSON a partir de cualquier valor serializable
    pub fn json_with_status<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => Self::new(status)
                .with_header("Content-Type", "application/json")
                .with_body_bytes(bytes),
            Err(e) => Self::error(StatusCode::InternalServerError, &format!("Serialization failed: {}", e)),
        }
    }

    /// 200 OK con JSON
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        Self::json_with_status(StatusCode::Ok, value)
    }

    /// Error con cuerpo `{"error": "..."}`
    ///
    /// ```
    /// use calc_server::http::{Response, StatusCode};
    ///
    /// let response = Response::error(StatusCode::BadRequest, "bad \"name\"");
    /// assert_eq!(response.body(), br#"{"error":"bad \"name\""}"#);
    /// ```
    pub fn error(status: StatusCode, message: &str) -> Self {
        let body = json!({ "error": message }).to_string();
        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body(&body)
    }

    /// Agrega `Set-Cookie` con path raíz
    pub fn with_cookie(self, name: &str, value: &str) -> Self {
        let cookie = format!("{}={}; Path=/", name, value);
        self.with_header("Set-Cookie", &cookie)
    }

    /// Status line y headers, terminados en línea vacía
    pub fn head_bytes(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.0 {}\r\n", self.status);
        for (name, value) in &self.headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");
        head.into_bytes()
    }

    /// Respuesta completa lista para el socket
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.head_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_response() {
        let response = Response::new(StatusCode::Ok);
        assert_eq!(response.status(), StatusCode::Ok);
        assert!(response.header("Content-Type").is_none());
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_header_replaced_case_insensitive() {
        let response = Response::new(StatusCode::Ok)
            .with_header("Content-Type", "text/plain")
            .with_header("content-type", "application/json");
        assert_eq!(response.header("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn test_json_response() {
        let response = Response::json(&json!({"state": "running"}));
        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(response.body(), br#"{"state":"running"}"#);
        assert_eq!(response.header("Content-Length"), Some("19"));
    }

    #[test]
    fn test_error_is_valid_json() {
        let response = Response::error(StatusCode::NotFound, "line\nbreak \"quoted\"");
        let parsed: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(parsed["error"], "line\nbreak \"quoted\"");
    }

    #[test]
    fn test_cookie_header() {
        let response = Response::new(StatusCode::Ok).with_cookie("calc_user", "abc");
        assert_eq!(response.header("Set-Cookie"), Some("calc_user=abc; Path=/"));
    }

    #[test]
    fn test_to_bytes() {
        let response = Response::new(StatusCode::Accepted)
            .with_header("Content-Type", "text/plain")
            .with_body("Test");
        let text = String::from_utf8(response.to_bytes()).unwrap();

        assert!(text.starts_with("HTTP/1.0 202 Accepted\r\n"));
        assert!(text.contains("Content-Type: text/plain\r\n"));
        assert!(text.contains("Content-Length: 4\r\n"));
        assert!(text.ends_with("\r\n\r\nTest"));
    }

    #[test]
    fn test_head_bytes_excludes_body() {
        let response = Response::new(StatusCode::Ok).with_body("payload");
        let head = String::from_utf8(response.head_bytes()).unwrap();
        assert!(head.ends_with("\r\n\r\n"));
        assert!(!head.contains("payload"));
    }
}
