//! # Módulo HTTP
//!
//! HTTP/1.0 escrito a mano, sin librerías de alto nivel:
//!
//! - Parsing de requests (headers, cookies, body por `Content-Length`)
//! - Construcción de responses JSON y de cabeceras para descargas
//! - Códigos de estado
//!
//! Cada conexión atiende un solo request y se cierra al responder.

pub mod request;
pub mod response;
pub mod status;

pub use request::{Method, ParseError, Request};
pub use response::Response;
pub use status::StatusCode;
