//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Servidor TCP que:
//! 1. Escucha en `host:port`
//! 2. Acepta conexiones, cada una en su propio thread
//! 3. Lee y parsea el request
//! 4. Responde con JSON o transmite una descarga

pub mod tcp;

pub use tcp::Server;
