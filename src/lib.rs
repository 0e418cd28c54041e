//! # Calc Server
//! src/lib.rs
//!
//! Servidor HTTP/1.0 que ejecuta cálculos largos en segundo plano.
//! Los clientes envían un cálculo, consultan su estado, esperan el
//! resultado y lo descargan como archivo. El servidor recuerda los
//! últimos N cálculos en memoria y borra los archivos transitorios al
//! terminar cada descarga.
//!
//! ## Arquitectura
//!
//! - `http`: parsing y construcción de mensajes HTTP/1.0
//! - `server`: servidor TCP, un thread por conexión
//! - `router`: enrutamiento de método y path a handlers
//! - `jobs`: pool de workers, registro acotado y gestor de cálculos
//! - `artifacts`: archivos transitorios, lectura por bloques y limpieza
//! - `compute`: interfaz de la función de cálculo
//! - `config`: CLI y variables de entorno
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use calc_server::compute::SyntheticSpectrum;
//! use calc_server::config::Config;
//! use calc_server::jobs::{JobManager, JobManagerConfig};
//! use calc_server::server::Server;
//! use std::sync::Arc;
//!
//! let config = Config::default();
//! let jobs = JobManager::new(JobManagerConfig::from_config(&config), Arc::new(SyntheticSpectrum::default())).unwrap();
//! let server = Server::bind(config, Arc::new(jobs)).unwrap();
//! server.run().unwrap();
//! ```

pub mod artifacts;
pub mod compute;
pub mod config;
pub mod http;
pub mod jobs;
pub mod router;
pub mod server;
