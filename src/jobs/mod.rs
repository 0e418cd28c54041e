//! # Sistema de Jobs
//!
//! Ejecuta cálculos largos en un pool de workers sin bloquear las
//! conexiones HTTP, y recuerda los últimos N cálculos en memoria.
//!
//! ## Piezas
//!
//! - `pool`: workers que ejecutan la función de cálculo
//! - `handle`: futuro de un cálculo (poll / result)
//! - `registry`: mapa acotado de JobId a registro, con expulsión FIFO
//! - `status`: proyección de un registro a su estado visible
//! - `manager`: fachada que usan los handlers HTTP
//! - `handlers`: endpoints `/calculation/*` y `/dashboard`

pub mod error;
pub mod handle;
pub mod handlers;
pub mod manager;
pub mod pool;
pub mod registry;
pub mod status;
pub mod types;

pub use error::JobError;
pub use handle::JobHandle;
pub use manager::{InputFile, JobManager, JobManagerConfig, SubmitRequest};
pub use registry::{JobRecord, JobRegistry};
pub use status::StatusSnapshot;
pub use types::{DomainTag, JobId, JobState, OwnerToken};
