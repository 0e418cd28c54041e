//! # Artefactos
//!
//! Archivos transitorios derivados de un job: se crean bajo demanda para
//! una descarga, se transmiten por bloques y se borran al terminar.

pub mod coordinator;
pub mod format;
pub mod stream;

pub use coordinator::{ArtifactCoordinator, DownloadSink};
pub use format::{ArtifactFormat, TableColumns};
pub use stream::{ChunkStream, DEFAULT_CHUNK_SIZE};

/// Errores al crear o transmitir artefactos
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Artifact I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// El resultado no tiene la forma que pide el formato
    #[error("Result cannot be exported: {0}")]
    Shape(String),
}
