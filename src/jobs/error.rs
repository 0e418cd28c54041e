//! # Errores del Sistema de Jobs
//! src/jobs/error.rs

use crate::artifacts::ArtifactError;
use crate::compute::ComputeFailure;
use crate::jobs::types::JobId;

/// Errores visibles para quien llama al `JobManager`
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(JobId),

    /// La función de cálculo falló; se propaga tal cual
    #[error(transparent)]
    Compute(#[from] ComputeFailure),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// Entrada inválida antes de crear el job
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
