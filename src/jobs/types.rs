//! # Tipos y Estructuras para el Sistema de Jobs
//! src/jobs/types.rs
//!
//! Define los tipos fundamentales para el manejo de trabajos asíncronos.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Estado de un job visto desde afuera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Job en cola esperando un worker
    Pending,

    /// Job ejecutándose actualmente
    Running,

    /// Job terminado (con éxito, o con un fallo aún no reclamado)
    Finished,

    /// Job cuyo resultado fue pedido y la función de cálculo falló
    Failed,

    /// Nunca se produce: no hay cancelación
    Cancelled,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Finished => "finished",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        }
    }
}

/// Familia de instrumentos a la que pertenece un job.
///
/// Se codifica como el último carácter del `JobId` y solo sirve para
/// separar los listados del dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DomainTag(char);

impl DomainTag {
    /// Cálculos para JWST
    pub const JWST: DomainTag = DomainTag('e');

    /// Cálculos para HST
    pub const HST: DomainTag = DomainTag('h');

    pub fn as_char(&self) -> char {
        self.0
    }
}

impl FromStr for DomainTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jwst" | "e" => Ok(DomainTag::JWST),
            "hst" | "h" => Ok(DomainTag::HST),
            other => Err(format!("Unknown domain: {}", other)),
        }
    }
}

impl fmt::Display for DomainTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ID único de un job: UUID v4 + tag de dominio al final
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Genera un ID nuevo para el dominio dado
    pub fn generate(tag: DomainTag) -> Self {
        JobId(format!("{}{}", uuid::Uuid::new_v4(), tag.as_char()))
    }

    /// Envuelve un ID recibido del cliente (no se valida: si no existe,
    /// la búsqueda simplemente no lo encuentra)
    pub fn from_raw(raw: impl Into<String>) -> Self {
        JobId(raw.into())
    }

    /// Tag de dominio (último carácter)
    pub fn domain_char(&self) -> Option<char> {
        self.0.chars().last()
    }

    pub fn has_domain(&self, tag: DomainTag) -> bool {
        self.domain_char() == Some(tag.as_char())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identidad opaca del cliente (cookie), solo se compara por igualdad
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerToken(String);

impl OwnerToken {
    pub fn new(raw: impl Into<String>) -> Self {
        OwnerToken(raw.into())
    }

    /// Token nuevo para un cliente que aún no tiene cookie
    pub fn generate() -> Self {
        OwnerToken(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_state_serialization() {
        let json = serde_json::to_string(&JobState::Running).unwrap();
        assert_eq!(json, "\"running\"");
        assert_eq!(JobState::Cancelled.as_str(), "cancelled");
    }

    #[test]
    fn test_job_id_carries_domain_tag() {
        let id = JobId::generate(DomainTag::HST);
        assert!(id.as_str().ends_with('h'));
        assert!(id.has_domain(DomainTag::HST));
        assert!(!id.has_domain(DomainTag::JWST));
    }

    #[test]
    fn test_job_ids_are_unique() {
        let a = JobId::generate(DomainTag::JWST);
        let b = JobId::generate(DomainTag::JWST);
        assert_ne!(a, b);
    }

    #[test]
    fn test_domain_tag_parse() {
        assert_eq!("jwst".parse::<DomainTag>().unwrap(), DomainTag::JWST);
        assert_eq!("H".parse::<DomainTag>().unwrap(), DomainTag::HST);
        assert!("spitzer".parse::<DomainTag>().is_err());
    }

    #[test]
    fn test_empty_job_id_has_no_domain() {
        let id = JobId::from_raw("");
        assert_eq!(id.domain_char(), None);
    }
}
