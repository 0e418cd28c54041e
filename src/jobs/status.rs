//! # Proyección de Estado
//! src/jobs/status.rs
//!
//! Deriva la vista que ve el cliente a partir de un `JobRecord`. Es la
//! única entrada para cualquier respuesta de estado o dashboard.

use crate::jobs::registry::JobRecord;
use crate::jobs::types::{JobId, JobState};
use serde::Serialize;

/// Código advisory "aún trabajando" (equivalente a HTTP 202)
pub const STILL_WORKING: u16 = 202;

/// Vista de un job para el cliente
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub id: JobId,
    pub name: String,
    #[serde(rename = "count")]
    pub sequence: usize,
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
}

/// Proyecta el estado de un job.
///
/// Orden de precedencia: corriendo, terminado (o fallido si el fallo ya
/// fue reclamado), cancelado, pendiente.
pub fn project(record: &JobRecord) -> StatusSnapshot {
    let handle = &record.handle;

    let state = match handle.poll() {
        JobState::Running => JobState::Running,
        done @ (JobState::Finished | JobState::Failed) => done,
        _ if handle.is_cancelled() => JobState::Cancelled,
        _ => JobState::Pending,
    };

    StatusSnapshot {
        id: record.id.clone(),
        name: record.display_name.clone(),
        sequence: record.sequence,
        state,
        code: (state == JobState::Running).then_some(STILL_WORKING),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::ComputeFailure;
    use crate::jobs::handle::JobHandle;
    use crate::jobs::types::{DomainTag, OwnerToken};
    use serde_json::json;

    fn record(handle: JobHandle) -> JobRecord {
        JobRecord {
            id: JobId::generate(DomainTag::JWST),
            display_name: "wasp-39b".to_string(),
            owner: OwnerToken::new("me"),
            sequence: 7,
            handle,
        }
    }

    #[test]
    fn test_pending_snapshot() {
        let snapshot = project(&record(JobHandle::new()));
        assert_eq!(snapshot.state, JobState::Pending);
        assert_eq!(snapshot.code, None);
        assert_eq!(snapshot.sequence, 7);
        assert_eq!(snapshot.name, "wasp-39b");
    }

    #[test]
    fn test_running_snapshot_has_202() {
        let handle = JobHandle::new();
        handle.mark_running();
        let snapshot = project(&record(handle));
        assert_eq!(snapshot.state, JobState::Running);
        assert_eq!(snapshot.code, Some(202));
    }

    #[test]
    fn test_failed_shows_finished_until_demanded() {
        let handle = JobHandle::new();
        handle.complete(Err(ComputeFailure::new("ValueError", "bad target")));
        let rec = record(handle.clone());

        assert_eq!(project(&rec).state, JobState::Finished);
        let _ = handle.result();
        assert_eq!(project(&rec).state, JobState::Failed);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let handle = JobHandle::new();
        handle.complete(Ok(json!(1)));
        let rec = record(handle);
        let value = serde_json::to_value(project(&rec)).unwrap();

        assert_eq!(value["state"], "finished");
        assert_eq!(value["count"], 7);
        assert_eq!(value["id"], rec.id.as_str());
        assert!(value.get("code").is_none());
    }
}
