//! # Gestor Central de Jobs
//! src/jobs/manager.rs
//!
//! Coordina las operaciones de frontera: envío, consulta de estado,
//! listado, resultado y descarga. Es dueño del registro, del pool de
//! workers y del coordinador de artefactos; el servidor lo comparte entre
//! conexiones con un `Arc`.

use crate::artifacts::{ArtifactCoordinator, ArtifactFormat, DownloadSink, TableColumns, DEFAULT_CHUNK_SIZE};
use crate::compute::Compute;
use crate::jobs::error::JobError;
use crate::jobs::handle::JobHandle;
use crate::jobs::pool::WorkerPool;
use crate::jobs::registry::{JobRecord, JobRegistry, DEFAULT_CAPACITY};
use crate::jobs::status::{self, StatusSnapshot};
use crate::jobs::types::{DomainTag, JobId, OwnerToken};
use serde_json::{Map, Value};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

/// Configuración del Job Manager
#[derive(Debug, Clone)]
pub struct JobManagerConfig {
    /// Número de workers del pool
    pub workers: usize,

    /// Máximo de jobs en el registro
    pub capacity: usize,

    /// Directorio de artefactos transitorios
    pub artifact_dir: PathBuf,

    /// Columnas de la exportación tabular
    pub table_columns: TableColumns,

    /// Tamaño de bloque para descargas
    pub chunk_size: usize,
}

impl Default for JobManagerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            capacity: DEFAULT_CAPACITY,
            artifact_dir: PathBuf::from("./temp"),
            table_columns: TableColumns::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl JobManagerConfig {
    /// Crea una configuración desde el Config principal
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            workers: config.workers,
            capacity: config.capacity,
            artifact_dir: PathBuf::from(&config.artifact_dir),
            table_columns: TableColumns {
                x: config.table_x.clone(),
                y: config.table_y.clone(),
            },
            chunk_size: config.chunk_size,
        }
    }
}

/// Archivo de entrada subido junto con el envío
#[derive(Debug, Clone)]
pub struct InputFile {
    /// Nombre lógico (ej: "planet", "noise")
    pub label: String,
    /// Extensión original (ej: ".txt")
    pub extension: String,
    pub content: Vec<u8>,
}

/// Datos de un envío nuevo
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub name: String,
    pub owner: OwnerToken,
    pub domain: DomainTag,
    pub payload: Value,
    pub inputs: Vec<InputFile>,
}

/// Gestor central de jobs
pub struct JobManager {
    registry: JobRegistry,
    pool: WorkerPool,
    artifacts: Arc<ArtifactCoordinator>,
    compute: Arc<dyn Compute>,
}

impl JobManager {
    /// Crea el gestor e inicia los workers
    pub fn new(config: JobManagerConfig, compute: Arc<dyn Compute>) -> io::Result<Self> {
        let pool = WorkerPool::new(config.workers)?;
        let registry = JobRegistry::new(config.capacity);
        let artifacts = Arc::new(ArtifactCoordinator::new(
            config.artifact_dir.clone(),
            config.table_columns,
            config.chunk_size,
        ));

        tracing::info!(
            workers = pool.size(),
            capacity = registry.capacity(),
            artifact_dir = %config.artifact_dir.display(),
            "job manager ready"
        );

        Ok(Self {
            registry,
            pool,
            artifacts,
            compute,
        })
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn artifacts(&self) -> &ArtifactCoordinator {
        &self.artifacts
    }

    /// Encola un cálculo nuevo y lo registra.
    ///
    /// Si algo falla antes de despachar (nombre vacío, payload inválido,
    /// error al guardar entradas) no queda ningún registro ni archivo.
    pub fn submit_job(&self, request: SubmitRequest) -> Result<(JobId, StatusSnapshot), JobError> {
        let SubmitRequest {
            name,
            owner,
            domain,
            mut payload,
            inputs,
        } = request;

        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(JobError::InvalidRequest("calculation name is required".to_string()));
        }

        let id = JobId::generate(domain);

        if !inputs.is_empty() {
            if let Err(e) = self.stage_inputs(&id, &mut payload, &inputs) {
                self.artifacts.sweep(&id);
                return Err(e);
            }
        }

        let handle = self.pool.dispatch(Arc::clone(&self.compute), payload);
        let (record, evicted) = self.registry.insert_record(id.clone(), &name, owner, handle);

        tracing::info!(job_id = %id, name = %name, "calculation submitted");

        if let Some(evicted) = evicted {
            self.release_evicted(evicted);
        }

        // Estado inicial desde la copia insertada, sin volver al registro
        Ok((id, status::project(&record)))
    }

    /// Barre los archivos de un job expulsado del registro.
    ///
    /// Si el cálculo todavía puede leer sus entradas, un thread espera a
    /// que termine antes de borrarlas.
    fn release_evicted(&self, record: JobRecord) {
        if !self.artifacts.has_files(&record.id) {
            return;
        }
        if record.handle.is_done() {
            self.artifacts.sweep(&record.id);
            return;
        }

        let artifacts = Arc::clone(&self.artifacts);
        let JobRecord { id, handle, .. } = record;
        let spawned = thread::Builder::new()
            .name("calc-evict-sweep".to_string())
            .spawn(move || {
                let _ = handle.result();
                artifacts.sweep(&id);
            });
        if let Err(e) = spawned {
            tracing::warn!(error = %e, "could not spawn sweep thread for evicted job");
        }
    }

    /// Guarda las entradas subidas y agrega sus rutas al payload
    /// en `input_files.<label>`
    fn stage_inputs(&self, id: &JobId, payload: &mut Value, inputs: &[InputFile]) -> Result<(), JobError> {
        let object = payload
            .as_object_mut()
            .ok_or_else(|| JobError::InvalidRequest("payload must be an object when inputs are attached".to_string()))?;

        let mut paths = Map::new();
        for input in inputs {
            let path = self
                .artifacts
                .stage_input(id, &input.label, &input.extension, &input.content)?;
            paths.insert(input.label.clone(), Value::String(path.to_string_lossy().into_owned()));
        }
        object.insert("input_files".to_string(), Value::Object(paths));
        Ok(())
    }

    fn handle(&self, id: &JobId) -> Result<JobHandle, JobError> {
        self.registry
            .get(id)
            .map(|record| record.handle)
            .ok_or_else(|| JobError::NotFound(id.clone()))
    }

    /// Estado actual de un job
    pub fn poll_status(&self, id: &JobId) -> Result<StatusSnapshot, JobError> {
        self.registry
            .get(id)
            .map(|record| status::project(&record))
            .ok_or_else(|| JobError::NotFound(id.clone()))
    }

    /// Jobs del dueño en el dominio, del más reciente al más viejo
    pub fn list_jobs(&self, owner: &OwnerToken, tag: DomainTag) -> Vec<StatusSnapshot> {
        self.registry
            .list_by_owner(owner, tag)
            .iter()
            .rev()
            .map(status::project)
            .collect()
    }

    /// Espera el resultado de un job.
    ///
    /// El handle se copia fuera del registro antes de bloquear: la espera
    /// nunca retiene el lock del registro.
    pub fn fetch_result(&self, id: &JobId) -> Result<Arc<Value>, JobError> {
        let handle = self.handle(id)?;
        Ok(handle.result()?)
    }

    /// Resultado para la vista; luego barre las entradas subidas del job
    pub fn view_result(&self, id: &JobId) -> Result<Arc<Value>, JobError> {
        let result = self.fetch_result(id)?;
        self.artifacts.sweep(id);
        Ok(result)
    }

    /// Espera el resultado, lo serializa y lo transmite al sink.
    /// Al terminar la transmisión barre los archivos del job.
    pub fn download_artifact<S: DownloadSink>(
        &self,
        id: &JobId,
        format: ArtifactFormat,
        sink: &mut S,
    ) -> Result<u64, JobError> {
        let result = self.fetch_result(id)?;
        Ok(self.artifacts.download(id, format, &result, sink)?)
    }

    /// Estadísticas del registro y del pool
    pub fn stats(&self) -> Value {
        serde_json::json!({
            "jobs": self.registry.len(),
            "capacity": self.registry.capacity(),
            "workers": self.pool.size(),
            "queued": self.pool.queued(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::ComputeFailure;
    use crate::jobs::types::JobState;
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use std::sync::{mpsc, Mutex};
    use std::time::{Duration, Instant};

    struct VecSink(Vec<u8>);

    impl DownloadSink for VecSink {
        fn begin(&mut self, _file_name: &str, _len: u64) -> io::Result<()> {
            Ok(())
        }

        fn chunk(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.0.extend_from_slice(bytes);
            Ok(())
        }
    }

    fn manager(dir: &Path, capacity: usize) -> JobManager {
        let compute: Arc<dyn Compute> = Arc::new(|v: Value| -> Result<Value, ComputeFailure> {
            if let Some(target) = v.get("fail").and_then(Value::as_str) {
                return Err(ComputeFailure::new("ValueError", target));
            }
            let x = v.get("x").and_then(Value::as_f64).unwrap_or(0.0);
            Ok(json!({"value": x * 2.0, "x": [1.0, 2.0], "y": [x, x], "input_files": v.get("input_files")}))
        });
        let config = JobManagerConfig {
            workers: 2,
            capacity,
            artifact_dir: dir.to_path_buf(),
            ..JobManagerConfig::default()
        };
        JobManager::new(config, compute).unwrap()
    }

    fn files_of(dir: &Path, id: &JobId) -> usize {
        fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_name().to_string_lossy().contains(id.as_str()))
                    .count()
            })
            .unwrap_or(0)
    }

    fn with_input(mut req: SubmitRequest, label: &str) -> SubmitRequest {
        req.inputs.push(InputFile {
            label: label.into(),
            extension: ".txt".into(),
            content: b"1 2".to_vec(),
        });
        req
    }

    fn request(name: &str, owner: &str, payload: Value) -> SubmitRequest {
        SubmitRequest {
            name: name.to_string(),
            owner: OwnerToken::new(owner),
            domain: DomainTag::JWST,
            payload,
            inputs: Vec::new(),
        }
    }

    #[test]
    fn test_submit_and_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 10);

        let (id, snapshot) = manager.submit_job(request("double", "me", json!({"x": 2}))).unwrap();
        assert_eq!(snapshot.id, id);
        assert_eq!(snapshot.sequence, 1);
        assert_ne!(snapshot.state, JobState::Failed);

        let result = manager.fetch_result(&id).unwrap();
        assert_eq!(result["value"], json!(4.0));
        assert_eq!(manager.poll_status(&id).unwrap().state, JobState::Finished);
    }

    #[test]
    fn test_unknown_job_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 10);
        let missing = JobId::from_raw("nope");

        assert!(matches!(manager.poll_status(&missing), Err(JobError::NotFound(_))));
        assert!(matches!(manager.fetch_result(&missing), Err(JobError::NotFound(_))));
    }

    #[test]
    fn test_compute_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 10);
        let (id, _) = manager.submit_job(request("bad", "me", json!({"fail": "bad target"}))).unwrap();

        match manager.fetch_result(&id) {
            Err(JobError::Compute(failure)) => {
                assert_eq!(failure.kind, "ValueError");
                assert_eq!(failure.message, "bad target");
            }
            other => panic!("expected compute failure, got {:?}", other),
        }
        assert_eq!(manager.poll_status(&id).unwrap().state, JobState::Failed);
    }

    #[test]
    fn test_empty_name_leaves_no_record() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 10);
        let err = manager.submit_job(request("   ", "me", json!({}))).unwrap_err();
        assert!(matches!(err, JobError::InvalidRequest(_)));
        assert!(manager.registry().is_empty());
    }

    #[test]
    fn test_inputs_need_object_payload() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 10);
        let mut req = request("with-input", "me", json!([1, 2, 3]));
        req.inputs.push(InputFile {
            label: "planet".into(),
            extension: ".txt".into(),
            content: b"1 2".to_vec(),
        });

        assert!(manager.submit_job(req).is_err());
        assert!(manager.registry().is_empty());
        assert_eq!(fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0), 0);
    }

    #[test]
    fn test_list_jobs_newest_first_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 10);
        manager.submit_job(request("one", "me", json!({"x": 1}))).unwrap();
        manager.submit_job(request("other", "you", json!({"x": 1}))).unwrap();
        manager.submit_job(request("two", "me", json!({"x": 1}))).unwrap();
        let mut hst = request("hst", "me", json!({"x": 1}));
        hst.domain = DomainTag::HST;
        manager.submit_job(hst).unwrap();

        let names: Vec<String> = manager
            .list_jobs(&OwnerToken::new("me"), DomainTag::JWST)
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["two", "one"]);
    }

    #[test]
    fn test_capacity_eviction_through_manager() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 100);
        let mut ids = Vec::new();
        for i in 0..=100 {
            let (id, _) = manager.submit_job(request(&format!("job-{}", i), "me", json!({"x": i}))).unwrap();
            ids.push(id);
        }

        assert!(matches!(manager.poll_status(&ids[0]), Err(JobError::NotFound(_))));
        assert_eq!(manager.list_jobs(&OwnerToken::new("me"), DomainTag::JWST).len(), 100);
    }

    #[test]
    fn test_download_removes_job_files() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 10);
        let mut req = request("dl", "me", json!({"x": 3}));
        req.inputs.push(InputFile {
            label: "noise".into(),
            extension: ".dat".into(),
            content: b"0.1".to_vec(),
        });
        let (id, _) = manager.submit_job(req).unwrap();

        let mut sink = VecSink(Vec::new());
        let sent = manager.download_artifact(&id, ArtifactFormat::Table, &mut sink).unwrap();
        assert_eq!(sent as usize, sink.0.len());
        assert_eq!(String::from_utf8(sink.0).unwrap().lines().count(), 2);

        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(id.as_str()))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_view_sweeps_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 10);
        let mut req = request("view", "me", json!({"x": 1}));
        req.inputs.push(InputFile {
            label: "planet".into(),
            extension: "txt".into(),
            content: b"1 1".to_vec(),
        });
        let (id, _) = manager.submit_job(req).unwrap();

        let result = manager.view_result(&id).unwrap();
        let staged = result["input_files"]["planet"].as_str().unwrap();
        assert!(staged.contains(id.as_str()));
        assert!(!Path::new(staged).exists());
    }

    #[test]
    fn test_snapshot_survives_immediate_eviction() {
        let dir = tempfile::tempdir().unwrap();
        let manager = Arc::new(manager(dir.path(), 1));
        let mut threads = Vec::new();

        for t in 0..4 {
            let manager = Arc::clone(&manager);
            threads.push(thread::spawn(move || {
                for i in 0..25 {
                    let (id, snapshot) = manager
                        .submit_job(request(&format!("job-{}-{}", t, i), "me", json!({"x": i})))
                        .unwrap();
                    assert_eq!(snapshot.id, id);
                }
            }));
        }
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(manager.registry().len(), 1);
    }

    #[test]
    fn test_evicted_job_inputs_are_swept() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 1);

        let (first, _) = manager
            .submit_job(with_input(request("first", "me", json!({"x": 1})), "planet"))
            .unwrap();
        let first_handle = manager.registry().get(&first).unwrap().handle;
        assert_eq!(files_of(dir.path(), &first), 1);

        let (second, _) = manager
            .submit_job(with_input(request("second", "me", json!({"x": 2})), "planet"))
            .unwrap();
        assert!(matches!(manager.poll_status(&first), Err(JobError::NotFound(_))));
        first_handle.result().unwrap();

        // El barrido del expulsado puede ir en otro thread
        let start = Instant::now();
        while files_of(dir.path(), &first) > 0 || manager.artifacts().has_files(&first) {
            assert!(start.elapsed() < Duration::from_secs(5), "evicted inputs never swept");
            thread::sleep(Duration::from_millis(5));
        }

        // Las entradas del job vigente no se tocan
        assert_eq!(files_of(dir.path(), &second), 1);
        assert_eq!(manager.artifacts().tracked(), 1);
    }

    #[test]
    fn test_running_evicted_job_keeps_inputs_until_done() {
        let dir = tempfile::tempdir().unwrap();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let compute: Arc<dyn Compute> = Arc::new(move |v: Value| -> Result<Value, ComputeFailure> {
            if v.get("block").is_some() {
                let _ = release_rx.lock().unwrap().recv();
            }
            Ok(json!({"input_files": v.get("input_files")}))
        });
        let config = JobManagerConfig {
            workers: 2,
            capacity: 1,
            artifact_dir: dir.path().to_path_buf(),
            ..JobManagerConfig::default()
        };
        let manager = JobManager::new(config, compute).unwrap();

        let (slow, _) = manager
            .submit_job(with_input(request("slow", "me", json!({"block": true})), "planet"))
            .unwrap();
        let slow_handle = manager.registry().get(&slow).unwrap().handle;
        manager.submit_job(request("fast", "me", json!({}))).unwrap();

        // Expulsado pero todavía corriendo: la entrada sigue en disco
        assert!(manager.registry().get(&slow).is_none());
        assert_eq!(files_of(dir.path(), &slow), 1);

        release_tx.send(()).unwrap();
        slow_handle.result().unwrap();
        let start = Instant::now();
        while files_of(dir.path(), &slow) > 0 {
            assert!(start.elapsed() < Duration::from_secs(5), "evicted inputs never swept");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_blocked_result_does_not_hold_registry() {
        let dir = tempfile::tempdir().unwrap();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let compute: Arc<dyn Compute> = Arc::new(move |v: Value| -> Result<Value, ComputeFailure> {
            if v.get("block").is_some() {
                let _ = release_rx.lock().unwrap().recv();
            }
            Ok(json!("done"))
        });
        let config = JobManagerConfig {
            workers: 2,
            artifact_dir: dir.path().to_path_buf(),
            ..JobManagerConfig::default()
        };
        let manager = Arc::new(JobManager::new(config, compute).unwrap());

        let (slow, _) = manager.submit_job(request("slow", "me", json!({"block": true}))).unwrap();
        let start = Instant::now();
        while manager.poll_status(&slow).unwrap().state != JobState::Running {
            assert!(start.elapsed() < Duration::from_secs(5), "job never started");
            thread::sleep(Duration::from_millis(5));
        }

        let waiter = {
            let manager = Arc::clone(&manager);
            let slow = slow.clone();
            thread::spawn(move || manager.fetch_result(&slow).map(|v| (*v).clone()))
        };
        thread::sleep(Duration::from_millis(50));

        // Con un result() bloqueado, el registro sigue respondiendo
        let (other, snapshot) = manager.submit_job(request("other", "me", json!({}))).unwrap();
        assert_eq!(snapshot.id, other);
        assert_eq!(manager.poll_status(&slow).unwrap().state, JobState::Running);
        assert_eq!(manager.list_jobs(&OwnerToken::new("me"), DomainTag::JWST).len(), 2);
        assert!(!waiter.is_finished());

        release_tx.send(()).unwrap();
        assert_eq!(waiter.join().unwrap().unwrap(), json!("done"));
    }
}
