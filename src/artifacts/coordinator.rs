//! # Coordinador de Artefactos
//! src/artifacts/coordinator.rs
//!
//! Crea, transmite y borra los archivos transitorios de cada job.
//!
//! El coordinador guarda, por JobId, la lista explícita de archivos que
//! creó (descargas y entradas subidas). Todas las operaciones sobre un
//! mismo JobId se serializan con un `Mutex` propio de ese ID, así una
//! descarga nunca ve borrado el archivo que está leyendo y cada archivo
//! se borra una sola vez.

use super::format::{self, ArtifactFormat, TableColumns};
use super::stream::ChunkStream;
use super::ArtifactError;
use crate::jobs::types::JobId;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Destino de una descarga.
///
/// `begin` se llama una vez, cuando el archivo ya existe y se conoce su
/// tamaño; después llegan los bloques en orden.
pub trait DownloadSink {
    fn begin(&mut self, file_name: &str, len: u64) -> io::Result<()>;
    fn chunk(&mut self, bytes: &[u8]) -> io::Result<()>;
}

/// Archivos propiedad de un JobId
type OwnedPaths = Arc<Mutex<Vec<PathBuf>>>;

/// Coordinador de artefactos en disco
pub struct ArtifactCoordinator {
    dir: PathBuf,
    columns: TableColumns,
    chunk_size: usize,
    owned: Mutex<HashMap<JobId, OwnedPaths>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl ArtifactCoordinator {
    pub fn new(dir: impl Into<PathBuf>, columns: TableColumns, chunk_size: usize) -> Self {
        Self {
            dir: dir.into(),
            columns,
            chunk_size: chunk_size.max(1),
            owned: Mutex::new(HashMap::new()),
        }
    }

    /// Directorio de artefactos
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Entrada (lock) del JobId, creándola si no existe
    fn entry(&self, id: &JobId) -> OwnedPaths {
        let mut owned = lock(&self.owned);
        Arc::clone(owned.entry(id.clone()).or_default())
    }

    /// Olvida el JobId si nadie más tiene su entrada
    fn forget_if_idle(&self, id: &JobId) {
        let mut owned = lock(&self.owned);
        let idle = owned
            .get(id)
            .map(|entry| Arc::strong_count(entry) == 1 && lock(entry).is_empty())
            .unwrap_or(false);
        if idle {
            owned.remove(id);
        }
    }

    fn write_owned(&self, paths: &mut Vec<PathBuf>, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ArtifactError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        fs::write(&path, bytes)?;
        if !paths.contains(&path) {
            paths.push(path.clone());
        }
        Ok(path)
    }

    /// Borra todos los archivos de la lista; cada uno una sola vez
    fn delete_owned(id: &JobId, paths: &mut Vec<PathBuf>) -> usize {
        let mut removed = 0;
        for path in paths.drain(..) {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(job_id = %id, path = %path.display(), error = %e, "could not delete artifact")
                }
            }
        }
        removed
    }

    /// Serializa el resultado en un archivo cuyo nombre contiene el JobId
    pub fn materialize(&self, id: &JobId, format: ArtifactFormat, result: &Value) -> Result<PathBuf, ArtifactError> {
        let bytes = format::encode(format, result, &self.columns)?;
        let entry = self.entry(id);
        let mut paths = lock(&entry);
        let path = self.write_owned(&mut paths, &format.file_name(id), &bytes)?;
        tracing::debug!(job_id = %id, path = %path.display(), "artifact materialized");
        Ok(path)
    }

    /// Guarda un archivo de entrada subido por el cliente
    pub fn stage_input(&self, id: &JobId, label: &str, extension: &str, bytes: &[u8]) -> Result<PathBuf, ArtifactError> {
        let safe_label: String = label
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        let safe_ext: String = extension
            .trim_start_matches('.')
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();

        let file_name = if safe_ext.is_empty() {
            format!("{}-{}", id, safe_label)
        } else {
            format!("{}-{}.{}", id, safe_label, safe_ext)
        };

        let entry = self.entry(id);
        let mut paths = lock(&entry);
        self.write_owned(&mut paths, &file_name, bytes)
    }

    /// Bloques de un archivo ya materializado
    pub fn stream(&self, path: &Path) -> io::Result<ChunkStream> {
        ChunkStream::open(path, self.chunk_size)
    }

    /// Borra todos los archivos que el coordinador tiene para el JobId.
    ///
    /// Se ejecuta bajo el lock del ID: no corre a la vez que una descarga
    /// del mismo job. Devuelve cuántos archivos se borraron.
    pub fn sweep(&self, id: &JobId) -> usize {
        let entry = self.entry(id);
        let removed = {
            let mut paths = lock(&entry);
            Self::delete_owned(id, &mut paths)
        };
        drop(entry);
        self.forget_if_idle(id);

        if removed > 0 {
            tracing::debug!(job_id = %id, removed, "artifacts swept");
        }
        removed
    }

    /// Materializa, transmite y limpia en una sola sección crítica por ID.
    ///
    /// El barrido solo ocurre si la transmisión terminó bien; si falla,
    /// los archivos siguen registrados y los borra el próximo `sweep`.
    pub fn download<S: DownloadSink>(
        &self,
        id: &JobId,
        format: ArtifactFormat,
        result: &Value,
        sink: &mut S,
    ) -> Result<u64, ArtifactError> {
        let bytes = format::encode(format, result, &self.columns)?;
        let file_name = format.file_name(id);

        let entry = self.entry(id);
        let sent = {
            let mut paths = lock(&entry);
            let path = self.write_owned(&mut paths, &file_name, &bytes)?;

            let len = fs::metadata(&path)?.len();
            sink.begin(&file_name, len)?;

            let mut sent = 0u64;
            for chunk in self.stream(&path)? {
                let chunk = chunk?;
                sink.chunk(&chunk)?;
                sent += chunk.len() as u64;
            }

            Self::delete_owned(id, &mut paths);
            sent
        };
        drop(entry);
        self.forget_if_idle(id);

        tracing::info!(job_id = %id, format = format.as_str(), bytes = sent, "artifact downloaded");
        Ok(sent)
    }

    /// Indica si el coordinador tiene archivos registrados para el JobId
    pub fn has_files(&self, id: &JobId) -> bool {
        lock(&self.owned).contains_key(id)
    }

    /// JobIds con archivos registrados
    pub fn tracked(&self) -> usize {
        lock(&self.owned).len()
    }
}
