//! # Registro de Jobs
//! src/jobs/registry.rs
//!
//! Colección acotada y ordenada por inserción: `JobId -> JobRecord`.
//!
//! - Al superar la capacidad se expulsa el job más viejo, sin importar su
//!   estado (uno que sigue corriendo termina sin observador).
//! - `sequence` es un ordinal de presentación (`tamaño + 1` al insertar);
//!   no se recalcula tras una expulsión.
//! - Un único `Mutex` protege el orden y el mapa: todas las operaciones
//!   son atómicas entre sí.

use crate::jobs::handle::JobHandle;
use crate::jobs::types::{DomainTag, JobId, OwnerToken};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Capacidad por defecto del registro
pub const DEFAULT_CAPACITY: usize = 100;

/// Registro de un job enviado
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: JobId,
    pub display_name: String,
    pub owner: OwnerToken,
    pub sequence: usize,
    pub handle: JobHandle,
}

#[derive(Default)]
struct Inner {
    /// Orden de inserción (el frente es el más viejo)
    order: VecDeque<JobId>,
    records: HashMap<JobId, JobRecord>,
}

/// Registro acotado de jobs, compartido por todas las conexiones
pub struct JobRegistry {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl JobRegistry {
    /// Crea un registro vacío. Una capacidad de 0 se trata como 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registra un job nuevo con un ID generado para el dominio dado
    pub fn submit(
        &self,
        name: &str,
        owner: OwnerToken,
        tag: DomainTag,
        handle: JobHandle,
    ) -> JobId {
        self.insert(JobId::generate(tag), name, owner, handle)
    }

    /// Registra un job con un ID ya generado por el llamador
    pub fn insert(&self, id: JobId, name: &str, owner: OwnerToken, handle: JobHandle) -> JobId {
        self.insert_record(id, name, owner, handle).0.id
    }

    /// Como `insert`, pero devuelve una copia del registro creado y el
    /// registro expulsado, si hubo uno. Ambos salen de la misma sección
    /// crítica que la inserción.
    pub fn insert_record(
        &self,
        id: JobId,
        name: &str,
        owner: OwnerToken,
        handle: JobHandle,
    ) -> (JobRecord, Option<JobRecord>) {
        let mut inner = self.lock();

        let record = JobRecord {
            id: id.clone(),
            display_name: name.to_string(),
            owner,
            sequence: inner.records.len() + 1,
            handle,
        };

        if inner.records.insert(id.clone(), record.clone()).is_some() {
            // ID repetido: se reemplaza el registro, la posición se renueva
            inner.order.retain(|existing| existing != &id);
        }
        inner.order.push_back(id);

        let mut evicted = None;
        if inner.records.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                evicted = inner.records.remove(&oldest);
            }
        }
        drop(inner);

        if let Some(old) = &evicted {
            tracing::info!(
                job_id = %old.id,
                name = %old.display_name,
                state = old.handle.poll().as_str(),
                "registry full, evicted oldest job"
            );
        }
        (record, evicted)
    }

    /// Busca un job por ID exacto
    pub fn get(&self, id: &JobId) -> Option<JobRecord> {
        self.lock().records.get(id).cloned()
    }

    /// Jobs de un dueño y dominio, en orden de inserción
    pub fn list_by_owner(&self, owner: &OwnerToken, tag: DomainTag) -> Vec<JobRecord> {
        let inner = self.lock();
        inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id))
            .filter(|record| &record.owner == owner && record.id.has_domain(tag))
            .cloned()
            .collect()
    }

    /// IDs en orden de inserción
    pub fn ids(&self) -> Vec<JobId> {
        self.lock().order.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
