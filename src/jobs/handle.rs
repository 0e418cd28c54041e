//! # Handle de un Job
//! src/jobs/handle.rs
//!
//! Representa una unidad de trabajo en vuelo o terminada. El worker que
//! la ejecuta y el registro comparten el mismo estado interno.
//!
//! Un fallo de la función de cálculo queda oculto para `poll()` hasta que
//! alguien llama a `result()`: antes de eso el job se ve como terminado.

use crate::compute::ComputeFailure;
use crate::jobs::types::JobState;
use serde_json::Value;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

/// Resultado de una ejecución ya terminada
pub type Outcome = Result<Arc<Value>, ComputeFailure>;

/// Fase interna de ejecución
#[derive(Debug)]
enum Phase {
    Pending,
    Running,
    Done(Outcome),
}

/// Datos internos mutables del job
#[derive(Debug)]
struct Slot {
    phase: Phase,
    /// `true` después del primer `result()`
    demanded: bool,
}

#[derive(Debug)]
struct Shared {
    slot: Mutex<Slot>,
    done: Condvar,
}

/// Handle compartido (barato de clonar) de un job
#[derive(Debug, Clone)]
pub struct JobHandle {
    shared: Arc<Shared>,
}

impl JobHandle {
    /// Crea un handle en estado pendiente
    pub(crate) fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    phase: Phase::Pending,
                    demanded: false,
                }),
                done: Condvar::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        // El lock nunca se mantiene mientras corre el cálculo
        self.shared.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Marca el job como iniciado (lo llama el worker)
    pub(crate) fn mark_running(&self) {
        let mut slot = self.lock();
        if matches!(slot.phase, Phase::Pending) {
            slot.phase = Phase::Running;
        }
    }

    /// Guarda el resultado y despierta a quien espere en `result()`
    pub(crate) fn complete(&self, outcome: Result<Value, ComputeFailure>) {
        let mut slot = self.lock();
        slot.phase = Phase::Done(outcome.map(Arc::new));
        self.shared.done.notify_all();
    }

    /// Consulta no bloqueante del estado.
    ///
    /// Nunca devuelve `Failed` antes del primer `result()`, aunque el
    /// cálculo haya fallado.
    pub fn poll(&self) -> JobState {
        let slot = self.lock();
        match &slot.phase {
            Phase::Pending => JobState::Pending,
            Phase::Running => JobState::Running,
            Phase::Done(Err(_)) if slot.demanded => JobState::Failed,
            Phase::Done(_) => JobState::Finished,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.lock().phase, Phase::Running)
    }

    pub fn is_done(&self) -> bool {
        matches!(self.lock().phase, Phase::Done(_))
    }

    /// No hay cancelación: siempre `false`
    pub fn is_cancelled(&self) -> bool {
        false
    }

    /// Espera a que el job termine y devuelve su resultado.
    ///
    /// Bloquea sin límite de tiempo. Llamadas repetidas devuelven el mismo
    /// valor (o el mismo fallo) sin volver a ejecutar nada.
    pub fn result(&self) -> Outcome {
        let mut slot = self.lock();
        loop {
            let ready = match &slot.phase {
                Phase::Done(outcome) => Some(outcome.clone()),
                _ => None,
            };
            if let Some(outcome) = ready {
                slot.demanded = true;
                return outcome;
            }
            slot = self
                .shared
                .done
                .wait(slot)
                .unwrap_or_else(|e| e.into_inner());
        }
    }
}
