//! # Pool de Workers
//! src/jobs/pool.rs
//!
//! Pool de tamaño fijo de threads del sistema operativo que ejecutan la
//! función de cálculo. `dispatch` solo encola y retorna de inmediato; la
//! cola es FIFO y está protegida por un `Mutex` + `Condvar`.
//!
//! Un panic dentro de la función de cálculo se captura en el worker y se
//! convierte en un `ComputeFailure`: el worker sigue vivo. Solo se aíslan
//! los panics que hacen unwinding; un abort (por ejemplo, una reserva de
//! memoria fallida) termina el proceso entero, así que la función de
//! cálculo debe acotar sus entradas.

use crate::compute::{Compute, ComputeFailure};
use crate::jobs::handle::JobHandle;
use serde_json::Value;
use std::collections::VecDeque;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

/// Trabajo encolado esperando un worker
struct Task {
    compute: Arc<dyn Compute>,
    payload: Value,
    handle: JobHandle,
}

struct QueueState {
    tasks: VecDeque<Task>,
    closed: bool,
}

struct TaskQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl TaskQueue {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, task: Task) {
        let mut state = self.lock();
        state.tasks.push_back(task);
        // Notificar a un worker esperando
        self.available.notify_one();
    }

    /// Bloquea hasta que haya trabajo. `None` cuando el pool se cerró
    /// y la cola quedó vacía.
    fn pop(&self) -> Option<Task> {
        let mut state = self.lock();
        loop {
            if let Some(task) = state.tasks.pop_front() {
                return Some(task);
            }
            if state.closed {
                return None;
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        self.available.notify_all();
    }
}

/// Pool de workers de tamaño fijo
pub struct WorkerPool {
    queue: Arc<TaskQueue>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Inicia `size` workers
    pub fn new(size: usize) -> io::Result<Self> {
        let queue = Arc::new(TaskQueue {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(size);
        for i in 0..size {
            let queue = Arc::clone(&queue);
            let name = format!("calc-worker-{}", i);
            let worker = thread::Builder::new()
                .name(name.clone())
                .spawn(move || Self::worker_loop(name, queue))?;
            workers.push(worker);
        }

        Ok(Self { queue, workers })
    }

    /// Número de workers
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Encola un cálculo y retorna su handle sin bloquear
    pub fn dispatch(&self, compute: Arc<dyn Compute>, payload: Value) -> JobHandle {
        let handle = JobHandle::new();
        self.queue.push(Task {
            compute,
            payload,
            handle: handle.clone(),
        });
        handle
    }

    /// Trabajos en cola que ningún worker tomó todavía
    pub fn queued(&self) -> usize {
        self.queue.lock().tasks.len()
    }

    /// Loop principal del worker
    fn worker_loop(name: String, queue: Arc<TaskQueue>) {
        tracing::debug!(worker = %name, "worker started");

        while let Some(task) = queue.pop() {
            task.handle.mark_running();

            let Task { compute, payload, handle } = task;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| compute.run(payload)))
                .unwrap_or_else(|payload| Err(ComputeFailure::from_panic(payload)));

            match &outcome {
                Ok(_) => tracing::debug!(worker = %name, "computation finished"),
                Err(failure) => {
                    tracing::warn!(worker = %name, kind = %failure.kind, error = %failure.message, "computation failed")
                }
            }

            handle.complete(outcome);
        }

        tracing::debug!(worker = %name, "worker stopped");
    }
}

impl Drop for WorkerPool {
    /// Cierra la cola; los workers terminan lo que queda y salen.
    /// No se espera a que terminen cálculos sin límite de tiempo.
    fn drop(&mut self) {
        self.queue.close();
        for worker in self.workers.drain(..) {
            if worker.is_finished() {
                let _ = worker.join();
            }
        }
    }
}
