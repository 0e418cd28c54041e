//! # Función de Cálculo
//! src/compute/mod.rs
//!
//! El cálculo científico es un colaborador externo: recibe un valor de
//! configuración (JSON) y devuelve un resultado (JSON) o un fallo. Este
//! módulo define la frontera (`Compute`) y un sustituto sencillo
//! (`SyntheticSpectrum`) para que el binario tenga algo que ejecutar.

use serde_json::{json, Value};

/// Fallo reportado por la función de cálculo.
///
/// Se propaga tal cual hasta el cliente: `kind` identifica el tipo de
/// error (ej: `"ValueError"`, `"panic"`) y `message` el texto original.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ComputeFailure {
    pub kind: String,
    pub message: String,
}

impl ComputeFailure {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Fallo por entrada inválida
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new("ValueError", message)
    }

    /// Convierte el payload de un panic capturado en un fallo
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "compute function panicked".to_string()
        };
        Self::new("panic", message)
    }
}

/// Función de cálculo que se ejecuta dentro de un worker.
///
/// Puede tardar un tiempo arbitrario y puede fallar.
pub trait Compute: Send + Sync + 'static {
    fn run(&self, payload: Value) -> Result<Value, ComputeFailure>;
}

impl<F> Compute for F
where
    F: Fn(Value) -> Result<Value, ComputeFailure> + Send + Sync + 'static,
{
    fn run(&self, payload: Value) -> Result<Value, ComputeFailure> {
        self(payload)
    }
}

/// Máximo de puntos por defecto de `SyntheticSpectrum`
pub const DEFAULT_MAX_POINTS: usize = 1_000_000;

/// Espectro de profundidad de tránsito plano.
///
/// Espera un payload como:
///
/// ```json
/// {"star": {"radius": 1.0}, "planet": {"radius": 0.1},
///  "wave_min": 1.0, "wave_max": 5.0, "points": 100}
/// ```
///
/// Ambos radios deben estar en las mismas unidades. Devuelve `x`
/// (malla de longitudes de onda) e `y` (profundidad `(rp/rs)^2`).
/// `points` no puede superar `max_points`.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticSpectrum {
    max_points: usize,
}

impl Default for SyntheticSpectrum {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_POINTS)
    }
}

impl SyntheticSpectrum {
    pub fn new(max_points: usize) -> Self {
        Self {
            max_points: max_points.max(2),
        }
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }

    fn number(payload: &Value, pointer: &str) -> Result<f64, ComputeFailure> {
        payload
            .pointer(pointer)
            .and_then(Value::as_f64)
            .ok_or_else(|| ComputeFailure::invalid_input(format!("missing numeric field {}", pointer)))
    }

    /// Vector vacío con capacidad reservada; un fallo de memoria se
    /// reporta como error en vez de abortar el proceso
    fn reserve(points: usize) -> Result<Vec<f64>, ComputeFailure> {
        let mut values = Vec::new();
        values
            .try_reserve_exact(points)
            .map_err(|e| ComputeFailure::new("MemoryError", e.to_string()))?;
        Ok(values)
    }
}

impl Compute for SyntheticSpectrum {
    fn run(&self, payload: Value) -> Result<Value, ComputeFailure> {
        let star_radius = Self::number(&payload, "/star/radius")?;
        let planet_radius = Self::number(&payload, "/planet/radius")?;
        let wave_min = Self::number(&payload, "/wave_min")?;
        let wave_max = Self::number(&payload, "/wave_max")?;
        let points = match payload.get("points") {
            None => 100,
            Some(value) => value
                .as_u64()
                .ok_or_else(|| ComputeFailure::invalid_input("points must be a non-negative integer"))?,
        };

        if star_radius <= 0.0 {
            return Err(ComputeFailure::invalid_input("star radius must be positive"));
        }
        if wave_max <= wave_min {
            return Err(ComputeFailure::invalid_input("wave_max must be greater than wave_min"));
        }
        if points < 2 {
            return Err(ComputeFailure::invalid_input("points must be >= 2"));
        }
        let points = usize::try_from(points)
            .ok()
            .filter(|p| *p <= self.max_points)
            .ok_or_else(|| ComputeFailure::invalid_input(format!("points must be <= {}", self.max_points)))?;

        let depth = (planet_radius / star_radius).powi(2);
        let step = (wave_max - wave_min) / (points - 1) as f64;

        let mut x = Self::reserve(points)?;
        x.extend((0..points).map(|i| wave_min + step * i as f64));
        let mut y = Self::reserve(points)?;
        y.resize(points, depth);

        Ok(json!({
            "x": x,
            "y": y,
            "depth": depth,
        }))
    }
}
