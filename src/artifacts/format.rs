//! # Formatos de Artefacto
//! src/artifacts/format.rs
//!
//! Serializa un resultado en bytes listos para descargar:
//! - `Blob`: el resultado completo como JSON
//! - `Table`: dos columnas numéricas alineadas extraídas del resultado

use super::ArtifactError;
use crate::jobs::types::JobId;
use serde_json::Value;
use std::fmt::Write as _;
use std::str::FromStr;

/// Forma de serialización de un artefacto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    /// Resultado completo, opaco
    Blob,
    /// Exportación tabular de dos columnas
    Table,
}

impl ArtifactFormat {
    /// Nombre del archivo; siempre contiene el JobId
    pub fn file_name(&self, id: &JobId) -> String {
        match self {
            ArtifactFormat::Blob => format!("calculation-{}.json", id),
            ArtifactFormat::Table => format!("spectrum-{}.txt", id),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactFormat::Blob => "blob",
            ArtifactFormat::Table => "table",
        }
    }
}

impl FromStr for ArtifactFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "blob" | "full" => Ok(ArtifactFormat::Blob),
            "table" | "txt" => Ok(ArtifactFormat::Table),
            other => Err(format!("Unknown artifact format: {}", other)),
        }
    }
}

/// Nombres de las dos columnas de la exportación tabular
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumns {
    pub x: String,
    pub y: String,
}

impl Default for TableColumns {
    fn default() -> Self {
        Self {
            x: "x".to_string(),
            y: "y".to_string(),
        }
    }
}

/// Serializa el resultado según el formato
pub fn encode(format: ArtifactFormat, result: &Value, columns: &TableColumns) -> Result<Vec<u8>, ArtifactError> {
    match format {
        ArtifactFormat::Blob => Ok(serde_json::to_vec_pretty(result)?),
        ArtifactFormat::Table => encode_table(result, columns),
    }
}

fn numeric_column(result: &Value, key: &str) -> Result<Vec<f64>, ArtifactError> {
    let items = result
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| ArtifactError::Shape(format!("result has no array field '{}'", key)))?;

    items
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_f64()
                .ok_or_else(|| ArtifactError::Shape(format!("'{}'[{}] is not a number", key, i)))
        })
        .collect()
}

/// Una fila por línea: `x y` en notación científica
fn encode_table(result: &Value, columns: &TableColumns) -> Result<Vec<u8>, ArtifactError> {
    let xs = numeric_column(result, &columns.x)?;
    let ys = numeric_column(result, &columns.y)?;

    if xs.len() != ys.len() {
        return Err(ArtifactError::Shape(format!(
            "columns '{}' ({}) and '{}' ({}) differ in length",
            columns.x,
            xs.len(),
            columns.y,
            ys.len()
        )));
    }

    let mut out = String::with_capacity(xs.len() * 52);
    for (x, y) in xs.iter().zip(&ys) {
        // Escribir a un String no falla
        let _ = writeln!(out, "{:.18e} {:.18e}", x, y);
    }
    Ok(out.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::DomainTag;
    use serde_json::json;

    #[test]
    fn test_file_names_embed_job_id() {
        let id = JobId::generate(DomainTag::JWST);
        assert!(ArtifactFormat::Blob.file_name(&id).contains(id.as_str()));
        assert!(ArtifactFormat::Table.file_name(&id).contains(id.as_str()));
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("blob".parse::<ArtifactFormat>().unwrap(), ArtifactFormat::Blob);
        assert_eq!("TABLE".parse::<ArtifactFormat>().unwrap(), ArtifactFormat::Table);
        assert!("pickle".parse::<ArtifactFormat>().is_err());
    }

    #[test]
    fn test_blob_is_full_json() {
        let result = json!({"x": [1.0], "y": [2.0], "notes": "ok"});
        let bytes = encode(ArtifactFormat::Blob, &result, &TableColumns::default()).unwrap();
        let back: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_table_rows() {
        let result = json!({"x": [1.0, 2.5], "y": [0.01, 0.02]});
        let bytes = encode(ArtifactFormat::Table, &result, &TableColumns::default()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        let first: Vec<f64> = lines[0].split(' ').map(|s| s.parse().unwrap()).collect();
        assert_eq!(first, vec![1.0, 0.01]);
        assert!(lines[1].starts_with("2.5"));
    }

    #[test]
    fn test_table_custom_columns() {
        let result = json!({"w": [1.0], "alpha": [3.0]});
        let columns = TableColumns { x: "w".into(), y: "alpha".into() };
        assert!(encode(ArtifactFormat::Table, &result, &columns).is_ok());
        assert!(encode(ArtifactFormat::Table, &result, &TableColumns::default()).is_err());
    }

    #[test]
    fn test_table_length_mismatch() {
        let result = json!({"x": [1.0, 2.0], "y": [0.1]});
        let err = encode(ArtifactFormat::Table, &result, &TableColumns::default()).unwrap_err();
        assert!(matches!(err, ArtifactError::Shape(_)));
    }

    #[test]
    fn test_table_non_numeric() {
        let result = json!({"x": [1.0, "two"], "y": [0.1, 0.2]});
        let err = encode(ArtifactFormat::Table, &result, &TableColumns::default()).unwrap_err();
        assert!(err.to_string().contains("'x'[1]"));
    }
}
