//! # Configuración del Servidor
//! src/config.rs
//!
//! Argumentos CLI con respaldo en variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./calc_server --port 1111 --workers 4 --capacity 100 \
//!   --artifact-dir /tmp/calc
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! CALC_PORT=1111 CALC_TEMP=/tmp/calc RUST_LOG=calc_server=debug ./calc_server
//! ```

use clap::Parser;

/// Configuración del servidor de cálculos
#[derive(Debug, Clone, Parser)]
#[command(name = "calc_server")]
#[command(about = "Servidor HTTP/1.0 de cálculos en segundo plano")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "1111", env = "CALC_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "CALC_HOST")]
    pub host: String,

    // === Jobs ===
    /// Número de workers de cálculo
    #[arg(short, long, default_value = "4", env = "CALC_WORKERS")]
    pub workers: usize,

    /// Máximo de cálculos recordados; al superarlo se olvida el más viejo
    #[arg(long, default_value = "100", env = "CALC_CAPACITY")]
    pub capacity: usize,

    // === Artefactos ===
    /// Directorio de archivos transitorios (descargas y entradas subidas)
    #[arg(long = "artifact-dir", default_value = "./temp", env = "CALC_TEMP")]
    pub artifact_dir: String,

    /// Columna X de la exportación tabular
    #[arg(long = "table-x", default_value = "x")]
    pub table_x: String,

    /// Columna Y de la exportación tabular
    #[arg(long = "table-y", default_value = "y")]
    pub table_y: String,

    /// Tamaño de bloque de las descargas en bytes
    #[arg(long = "chunk-size", default_value = "4096")]
    pub chunk_size: usize,

    /// Máximo de puntos de la malla de `SyntheticSpectrum`
    #[arg(long = "max-points", default_value = "1000000", env = "CALC_MAX_POINTS")]
    pub max_points: usize,

    // === Requests ===
    /// Tamaño máximo del body de un request en bytes
    #[arg(long = "max-body", default_value = "16777216", env = "CALC_MAX_BODY")]
    pub max_body: usize,
}

impl Config {
    /// Parsea argumentos CLI (y variables de entorno)
    pub fn new() -> Self {
        Config::parse()
    }

    /// Dirección para bind (host:port)
    ///
    /// ```rust
    /// use calc_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:1111");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("Workers must be >= 1".to_string());
        }
        if self.capacity == 0 {
            return Err("Capacity must be >= 1".to_string());
        }
        if self.chunk_size == 0 {
            return Err("Chunk size must be >= 1".to_string());
        }
        if self.max_points < 2 {
            return Err("Max points must be >= 2".to_string());
        }
        if self.max_body == 0 {
            return Err("Max body must be >= 1".to_string());
        }
        if self.artifact_dir.trim().is_empty() {
            return Err("Artifact dir must not be empty".to_string());
        }
        if self.table_x.trim().is_empty() || self.table_y.trim().is_empty() {
            return Err("Table column names must not be empty".to_string());
        }
        if self.table_x == self.table_y {
            return Err("Table columns must be different".to_string());
        }
        Ok(())
    }

    /// Imprime un resumen de la configuración
    pub fn print_summary(&self) {
        println!("╔══════════════════════════════════════════════════════════════╗");
        println!("║              Calc Server HTTP/1.0 Configuration             ║");
        println!("╚══════════════════════════════════════════════════════════════╝");
        println!();
        println!("🌐 Network:");
        println!("   Address:      {}", self.address());
        println!("   Max body:     {} bytes", self.max_body);
        println!();
        println!("👷 Jobs:");
        println!("   ┌──────────────┬──────────┐");
        println!("   │ Workers      │ {:^8} │", self.workers);
        println!("   │ Capacity     │ {:^8} │", self.capacity);
        println!("   └──────────────┴──────────┘");
        println!();
        println!("📦 Artifacts:");
        println!("   Directory:    {}", self.artifact_dir);
        println!("   Table cols:   {} / {}", self.table_x, self.table_y);
        println!("   Chunk size:   {} bytes", self.chunk_size);
        println!("   Max points:   {}", self.max_points);
        println!();
        println!("═══════════════════════════════════════════════════════════════");
        println!();
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 1111,
            host: "127.0.0.1".to_string(),
            workers: 4,
            capacity: 100,
            artifact_dir: "./temp".to_string(),
            table_x: "x".to_string(),
            table_y: "y".to_string(),
            chunk_size: 4096,
            max_points: 1_000_000,
            max_body: 16 * 1024 * 1024,
        }
    }
}
