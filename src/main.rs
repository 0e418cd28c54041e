//! # Calc Server - Entry Point
//! src/main.rs

use calc_server::compute::SyntheticSpectrum;
use calc_server::config::Config;
use calc_server::jobs::{JobManager, JobManagerConfig};
use calc_server::server::Server;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "calc_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::new();
    if let Err(e) = config.validate() {
        eprintln!("Configuración inválida: {}", e);
        std::process::exit(1);
    }
    config.print_summary();

    let jobs = match JobManager::new(JobManagerConfig::from_config(&config), Arc::new(SyntheticSpectrum::new(config.max_points))) {
        Ok(jobs) => Arc::new(jobs),
        Err(e) => {
            tracing::error!(error = %e, "could not start workers");
            std::process::exit(1);
        }
    };

    let server = match Server::bind(config, jobs) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "could not bind");
            std::process::exit(1);
        }
    };

    // Bloquea el thread principal
    if let Err(e) = server.run() {
        tracing::error!(error = %e, "fatal server error");
        std::process::exit(1);
    }
}
