//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Un thread por conexión. Cada conexión lee un request (headers y luego
//! el body según `Content-Length`), lo pasa al router y responde. Las
//! descargas se escriben directo al socket por bloques.

use crate::artifacts::DownloadSink;
use crate::config::Config;
use crate::http::request::find_header_end;
use crate::http::{Request, Response, StatusCode};
use crate::jobs::handlers::{self, error_response};
use crate::jobs::JobManager;
use crate::router::{Reply, Router};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Límite de la sección de headers
const MAX_HEADER_BYTES: usize = 64 * 1024;

/// Tiempo máximo de espera por datos del cliente
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Resultado de leer un request del socket
enum Incoming {
    /// El cliente cerró sin enviar nada
    Closed,
    Complete(Vec<u8>),
    TooLarge,
}

/// Sink de descarga sobre el socket: escribe la cabecera al conocer el
/// tamaño y después cada bloque tal cual
struct HttpDownload<'a> {
    stream: &'a mut TcpStream,
    request_id: &'a str,
    started: bool,
}

impl DownloadSink for HttpDownload<'_> {
    fn begin(&mut self, file_name: &str, len: u64) -> io::Result<()> {
        let mut head = Response::new(StatusCode::Ok)
            .with_header("Content-Type", "application/octet-stream")
            .with_header("Content-Disposition", &format!("attachment; filename={}", file_name))
            .with_header("Content-Length", &len.to_string())
            .with_header("X-Request-Id", self.request_id);
        Router::add_common_headers(&mut head);

        self.started = true;
        self.stream.write_all(&head.head_bytes())
    }

    fn chunk(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)
    }
}

/// Servidor HTTP/1.0 de cálculos
pub struct Server {
    config: Config,
    router: Arc<Router>,
    jobs: Arc<JobManager>,
    listener: TcpListener,
}

impl Server {
    /// Abre el socket y registra las rutas
    pub fn bind(config: Config, jobs: Arc<JobManager>) -> io::Result<Self> {
        let mut router = Router::new();
        handlers::register_routes(&mut router);

        let listener = TcpListener::bind(config.address())?;
        tracing::info!(address = %listener.local_addr()?, routes = router.len(), "server listening");

        Ok(Self {
            config,
            router: Arc::new(router),
            jobs,
            listener,
        })
    }

    /// Dirección real (útil con puerto 0)
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Acepta conexiones indefinidamente, una por thread
    pub fn run(&self) -> io::Result<()> {
        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            let router = Arc::clone(&self.router);
            let jobs = Arc::clone(&self.jobs);
            let max_body = self.config.max_body;
            let peer = stream
                .peer_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|_| "unknown".to_string());

            let spawned = thread::Builder::new().name("calc-conn".to_string()).spawn(move || {
                if let Err(e) = Self::handle_connection(stream, &router, &jobs, max_body) {
                    tracing::warn!(peer = %peer, error = %e, "connection error");
                }
            });
            if let Err(e) = spawned {
                tracing::error!(error = %e, "could not spawn connection thread");
            }
        }
        Ok(())
    }

    /// Lee headers y body; el body nunca supera `max_body`
    fn read_request(stream: &mut TcpStream, max_body: usize) -> io::Result<Incoming> {
        let mut buffer = Vec::with_capacity(8192);
        let mut chunk = [0u8; 8192];

        let header_end = loop {
            if let Some(end) = find_header_end(&buffer) {
                break end;
            }
            if buffer.len() > MAX_HEADER_BYTES {
                return Ok(Incoming::TooLarge);
            }
            let n = stream.read(&mut chunk)?;
            if n == 0 {
                // Sin línea vacía: el parser decide si es válido
                return Ok(if buffer.is_empty() {
                    Incoming::Closed
                } else {
                    Incoming::Complete(buffer)
                });
            }
            buffer.extend_from_slice(&chunk[..n]);
        };

        let body_start = header_end + 4;
        let content_length = Request::parse(&buffer[..body_start])
            .ok()
            .and_then(|head| head.content_length())
            .unwrap_or(0);
        if content_length > max_body {
            return Ok(Incoming::TooLarge);
        }

        let total = body_start + content_length;
        while buffer.len() < total {
            let n = stream.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..n]);
        }
        buffer.truncate(total);
        Ok(Incoming::Complete(buffer))
    }

    fn handle_connection(mut stream: TcpStream, router: &Router, jobs: &JobManager, max_body: usize) -> io::Result<()> {
        let start = Instant::now();
        let request_id = uuid::Uuid::new_v4().simple().to_string();
        stream.set_read_timeout(Some(READ_TIMEOUT))?;

        let raw = match Self::read_request(&mut stream, max_body)? {
            Incoming::Closed => {
                tracing::debug!("connection closed without request");
                return Ok(());
            }
            Incoming::TooLarge => {
                let response = Response::error(StatusCode::PayloadTooLarge, "Request exceeds size limit");
                return Self::send(&mut stream, response, &request_id, start, "-");
            }
            Incoming::Complete(raw) => raw,
        };

        let request = match Request::parse(&raw) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(error = %e, "parse error");
                let response = Response::error(StatusCode::BadRequest, &format!("Invalid request: {}", e));
                return Self::send(&mut stream, response, &request_id, start, "-");
            }
        };

        let path = request.path().to_string();
        tracing::debug!(method = request.method().as_str(), path = %path, request_id = %request_id, "request");

        match router.route(&request, jobs) {
            Reply::Full(response) => Self::send(&mut stream, response, &request_id, start, &path),
            Reply::Download { id, format } => {
                let (outcome, started) = {
                    let mut sink = HttpDownload {
                        stream: &mut stream,
                        request_id: &request_id,
                        started: false,
                    };
                    let outcome = jobs.download_artifact(&id, format, &mut sink);
                    (outcome, sink.started)
                };

                match outcome {
                    Ok(bytes) => {
                        stream.flush()?;
                        tracing::info!(
                            path = %path,
                            bytes,
                            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
                            "download sent"
                        );
                        Ok(())
                    }
                    Err(e) if !started => {
                        let mut response = error_response(&e);
                        Router::add_common_headers(&mut response);
                        Self::send(&mut stream, response, &request_id, start, &path)
                    }
                    Err(e) => {
                        // La cabecera ya salió: solo queda cortar la conexión
                        tracing::warn!(job_id = %id, error = %e, "download interrupted");
                        Ok(())
                    }
                }
            }
        }
    }

    fn send(stream: &mut TcpStream, mut response: Response, request_id: &str, start: Instant, path: &str) -> io::Result<()> {
        response.add_header("X-Request-Id", request_id);
        stream.write_all(&response.to_bytes())?;
        stream.flush()?;

        tracing::info!(
            path = %path,
            status = response.status().as_u16(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "response sent"
        );
        Ok(())
    }
}
