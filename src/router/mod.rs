//! # Sistema de Routing
//! src/router/mod.rs
//!
//! ```text
//! Request → Router → Handler(&JobManager) → Reply
//! ```
//!
//! Una ruta es un método más un patrón de path. El patrón puede terminar
//! en un segmento `{id}`, que se entrega al handler en `RouteParams`.
//! Si el path existe con otro método se responde 405; si no existe, 404.

use crate::artifacts::ArtifactFormat;
use crate::http::{Method, Request, Response, StatusCode};
use crate::jobs::types::JobId;
use crate::jobs::JobManager;

/// Lo que un handler devuelve al servidor
#[derive(Debug)]
pub enum Reply {
    /// Respuesta en memoria
    Full(Response),

    /// Descarga transmitida por bloques desde el coordinador de artefactos
    Download { id: JobId, format: ArtifactFormat },
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Reply::Full(response)
    }
}

/// Segmentos capturados del path
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RouteParams {
    pub id: Option<String>,
}

/// Handler con acceso al gestor de jobs
pub type Handler = fn(&Request, &RouteParams, &JobManager) -> Reply;

struct Route {
    method: Method,
    prefix: String,
    /// El patrón termina en `{id}`
    captures_id: bool,
    handler: Handler,
}

impl Route {
    fn matches_path(&self, path: &str) -> Option<RouteParams> {
        if !self.captures_id {
            return (path == self.prefix).then(RouteParams::default);
        }
        let id = path.strip_prefix(&self.prefix)?;
        if id.is_empty() || id.contains('/') {
            return None;
        }
        Some(RouteParams {
            id: Some(id.to_string()),
        })
    }
}

/// Router de métodos y paths a handlers
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registra una ruta. `pattern` puede terminar en `{id}`:
    ///
    /// ```
    /// use calc_server::router::{Reply, RouteParams, Router};
    /// use calc_server::http::{Method, Request, Response};
    /// use calc_server::jobs::JobManager;
    ///
    /// fn hello(_req: &Request, _params: &RouteParams, _jobs: &JobManager) -> Reply {
    ///     Response::json(&serde_json::json!({"message": "hello"})).into()
    /// }
    ///
    /// let mut router = Router::new();
    /// router.register(Method::GET, "/hello/{id}", hello);
    /// assert_eq!(router.len(), 1);
    /// ```
    pub fn register(&mut self, method: Method, pattern: &str, handler: Handler) {
        let (prefix, captures_id) = match pattern.strip_suffix("{id}") {
            Some(prefix) => (prefix.to_string(), true),
            None => (pattern.to_string(), false),
        };
        self.routes.push(Route {
            method,
            prefix,
            captures_id,
            handler,
        });
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Ejecuta el handler que corresponde al request
    pub fn route(&self, request: &Request, jobs: &JobManager) -> Reply {
        let path = request.path();
        let mut path_known = false;

        for route in &self.routes {
            if let Some(params) = route.matches_path(path) {
                path_known = true;
                if route.method == request.method() {
                    return match (route.handler)(request, &params, jobs) {
                        Reply::Full(mut response) => {
                            Self::add_common_headers(&mut response);
                            Reply::Full(response)
                        }
                        download => download,
                    };
                }
            }
        }

        let mut response = if path_known {
            Response::error(
                StatusCode::MethodNotAllowed,
                &format!("Method {} not allowed for {}", request.method().as_str(), path),
            )
        } else {
            Response::error(StatusCode::NotFound, &format!("Route not found: {}", path))
        };
        Self::add_common_headers(&mut response);
        Reply::Full(response)
    }

    /// Headers comunes a todas las respuestas
    pub fn add_common_headers(response: &mut Response) {
        response.add_header("Server", "calc-server/1.0");
        response.add_header("Connection", "close");
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
