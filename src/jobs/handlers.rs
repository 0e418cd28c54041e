//! # Handlers HTTP para Cálculos
//! src/jobs/handlers.rs
//!
//! Endpoints del servidor:
//! - `GET  /` (emite la cookie de dueño)
//! - `POST /calculation/new`
//! - `GET  /calculation/status/{id}`
//! - `GET  /calculation/result/{id}`
//! - `GET  /calculation/view/{id}`
//! - `GET  /calculation/download/{id}?format=blob|table`
//! - `GET  /dashboard?domain=jwst|hst`
//! - `GET  /stats`

use crate::artifacts::{ArtifactError, ArtifactFormat};
use crate::http::{Method, Request, Response, StatusCode};
use crate::jobs::error::JobError;
use crate::jobs::manager::{InputFile, JobManager, SubmitRequest};
use crate::jobs::types::{DomainTag, JobId, OwnerToken};
use crate::router::{Reply, RouteParams, Router};
use serde::Deserialize;
use serde_json::{json, Value};

/// Nombre de la cookie que identifica al dueño
pub const OWNER_COOKIE: &str = "calc_user";

/// Body de `POST /calculation/new`
#[derive(Debug, Deserialize)]
struct SubmitBody {
    name: String,
    #[serde(default = "default_domain")]
    domain: String,
    #[serde(default)]
    payload: Value,
    #[serde(default)]
    inputs: Vec<InputBody>,
}

#[derive(Debug, Deserialize)]
struct InputBody {
    label: String,
    #[serde(default)]
    extension: String,
    content: InputContent,
}

/// Contenido de una entrada: texto o bytes crudos (arreglo de 0..=255)
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InputContent {
    Text(String),
    Bytes(Vec<u8>),
}

impl InputContent {
    fn into_bytes(self) -> Vec<u8> {
        match self {
            InputContent::Text(text) => text.into_bytes(),
            InputContent::Bytes(bytes) => bytes,
        }
    }
}

fn default_domain() -> String {
    "jwst".to_string()
}

/// Registra todas las rutas de cálculos en el router
pub fn register_routes(router: &mut Router) {
    router.register(Method::GET, "/", home_handler);
    router.register(Method::POST, "/calculation/new", submit_handler);
    router.register(Method::GET, "/calculation/status/{id}", status_handler);
    router.register(Method::GET, "/calculation/result/{id}", result_handler);
    router.register(Method::GET, "/calculation/view/{id}", view_handler);
    router.register(Method::GET, "/calculation/download/{id}", download_handler);
    router.register(Method::GET, "/dashboard", dashboard_handler);
    router.register(Method::GET, "/stats", stats_handler);
}

/// Traduce un `JobError` al código HTTP correspondiente
pub fn error_response(error: &JobError) -> Response {
    match error {
        JobError::NotFound(_) => Response::error(StatusCode::NotFound, &error.to_string()),
        JobError::Compute(failure) => Response::json_with_status(
            StatusCode::InternalServerError,
            &json!({ "error": failure.message, "kind": failure.kind }),
        ),
        JobError::Artifact(ArtifactError::Shape(_)) => Response::error(StatusCode::Conflict, &error.to_string()),
        JobError::Artifact(_) => Response::error(StatusCode::InternalServerError, &error.to_string()),
        JobError::InvalidRequest(_) => Response::error(StatusCode::BadRequest, &error.to_string()),
    }
}

/// Dueño del request; si no trae cookie se genera uno nuevo
/// (el segundo valor indica que hay que emitir `Set-Cookie`)
fn owner_of(req: &Request) -> (OwnerToken, bool) {
    match req.cookie(OWNER_COOKIE).filter(|v| !v.is_empty()) {
        Some(value) => (OwnerToken::new(value), false),
        None => (OwnerToken::generate(), true),
    }
}

fn job_id(params: &RouteParams) -> Result<JobId, Response> {
    params
        .id
        .as_deref()
        .map(JobId::from_raw)
        .ok_or_else(|| Response::error(StatusCode::BadRequest, "Missing calculation id"))
}

/// `GET /`
///
/// Asegura que el cliente tenga cookie de dueño.
pub fn home_handler(req: &Request, _params: &RouteParams, _jobs: &JobManager) -> Reply {
    let (owner, issued) = owner_of(req);
    let mut response = Response::json(&json!({
        "owner": owner.as_str(),
        "domains": ["jwst", "hst"],
    }));
    if issued {
        response = response.with_cookie(OWNER_COOKIE, owner.as_str());
    }
    response.into()
}

/// `POST /calculation/new`
///
/// ```json
/// {"name": "wasp-12b", "domain": "jwst", "payload": {...},
///  "inputs": [{"label": "planet", "extension": ".txt", "content": "..."}]}
/// ```
///
/// `content` acepta texto o, para archivos binarios, un arreglo de bytes
/// (`[0, 159, 255]`).
///
/// Responde 202 con el ID y el primer estado del cálculo.
pub fn submit_handler(req: &Request, _params: &RouteParams, jobs: &JobManager) -> Reply {
    let body: SubmitBody = match serde_json::from_slice(req.body()) {
        Ok(body) => body,
        Err(e) => return Response::error(StatusCode::BadRequest, &format!("Invalid submission body: {}", e)).into(),
    };

    let domain: DomainTag = match body.domain.parse() {
        Ok(domain) => domain,
        Err(e) => return Response::error(StatusCode::BadRequest, &e).into(),
    };

    let (owner, issued) = owner_of(req);
    let request = SubmitRequest {
        name: body.name,
        owner: owner.clone(),
        domain,
        payload: body.payload,
        inputs: body
            .inputs
            .into_iter()
            .map(|input| InputFile {
                label: input.label,
                extension: input.extension,
                content: input.content.into_bytes(),
            })
            .collect(),
    };

    match jobs.submit_job(request) {
        Ok((id, snapshot)) => {
            let mut response = Response::json_with_status(StatusCode::Accepted, &json!({ "id": id, "status": snapshot }));
            if issued {
                response = response.with_cookie(OWNER_COOKIE, owner.as_str());
            }
            response.into()
        }
        Err(e) => {
            tracing::warn!(error = %e, "submission rejected");
            error_response(&e).into()
        }
    }
}

/// `GET /calculation/status/{id}`
pub fn status_handler(_req: &Request, params: &RouteParams, jobs: &JobManager) -> Reply {
    let id = match job_id(params) {
        Ok(id) => id,
        Err(response) => return response.into(),
    };
    match jobs.poll_status(&id) {
        Ok(snapshot) => Response::json(&snapshot).into(),
        Err(e) => error_response(&e).into(),
    }
}

/// `GET /calculation/result/{id}`
///
/// Bloquea hasta que el cálculo termine.
pub fn result_handler(_req: &Request, params: &RouteParams, jobs: &JobManager) -> Reply {
    let id = match job_id(params) {
        Ok(id) => id,
        Err(response) => return response.into(),
    };
    match jobs.fetch_result(&id) {
        Ok(result) => Response::json(&json!({ "id": id, "result": &*result })).into(),
        Err(e) => error_response(&e).into(),
    }
}

/// `GET /calculation/view/{id}`
///
/// Igual que result, pero borra después las entradas subidas del job.
pub fn view_handler(_req: &Request, params: &RouteParams, jobs: &JobManager) -> Reply {
    let id = match job_id(params) {
        Ok(id) => id,
        Err(response) => return response.into(),
    };
    match jobs.view_result(&id) {
        Ok(result) => Response::json(&json!({ "id": id, "result": &*result })).into(),
        Err(e) => error_response(&e).into(),
    }
}

/// `GET /calculation/download/{id}?format=blob|table`
///
/// Solo valida; la transmisión la hace el servidor sobre el socket.
pub fn download_handler(req: &Request, params: &RouteParams, jobs: &JobManager) -> Reply {
    let id = match job_id(params) {
        Ok(id) => id,
        Err(response) => return response.into(),
    };

    let format: ArtifactFormat = match req.query_param("format").unwrap_or("blob").parse() {
        Ok(format) => format,
        Err(e) => return Response::error(StatusCode::BadRequest, &e).into(),
    };

    if let Err(e) = jobs.poll_status(&id) {
        return error_response(&e).into();
    }

    Reply::Download { id, format }
}

/// `GET /dashboard?domain=jwst|hst`
///
/// Cálculos del dueño en el dominio, del más reciente al más viejo.
pub fn dashboard_handler(req: &Request, _params: &RouteParams, jobs: &JobManager) -> Reply {
    let domain: DomainTag = match req.query_param("domain").unwrap_or("jwst").parse() {
        Ok(domain) => domain,
        Err(e) => return Response::error(StatusCode::BadRequest, &e).into(),
    };

    // Sin cookie no hay cálculos propios
    let calculations = match req.cookie(OWNER_COOKIE) {
        Some(owner) => jobs.list_jobs(&OwnerToken::new(owner), domain),
        None => Vec::new(),
    };

    Response::json(&json!({
        "domain": domain.to_string(),
        "calculations": calculations,
    }))
    .into()
}

/// `GET /stats`
pub fn stats_handler(_req: &Request, _params: &RouteParams, jobs: &JobManager) -> Reply {
    Response::json(&jobs.stats()).into()
}
