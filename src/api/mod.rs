//! HTTP API surface.
//!
//! A small HTTP/1.1 server over `TcpListener`: an accept loop on a spawned
//! thread, one handler thread per connection. All request-path errors are
//! converted to structured JSON bodies here; nothing propagates as a panic.
//!
//! Routes:
//! - `GET /` — liveness greeting, no dependencies.
//! - `POST /predict_ewaste` — Base64 image in, detections + hazard info out.
//! - `GET /hazards/{ewaste_type}` — catalog lookup, case-insensitive.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde_json::{json, Value};

use crate::aggregate::{aggregate, normalize_class_name};
use crate::catalog::HazardCatalog;
use crate::decode::{decode_base64_image, MAX_IMAGE_BYTES};
use crate::detect::DetectorHandle;
use crate::error::ServiceError;

const MAX_HEADER_BYTES: usize = 8192;
// Base64 inflates the image payload by 4/3; leave room for the JSON wrapper.
const MAX_BODY_BYTES: usize = MAX_IMAGE_BYTES / 3 * 4 + 4096;
const READ_TIMEOUT: Duration = Duration::from_secs(10);

const WELCOME_MESSAGE: &str =
    "Welcome to the E-waste Prediction API! Use /predict_ewaste for predictions.";

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub addr: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8700".to_string(),
        }
    }
}

/// Shared per-request context: the immutable catalog and the (possibly
/// absent) detector. A missing detector means the model failed to load at
/// startup; prediction requests are rejected, everything else still works.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<HazardCatalog>,
    pub detector: Option<Arc<DetectorHandle>>,
    pub detect_timeout: Duration,
}

impl AppState {
    pub fn new(
        catalog: Arc<HazardCatalog>,
        detector: Option<Arc<DetectorHandle>>,
        detect_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            detector,
            detect_timeout,
        }
    }
}

#[derive(Debug)]
pub struct ApiHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ApiHandle {
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("api server thread panicked"))?;
        }
        Ok(())
    }
}

pub struct ApiServer {
    cfg: ApiConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(cfg: ApiConfig, state: AppState) -> Self {
        Self { cfg, state }
    }

    pub fn spawn(self) -> Result<ApiHandle> {
        let configured_addr: SocketAddr = self.cfg.addr.parse()?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let state = self.state;
        let join = std::thread::spawn(move || {
            if let Err(err) = run_api(listener, state, shutdown_thread) {
                log::error!("e-waste api stopped: {}", err);
            }
        });

        Ok(ApiHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_api(listener: TcpListener, state: AppState, shutdown: Arc<AtomicBool>) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, _)) => {
                // Requests are independent and stateless; inference itself is
                // serialized by the detector worker.
                let state = state.clone();
                std::thread::spawn(move || {
                    if let Err(err) = handle_connection(stream, &state) {
                        log::warn!("request rejected: {}", err);
                    }
                });
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn handle_connection(mut stream: TcpStream, state: &AppState) -> Result<()> {
    let request = read_request(&mut stream)?;
    let (status, body) = route(&request, state);
    if status >= 500 {
        log::warn!(
            "{} {} -> {}: {}",
            request.method,
            request.path,
            status,
            body.get("message").and_then(Value::as_str).unwrap_or("")
        );
    }
    write_json_response(&mut stream, status, &serde_json::to_vec(&body)?)
}

fn route(request: &HttpRequest, state: &AppState) -> (u16, Value) {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/") => (200, json!({ "message": WELCOME_MESSAGE })),
        ("POST", "/predict_ewaste") => handle_predict(state, &request.body),
        ("GET", path) if path.starts_with("/hazards/") => {
            handle_hazard_lookup(state, &path["/hazards/".len()..])
        }
        (_, "/") | (_, "/predict_ewaste") => (405, error_body("method not allowed")),
        (_, path) if path.starts_with("/hazards/") => (405, error_body("method not allowed")),
        _ => (404, error_body("not found")),
    }
}

fn handle_predict(state: &AppState, body: &[u8]) -> (u16, Value) {
    let payload: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(err) => {
            return (
                400,
                error_body(&format!("request body must be a JSON object: {err}")),
            )
        }
    };
    let image_field = payload
        .get("image")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if image_field.trim().is_empty() {
        return (
            400,
            error_body("no image data provided in the 'image' field"),
        );
    }

    let detector = match &state.detector {
        Some(detector) => detector,
        None => return service_error_response(&ServiceError::ModelUnavailable),
    };

    let image = match decode_base64_image(image_field) {
        Ok(image) => image,
        Err(err) => return service_error_response(&err),
    };
    let (width, height) = image.dimensions();

    let raw = match detector.detect(image.into_raw(), width, height, state.detect_timeout) {
        Ok(raw) => raw,
        Err(err) => return service_error_response(&err),
    };

    let result = aggregate(&raw, &state.catalog);
    (
        200,
        json!({
            "status": "success",
            "message": "E-waste prediction completed.",
            "primary_ewaste_type": result.primary_type,
            "primary_ewaste_info": result.primary_info,
            "detections": result.detections,
        }),
    )
}

fn handle_hazard_lookup(state: &AppState, raw_param: &str) -> (u16, Value) {
    let requested = match urlencoding::decode(raw_param) {
        Ok(value) => value.into_owned(),
        Err(_) => {
            return (
                400,
                error_body("invalid percent-encoding in e-waste type"),
            )
        }
    };
    let normalized = normalize_class_name(&requested);
    if normalized.is_empty() {
        return service_error_response(&ServiceError::NotFound(
            "no e-waste type requested".to_string(),
        ));
    }
    match state.catalog.lookup(&normalized) {
        Some(entry) => match serde_json::to_value(entry) {
            Ok(Value::Object(mut body)) => {
                // Echo the normalized name so equivalent spellings of one
                // type produce identical payloads.
                body.insert("ewaste_type".to_string(), Value::String(normalized));
                (200, Value::Object(body))
            }
            _ => (500, error_body("failed to serialize hazard entry")),
        },
        None => service_error_response(&ServiceError::NotFound(format!(
            "hazard information not found for e-waste type: {requested}"
        ))),
    }
}

fn error_status(err: &ServiceError) -> u16 {
    match err {
        ServiceError::ModelUnavailable => 503,
        ServiceError::Decode(_) => 400,
        ServiceError::Inference(_) => 500,
        ServiceError::NotFound(_) => 404,
    }
}

fn error_body(message: &str) -> Value {
    json!({ "status": "error", "message": message })
}

fn service_error_response(err: &ServiceError) -> (u16, Value) {
    (error_status(err), error_body(&err.to_string()))
}

fn read_request(stream: &mut TcpStream) -> Result<HttpRequest> {
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    let mut buf = [0u8; 4096];
    let mut data = Vec::new();
    let header_end = loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(anyhow!("connection closed before headers were complete"));
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        if data.len() > MAX_HEADER_BYTES {
            return Err(anyhow!("request headers too large"));
        }
    };

    let header_text = String::from_utf8_lossy(&data[..header_end]).into_owned();
    let mut lines = header_text.split("\r\n");
    let request_line = lines.next().ok_or_else(|| anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or_else(|| anyhow!("missing method"))?;
    let raw_path = parts.next().ok_or_else(|| anyhow!("missing path"))?;
    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_lowercase(), v.trim().to_string());
        }
    }

    let content_length = match headers.get("content-length") {
        Some(value) => value
            .parse::<usize>()
            .map_err(|_| anyhow!("invalid content-length header"))?,
        None => 0,
    };
    if content_length > MAX_BODY_BYTES {
        return Err(anyhow!(
            "request body is {} bytes, limit is {}",
            content_length,
            MAX_BODY_BYTES
        ));
    }

    let mut body = data[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(anyhow!("connection closed before body was complete"));
        }
        body.extend_from_slice(&buf[..n]);
    }
    body.truncate(content_length);

    let path = raw_path.split('?').next().unwrap_or(raw_path).to_string();
    Ok(HttpRequest {
        method: method.to_string(),
        path,
        body,
    })
}

fn write_json_response(stream: &mut TcpStream, status: u16, body: &[u8]) -> Result<()> {
    let status_line = match status {
        200 => "HTTP/1.1 200 OK",
        400 => "HTTP/1.1 400 Bad Request",
        404 => "HTTP/1.1 404 Not Found",
        405 => "HTTP/1.1 405 Method Not Allowed",
        503 => "HTTP/1.1 503 Service Unavailable",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let header = format!(
        "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {len}\r\nCache-Control: no-store\r\n\r\n",
        status_line = status_line,
        len = body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    Ok(())
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    body: Vec<u8>,
}
