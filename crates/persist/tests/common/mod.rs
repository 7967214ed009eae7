#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use herbari_core::model::PlantRecord;
use serde_json::json;

/// How the fake legacy endpoint answers.
#[derive(Clone, Copy)]
pub enum Reply {
    Success,
    Refuse,
    ServerError,
    NotJson,
}

/// Every request body the endpoint received.
#[derive(Clone)]
pub struct Endpoint {
    pub bodies: Arc<Mutex<Vec<(Option<String>, String)>>>,
    reply: Reply,
    delay: Duration,
}

impl Endpoint {
    pub fn requests(&self) -> usize {
        self.bodies.lock().unwrap().len()
    }

    pub fn last_body(&self) -> Option<String> {
        self.bodies.lock().unwrap().last().map(|(_, body)| body.clone())
    }

    pub fn last_content_type(&self) -> Option<String> {
        self.bodies.lock().unwrap().last().and_then(|(ct, _)| ct.clone())
    }
}

async fn save_json(
    State(endpoint): State<Endpoint>,
    headers: axum::http::HeaderMap,
    body: String,
) -> Response {
    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    endpoint.bodies.lock().unwrap().push((content_type, body));
    tokio::time::sleep(endpoint.delay).await;

    match endpoint.reply {
        Reply::Success => Json(json!({ "success": true, "message": "Desat" })).into_response(),
        Reply::Refuse => Json(json!({ "success": false, "message": "read-only" })).into_response(),
        Reply::ServerError => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        Reply::NotJson => "<html>404 handler</html>".into_response(),
    }
}

/// Start a fake `save_json.php` and return its URL alongside the recorder.
pub async fn spawn_endpoint(reply: Reply, delay: Duration) -> (String, Endpoint) {
    let endpoint = Endpoint {
        bodies: Arc::new(Mutex::new(Vec::new())),
        reply,
        delay,
    };
    let app = Router::new()
        .route("/save_json.php", post(save_json))
        .with_state(endpoint.clone());

    let addr = spawn(app).await;
    (format!("http://{addr}/save_json.php"), endpoint)
}

pub async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub fn plant(name: &str, scientific: &str) -> PlantRecord {
    let mut record = PlantRecord {
        display_name: name.into(),
        scientific_name: scientific.into(),
        ..Default::default()
    };
    record.refresh_id();
    record
}

pub fn catalog() -> Vec<PlantRecord> {
    vec![plant("Rosa Roja", "Rosa gallica"), plant("Alzina", "Quercus ilex")]
}
