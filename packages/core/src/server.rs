//! HTTP surface of the playground.
//!
//! `POST /compile/{variant}` runs a build; `GET /cabal/version` and
//! `GET /cabal/version/bash` report the toolchain version through `/bin/sh`
//! and `/bin/bash` respectively.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use crate::engine::BuildEngine;
use crate::executors::DEFAULT_SHELL;
use crate::models::{BuildRequest, EngineError, Variant};

const BASH: &str = "/bin/bash";

#[derive(Debug, Deserialize)]
pub struct CompileRequest {
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

fn error_response(status: StatusCode, error: impl Into<String>, details: Option<String>) -> Response {
    (status, Json(ErrorBody { error: error.into(), details })).into_response()
}

pub fn router(engine: Arc<BuildEngine>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/compile/{variant}", post(compile_handler))
        .route("/cabal/version", get(version_handler))
        .route("/cabal/version/bash", get(version_bash_handler))
        .layer(cors)
        .with_state(engine)
}

pub async fn serve(engine: Arc<BuildEngine>, addr: SocketAddr) -> Result<(), EngineError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| EngineError::ConfigError(format!("Failed to bind to {}: {}", addr, e)))?;
    info!("Playground server running on {}", addr);

    axum::serve(listener, router(engine))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| EngineError::ExecutorError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn compile_handler(
    State(engine): State<Arc<BuildEngine>>,
    Path(variant): Path<String>,
    body: Result<Json<CompileRequest>, JsonRejection>,
) -> Response {
    let variant: Variant = match variant.parse() {
        Ok(variant) => variant,
        Err(_) => {
            return error_response(StatusCode::NOT_FOUND, format!("Unknown build variant: {}", variant), None);
        }
    };

    // A missing, non-JSON or mistyped body is the same as no code at all.
    let code = match body {
        Ok(Json(body)) => body.code.unwrap_or_default(),
        Err(rejection) => {
            debug!("Rejected compile body: {}", rejection);
            String::new()
        }
    };

    let request = match BuildRequest::new(variant, code) {
        Ok(request) => request,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "No source code provided", None),
    };

    // The build runs on its own task so a dropped connection cannot cut its
    // cleanup short, and a panic inside it becomes a 500 instead of a reset.
    match tokio::spawn(async move { engine.build(request).await }).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            error!("Build task failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", Some(e.to_string()))
        }
    }
}

async fn version_handler(State(engine): State<Arc<BuildEngine>>) -> Response {
    version_response(&engine, DEFAULT_SHELL).await
}

async fn version_bash_handler(State(engine): State<Arc<BuildEngine>>) -> Response {
    version_response(&engine, BASH).await
}

async fn version_response(engine: &BuildEngine, shell: &str) -> Response {
    match engine.toolchain_version(Some(PathBuf::from(shell))).await {
        Ok(version) => Json(version).into_response(),
        Err(e) => {
            error!("Version check failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", Some(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlaygroundConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use serde_json::{json, Value};
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;

    const FAKE_BUILD: &str = "echo '[2 of 2] Linking dist/playground'; sh app/Main.hs";

    async fn app() -> (TempDir, Router) {
        let root = tempdir().unwrap();
        let mut config = PlaygroundConfig::default();
        config.workspace_root = root.path().join("builds");
        config.template_dir = root.path().join("templates");
        std::fs::create_dir_all(&config.template_dir).unwrap();
        std::fs::write(config.template_dir.join("playground-plutus.cabal"), "name: p\n").unwrap();
        std::fs::write(config.template_dir.join("cabal.project"), "packages: .\n").unwrap();
        config.shell = PathBuf::from("/bin/sh");
        config.init_command = "mkdir -p app && touch generated.cabal".to_string();
        config.version_command = "echo cabal-install version 3.10".to_string();
        config.variants.haskell.command = FAKE_BUILD.to_string();
        config.variants.plutus.command = FAKE_BUILD.to_string();

        let engine = BuildEngine::from_config(&config).await.unwrap();
        (root, router(Arc::new(engine)))
    }

    async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn workspaces(root: &TempDir) -> usize {
        std::fs::read_dir(root.path().join("builds")).unwrap().count()
    }

    #[tokio::test]
    async fn test_compile_hello_world() {
        let (root, app) = app().await;
        let (status, body) = send(app, Method::POST, "/compile/haskell", Some(json!({ "code": "echo 'Hello, World!'" }))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["output"], "Hello, World!");
        assert!(body["fullOutput"].as_str().unwrap().contains("[2 of 2] Linking"));
        assert_eq!(workspaces(&root), 0);
    }

    #[tokio::test]
    async fn test_compile_failure_body() {
        let (_root, app) = app().await;
        let code = "echo 'Main.hs:1:1: error: parse error' >&2; exit 1";
        let (status, body) = send(app, Method::POST, "/compile/plutus", Some(json!({ "code": code }))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["output"], "");
        assert_eq!(body["error"], "Main.hs:1:1: error: parse error\n");
    }

    #[tokio::test]
    async fn test_missing_code_is_rejected_before_any_workspace() {
        let (root, app) = app().await;
        let (status, body) = send(app.clone(), Method::POST, "/compile/haskell", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "No source code provided" }));

        let (status, _) = send(app, Method::POST, "/compile/haskell", Some(json!({ "code": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(workspaces(&root), 0);
    }

    #[tokio::test]
    async fn test_unreadable_body_is_rejected_before_any_workspace() {
        let (root, app) = app().await;

        let request = Request::builder()
            .method(Method::POST)
            .uri("/compile/haskell")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": "No source code provided" }));

        let request = Request::builder()
            .method(Method::POST)
            .uri("/compile/plutus")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let (status, body) = send(app, Method::POST, "/compile/haskell", Some(json!({ "code": 5 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No source code provided");

        assert_eq!(workspaces(&root), 0);
    }

    #[tokio::test]
    async fn test_unknown_variant() {
        let (_root, app) = app().await;
        let (status, body) = send(app, Method::POST, "/compile/rust", Some(json!({ "code": "fn main() {}" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Unknown build variant: rust");
    }

    #[tokio::test]
    async fn test_version_endpoints() {
        let (_root, app) = app().await;
        let (status, body) = send(app.clone(), Method::GET, "/cabal/version", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stdout"], "cabal-install version 3.10\n");
        assert_eq!(body["stderr"], "");

        let (status, body) = send(app, Method::GET, "/cabal/version/bash", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stdout"], "cabal-install version 3.10\n");
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let (_root, app) = app().await;
        let request = Request::builder()
            .method(Method::GET)
            .uri("/cabal/version")
            .header(header::ORIGIN, "https://example.com")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
    }
}
