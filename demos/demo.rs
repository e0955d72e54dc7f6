use axum::{
    body::Bytes,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::time::Duration;
use tattle::*;
use tokio::{net::TcpListener, time::sleep};
use tracing::{info, warn, Level};

/// Custom logger that prints one compact line per call
#[derive(Debug, Clone, Default)]
struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn info(&self, values: &[LogValue]) {
        println!("[facade] {}", summary(values));
    }

    fn error(&self, values: &[LogValue]) {
        println!("[facade] FAILED {}", summary(values));
    }
}

/// Only the textual values; the JSON context is left out for readability.
fn summary(values: &[LogValue]) -> String {
    values
        .iter()
        .filter_map(LogValue::as_text)
        .collect::<Vec<_>>()
        .join(" ")
}

async fn hello() -> impl IntoResponse {
    "Hello from the demo server"
}

async fn echo(body: Bytes) -> impl IntoResponse {
    format!("echo: {}", String::from_utf8_lossy(&body))
}

async fn slow() -> impl IntoResponse {
    sleep(Duration::from_millis(250)).await;
    "finally"
}

async fn broken() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn users() -> impl IntoResponse {
    axum::Json(json!([{ "id": 1, "name": "ada" }, { "id": 2, "name": "grace" }]))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();

    let app = Router::new()
        .route("/hello", get(hello))
        .route("/echo", post(echo))
        .route("/slow", get(slow))
        .route("/broken", get(broken))
        .route("/users", get(users));
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!(error = %e, "demo server stopped");
        }
    });
    info!("demo server listening on http://{addr}");

    // Adapter-level: every call through `client` is logged via tracing.
    let client = HttpClient::with_adapter(reqwest_adapter(reqwest::Client::new()));
    client.defaults().write().base_url = Some(format!("http://{addr}"));
    decorate(&client, LoggerOptions::default())?;

    client.get("/hello", RequestConfig::default()).await?;
    client
        .post("/echo", Bytes::from_static(b"ping"), RequestConfig::default())
        .await?;
    let users = client.get("/users", RequestConfig::default()).await?;
    info!("users: {}", String::from_utf8_lossy(&users.data));

    if let Err(e) = client.get("/broken", RequestConfig::default()).await {
        info!(kind = ?e.kind, "broken endpoint failed as expected: {e}");
    }
    let timeout = RequestConfig::default().with_timeout(Duration::from_millis(50));
    if let Err(e) = client.get("/slow", timeout).await {
        info!(kind = ?e.kind, "slow endpoint timed out as expected: {e}");
    }

    // Facade: an undecorated client, logged only through the facade.
    let plain = HttpClient::with_adapter(reqwest_adapter(reqwest::Client::new()));
    let facade = LoggedClient::new(LoggedClientConfig::new(ConsoleLogger, plain));
    facade.defaults().write().base_url = Some(format!("http://{addr}"));

    facade.get("/hello", RequestConfig::default()).await?;
    facade.get("/slow", RequestConfig::default()).await?;
    let _ = facade.get("/broken", RequestConfig::default()).await;

    Ok(())
}
