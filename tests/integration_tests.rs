use axum::{
    body::Bytes,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use http::{header, HeaderValue, Method, StatusCode};
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};
use tattle::{
    adapter_fn, decorate, reqwest_adapter, settle, ConfigError, ErrorKind, HttpClient, HttpError,
    LogValue, LoggedClient, LoggedClientConfig, Logger, LoggerOptions, RequestConfig,
    RequestRecord, Response,
};
use tokio::{net::TcpListener, time::sleep};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Info,
    Error,
}

/// Test logger that collects every invocation for verification
#[derive(Debug, Default)]
struct TestLogger {
    entries: Mutex<Vec<(Level, Vec<LogValue>)>>,
}

impl TestLogger {
    fn entries(&self) -> Vec<(Level, Vec<LogValue>)> {
        self.entries.lock().unwrap().clone()
    }

    fn count(&self, level: Level) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .count()
    }

    /// The first four (textual) values of each entry.
    fn summaries(&self) -> Vec<Vec<String>> {
        self.entries()
            .into_iter()
            .map(|(_, values)| {
                values
                    .iter()
                    .filter_map(LogValue::as_text)
                    .map(str::to_string)
                    .collect()
            })
            .collect()
    }
}

impl Logger for TestLogger {
    fn info(&self, values: &[LogValue]) {
        self.entries
            .lock()
            .unwrap()
            .push((Level::Info, values.to_vec()));
    }

    fn error(&self, values: &[LogValue]) {
        self.entries
            .lock()
            .unwrap()
            .push((Level::Error, values.to_vec()));
    }
}

/// Adapter answering 200 with the request body echoed back, or 503 for `/down`.
fn echo_adapter() -> tattle::Adapter {
    adapter_fn(|config: RequestConfig| async move {
        if config.url.ends_with("/down") {
            return settle(Response::new(StatusCode::SERVICE_UNAVAILABLE, config));
        }
        if config.url.ends_with("/refused") {
            return Err(HttpError::new(ErrorKind::Network, "connection refused")
                .with_config(config));
        }
        let body = config.data.clone().unwrap_or_default();
        settle(Response::new(StatusCode::OK, config).with_data(body))
    })
}

// Test server handlers
async fn hello_handler() -> impl IntoResponse {
    "Hello, World!"
}

async fn echo_handler(body: Bytes) -> impl IntoResponse {
    format!("Echo: {}", String::from_utf8_lossy(&body))
}

async fn delayed_handler() -> impl IntoResponse {
    sleep(Duration::from_millis(100)).await;
    "Delayed response"
}

async fn missing_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "no such thing")
}

async fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route("/hello", get(hello_handler))
        .route("/echo", post(echo_handler))
        .route("/delayed", get(delayed_handler))
        .route("/missing", get(missing_handler));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// An address nothing is listening on.
async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

fn network_client(addr: SocketAddr) -> HttpClient {
    let client = HttpClient::with_adapter(reqwest_adapter(reqwest::Client::new()));
    client.defaults().write().base_url = Some(format!("http://{addr}"));
    client
}

#[tokio::test]
async fn test_decorate_without_adapter_fails_immediately() {
    let client = HttpClient::new();
    let result = decorate(&client, LoggerOptions::default());
    assert!(matches!(result, Err(ConfigError::MissingAdapter)));
    assert!(client.defaults().read().adapter.is_none());
}

#[tokio::test]
async fn test_decorate_returns_same_client() {
    let client = HttpClient::with_adapter(echo_adapter());
    let decorated = decorate(&client, LoggerOptions::default()).unwrap();
    assert!(std::ptr::eq(decorated, &client));
}

#[tokio::test]
async fn test_decorated_success_passthrough() {
    let logger = Arc::new(TestLogger::default());
    let plain = HttpClient::with_adapter(echo_adapter());
    let client = HttpClient::with_adapter(echo_adapter());
    decorate(&client, LoggerOptions::default().with_logger(logger.clone())).unwrap();

    let expected = plain
        .post("/items", Bytes::from_static(b"widget"), RequestConfig::default())
        .await
        .unwrap();
    let response = client
        .post("/items", Bytes::from_static(b"widget"), RequestConfig::default())
        .await
        .unwrap();

    assert_eq!(response.status, expected.status);
    assert_eq!(response.status_text, expected.status_text);
    assert_eq!(response.data, expected.data);
    assert_eq!(response.config.url, expected.config.url);

    assert_eq!(logger.count(Level::Info), 1);
    assert_eq!(logger.count(Level::Error), 0);
    let summary = &logger.summaries()[0];
    assert_eq!(summary[0], "POST");
    assert_eq!(summary[1], "200/(OK)");
    assert!(summary[2].ends_with("ms"));
    assert_eq!(summary[3], "/items");
}

#[tokio::test]
async fn test_decorated_failure_passthrough() {
    let logger = Arc::new(TestLogger::default());
    let plain = HttpClient::with_adapter(echo_adapter());
    let client = HttpClient::with_adapter(echo_adapter());
    decorate(&client, LoggerOptions::default().with_logger(logger.clone())).unwrap();

    let expected = plain.get("/down", RequestConfig::default()).await.unwrap_err();
    let error = client.get("/down", RequestConfig::default()).await.unwrap_err();

    assert_eq!(error.kind, expected.kind);
    assert_eq!(error.message, expected.message);
    assert_eq!(
        error.response().map(|r| r.status),
        Some(StatusCode::SERVICE_UNAVAILABLE)
    );

    assert_eq!(logger.count(Level::Info), 0);
    assert_eq!(logger.count(Level::Error), 1);
    assert_eq!(logger.summaries()[0][1], "503/(Service Unavailable)");

    let refused = client
        .get("/refused", RequestConfig::default())
        .await
        .unwrap_err();
    assert_eq!(refused.kind, ErrorKind::Network);
    assert_eq!(logger.count(Level::Error), 2);
    assert_eq!(logger.summaries()[1][1], "-/(-)");
}

#[tokio::test]
async fn test_decorate_twice_logs_twice() {
    let logger = Arc::new(TestLogger::default());
    let client = HttpClient::with_adapter(echo_adapter());
    decorate(&client, LoggerOptions::default().with_logger(logger.clone())).unwrap();
    decorate(&client, LoggerOptions::default().with_logger(logger.clone())).unwrap();

    client.get("/hello", RequestConfig::default()).await.unwrap();
    assert_eq!(logger.count(Level::Info), 2);

    client.get("/down", RequestConfig::default()).await.unwrap_err();
    assert_eq!(logger.count(Level::Error), 2);
}

#[tokio::test]
async fn test_decorate_keeps_existing_interceptors() {
    let logger = Arc::new(TestLogger::default());
    let client = HttpClient::with_adapter(echo_adapter());
    client.interceptors().request.add(|config| {
        Ok(config.with_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer t")))
    });
    decorate(&client, LoggerOptions::default().with_logger(logger.clone())).unwrap();

    let response = client.get("/me", RequestConfig::default()).await.unwrap();
    assert_eq!(response.config.headers[header::AUTHORIZATION], "Bearer t");

    // The adapter-level logger sees the config after interceptors ran.
    let (_, values) = &logger.entries()[0];
    let LogValue::Context(context) = &values[4] else {
        panic!("expected context value");
    };
    assert_eq!(context["config"]["headers"]["authorization"], "Bearer t");
}

#[tokio::test]
async fn test_decorated_clones_share_logging() {
    let logger = Arc::new(TestLogger::default());
    let client = HttpClient::with_adapter(echo_adapter());
    let clone = client.clone();
    decorate(&client, LoggerOptions::default().with_logger(logger.clone())).unwrap();

    clone.get("/hello", RequestConfig::default()).await.unwrap();
    assert_eq!(logger.count(Level::Info), 1);
}

#[tokio::test]
async fn test_custom_formatter() {
    let logger = Arc::new(TestLogger::default());
    let client = HttpClient::with_adapter(echo_adapter());
    let options = LoggerOptions::default()
        .with_logger(logger.clone())
        .with_format(|record: &RequestRecord<'_>| -> Vec<LogValue> {
            vec![LogValue::from(format!(
                "{} {} ok={}",
                record.method,
                record.url,
                record.is_success()
            ))]
        });
    decorate(&client, options).unwrap();

    client.delete("/items/1", RequestConfig::default()).await.unwrap();
    assert_eq!(
        logger.entries(),
        vec![(Level::Info, vec![LogValue::from("DELETE /items/1 ok=true")])]
    );
}

#[tokio::test]
async fn test_facade_verbs_forward_to_client() {
    let logger = Arc::new(TestLogger::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = seen.clone();
    let client = HttpClient::with_adapter(adapter_fn(move |config: RequestConfig| {
        let recorded = recorded.clone();
        async move {
            recorded
                .lock()
                .unwrap()
                .push((config.method.clone(), config.url.clone(), config.data.clone()));
            settle(Response::new(StatusCode::OK, config))
        }
    }));
    let facade = LoggedClient::new(LoggedClientConfig::new(logger.clone(), client));
    let cfg = RequestConfig::default;

    facade.get("/g", cfg()).await.unwrap();
    facade.delete("/d", cfg()).await.unwrap();
    facade.head("/h", cfg()).await.unwrap();
    facade.options("/o", cfg()).await.unwrap();
    facade.post("/p", Bytes::from_static(b"post"), cfg()).await.unwrap();
    facade.put("/u", Bytes::from_static(b"put"), cfg()).await.unwrap();
    facade.patch("/a", None, cfg()).await.unwrap();
    facade
        .request(RequestConfig::new(Method::POST, "/r").with_data(Bytes::from_static(b"req")))
        .await
        .unwrap();

    let seen = seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            (Method::GET, "/g".to_string(), None),
            (Method::DELETE, "/d".to_string(), None),
            (Method::HEAD, "/h".to_string(), None),
            (Method::OPTIONS, "/o".to_string(), None),
            (Method::POST, "/p".to_string(), Some(Bytes::from_static(b"post"))),
            (Method::PUT, "/u".to_string(), Some(Bytes::from_static(b"put"))),
            (Method::PATCH, "/a".to_string(), None),
            (Method::POST, "/r".to_string(), Some(Bytes::from_static(b"req"))),
        ]
    );

    let methods: Vec<_> = logger
        .summaries()
        .into_iter()
        .map(|s| format!("{} {}", s[0], s[3]))
        .collect();
    assert_eq!(
        methods,
        vec![
            "GET /g", "DELETE /d", "HEAD /h", "OPTIONS /o", "POST /p", "PUT /u", "PATCH /a",
            "POST /r"
        ]
    );
    assert_eq!(logger.count(Level::Info), 8);
}

#[tokio::test]
async fn test_facade_records_payload_and_errors() {
    let logger = Arc::new(TestLogger::default());
    let client = HttpClient::with_adapter(echo_adapter());
    let facade = LoggedClient::new(LoggedClientConfig::new(logger.clone(), client));

    facade
        .post("/items", Bytes::from_static(b"{\"a\":1}"), RequestConfig::default())
        .await
        .unwrap();
    let (_, values) = &logger.entries()[0];
    let LogValue::Context(context) = &values[4] else {
        panic!("expected context value");
    };
    assert_eq!(context["data"], "{\"a\":1}");

    let error = facade.get("/down", RequestConfig::default()).await.unwrap_err();
    assert_eq!(error.kind, ErrorKind::Status);
    assert_eq!(logger.count(Level::Error), 1);
}

#[tokio::test]
async fn test_facade_does_not_decorate_client() {
    let logger = Arc::new(TestLogger::default());
    let client = HttpClient::with_adapter(echo_adapter());
    let facade = LoggedClient::new(LoggedClientConfig::new(logger.clone(), client.clone()));

    client.get("/direct", RequestConfig::default()).await.unwrap();
    facade.client().get("/direct", RequestConfig::default()).await.unwrap();
    assert!(logger.entries().is_empty());
}

#[tokio::test]
async fn test_facade_passthrough_is_identity() {
    let logger = Arc::new(TestLogger::default());
    let client = HttpClient::with_adapter(echo_adapter());
    let facade = LoggedClient::new(LoggedClientConfig::new(logger.clone(), client.clone()));

    assert!(Arc::ptr_eq(facade.defaults(), client.defaults()));
    assert!(Arc::ptr_eq(facade.interceptors(), client.interceptors()));

    facade.defaults().write().base_url = Some("http://svc.test".to_string());
    assert_eq!(
        client.defaults().read().base_url.as_deref(),
        Some("http://svc.test")
    );

    let id = facade
        .interceptors()
        .request
        .add(|config| Ok(config.with_param("via", "facade")));
    assert_eq!(client.interceptors().request.len(), 1);

    let response = client.get("/x", RequestConfig::default()).await.unwrap();
    assert_eq!(response.config.url, "http://svc.test/x");
    assert_eq!(response.config.params, vec![("via".into(), "facade".into())]);

    assert!(client.interceptors().request.eject(id));
    assert!(facade.interceptors().request.is_empty());
}

#[tokio::test]
async fn test_facade_over_decorated_client_logs_both() {
    let adapter_logger = Arc::new(TestLogger::default());
    let facade_logger = Arc::new(TestLogger::default());
    let client = HttpClient::with_adapter(echo_adapter());
    decorate(&client, LoggerOptions::default().with_logger(adapter_logger.clone())).unwrap();
    let facade = LoggedClient::new(LoggedClientConfig::new(facade_logger.clone(), client));

    facade.get("/hello", RequestConfig::default()).await.unwrap();
    assert_eq!(adapter_logger.count(Level::Info), 1);
    assert_eq!(facade_logger.count(Level::Info), 1);
}

#[tokio::test]
async fn test_network_success() {
    let addr = spawn_server().await;
    let logger = Arc::new(TestLogger::default());
    let client = network_client(addr);
    decorate(&client, LoggerOptions::default().with_logger(logger.clone())).unwrap();

    let response = client.get("/hello", RequestConfig::default()).await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data, "Hello, World!");

    let response = client
        .post("/echo", Bytes::from_static(b"ping"), RequestConfig::default())
        .await
        .unwrap();
    assert_eq!(response.data, "Echo: ping");

    let summaries = logger.summaries();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0][0], "GET");
    assert_eq!(summaries[0][1], "200/(OK)");
    assert_eq!(summaries[0][3], format!("http://{addr}/hello"));
    assert_eq!(summaries[1][0], "POST");
}

#[tokio::test]
async fn test_network_status_error() {
    let addr = spawn_server().await;
    let logger = Arc::new(TestLogger::default());
    let client = network_client(addr);
    decorate(&client, LoggerOptions::default().with_logger(logger.clone())).unwrap();

    let error = client.get("/missing", RequestConfig::default()).await.unwrap_err();
    assert_eq!(error.kind, ErrorKind::Status);
    let response = error.response().expect("embedded response");
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.data, "no such thing");

    assert_eq!(logger.count(Level::Error), 1);
    assert_eq!(logger.summaries()[0][1], "404/(Not Found)");
}

#[tokio::test]
async fn test_network_connection_refused() {
    let addr = closed_addr().await;
    let logger = Arc::new(TestLogger::default());
    let client = network_client(addr);
    decorate(&client, LoggerOptions::default().with_logger(logger.clone())).unwrap();

    let error = client.get("/hello", RequestConfig::default()).await.unwrap_err();
    assert_eq!(error.kind, ErrorKind::Network);
    assert!(error.response().is_none());

    assert_eq!(logger.count(Level::Error), 1);
    assert_eq!(logger.summaries()[0][1], "-/(-)");
}

#[tokio::test]
async fn test_network_timeout_comes_from_transport() {
    let addr = spawn_server().await;
    let logger = Arc::new(TestLogger::default());
    let client = network_client(addr);
    decorate(&client, LoggerOptions::default().with_logger(logger.clone())).unwrap();

    let error = client
        .get(
            "/delayed",
            RequestConfig::default().with_timeout(Duration::from_millis(20)),
        )
        .await
        .unwrap_err();
    assert_eq!(error.kind, ErrorKind::Timeout);
    assert_eq!(logger.count(Level::Error), 1);
}

#[tokio::test]
async fn test_timing_accuracy() {
    let addr = spawn_server().await;
    let elapsed = Arc::new(Mutex::new(Vec::new()));
    let sink = elapsed.clone();
    let client = network_client(addr);
    let options = LoggerOptions::default()
        .with_logger(TestLogger::default())
        .with_format(move |record: &RequestRecord<'_>| -> Vec<LogValue> {
            sink.lock().unwrap().push(record.elapsed());
            Vec::new()
        });
    decorate(&client, options).unwrap();

    let started = std::time::Instant::now();
    client.get("/delayed", RequestConfig::default()).await.unwrap();
    let actual = started.elapsed();

    let elapsed = elapsed.lock().unwrap();
    assert_eq!(elapsed.len(), 1);
    assert!(elapsed[0] >= Duration::from_millis(90));
    assert!(elapsed[0] <= actual);
}

#[tokio::test]
async fn test_multiple_concurrent_requests() {
    let addr = spawn_server().await;
    let logger = Arc::new(TestLogger::default());
    let client = network_client(addr);
    decorate(&client, LoggerOptions::default().with_logger(logger.clone())).unwrap();

    use futures::future::join_all;

    let futures: Vec<_> = (0..5)
        .map(|i| {
            let client = client.clone();
            async move {
                client
                    .post("/echo", Bytes::from(format!("Request {i}")), RequestConfig::default())
                    .await
            }
        })
        .collect();
    let responses = join_all(futures).await;

    for (i, response) in responses.into_iter().enumerate() {
        let response = response.unwrap();
        assert_eq!(response.data, format!("Echo: Request {i}"));
    }

    assert_eq!(logger.count(Level::Info), 5);
    assert_eq!(logger.count(Level::Error), 0);
}
