use authentik_webfinger::config::Config;
use authentik_webfinger::serve::ServerContext;
use authentik_webfinger::serve::app;
use axum::body::Body;
use axum::extract::Request;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use http_body_util::BodyExt;
use std::sync::Arc;
use std::sync::Mutex;
use tower::util::ServiceExt;
use tracing::subscriber::DefaultGuard;
use webfinger_directory::Directory;
use webfinger_directory::LookupError;
use webfinger_directory::UserRecord;

pub trait TestDefault {
    fn test_default() -> Self;
}

impl TestDefault for Config {
    fn test_default() -> Self {
        Self {
            host: ":8080".to_string(),
            authentik_host: "auth.example.com".to_string(),
            token: "test-token".to_string(),
            user_agent: "authentik-webfinger-test".to_string(),
            authentik_application: "tailscale".to_string(),
        }
    }
}

impl TestDefault for UserRecord {
    fn test_default() -> Self {
        Self {
            email: "alice@example.com".to_string(),
            name: "Alice A".to_string(),
            avatar: "https://cdn/x.png".to_string(),
        }
    }
}

/// Directory that answers every lookup with the same user, or with
/// `LookupError::NotFound` when `user` is `None`.
pub struct FakeDirectory {
    pub user: Option<UserRecord>,
    /// The accounts that were looked up.
    pub seen: Mutex<Vec<String>>,
}

impl FakeDirectory {
    pub fn new(user: Option<UserRecord>) -> Arc<Self> {
        Arc::new(Self {
            user,
            seen: Mutex::new(Vec::new()),
        })
    }
    #[allow(dead_code)]
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Directory for FakeDirectory {
    async fn lookup(&self, email: &str) -> Result<UserRecord, LookupError> {
        self.seen.lock().unwrap().push(email.to_string());
        self.user.clone().ok_or(LookupError::NotFound)
    }
    fn host(&self) -> &str {
        "auth.example.com"
    }
}

#[allow(dead_code)]
pub fn server_context(directory: Arc<dyn Directory>) -> ServerContext {
    ServerContext::new(Config::test_default(), directory)
}

#[allow(dead_code)]
pub async fn request(
    directory: Arc<dyn Directory>,
    method: &str,
    uri: &str,
) -> (StatusCode, HeaderMap, String) {
    let app = app(server_context(directory));
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap();
    let body: Vec<u8> = body.to_bytes().into();
    let body = String::from_utf8(body).unwrap();
    (status, headers, body)
}

#[allow(dead_code)]
pub async fn request_body(directory: Arc<dyn Directory>, uri: &str) -> (StatusCode, String) {
    let (status, _headers, body) = request(directory, "GET", uri).await;
    (status, body)
}

/// Log output collected by [`capture_logs`].
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    #[allow(dead_code)]
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Collect the logs of the current thread until the guard is dropped.
///
/// `#[tokio::test]` runs on a single thread, so this includes the handlers.
#[allow(dead_code)]
pub fn capture_logs() -> (LogBuffer, DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .without_time()
        .with_target(false)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}
