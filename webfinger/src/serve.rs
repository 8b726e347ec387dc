use crate::ServeArgs;
use crate::config::Config;
use crate::config::ConfigError;
use axum::Router;
use axum::body::Body;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::Response;
use axum::http::StatusCode;
use std::sync::Arc;
use webfinger_directory::AuthentikClient;
use webfinger_directory::Directory;
use webfinger_directory::LookupError;

/// State shared by all requests.
///
/// Both fields are read-only after startup so no locking is needed.
#[derive(Clone)]
pub struct ServerContext {
    pub config: Arc<Config>,
    pub directory: Arc<dyn Directory>,
}

impl ServerContext {
    pub fn new(config: Config, directory: Arc<dyn Directory>) -> Self {
        Self {
            config: Arc::new(config),
            directory,
        }
    }
}

pub fn response<D: Sized>(status: StatusCode, headers: HeaderMap, body: D) -> Response<Body>
where
    Body: From<D>,
{
    let mut response: Response<Body> = Response::default();
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    *response.body_mut() = Body::from(body);
    response
}

/// A 500 without body; details go to the log instead.
pub fn internal_server_error() -> Response<Body> {
    response(StatusCode::INTERNAL_SERVER_ERROR, HeaderMap::new(), Body::empty())
}

pub fn content_type(headers: &mut HeaderMap, content_type: &'static str) {
    headers.insert("Content-Type", HeaderValue::from_static(content_type));
}

pub fn app(ctx: ServerContext) -> Router {
    let router = Router::new();
    let router = crate::webfinger::routes(&router);
    router.with_state(ctx)
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("could not load configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("could not create directory client: {0}")]
    Directory(#[from] LookupError),
    #[error("could not listen on {addr}: {source}")]
    Listen {
        addr: String,
        source: std::io::Error,
    },
    #[error("no address to listen on")]
    NoAddress,
    #[error("server stopped: {0}")]
    Serve(std::io::Error),
}

/// Bind to the first of `addrs` that is available.
pub async fn bind(addrs: &[String]) -> Result<tokio::net::TcpListener, ServeError> {
    let mut failure = None;
    for addr in addrs {
        match tokio::net::TcpListener::bind(addr.as_str()).await {
            Ok(listener) => {
                tracing::info!("Listening on {addr}");
                return Ok(listener);
            }
            Err(source) => {
                tracing::debug!("Could not listen on {addr}: {source}");
                failure = Some(ServeError::Listen {
                    addr: addr.clone(),
                    source,
                });
            }
        }
    }
    Err(failure.unwrap_or(ServeError::NoAddress))
}

/// Load the configuration and serve until the process is stopped.
///
/// Configuration errors are returned before anything is bound.
pub async fn run(args: &ServeArgs) -> Result<(), ServeError> {
    let config = Config::load(args)?;
    tracing::debug!("Loaded {config:?}");
    let directory = AuthentikClient::new(
        &config.authentik_host,
        &config.token,
        &config.user_agent,
    )?;
    let ctx = ServerContext::new(config, Arc::new(directory));
    let listener = bind(&ctx.config.listen_addrs()).await?;
    axum::serve(listener, app(ctx))
        .await
        .map_err(ServeError::Serve)
}
