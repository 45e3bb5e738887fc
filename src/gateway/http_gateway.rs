//! HTTP gateway implementation / HTTP网关实现

use axum::{
    body::{to_bytes, Body},
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{info, warn};

use crate::adapter::InvocationAdapter;
use crate::gateway::config::AppConfig;
use crate::gateway::error::{GatewayError, GatewayResult};
use crate::gateway::handlers;

pub const CORS_ALLOW_ORIGIN: &str = "*";
pub const CORS_ALLOW_HEADERS: &str = "Content-Type, Authorization, X-Requested-With, Accept, Origin";
pub const CORS_ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const CORS_ALLOW_CREDENTIALS: &str = "true";

/// HTTP gateway server / HTTP网关服务器
pub struct HttpGateway {
    /// Server configuration / 服务器配置
    config: Arc<AppConfig>,
    /// Invocation adapter picked at startup / 启动时选定的调用适配器
    adapter: Arc<dyn InvocationAdapter>,
}

/// Application state / 应用状态
#[derive(Clone)]
pub struct AppState {
    pub adapter: Arc<dyn InvocationAdapter>,
}

impl AppState {
    pub fn new(adapter: Arc<dyn InvocationAdapter>) -> Self {
        Self { adapter }
    }
}

/// Build the full router, CORS and request logging included
/// 构建完整路由（包含CORS与请求日志）
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handlers::index).options(handlers::preflight))
        .route(
            "/health",
            get(handlers::health_check).options(handlers::preflight),
        )
        .route(
            "/api/tags",
            get(handlers::list_models).options(handlers::preflight),
        )
        .route(
            "/api/generate",
            post(handlers::generate).options(handlers::preflight),
        )
        .route(
            "/test-query",
            get(handlers::test_query).options(handlers::preflight),
        )
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(middleware::from_fn_with_state(max_body_bytes, log_request))
        // Outermost, so error responses from inner layers carry them too.
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static(CORS_ALLOW_ORIGIN),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOW_HEADERS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOW_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static(CORS_ALLOW_CREDENTIALS),
        ))
}

/// Log every request; POST bodies are decoded best-effort and logged at info
/// 记录每个请求；POST请求体尽力解码
async fn log_request(State(max_body_bytes): State<usize>, req: Request, next: Next) -> Response {
    let (parts, body) = req.into_parts();
    info!(
        method = %parts.method,
        path = %parts.uri.path(),
        headers = ?parts.headers,
        "Received request"
    );

    let body = if parts.method == Method::POST {
        let bytes = match to_bytes(body, max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, limit = max_body_bytes, "Error reading POST data");
                return GatewayError::BodyTooLarge {
                    limit: max_body_bytes,
                }
                .into_response();
            }
        };
        info!("POST data: {}", describe_post_data(&bytes));
        Body::from(bytes)
    } else {
        body
    };

    next.run(Request::from_parts(parts, body)).await
}

/// Decoded POST body for the request log, `none` when it is not JSON
/// 请求日志中的POST数据，非JSON时为 `none`
fn describe_post_data(bytes: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(bytes)
        .map(|data| data.to_string())
        .unwrap_or_else(|_| "none".to_string())
}

/// Bind `host:port`, walking the port upwards while it is already in use
/// 绑定 `host:port`，端口被占用时依次递增重试
///
/// Up to `max_attempts` ports are tried. Any bind error other than
/// "address in use" is returned immediately.
pub async fn bind_with_retry(
    host: &str,
    first_port: u16,
    max_attempts: u32,
) -> GatewayResult<TcpListener> {
    let max_attempts = max_attempts.max(1);
    let mut port = first_port;
    let mut last_port = first_port;

    for attempt in 1..=max_attempts {
        last_port = port;
        match TcpListener::bind((host, port)).await {
            Ok(listener) => {
                if port != first_port {
                    info!(port, attempt, "Bound to fallback port");
                }
                return Ok(listener);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                warn!(port, attempt, "Port {} is already in use", port);
                match port.checked_add(1) {
                    Some(next) if attempt < max_attempts => {
                        info!("Trying port {}...", next);
                        port = next;
                    }
                    Some(_) => {}
                    None => break,
                }
            }
            Err(e) => {
                return Err(GatewayError::Bind {
                    addr: format!("{}:{}", host, port),
                    source: e,
                });
            }
        }
    }

    Err(GatewayError::PortsExhausted {
        first_port,
        last_port,
        attempts: max_attempts,
    })
}

impl HttpGateway {
    /// Create new HTTP gateway / 创建新的HTTP网关
    pub fn new(config: Arc<AppConfig>, adapter: Arc<dyn InvocationAdapter>) -> Self {
        Self { config, adapter }
    }

    /// Router without a listener, for embedding and tests
    /// 不带监听器的路由（用于嵌入和测试）
    pub fn router(&self) -> Router {
        build_router(
            AppState::new(self.adapter.clone()),
            self.config.http.max_body_bytes,
        )
    }

    /// Start HTTP gateway with shutdown signal / 使用关闭信号启动HTTP网关
    pub async fn start_with_shutdown<F>(self, shutdown: F) -> GatewayResult<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let (listener, app) = self.prepare().await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(GatewayError::Serve)
    }

    async fn prepare(&self) -> GatewayResult<(TcpListener, Router)> {
        let server = &self.config.http.server;
        info!("Starting HTTP gateway on {}", server.display_addr());

        let listener =
            bind_with_retry(&server.host, server.port, self.config.http.max_port_attempts).await?;
        let app = self.router();

        match listener.local_addr() {
            Ok(addr) => info!("HTTP gateway listening on {}", addr),
            Err(e) => warn!(error = %e, "HTTP gateway listening on unknown address"),
        }

        let status = self.adapter.status();
        info!(
            module_loaded = status.module_loaded,
            has_query_function = status.has_query_function,
            "Invocation adapter ready"
        );

        Ok((listener, app))
    }
}
