//! Inbound webhook server.
//!
//! The platform pushes updates as `POST /<secret>` with a JSON body. The
//! path is the only credential: any other method or path, and any body that
//! is not JSON, gets the same empty `403 Forbidden`. Accepted updates are
//! pushed onto the [`UpdateQueue`] and answered with `204 No Content` right
//! away; processing happens later on the dispatcher.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::{Bytes, to_bytes};
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};
use whodat_core::UpdateQueue;

use crate::error::WebhookRejection;

/// Largest accepted request body.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Strips leading and trailing `/` from a configured secret.
pub fn normalize_secret(secret: &str) -> &str {
    secret.trim_matches('/')
}

/// HTTP endpoint feeding the update queue.
#[derive(Clone)]
pub struct WebhookServer {
    state: Arc<WebhookState>,
}

struct WebhookState {
    secret: String,
    queue: UpdateQueue,
    body_limit: usize,
}

impl WebhookServer {
    /// Creates a server accepting updates on `/<secret>`.
    pub fn new(secret: &str, queue: UpdateQueue) -> Self {
        Self::with_body_limit(secret, queue, DEFAULT_BODY_LIMIT)
    }

    /// Creates a server with a custom body size limit.
    pub fn with_body_limit(secret: &str, queue: UpdateQueue, body_limit: usize) -> Self {
        Self {
            state: Arc::new(WebhookState {
                secret: normalize_secret(secret).to_string(),
                queue,
                body_limit,
            }),
        }
    }

    /// Builds the router.
    ///
    /// Everything goes through a single fallback so that no request can be
    /// answered by axum's own 404 or 405.
    pub fn router(&self) -> Router {
        Router::new()
            .fallback(handle_request)
            .with_state(Arc::clone(&self.state))
    }

    /// Serves on `listener` until `shutdown` is cancelled.
    ///
    /// On cancellation the listener stops accepting, in-flight requests are
    /// completed and the socket is closed before this returns.
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> std::io::Result<()> {
        let addr: SocketAddr = listener.local_addr()?;
        info!(addr = %addr, "Webhook server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!(addr = %addr, "Webhook server stopped");
        Ok(())
    }
}

impl std::fmt::Debug for WebhookServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookServer")
            .field("body_limit", &self.state.body_limit)
            .finish_non_exhaustive()
    }
}

async fn handle_request(State(state): State<Arc<WebhookState>>, request: Request) -> StatusCode {
    match state.accept(request).await {
        Ok(update) => {
            state.queue.push(update);
            StatusCode::NO_CONTENT
        }
        Err(rejection) => {
            debug!(reason = %rejection, "Rejected webhook request");
            StatusCode::FORBIDDEN
        }
    }
}

impl WebhookState {
    async fn accept(&self, request: Request) -> Result<Value, WebhookRejection> {
        let (parts, body) = request.into_parts();

        // Registered URLs percent-encode the secret; compare the decoded path.
        let path = urlencoding::decode(parts.uri.path()).ok();
        let authorized = parts.method == Method::POST
            && path
                .as_deref()
                .is_some_and(|path| normalize_secret(path) == self.secret);

        if !authorized {
            // The path carries the secret; never log it verbatim.
            return Err(WebhookRejection::Forbidden {
                method: parts.method.to_string(),
                path: redact(parts.uri.path()),
            });
        }

        let bytes: Bytes = to_bytes(body, self.body_limit)
            .await
            .map_err(|err| WebhookRejection::MalformedPayload(err.to_string()))?;
        trace!(len = bytes.len(), "Received webhook body");

        serde_json::from_slice(&bytes)
            .map_err(|err| WebhookRejection::MalformedPayload(err.to_string()))
    }
}

fn redact(path: &str) -> String {
    match path.len() {
        0..=1 => path.to_string(),
        len => format!("/<{len} bytes>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde_json::json;
    use tower::ServiceExt;
    use url::Url;
    use whodat_core::{UpdateDispatcher, UpdateTypeRegistry};

    fn setup(secret: &str) -> (Arc<UpdateDispatcher>, Router) {
        let dispatcher = Arc::new(UpdateDispatcher::new(UpdateTypeRegistry::new()));
        let server = WebhookServer::new(secret, dispatcher.queue());
        (dispatcher, server.router())
    }

    async fn send(router: &Router, method: Method, path: &str, body: &str) -> StatusCode {
        let request = axum::http::Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        router.clone().oneshot(request).await.unwrap().status()
    }

    /// Drains the queue by running the dispatcher up to a sentinel.
    async fn queued(dispatcher: &UpdateDispatcher) -> u64 {
        dispatcher.shutdown();
        dispatcher.run().await;
        let stats = dispatcher.stats();
        stats.processed + stats.failed
    }

    #[test]
    fn test_normalize_secret() {
        assert_eq!(normalize_secret("/s3cret/"), "s3cret");
        assert_eq!(normalize_secret("s3cret"), "s3cret");
        assert_eq!(normalize_secret("///"), "");
    }

    #[tokio::test]
    async fn test_wrong_path_is_forbidden() {
        let (dispatcher, router) = setup("s3cret");

        assert_eq!(
            send(&router, Method::POST, "/wrong", "{}").await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            send(&router, Method::POST, "/", "{}").await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            send(&router, Method::POST, "/s3cret/extra", "{}").await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(queued(&dispatcher).await, 0);
    }

    #[tokio::test]
    async fn test_wrong_method_is_forbidden() {
        let (dispatcher, router) = setup("s3cret");

        for method in [Method::GET, Method::PUT, Method::DELETE] {
            assert_eq!(
                send(&router, method, "/s3cret", "{}").await,
                StatusCode::FORBIDDEN
            );
        }
        assert_eq!(queued(&dispatcher).await, 0);
    }

    #[tokio::test]
    async fn test_invalid_json_is_forbidden() {
        let (dispatcher, router) = setup("s3cret");

        assert_eq!(
            send(&router, Method::POST, "/s3cret", "{not json").await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            send(&router, Method::POST, "/s3cret", "").await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(queued(&dispatcher).await, 0);
    }

    #[tokio::test]
    async fn test_valid_update_is_queued() {
        let (dispatcher, router) = setup("/s3cret/");
        let update = json!({"update_id": 1, "message": {}}).to_string();

        assert_eq!(
            send(&router, Method::POST, "/s3cret", &update).await,
            StatusCode::NO_CONTENT
        );
        assert_eq!(
            send(&router, Method::POST, "/s3cret/", &update).await,
            StatusCode::NO_CONTENT
        );
        // No handler is registered, so both fail in the dispatcher.
        assert_eq!(queued(&dispatcher).await, 2);
        assert_eq!(dispatcher.stats().failed, 2);
    }

    #[tokio::test]
    async fn test_encoded_secret_matches_registered_url() {
        let update = json!({"update_id": 1, "message": {}}).to_string();
        let base = Url::parse("https://example.com/").unwrap();

        for secret in ["my secret", "тайна"] {
            let (dispatcher, router) = setup(secret);
            let registered = base.join(secret).unwrap();

            assert_eq!(
                send(&router, Method::POST, registered.path(), &update).await,
                StatusCode::NO_CONTENT,
                "secret {secret:?} via {registered}"
            );
            assert_eq!(queued(&dispatcher).await, 1);
        }
    }

    #[tokio::test]
    async fn test_undecodable_path_is_forbidden() {
        let (dispatcher, router) = setup("s3cret");

        assert_eq!(
            send(&router, Method::POST, "/%FF%FE", "{}").await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(queued(&dispatcher).await, 0);
    }

    #[tokio::test]
    async fn test_denial_has_empty_body() {
        let (_dispatcher, router) = setup("s3cret");
        let request = axum::http::Request::builder()
            .uri("/missing")
            .body(Body::empty())
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_body_is_forbidden() {
        let dispatcher = Arc::new(UpdateDispatcher::new(UpdateTypeRegistry::new()));
        let router = WebhookServer::with_body_limit("s3cret", dispatcher.queue(), 8).router();

        assert_eq!(
            send(&router, Method::POST, "/s3cret", r#"{"update_id": 1}"#).await,
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn test_serve_stops_on_cancel() {
        let (dispatcher, _) = setup("s3cret");
        let server = WebhookServer::new("s3cret", dispatcher.queue());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = CancellationToken::new();

        let task = tokio::spawn({
            let shutdown = shutdown.clone();
            async move { server.serve(listener, shutdown).await }
        });

        shutdown.cancel();
        task.await.unwrap().unwrap();
    }
}
