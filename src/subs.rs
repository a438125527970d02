//! Optional subscription HTTP endpoint: resolves a configured nickname to its `mw://`
//! connection link. Started only when `subs_listen_port` is configured.
//!
//! This codebase has no HTTP *server* of its own to imitate (its existing HTTP usage
//! is client-side, via `reqwest`), so the server shape here follows the standard
//! `tokio`/`tracing`-stack convention: `axum` routing with state passed through
//! `Router::with_state`.

use crate::auth::Authenticator;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct SubsState {
    authenticator: Arc<Authenticator>,
    listen_port: Arc<str>,
}

/// Binds and serves the subscription endpoint until the process shuts down.
pub async fn serve(
    subs_listen_port: &str,
    listen_port: &str,
    authenticator: Arc<Authenticator>,
) -> std::io::Result<()> {
    let state = SubsState {
        authenticator,
        listen_port: Arc::from(listen_port),
    };
    let app = Router::new()
        .route("/subs/{nickname}", get(handle_subscription))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", subs_listen_port.parse::<u16>().map_err(
        |_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "subs_listen_port is not a valid port number"),
    )?))
    .await?;
    info!(%subs_listen_port, "subscription endpoint listening");

    axum::serve(listener, app).await
}

async fn handle_subscription(
    State(state): State<SubsState>,
    Path(nickname): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    build_response(&state, &nickname, &headers)
}

fn build_response(state: &SubsState, nickname: &str, headers: &HeaderMap) -> (StatusCode, String) {
    if nickname.is_empty() {
        return (StatusCode::BAD_REQUEST, String::new());
    }

    let Some(secret) = state.authenticator.secret_for_nickname(nickname) else {
        return (StatusCode::NOT_FOUND, String::new());
    };

    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(':').next().unwrap_or(value))
        .unwrap_or("localhost");

    let link = format!(
        "mw://{secret}@{host}:{port}#{nickname}",
        port = state.listen_port
    );
    (StatusCode::OK, link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credential;

    fn state() -> SubsState {
        SubsState {
            authenticator: Arc::new(
                Authenticator::new(vec![Credential {
                    secret: "hunter2".to_string(),
                    nickname: Some("alice".to_string()),
                }])
                .unwrap(),
            ),
            listen_port: Arc::from("25565"),
        }
    }

    #[test]
    fn resolves_known_nickname() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::HOST, "example.com:8080".parse().unwrap());

        let (status, body) = build_response(&state(), "alice", &headers);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "mw://hunter2@example.com:25565#alice");
    }

    #[test]
    fn unknown_nickname_is_404() {
        let (status, _) = build_response(&state(), "mallory", &HeaderMap::new());
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn empty_nickname_is_400() {
        let (status, _) = build_response(&state(), "", &HeaderMap::new());
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn link_format_matches_spec() {
        let link = format!("mw://{}@{}:{}#{}", "hunter2", "example.com", "25565", "alice");
        assert_eq!(link, "mw://hunter2@example.com:25565#alice");
    }
}
