//! Loopback listener for the provider's redirect back to the app.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};

const SIGNED_IN_PAGE: &str = "<!doctype html><title>Signed in</title>\
<p>You are signed in. You can close this window and return to the terminal.</p>";

/// Query parameters the provider appends to the redirect URI.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// A redirect that reached the listener. The browser waits on the response
/// until `complete` is called.
pub struct Callback {
    pub params: CallbackParams,
    reply: oneshot::Sender<bool>,
}

impl Callback {
    /// `true` sends the browser on to the root page.
    pub fn complete(self, signed_in: bool) {
        let _ = self.reply.send(signed_in);
    }
}

#[derive(Clone)]
struct ListenerState {
    callbacks: mpsc::Sender<Callback>,
}

pub struct CallbackServer {
    callbacks: mpsc::Receiver<Callback>,
    shutdown: Option<oneshot::Sender<()>>,
    #[cfg(test)]
    local_addr: std::net::SocketAddr,
}

impl CallbackServer {
    /// Listen on the redirect URI's host and port, serving its path and `/`.
    pub async fn bind(redirect_uri: &str) -> Result<Self> {
        let invalid = || Error::InvalidUrl {
            field: "redirect URI",
            value: redirect_uri.to_string(),
        };

        let url = Url::parse(redirect_uri).map_err(|_| invalid())?;
        let host = url.host_str().ok_or_else(invalid)?.to_string();
        let port = url.port_or_known_default().ok_or_else(invalid)?;
        let path = url.path().to_string();

        let listener = TcpListener::bind((host.as_str(), port)).await?;
        let local_addr = listener.local_addr()?;

        let (callbacks_tx, callbacks_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let mut router = Router::new().route(&path, get(handle_callback));
        if path != "/" {
            router = router.route("/", get(signed_in_page));
        }
        let router = router.with_state(ListenerState {
            callbacks: callbacks_tx,
        });

        debug!(%local_addr, path = path.as_str(), "callback listener started");

        tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = served {
                warn!(error = %e, "callback listener failed");
            }
        });

        Ok(Self {
            callbacks: callbacks_rx,
            shutdown: Some(shutdown_tx),
            #[cfg(test)]
            local_addr,
        })
    }

    #[cfg(test)]
    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.local_addr
    }

    /// Wait for the next redirect. `None` once the listener has stopped.
    pub async fn next(&mut self) -> Option<Callback> {
        self.callbacks.recv().await
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

async fn handle_callback(
    State(state): State<ListenerState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let (reply_tx, reply_rx) = oneshot::channel();
    let callback = Callback {
        params,
        reply: reply_tx,
    };

    if state.callbacks.send(callback).await.is_err() {
        return (StatusCode::GONE, "Sign-in is no longer in progress.").into_response();
    }

    match reply_rx.await {
        Ok(true) => Redirect::to("/").into_response(),
        _ => (
            StatusCode::BAD_REQUEST,
            "Sign-in could not be completed. Return to the terminal for details.",
        )
            .into_response(),
    }
}

async fn signed_in_page() -> Html<&'static str> {
    Html(SIGNED_IN_PAGE)
}
