use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::instance::{SourceInstance, QUEUE_CAPACITY};
use crate::record::Record;

const OK_BODY: &str = "<html><body>Ok</body></html>";

/// How long in-flight requests get to finish once cancellation fires. The
/// listening socket itself is released immediately.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

struct WebhookState {
    events: mpsc::Sender<Record>,
    cancel: CancellationToken,
    max_event_bytes: usize,
}

/// Starts a webhook server for `port_spec` (leading colon included) serving
/// exactly one handler at `path`.
///
/// Port parsing, TLS setup, and binding all happen inside the background
/// task: their failures arrive on the error queue, never synchronously.
/// Every call builds its own router and listener, so concurrent instances
/// never collide on handler registration.
pub(crate) fn start(
    port_spec: &str,
    path: &str,
    use_tls: bool,
    config: &SourceConfig,
) -> SourceInstance {
    let (event_tx, event_rx) = mpsc::channel(QUEUE_CAPACITY);
    let (error_tx, error_rx) = mpsc::channel::<SourceError>(QUEUE_CAPACITY);
    let (bound_tx, bound_rx) = watch::channel(None);
    let cancel = CancellationToken::new();

    let task = tokio::spawn(serve(
        port_spec.to_string(),
        path.to_string(),
        use_tls,
        config.clone(),
        event_tx,
        error_tx,
        bound_tx,
        cancel.clone(),
    ));

    SourceInstance::new(event_rx, error_rx, bound_rx, cancel, config.timeout, task)
}

#[allow(clippy::too_many_arguments)]
async fn serve(
    port_spec: String,
    path: String,
    use_tls: bool,
    config: SourceConfig,
    event_tx: mpsc::Sender<Record>,
    error_tx: mpsc::Sender<SourceError>,
    bound_tx: watch::Sender<Option<SocketAddr>>,
    cancel: CancellationToken,
) {
    let port: u16 = match port_spec.strip_prefix(':').and_then(|digits| digits.parse().ok()) {
        Some(port) => port,
        None => {
            let _ = error_tx.send(SourceError::InvalidPort { port_spec }).await;
            return;
        }
    };
    // The optional `localhost` literal in the address was discarded at
    // parse time: the server binds the port, not a host. Unspecified IPv4
    // only; IPv6-only clients are not served.
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    // The router owns the sender inside its state and drops it whenever the
    // server returns. This clone keeps the record queue open until any
    // terminal error has been queued: the consumer must never observe the
    // record queue closed while the error queue is still empty.
    let event_keepalive = event_tx.clone();

    let state = Arc::new(WebhookState {
        events: event_tx,
        cancel: cancel.clone(),
        max_event_bytes: config.max_event_bytes,
    });
    let app = Router::new().route(&path, any(accept_event)).with_state(state);

    let result = if use_tls {
        serve_tls(addr, app, &config, bound_tx, cancel).await
    } else {
        serve_plain(addr, app, bound_tx, cancel).await
    };

    if let Err(err) = result {
        tracing::warn!(path = %path, error = %err, "webhook server terminated");
        let _ = error_tx.send(err).await;
    }
    drop(event_keepalive);
}

async fn serve_plain(
    addr: SocketAddr,
    app: Router,
    bound_tx: watch::Sender<Option<SocketAddr>>,
    cancel: CancellationToken,
) -> Result<(), SourceError> {
    let listener = TcpListener::bind(addr).await.map_err(|source| SourceError::Bind {
        address: addr.to_string(),
        source,
    })?;
    let local = listener.local_addr().ok();
    let _ = bound_tx.send(local);
    tracing::info!(address = ?local, "webhook listener started");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(SourceError::Serve)
}

async fn serve_tls(
    addr: SocketAddr,
    app: Router,
    config: &SourceConfig,
    bound_tx: watch::Sender<Option<SocketAddr>>,
    cancel: CancellationToken,
) -> Result<(), SourceError> {
    let Some(bundle) = config.ssl_cert_bundle.as_ref() else {
        return Err(SourceError::MissingCertBundle);
    };
    // The bundle concatenates certificate and key PEM blocks; it is handed
    // over as both to match the legacy webhook behavior.
    let tls = RustlsConfig::from_pem_file(bundle, bundle)
        .await
        .map_err(|source| SourceError::TlsConfig {
            path: bundle.clone(),
            source,
        })?;

    let handle = axum_server::Handle::new();

    let publisher = handle.clone();
    tokio::spawn(async move {
        if let Some(local) = publisher.listening().await {
            let _ = bound_tx.send(Some(local));
        }
    });

    let stopper = handle.clone();
    tokio::spawn(async move {
        cancel.cancelled().await;
        stopper.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    tracing::info!(address = %addr, "webhook TLS listener starting");
    axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .map_err(SourceError::Serve)
}

/// Single handler behind the configured path. Runs once per request, and
/// concurrently across connections; the only shared state is the instance's
/// queues.
async fn accept_event(State(state): State<Arc<WebhookState>>, request: Request) -> Response {
    if request.method() != Method::POST {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            format!("{} method not allowed", request.method()),
        )
            .into_response();
    }

    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    if content_type != Some("application/json") {
        return (StatusCode::BAD_REQUEST, "wrong Content Type").into_response();
    }

    // Reading is capped at max_event_bytes; an oversized body aborts here
    // and no partial record is ever emitted.
    let body = match to_bytes(request.into_body(), state.max_event_bytes).await {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!(error = %err, "rejecting webhook request body");
            return (StatusCode::BAD_REQUEST, format!("bad request: {err}")).into_response();
        }
    };

    // Blocking push: a slow consumer stalls this response, which is the
    // intended backpressure. Cancellation unblocks it.
    tokio::select! {
        _ = state.cancel.cancelled() => {
            (StatusCode::SERVICE_UNAVAILABLE, "event source is shutting down").into_response()
        }
        sent = state.events.send(Record::from(body.to_vec())) => {
            if sent.is_err() {
                return (StatusCode::SERVICE_UNAVAILABLE, "event source is closed").into_response();
            }
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html")],
                OK_BODY,
            )
                .into_response()
        }
    }
}
