use axum::extract::ConnectInfo;
use axum::routing::get;
use axum::{middleware, Router};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tower::{ServiceBuilder, ServiceExt};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{Result, ServiceError};
use crate::excuses::ExcuseList;
use crate::handlers::{excuse, health_check, AppState, SharedState};
use crate::middleware::logging_middleware;
use crate::rate_limiter::RateLimiter;
use crate::sweeper;

/// Build the router over an already constructed state.
pub fn create_app(state: SharedState) -> Router {
    Router::new()
        .route("/no", get(excuse))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(logging_middleware)),
        )
}

/// A bound, not yet serving, HTTP server.
pub struct Server {
    config: Config,
    listener: TcpListener,
    state: SharedState,
}

impl Server {
    /// Validate the config, load the excuse file and bind the listener, in
    /// that order. Nothing is bound if the excuses cannot be loaded.
    pub async fn bind(config: Config) -> Result<Self> {
        config.validate()?;
        let excuses = ExcuseList::load(&config.excuses_path)?;
        Self::bind_with(config, excuses, Arc::new(SystemClock)).await
    }

    /// Bind with an explicit excuse list and clock.
    pub async fn bind_with(
        config: Config,
        excuses: ExcuseList,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| ServiceError::Bind {
                addr: config.bind_addr,
                source,
            })?;

        let limiter = RateLimiter::with_clock(config.policy(), clock);
        let state = Arc::new(AppState::new(limiter, Arc::new(excuses), config.seed));

        Ok(Self {
            config,
            listener,
            state,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(ServiceError::Server)
    }

    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    /// Serve until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Serve until `shutdown` resolves.
    ///
    /// On shutdown the listener is closed and every open connection is told
    /// to finish its current request and close. Connections still open when
    /// the grace period ends are aborted, which closes their sockets. The
    /// sweeper is stopped and joined before returning.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr()?;
        let grace = self.config.shutdown_grace();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let sweeper = sweeper::spawn(
            self.state.limiter.clone(),
            self.config.cleanup_interval(),
            self.config.idle_timeout(),
            shutdown_rx.clone(),
        );

        let app = create_app(self.state);
        let listener = self.listener;
        let mut connections = JoinSet::new();

        info!("nope server listening on {}", addr);

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(serve_connection(
                            stream,
                            peer,
                            app.clone(),
                            shutdown_rx.clone(),
                        ));
                    }
                    Err(e) => {
                        // Usually fd exhaustion; back off instead of spinning.
                        warn!(error = %e, "failed to accept connection");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    log_connection_exit(finished);
                }
            }
        }

        info!("Shutting down server...");
        drop(listener);
        let _ = shutdown_tx.send(true);

        let drained = tokio::time::timeout(grace, async {
            while let Some(finished) = connections.join_next().await {
                log_connection_exit(finished);
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                open_connections = connections.len(),
                grace_secs = grace.as_secs_f64(),
                "in-flight requests did not finish in time, closing"
            );
            connections.shutdown().await;
        }

        if let Err(e) = sweeper.await {
            warn!(error = %e, "sweeper task ended abnormally");
        }

        info!("...server shutdown complete");
        Ok(())
    }
}

/// Drive one HTTP/1 connection until it closes. When `stop` flips, the
/// connection finishes any request in progress and then closes.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    app: Router,
    mut stop: watch::Receiver<bool>,
) {
    let service = service_fn(move |mut request: hyper::Request<Incoming>| {
        request.extensions_mut().insert(ConnectInfo(peer));
        app.clone().oneshot(request)
    });

    let connection = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
    tokio::pin!(connection);

    tokio::select! {
        served = connection.as_mut() => {
            if let Err(e) = served {
                debug!(client = %peer, error = %e, "connection closed with error");
            }
            return;
        }
        _ = stopped(&mut stop) => {}
    }

    connection.as_mut().graceful_shutdown();
    if let Err(e) = connection.await {
        debug!(client = %peer, error = %e, "connection closed with error");
    }
}

async fn stopped(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stop| *stop).await;
}

fn log_connection_exit(finished: std::result::Result<(), JoinError>) {
    if let Err(e) = finished {
        if e.is_panic() {
            error!(error = %e, "connection task panicked");
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}
