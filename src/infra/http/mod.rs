//! HTTP surface: the public JSON API and, outside production, the admin.

mod admin;
mod middleware;
mod public;

use std::{net::SocketAddr, time::Duration};

use axum::{Router, middleware::from_fn};
use tokio::{net::TcpListener, sync::watch, task::JoinError};
use tracing::{info, warn};

use crate::application::{
    admin::AdminPostService, engagement::EngagementService,
    recommendations::RecommendationService,
};
use crate::infra::error::InfraError;

#[derive(Clone)]
pub struct HttpState {
    pub engagement: EngagementService,
    pub recommendations: RecommendationService,
}

#[derive(Clone)]
pub struct AdminState {
    pub posts: AdminPostService,
}

/// Build the application router. Admin routes are merged only when an
/// [`AdminState`] is supplied.
pub fn build_router(state: HttpState, admin: Option<AdminState>) -> Router {
    let router = public::build_public_router(state);
    let router = match admin {
        Some(admin) => router.merge(admin::build_admin_router(admin)),
        None => router,
    };

    router.layer(from_fn(middleware::log_responses))
}

/// Serve `router` until ctrl-c, then give in-flight requests up to `grace`
/// to finish before dropping them.
pub async fn serve(addr: SocketAddr, router: Router, grace: Duration) -> Result<(), InfraError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| InfraError::Bind { addr, source })?;
    info!(%addr, "listening");

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        let _ = shutdown_rx.changed().await;
    });
    let mut handle = tokio::spawn(async move { server.await });

    tokio::select! {
        result = &mut handle => return join_result(result),
        () = shutdown_signal() => {}
    }

    info!(grace_secs = grace.as_secs(), "shutting down");
    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(grace, &mut handle).await {
        Ok(result) => join_result(result),
        Err(_) => {
            warn!("grace period elapsed; dropping open connections");
            handle.abort();
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

fn join_result(result: Result<std::io::Result<()>, JoinError>) -> Result<(), InfraError> {
    match result {
        Ok(served) => served.map_err(InfraError::from),
        Err(err) => Err(InfraError::from(std::io::Error::other(err))),
    }
}
