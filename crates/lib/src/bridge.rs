//! Session/listener boundary.
//!
//! Two long-lived roles run as separate tasks and share nothing mutable:
//! - session role: owns the chat session, resolves the group, runs the inbound
//!   dispatcher and delivers relayed messages into the group;
//! - listener role: owns the relay HTTP listener.
//!
//! The only link is a one-way channel (listener → session) carrying [`RelayRequest`]s
//! by value. Either role may stop or panic without taking the other down.

use crate::backend::BackendClient;
use crate::channels::{ChatSession, GroupIdentity, RawMessage};
use crate::config::{self, Config, GroupSelector};
use crate::dispatch::Dispatcher;
use crate::relay::{self, RelayRequest};
use anyhow::{Context, Result};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};

const RELAY_QUEUE: usize = 64;
const EVENT_QUEUE: usize = 64;

/// Turn the configured selector into the group identity (lookup by name goes through the session).
pub async fn resolve_group(
    session: &dyn ChatSession,
    selector: &GroupSelector,
) -> Result<GroupIdentity> {
    match selector {
        GroupSelector::Fixed(id) => Ok(GroupIdentity::new(id.clone())),
        GroupSelector::ByName(name) => {
            let id = session
                .find_group(name)
                .await
                .map_err(|e| anyhow::anyhow!("looking up group {:?}: {}", name, e))?
                .with_context(|| format!("group not found: {:?}", name))?;
            Ok(GroupIdentity::new(id))
        }
    }
}

/// Session role: resolve the group, then run the inbound dispatcher and the outbound relay loop
/// side by side until both the chat event stream and the relay channel are closed.
pub async fn run_session_role(
    session: Arc<dyn ChatSession>,
    backend: BackendClient,
    selector: GroupSelector,
    relay_rx: mpsc::Receiver<RelayRequest>,
) -> Result<()> {
    let group = resolve_group(session.as_ref(), &selector).await?;
    log::info!("session role: authorized group {}", group);

    let (events_tx, events_rx) = mpsc::channel::<RawMessage>(EVENT_QUEUE);
    let inbound = session.clone().start(events_tx);
    let dispatcher = Dispatcher::new(group.clone(), backend, session.clone());

    tokio::join!(
        dispatcher.run(events_rx),
        deliver_relayed(session.as_ref(), &group, relay_rx),
    );
    if let Err(e) = inbound.await {
        log::warn!("session role: {} event task ended abnormally: {}", session.id(), e);
    }
    Ok(())
}

/// Send every relayed message into the group. Failures and panics are logged; the HTTP caller was already answered.
async fn deliver_relayed(
    session: &dyn ChatSession,
    group: &GroupIdentity,
    mut relay_rx: mpsc::Receiver<RelayRequest>,
) {
    while let Some(request) = relay_rx.recv().await {
        // A panicking send costs only this message; the loop keeps draining the channel.
        match AssertUnwindSafe(session.send_message(group, &request.message))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("session role: relayed message to {} failed: {}", group, e),
            Err(_) => log::error!("session role: relayed message to {} panicked", group),
        }
    }
    log::info!("session role: relay channel closed");
}

/// Run both roles until SIGINT/SIGTERM. A role that exits early is logged and the other keeps running.
pub async fn run_bridge(config: Config, session: Arc<dyn ChatSession>) -> Result<()> {
    let base_url = config::resolve_backend_base_url(&config)
        .context("no backend base URL configured (set backend.baseUrl or BASE_URL)")?;
    let backend = BackendClient::new(&base_url, config.backend.timeout())?;
    let selector = config::resolve_group_selector(&config)?;
    log::info!("backend at {}", backend.base_url());

    let (relay_tx, relay_rx) = mpsc::channel::<RelayRequest>(RELAY_QUEUE);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let mut session_role: JoinHandle<Result<()>> = tokio::spawn(run_session_role(
        session.clone(),
        backend,
        selector,
        relay_rx,
    ));
    let relay_config = config.relay.clone();
    let mut listener_role: JoinHandle<Result<()>> = tokio::spawn(async move {
        relay::run_listener(&relay_config, relay_tx, async {
            let _ = stop_rx.await;
        })
        .await
    });

    let signal = shutdown_signal();
    tokio::pin!(signal);
    let mut session_done = false;
    let mut listener_done = false;
    loop {
        tokio::select! {
            _ = &mut signal => break,
            res = &mut session_role, if !session_done => {
                session_done = true;
                report_role_exit("session", res);
            }
            res = &mut listener_role, if !listener_done => {
                listener_done = true;
                report_role_exit("listener", res);
            }
        }
        if session_done && listener_done {
            anyhow::bail!("both session and listener roles stopped");
        }
    }

    log::info!("shutdown signal received, stopping roles");
    session.stop();
    let _ = stop_tx.send(());
    if !listener_done {
        report_role_exit("listener", listener_role.await);
    }
    if !session_done {
        session_role.abort();
    }
    Ok(())
}

fn report_role_exit(role: &str, res: Result<Result<()>, JoinError>) {
    match res {
        Ok(Ok(())) => log::info!("{} role stopped", role),
        Ok(Err(e)) => log::error!("{} role failed: {:#}", role, e),
        Err(e) if e.is_panic() => log::error!("{} role panicked", role),
        Err(e) => log::error!("{} role aborted: {}", role, e),
    }
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
