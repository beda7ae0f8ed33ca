//! `tokens status|refresh|watch`.

use std::sync::Arc;

use anyhow::bail;
use chrono::Local;
use opsdesk_auth::TokenEndpoint;
use opsdesk_core::{Clock, FocusTrigger, RefreshScheduler, SchedulerConfig, TokenStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::Context;

/// One-line state of a token store.
fn describe<E: TokenEndpoint>(store: &TokenStore<E>, now_millis: i64) -> String {
    let Some(record) = store.token() else {
        return "absent".to_string();
    };
    let state = if record.is_expired_at(now_millis, None) {
        "stale"
    } else {
        "valid"
    };
    let expires = record.expires_at().map_or_else(
        || "unknown".to_string(),
        |at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
    );
    format!(
        "{state}, expires {expires} ({}s left)",
        record.remaining_at(now_millis).as_secs()
    )
}

pub fn status(ctx: &Context) -> anyhow::Result<()> {
    let now = ctx.clock.now_millis();
    let mut any = false;

    if let Some(walmart) = ctx.walmart_tokens()? {
        println!("{:<18} {}", walmart.endpoint().name(), describe(walmart.as_ref(), now));
        any = true;
    }
    for (_, store) in ctx.logistics_tokens().stores() {
        println!("{:<18} {}", store.endpoint().name(), describe(store.as_ref(), now));
        any = true;
    }

    if !any {
        println!("No token endpoints configured.");
    }
    Ok(())
}

pub async fn refresh(ctx: &Context, force: bool) -> anyhow::Result<()> {
    let mut failed = Vec::new();

    if let Some(walmart) = ctx.walmart_tokens()? {
        let ok = if force {
            walmart.refresh().await
        } else {
            walmart.ensure_fresh().await
        };
        report(walmart.endpoint().name(), ok, &mut failed);
    }

    let logistics = ctx.logistics_tokens();
    if force {
        for (carrier, ok) in logistics.refresh_all().await {
            report(&format!("logistics-{carrier}"), ok, &mut failed);
        }
    } else {
        for (_, store) in logistics.stores() {
            report(store.endpoint().name(), store.ensure_fresh().await, &mut failed);
        }
    }

    if !failed.is_empty() {
        bail!("refresh failed for {}", failed.join(", "));
    }
    Ok(())
}

fn report(name: &str, ok: bool, failed: &mut Vec<String>) {
    if ok {
        println!("{name:<18} ok");
    } else {
        println!("{name:<18} FAILED (previous token kept)");
        failed.push(name.to_string());
    }
}

/// Keeps every configured token fresh until Ctrl-C. Each line read from
/// stdin counts as the user coming back to the app.
pub async fn watch(ctx: &Context) -> anyhow::Result<()> {
    let config = SchedulerConfig {
        interval: ctx.config.refresh_interval(),
        ..SchedulerConfig::default()
    };
    let trigger = FocusTrigger::new();
    let shutdown = CancellationToken::new();
    let mut handles = Vec::new();

    if let Some(walmart) = ctx.walmart_tokens()? {
        handles.push(RefreshScheduler::spawn(walmart, config, &trigger, shutdown.clone()));
    }
    for (_, store) in ctx.logistics_tokens().stores() {
        handles.push(RefreshScheduler::spawn(
            Arc::clone(store),
            config,
            &trigger,
            shutdown.clone(),
        ));
    }
    if handles.is_empty() {
        bail!("no token endpoints configured");
    }

    let stdin_trigger = trigger.clone();
    let stdin_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                () = stdin_shutdown.cancelled() => break,
                line = lines.next_line() => match line {
                    Ok(Some(_)) => {
                        debug!("Focus regained");
                        stdin_trigger.notify();
                    }
                    Ok(None) | Err(_) => break,
                },
            }
        }
    });

    info!("Watching {} token(s); press Enter to simulate focus, Ctrl-C to stop", handles.len());
    tokio::signal::ctrl_c().await?;
    shutdown.cancel();
    for handle in handles {
        handle.await?;
    }
    Ok(())
}
