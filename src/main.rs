use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveTime, Utc};
use chrono_tz::Tz;
use tokio::net::TcpListener;
use tracing::info;

use slotd::alloc::{Allocator, DEFAULT_CAPACITY, DEFAULT_QUOTA_LIMIT};
use slotd::http::{self, AppState};
use slotd::{observability, reset, schedule};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("SLOTD_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    observability::init(metrics_port);

    let port = std::env::var("SLOTD_PORT").unwrap_or_else(|_| "5000".into());
    let bind = std::env::var("SLOTD_BIND").unwrap_or_else(|_| "127.0.0.1".into());
    let tz_name = std::env::var("SLOTD_TZ").unwrap_or_else(|_| "Europe/Berlin".into());
    let day_start = std::env::var("SLOTD_DAY_START").unwrap_or_else(|_| "08:00".into());
    let day_end = std::env::var("SLOTD_DAY_END").unwrap_or_else(|_| "18:00".into());
    let slot_minutes: i64 = std::env::var("SLOTD_SLOT_MINUTES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(2);
    let capacity: u32 = std::env::var("SLOTD_CAPACITY")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_CAPACITY);
    let quota_limit: u32 = std::env::var("SLOTD_QUOTA_LIMIT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_QUOTA_LIMIT);
    let reset_minutes: u64 = std::env::var("SLOTD_RESET_MINUTES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(60);

    // A malformed schedule is a configuration error: fail at startup,
    // never per-request.
    let tz: Tz = tz_name
        .parse()
        .map_err(|_| format!("invalid SLOTD_TZ: {tz_name}"))?;
    let day_start = NaiveTime::parse_from_str(&day_start, "%H:%M")
        .map_err(|e| format!("invalid SLOTD_DAY_START: {e}"))?;
    let day_end = NaiveTime::parse_from_str(&day_end, "%H:%M")
        .map_err(|e| format!("invalid SLOTD_DAY_END: {e}"))?;
    if day_start >= day_end {
        return Err("day window start must precede its end".into());
    }
    if slot_minutes <= 0 {
        return Err("slot duration must be positive".into());
    }

    let today = Utc::now().with_timezone(&tz).date_naive();
    let (window_start, window_end) = schedule::local_day_window(tz, today, day_start, day_end)
        .ok_or("day window boundary does not exist in local time")?;
    let slots = schedule::generate(window_start, window_end, slot_minutes * 60_000);

    let allocator = Arc::new(Allocator::new(slots, capacity, quota_limit));
    let reset_handle = reset::spawn(
        allocator.clone(),
        Duration::from_secs(reset_minutes * 60),
    );

    let app = http::router(AppState {
        allocator: allocator.clone(),
        tz,
    });

    let addr = format!("{bind}:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("slotd listening on {addr}");
    info!("  timezone: {tz}");
    info!(
        "  schedule: {} slots of {slot_minutes}m covering {day_start}-{day_end}",
        allocator.slots().len()
    );
    info!("  capacity: {capacity} per slot, quota: {quota_limit} attempts per {reset_minutes}m");
    info!(
        "  metrics: {}",
        metrics_port.map_or("disabled".to_string(), |p| format!(
            "http://0.0.0.0:{p}/metrics"
        ))
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The reset loop must acknowledge cancellation before process exit.
    info!("http server stopped, stopping quota reset loop");
    reset_handle.stop().await;
    info!("slotd stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}
