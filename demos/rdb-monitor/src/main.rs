//! Watches a runtime-database key pattern and prints every change.
//!
//! ```text
//! MULINK_URL=ws://127.0.0.1:5701 \
//! MULINK_PATTERN='/system/backends/*/connected' \
//!     cargo run -p rdb-monitor
//! ```

use mulink::DEFAULT_URL;
use mulink::prelude::*;

const DEFAULT_PATTERN: &str = "/system/backends/*/connected";

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Renders a watched value for display. The kind is not on the wire, so
/// try the kinds monitored keys usually hold.
fn render(value: &TypedValue) -> String {
    match value.payload().len() {
        0 => "<empty>".to_string(),
        1 => value
            .decode(Kind::Bool)
            .map(|v| v.to_string())
            .unwrap_or_else(|e| e.to_string()),
        8 => value
            .decode(Kind::F64)
            .map(|v| v.to_string())
            .unwrap_or_else(|e| e.to_string()),
        _ => value
            .decode(Kind::Str512)
            .map(|v| v.to_string())
            .unwrap_or_else(|e| e.to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    mulink::telemetry::init();

    let url = env_or("MULINK_URL", DEFAULT_URL);
    let pattern = env_or("MULINK_PATTERN", DEFAULT_PATTERN);

    let mx = Mulink::builder().url(url.as_str()).connect().await?;
    mx.client()
        .on_connection_change(|open| {
            tracing::info!(open, "connection changed");
        })
        .await?;

    let experiment = mx.experiment_name().await?;
    println!("connected to {url} (experiment {experiment})");

    let rdb = mx.rdb();
    for key in rdb.list_subkeys(&pattern).await? {
        let value = rdb.read(&key).await?;
        println!("{key} = {}", render(&value));
    }

    rdb.watch(&pattern, |key, value| {
        println!("{key} -> {}", render(&value));
    })
    .await?;
    println!("watching {pattern}, ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    rdb.unwatch(&pattern).await?;
    mx.close().await?;
    Ok(())
}
