//! Subcommand bodies.

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use uplink_receiver::UploadReceiver;
use uplink_transfer::{DirStore, TokioStack, send_file};

use crate::config::Config;

/// Uploads `file` from the outbox directory.
pub async fn send(config: &Config, file: &str) -> anyhow::Result<()> {
    let store = DirStore::new(&config.outbox);
    let mut stack = TokioStack::new(config.upload.send_buffer_len);

    let summary = send_file(&mut stack, &store, &config.upload, file)
        .await
        .with_context(|| format!("uploading {file} to {}", config.upload.server))?;

    let trail: Vec<String> = summary.trail.iter().map(ToString::to_string).collect();
    tracing::info!(
        file = %summary.filename,
        bytes = summary.sent_len,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        trail = %trail.join(" -> "),
        "delivered"
    );
    Ok(())
}

/// Receives uploads into the inbox directory until Ctrl-C.
pub async fn receive(config: &Config) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let receiver = UploadReceiver::new(
        config.inbox.clone(),
        config.upload.naming.clone(),
        cancel.clone(),
    );
    let listener = receiver
        .listen(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("SIGINT received, shutting down");
        }
        cancel.cancel();
    });

    receiver.serve(listener).await?;
    Ok(())
}
