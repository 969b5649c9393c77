use std::{sync::Arc, time::Duration};

use anyhow::Context;
use shared::domain::RestaurantDirectory;
use storage::DirectoryProvider;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, info, warn};

/// Loads the first snapshot. Startup fails if the directory cannot be read.
pub(crate) async fn load_initial(
    provider: &dyn DirectoryProvider,
) -> anyhow::Result<(Arc<RestaurantDirectory>, i64)> {
    let revision = provider
        .revision()
        .await
        .context("failed to read directory revision")?;
    let directory = provider
        .load_directory()
        .await
        .context("failed to load restaurant directory")?;
    info!(records = directory.len(), revision, "restaurant directory loaded");
    Ok((Arc::new(directory), revision))
}

/// Reloads the snapshot when the provider's revision moved past `last_seen`.
/// Returns whether a new snapshot was published.
pub(crate) async fn refresh_once(
    provider: &dyn DirectoryProvider,
    last_seen: &mut i64,
    sender: &watch::Sender<Arc<RestaurantDirectory>>,
) -> anyhow::Result<bool> {
    let revision = provider.revision().await?;
    if revision == *last_seen {
        return Ok(false);
    }

    let directory = provider.load_directory().await?;
    info!(
        records = directory.len(),
        previous_revision = *last_seen,
        revision,
        "restaurant directory changed"
    );
    sender.send_replace(Arc::new(directory));
    *last_seen = revision;
    Ok(true)
}

/// Polls the provider until every receiver is gone. A failed poll keeps the
/// previous snapshot in service.
pub(crate) fn spawn_refresh(
    provider: Arc<dyn DirectoryProvider>,
    every: Duration,
    mut last_seen: i64,
    sender: watch::Sender<Arc<RestaurantDirectory>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if sender.is_closed() {
                debug!("no directory subscribers left; stopping refresh");
                break;
            }
            if let Err(error) = refresh_once(provider.as_ref(), &mut last_seen, &sender).await {
                warn!(%error, revision = last_seen, "directory refresh failed; keeping previous snapshot");
            }
        }
    })
}

#[cfg(test)]
#[path = "tests/directory_tests.rs"]
mod tests;
