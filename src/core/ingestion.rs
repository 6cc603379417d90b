//! Episode discovery across configured feeds with ledger-backed dedup.
//!
//! Entries already recorded in the seen ledger are skipped; accepted
//! entries are marked seen immediately so a duplicate appearing later in
//! the same sweep (e.g. from two providers) is also excluded.

use tracing::{info, instrument, warn};

use crate::adapters::FeedSource;
use crate::config::JobConfig;
use crate::domain::Episode;
use crate::store::StateStore;

use super::JobError;

/// Sweep all configured feeds and return episodes the ledger has not
/// seen. A failing feed is logged and skipped; the sweep continues.
#[instrument(skip_all)]
pub async fn discover_new_episodes(
    config: &JobConfig,
    store: &mut StateStore,
    source: &dyn FeedSource,
) -> Result<Vec<Episode>, JobError> {
    let mut episodes = Vec::new();

    for feed in &config.feeds {
        let name = feed.display_name();

        let entries = match source.fetch(feed).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(feed = %name, error = %err, "feed fetch failed, skipping");
                continue;
            }
        };

        let mut accepted = 0usize;
        for entry in entries {
            // Dedup key: feed-provided guid, else the entry link.
            let key = entry
                .guid
                .clone()
                .filter(|g| !g.is_empty())
                .or_else(|| entry.link.clone().filter(|l| !l.is_empty()));

            if store.has_seen(&name, key.as_deref()) {
                continue;
            }

            // No enclosure and no link means nothing to download; drop silently.
            let Some(media_url) = entry
                .enclosure_url
                .clone()
                .filter(|u| !u.is_empty())
                .or_else(|| entry.link.clone().filter(|l| !l.is_empty()))
            else {
                continue;
            };

            let title = entry
                .title
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Episode".to_string());

            episodes.push(Episode::new(&name, title, media_url, key.clone()));
            store.mark_seen(&name, key.as_deref()).await?;
            accepted += 1;
        }

        info!(feed = %name, new_episodes = accepted, "feed swept");
    }

    Ok(episodes)
}
