//! Digest composition: one chapter per recently processed episode.
//!
//! Read-only over the store; composing a digest never mutates state.

use crate::domain::Chapter;
use crate::store::StateStore;

/// Placeholder body for episodes without a cached transcript.
const NO_TRANSCRIPT: &str = "(no transcript cached)";

/// Collect episodes from jobs created within the window and turn each
/// into a chapter, optionally restricted to one feed.
pub fn build_digest(store: &StateStore, days: i64, feed_name: Option<&str>) -> Vec<Chapter> {
    store
        .list_recent(days, feed_name)
        .into_iter()
        .map(|episode| {
            let title = if !episode.title.is_empty() {
                episode.title.clone()
            } else if !episode.slug.is_empty() {
                episode.slug.clone()
            } else {
                "Episode".to_string()
            };

            let text = episode
                .transcript
                .clone()
                .unwrap_or_else(|| NO_TRANSCRIPT.to_string());

            Chapter::new(title, text)
        })
        .collect()
}
