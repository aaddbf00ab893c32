//! In-page DOM mutation probe.
//!
//! A `MutationObserver` installed in the page counts added and removed nodes
//! and stamps the time of the last "spike" (a single observation batch with
//! at least [`SPIKE_THRESHOLD`] combined changes). The explorer only ever polls
//! it; a fresh document load resets the counters.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Combined added + removed nodes in one batch that count as a spike.
pub const SPIKE_THRESHOLD: u32 = 30;

/// Name of the global the probe publishes to.
pub const PROBE_GLOBAL: &str = "__uiExplorerMutations";

/// Script installing the probe. Safe to evaluate more than once per document.
pub const PROBE_SCRIPT: &str = r#"
(() => {
    if (window.__uiExplorerMutations) return true;
    const state = { addedCount: 0, removedCount: 0, lastSpikeTimestamp: 0 };
    window.__uiExplorerMutations = state;
    const start = () => {
        const root = document.documentElement || document;
        new MutationObserver((records) => {
            let added = 0;
            let removed = 0;
            for (const r of records) {
                added += r.addedNodes.length;
                removed += r.removedNodes.length;
            }
            state.addedCount += added;
            state.removedCount += removed;
            if (added + removed >= 30) state.lastSpikeTimestamp = Date.now();
        }).observe(root, { childList: true, subtree: true });
    };
    if (document.documentElement) start();
    else document.addEventListener('DOMContentLoaded', start, { once: true });
    return true;
})()
"#;

/// Script reading the probe. Yields `null` when it is not installed.
pub const PROBE_READ_SCRIPT: &str =
    "(() => { const s = window.__uiExplorerMutations; return s ? { addedCount: s.addedCount, removedCount: s.removedCount, lastSpikeTimestamp: s.lastSpikeTimestamp, now: Date.now() } : null; })()";

/// Counters published by the probe, as seen at poll time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MutationState {
    pub added_count: u64,
    pub removed_count: u64,
    /// Page clock (epoch ms) of the latest spike, 0 when none yet
    pub last_spike_timestamp: f64,
    /// Page clock (epoch ms) when the state was read
    pub now: f64,
}

impl MutationState {
    /// Time since the last spike, measured on the page's own clock.
    pub fn since_last_spike(&self) -> Option<Duration> {
        if self.last_spike_timestamp <= 0.0 {
            return None;
        }
        let elapsed = (self.now - self.last_spike_timestamp).max(0.0);
        Some(Duration::from_millis(elapsed as u64))
    }

    /// Whether a spike happened within `window` of the poll.
    pub fn spiked_within(&self, window: Duration) -> bool {
        self.since_last_spike().is_some_and(|d| d <= window)
    }
}
