//! Run configuration for an exploration session.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// Everything the explorer needs to know about a single run.
///
/// Process launch and argument parsing live in the binary; this struct is the
/// resolved form handed to the library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Start location (already normalized, see [`normalize_url`])
    pub start_url: String,

    /// Free-text description of what the run is exploring
    pub task: String,

    /// Maximum number of proposal iterations
    pub max_steps: usize,

    /// Whether controls matching the destructive vocabulary may be chosen
    pub allow_destructive: bool,

    /// Optional hold after the first navigation (manual login etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold: Option<Duration>,

    /// Lowercased hint keywords that boost matching controls
    #[serde(default)]
    pub hints: BTreeSet<String>,

    /// Root directory for run and step artifacts
    pub output_dir: PathBuf,

    /// Optional `{cookies: [...]}` document imported before and exported after the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_file: Option<PathBuf>,

    /// Upper bound on a single click
    pub click_timeout: Duration,

    /// Fixed wait after every action
    pub settle_delay: Duration,

    /// A mutation spike newer than this counts as "still rendering"
    pub spike_window: Duration,

    /// Extra wait applied once when a recent spike is observed
    pub spike_extra_delay: Duration,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            start_url: "about:blank".to_string(),
            task: String::new(),
            max_steps: 25,
            allow_destructive: false,
            hold: None,
            hints: BTreeSet::new(),
            output_dir: PathBuf::from("./explorer-run"),
            session_file: None,
            click_timeout: Duration::from_secs(4),
            settle_delay: Duration::from_millis(600),
            spike_window: Duration::from_millis(1500),
            spike_extra_delay: Duration::from_millis(800),
        }
    }
}

/// Parse a comma-separated hint list into lowercased, trimmed keywords.
///
/// Empty entries are dropped, so `"a,,b, "` yields `{a, b}`.
pub fn parse_hints(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(|h| h.trim().to_lowercase())
        .filter(|h| !h.is_empty())
        .collect()
}

/// Add `https://` when the location carries no scheme.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://")
        || url.starts_with("https://")
        || url.starts_with("file://")
        || url.starts_with("about:")
        || url.starts_with("data:")
    {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}
