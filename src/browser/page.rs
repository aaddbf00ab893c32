//! The page capability the explorer drives.
//!
//! Every core component (extractor, proposer, filler, orchestrator) talks to
//! the browser only through [`ExplorerPage`]. [`super::chrome::ChromeDriver`]
//! implements it over CDP; tests implement it with scripted fakes.

use crate::browser::probe::MutationState;
use crate::error::Result;
use crate::snapshot::RawSnapshot;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// CSS selector for the control tag/role set.
pub const CONTROL_SELECTOR: &str = "button, a, input, textarea, select, [role]";

/// Controls plus anything exposing an expanded/collapsed state.
pub const CLICKABLE_SELECTOR: &str = "button, a, input, textarea, select, [role], [aria-expanded]";

/// Dialog-like containers: explicit role, modal flag, or conventional markers.
pub const DIALOG_SELECTOR: &str = r#"[role="dialog"], [role="alertdialog"], [aria-modal="true"], dialog[open], .modal, .dialog, [data-modal]"#;

/// Clickable descendants of a dialog container.
pub const DIALOG_CONTROL_SELECTOR: &str = r#"button, [role="button"], a"#;

/// Elements a fallback toggle may be chosen from.
pub const TOGGLE_SELECTOR: &str = r#"[aria-expanded], [role="menu"], [data-state]"#;

/// Text-capable form fields.
pub const INPUT_SELECTOR: &str = "input, textarea";

/// Which set of live elements to enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementQuery {
    /// Buttons, role-buttons and links inside the first dialog-like container
    DialogControls,
    /// Every element matching [`CLICKABLE_SELECTOR`]
    Clickables,
    /// Every element matching [`TOGGLE_SELECTOR`]
    Toggles,
    /// Every element matching [`INPUT_SELECTOR`]
    TextInputs,
}

impl ElementQuery {
    pub fn selector(&self) -> &'static str {
        match self {
            ElementQuery::DialogControls => DIALOG_CONTROL_SELECTOR,
            ElementQuery::Clickables => CLICKABLE_SELECTOR,
            ElementQuery::Toggles => TOGGLE_SELECTOR,
            ElementQuery::TextInputs => INPUT_SELECTOR,
        }
    }
}

/// What the page reports about one live element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ElementDescriptor {
    pub tag: String,
    pub role: Option<String>,
    pub text: String,
    pub label: Option<String>,
    pub class_name: String,
    pub input_type: Option<String>,
    pub width: f64,
    pub height: f64,
    /// False when hidden via `display` or `visibility` styling
    pub styled_visible: bool,
}

impl ElementDescriptor {
    /// Rendered box is at least `min` pixels in both dimensions.
    pub fn has_box(&self, min: f64) -> bool {
        self.width >= min && self.height >= min
    }

    /// Text and accessible label, lowercased, for keyword matching.
    pub fn match_text(&self) -> String {
        match &self.label {
            Some(label) if !label.is_empty() => {
                format!("{} {}", self.text, label).to_lowercase()
            }
            _ => self.text.to_lowercase(),
        }
    }

    /// Short human-readable name used in action labels and logs.
    pub fn display_name(&self) -> String {
        let text = self.text.trim();
        if !text.is_empty() {
            return text.chars().take(60).collect();
        }
        if let Some(label) = self.label.as_deref().filter(|l| !l.trim().is_empty()) {
            return label.trim().chars().take(60).collect();
        }
        self.tag.clone()
    }
}

/// A live element handle paired with its descriptor.
#[derive(Debug, Clone)]
pub struct ElementInfo<H> {
    pub handle: H,
    pub descriptor: ElementDescriptor,
}

/// Browser page operations needed by the explorer.
///
/// All calls are suspension points; callers issue them strictly in sequence.
#[async_trait]
pub trait ExplorerPage: Send + Sync {
    /// Live reference to an element in the current document.
    type Handle: Clone + Send + Sync;

    /// Navigate and wait for basic document readiness.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Install the mutation probe for the current and all future documents.
    async fn install_mutation_probe(&self) -> Result<()>;

    /// Poll the probe's counters.
    async fn mutation_state(&self) -> Result<MutationState>;

    /// Raw control and dialog records in document order.
    async fn raw_snapshot(&self) -> Result<RawSnapshot>;

    /// Enumerate live elements in document order.
    async fn query(&self, query: ElementQuery) -> Result<Vec<ElementInfo<Self::Handle>>>;

    async fn click(&self, handle: &Self::Handle) -> Result<()>;

    /// Set a form field's value and fire `input`/`change`.
    async fn set_value(&self, handle: &Self::Handle, value: &str) -> Result<()>;

    /// Full-page PNG.
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Serialized rendered markup.
    async fn content(&self) -> Result<String>;

    async fn url(&self) -> Result<String>;
}
