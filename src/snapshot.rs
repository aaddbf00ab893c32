//! Snapshot extraction.
//!
//! A [`Snapshot`] describes the visible interactive controls and the
//! dialog-like containers of a page at one instant. The page reports raw
//! records through [`extract_script`]; [`Snapshot::from_raw`] applies the
//! visibility filter, the node cap and text truncation.

use crate::browser::page::{ExplorerPage, CONTROL_SELECTOR, DIALOG_SELECTOR};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Maximum number of node records kept per snapshot.
pub const MAX_NODES: usize = 400;

/// Maximum characters of visible text kept per node.
pub const NODE_TEXT_LIMIT: usize = 120;

/// Maximum characters of visible text kept per dialog.
pub const DIALOG_TEXT_LIMIT: usize = 200;

/// Extraction script template; selectors are substituted by [`extract_script`].
const EXTRACT_TEMPLATE: &str = r#"
(() => {
    const text = (el) => ((el.innerText || el.value || '') + '').trim().slice(0, 400);
    const attr = (el, name) => el.getAttribute(name);
    const nodes = [];
    for (const el of document.querySelectorAll(__CONTROLS__)) {
        const r = el.getBoundingClientRect();
        const cs = window.getComputedStyle(el);
        nodes.push({
            tag: el.tagName.toLowerCase(),
            role: attr(el, 'role'),
            id: el.id || null,
            className: (typeof el.className === 'string' ? el.className : attr(el, 'class')) || null,
            name: attr(el, 'name'),
            type: attr(el, 'type'),
            label: attr(el, 'aria-label') || attr(el, 'title') || attr(el, 'placeholder'),
            text: text(el),
            x: r.x, y: r.y, width: r.width, height: r.height,
            styledVisible: cs.visibility !== 'hidden' && cs.display !== 'none'
        });
    }
    const dialogs = [];
    for (const el of document.querySelectorAll(__DIALOGS__)) {
        dialogs.push({
            tag: el.tagName.toLowerCase(),
            id: el.id || null,
            className: (typeof el.className === 'string' ? el.className : attr(el, 'class')) || null,
            text: text(el)
        });
    }
    return { title: document.title || '', nodes, dialogs };
})()
"#;

/// Script collecting raw control and dialog records in document order.
///
/// Uses the same selectors as the proposer's element queries. Text is
/// pre-sliced only to bound the payload; the exact limits are applied on the
/// Rust side.
pub fn extract_script() -> String {
    EXTRACT_TEMPLATE
        .replace("__CONTROLS__", &js_string(CONTROL_SELECTOR))
        .replace("__DIALOGS__", &js_string(DIALOG_SELECTOR))
}

/// Quote a value as a JavaScript string literal.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Bounding box in CSS pixels, viewport-relative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One visible interactive control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "class", skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub text: String,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

/// One dialog-like container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogRecord {
    pub tag: String,
    pub id: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub text: String,
}

/// Structured summary of the page at one instant. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub nodes: Vec<NodeRecord>,
    pub dialogs: Vec<DialogRecord>,
    pub title: String,
}

/// Control record exactly as the page reports it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawNode {
    pub tag: String,
    pub role: Option<String>,
    pub id: Option<String>,
    pub class_name: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub input_type: Option<String>,
    pub label: Option<String>,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub styled_visible: bool,
}

impl RawNode {
    fn is_visible(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.styled_visible
    }
}

/// Dialog record exactly as the page reports it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawDialog {
    pub tag: String,
    pub id: Option<String>,
    pub class_name: Option<String>,
    pub text: String,
}

/// Output of [`extract_script`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSnapshot {
    pub title: String,
    pub nodes: Vec<RawNode>,
    pub dialogs: Vec<RawDialog>,
}

impl Snapshot {
    /// Keep visible controls (first [`MAX_NODES`] in document order) and
    /// every dialog, truncating their text.
    pub fn from_raw(raw: RawSnapshot) -> Self {
        let nodes = raw
            .nodes
            .into_iter()
            .filter(RawNode::is_visible)
            .take(MAX_NODES)
            .map(|n| NodeRecord {
                tag: n.tag,
                role: non_empty(n.role),
                id: non_empty(n.id),
                class_name: non_empty(n.class_name),
                name: non_empty(n.name),
                input_type: non_empty(n.input_type),
                label: non_empty(n.label),
                text: truncate_chars(&n.text, NODE_TEXT_LIMIT),
                bbox: BoundingBox {
                    x: n.x,
                    y: n.y,
                    width: n.width,
                    height: n.height,
                },
            })
            .collect();

        let dialogs = raw
            .dialogs
            .into_iter()
            .map(|d| DialogRecord {
                tag: d.tag,
                id: non_empty(d.id),
                class_name: non_empty(d.class_name),
                text: truncate_chars(&d.text, DIALOG_TEXT_LIMIT),
            })
            .collect();

        Self {
            nodes,
            dialogs,
            title: raw.title,
        }
    }

    pub fn has_dialogs(&self) -> bool {
        !self.dialogs.is_empty()
    }
}

/// Extract a snapshot from the live page.
///
/// Fails with [`crate::ExplorerError::PageUnavailable`] when the page cannot
/// be reached.
pub async fn extract<P: ExplorerPage + ?Sized>(page: &P) -> Result<Snapshot> {
    let raw = page.raw_snapshot().await?;
    let snapshot = Snapshot::from_raw(raw);
    log::debug!(
        "Snapshot: {} nodes, {} dialogs, title {:?}",
        snapshot.nodes.len(),
        snapshot.dialogs.len(),
        snapshot.title
    );
    Ok(snapshot)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Truncate to at most `limit` characters, respecting char boundaries.
pub(crate) fn truncate_chars(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
