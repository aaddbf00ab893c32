//! Snapshot fingerprints for change detection.

use crate::snapshot::{NodeRecord, Snapshot};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Nodes beyond this index do not contribute to the fingerprint.
pub const FINGERPRINT_NODES: usize = 100;

/// Hex SHA-256 digest of a snapshot's canonical form.
///
/// Only meaningful for "did the UI change" comparisons; it says nothing about
/// element identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical string: the title, then `role|name` per node in document order.
pub fn canonical_form(snapshot: &Snapshot) -> String {
    let mut out = snapshot.title.clone();
    for node in snapshot.nodes.iter().take(FINGERPRINT_NODES) {
        out.push('\n');
        out.push_str(node.role.as_deref().unwrap_or(""));
        out.push('|');
        out.push_str(node_key(node));
    }
    out
}

/// First non-empty of text, label, id, class list.
fn node_key(node: &NodeRecord) -> &str {
    if !node.text.is_empty() {
        return &node.text;
    }
    [&node.label, &node.id, &node.class_name]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .find(|s| !s.is_empty())
        .unwrap_or("")
}

pub fn fingerprint(snapshot: &Snapshot) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(canonical_form(snapshot).as_bytes());
    Fingerprint(format!("{:x}", hasher.finalize()))
}
