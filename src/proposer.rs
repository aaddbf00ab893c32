//! Next-action selection.
//!
//! Candidates are scored with a keyword heuristic: affirmative verbs and
//! caller hints add points, destructive keywords veto outright unless the run
//! allows them. Open dialogs always win over the rest of the page.

use crate::browser::page::{ElementDescriptor, ElementInfo, ElementQuery, ExplorerPage};
use crate::error::Result;
use crate::snapshot::{self, Snapshot};
use std::collections::BTreeSet;
use std::fmt;

/// Verbs suggesting a control moves a task forward.
pub const AFFIRMATIVE_VERBS: &[&str] = &[
    "create", "new", "add", "filter", "edit", "settings", "save", "submit", "next", "continue",
    "done", "apply",
];

/// Label fragments presumed to mean an irreversible action.
pub const DESTRUCTIVE_KEYWORDS: &[&str] = &["delete", "remove", "archive", "reset"];

/// Class-list fragments marking a primary / call-to-action control.
pub const PRIMARY_CLASS_MARKERS: &[&str] = &["primary", "cta", "confirm", "submit"];

/// Minimum rendered width and height for a page-level candidate.
pub const MIN_CANDIDATE_BOX: f64 = 2.0;

const VERB_POINTS: i32 = 2;
const HINT_POINTS: i32 = 3;
const VETO: i32 = -1;

/// Keyword sets the scorer matches against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    pub affirmative: Vec<String>,
    pub destructive: Vec<String>,
    pub primary_class_markers: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        let owned = |words: &[&str]| words.iter().map(|w| w.to_string()).collect();
        Self {
            affirmative: owned(AFFIRMATIVE_VERBS),
            destructive: owned(DESTRUCTIVE_KEYWORDS),
            primary_class_markers: owned(PRIMARY_CLASS_MARKERS),
        }
    }
}

/// Per-run scoring inputs.
#[derive(Debug, Clone, Default)]
pub struct ScoringPolicy {
    pub allow_destructive: bool,
    pub hints: BTreeSet<String>,
    pub vocabulary: Vocabulary,
}

impl ScoringPolicy {
    pub fn new(allow_destructive: bool, hints: BTreeSet<String>) -> Self {
        Self {
            allow_destructive,
            hints,
            vocabulary: Vocabulary::default(),
        }
    }
}

/// Score a candidate. Returns exactly `-1` for a vetoed destructive control.
///
/// Matching is plain substring containment on lowercased text.
pub fn score(candidate: &ElementDescriptor, policy: &ScoringPolicy) -> i32 {
    let text = candidate.match_text();
    let vocab = &policy.vocabulary;

    if !policy.allow_destructive && vocab.destructive.iter().any(|k| text.contains(k.as_str())) {
        return VETO;
    }

    let mut total = 0;
    total += VERB_POINTS
        * vocab
            .affirmative
            .iter()
            .filter(|v| text.contains(v.as_str()))
            .count() as i32;
    total += HINT_POINTS
        * policy
            .hints
            .iter()
            .filter(|h| !h.is_empty() && text.contains(h.as_str()))
            .count() as i32;

    if is_button(candidate) {
        total += 1;
    }

    let class = candidate.class_name.to_lowercase();
    if vocab
        .primary_class_markers
        .iter()
        .any(|m| class.contains(m.as_str()))
    {
        total += 1;
    }

    total
}

fn is_button(candidate: &ElementDescriptor) -> bool {
    candidate.tag.eq_ignore_ascii_case("button")
        || candidate
            .role
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case("button"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Click,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Click => "click",
        }
    }
}

/// Why a candidate was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceReason {
    /// Best positive score (inside a dialog or on the page)
    VerbMatch,
    /// First control of an open dialog, taken although nothing scored
    ForcedDialog,
    /// First toggle/menu element, taken regardless of score
    FallbackMenu,
}

impl ChoiceReason {
    pub fn tag(&self) -> &'static str {
        match self {
            ChoiceReason::VerbMatch => "verb",
            ChoiceReason::ForcedDialog => "dialog-forced",
            ChoiceReason::FallbackMenu => "fallback-menu",
        }
    }
}

/// A single proposed interaction. Lives for one orchestrator iteration.
#[derive(Debug, Clone)]
pub struct Action<H> {
    pub kind: ActionKind,
    pub handle: H,
    pub reason: ChoiceReason,
    pub score: i32,
    /// Human-readable tag, e.g. `verb:Create Project`
    pub label: String,
}

impl<H> Action<H> {
    fn new(handle: H, descriptor: &ElementDescriptor, reason: ChoiceReason, score: i32) -> Self {
        Self {
            kind: ActionKind::Click,
            handle,
            reason,
            score,
            label: format!("{}:{}", reason.tag(), descriptor.display_name()),
        }
    }
}

impl<H> fmt::Display for Action<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} (score {})", self.kind.as_str(), self.label, self.score)
    }
}

/// Chooses at most one next action per call.
#[derive(Debug, Clone, Default)]
pub struct Proposer {
    policy: ScoringPolicy,
}

impl Proposer {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    /// Extract a fresh snapshot and propose from it.
    pub async fn propose<P: ExplorerPage + ?Sized>(
        &self,
        page: &P,
    ) -> Result<Option<Action<P::Handle>>> {
        let snapshot = snapshot::extract(page).await?;
        self.propose_with(page, &snapshot).await
    }

    /// Propose using an already extracted snapshot for the dialog check.
    ///
    /// `None` means there is nothing left worth clicking.
    pub async fn propose_with<P: ExplorerPage + ?Sized>(
        &self,
        page: &P,
        snapshot: &Snapshot,
    ) -> Result<Option<Action<P::Handle>>> {
        if snapshot.has_dialogs() {
            let controls = page.query(ElementQuery::DialogControls).await?;
            if let Some(action) = self.choose_in_dialog(controls) {
                log::debug!("Dialog choice: {}", action);
                return Ok(Some(action));
            }
        }

        let clickables = page.query(ElementQuery::Clickables).await?;
        if let Some(action) = self.choose_best(clickables) {
            log::debug!("Page choice: {}", action);
            return Ok(Some(action));
        }

        let toggles = page.query(ElementQuery::Toggles).await?;
        let fallback = toggles
            .into_iter()
            .next()
            .map(|t| Action::new(t.handle, &t.descriptor, ChoiceReason::FallbackMenu, 0));
        if let Some(action) = &fallback {
            log::debug!("Fallback choice: {}", action);
        }
        Ok(fallback)
    }

    /// First positively scoring dialog control, else the first control at all.
    pub fn choose_in_dialog<H>(&self, controls: Vec<ElementInfo<H>>) -> Option<Action<H>> {
        let mut first = None;
        for control in controls {
            // Dialog controls are scored as buttons whatever their markup says
            let mut synthetic = control.descriptor.clone();
            synthetic.role = Some("button".to_string());
            let s = score(&synthetic, &self.policy);
            if s > 0 {
                return Some(Action::new(
                    control.handle,
                    &control.descriptor,
                    ChoiceReason::VerbMatch,
                    s,
                ));
            }
            if first.is_none() {
                first = Some((control, s));
            }
        }
        first.map(|(c, s)| Action::new(c.handle, &c.descriptor, ChoiceReason::ForcedDialog, s))
    }

    /// Highest positive score among visible candidates; ties go to the first seen.
    pub fn choose_best<H>(&self, candidates: Vec<ElementInfo<H>>) -> Option<Action<H>> {
        let mut best: Option<(ElementInfo<H>, i32)> = None;
        for candidate in candidates {
            let d = &candidate.descriptor;
            if !d.styled_visible || !d.has_box(MIN_CANDIDATE_BOX) {
                continue;
            }
            let s = score(d, &self.policy);
            if best.as_ref().map_or(true, |(_, top)| s > *top) {
                best = Some((candidate, s));
            }
        }
        best.filter(|(_, s)| *s > 0)
            .map(|(c, s)| Action::new(c.handle, &c.descriptor, ChoiceReason::VerbMatch, s))
    }
}
