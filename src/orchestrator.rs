//! Capture orchestration.
//!
//! One run navigates to the start location, captures an initial step, then
//! repeats propose → before capture → click → settle → after capture → fill →
//! post-fill capture until nothing is proposed or the step budget is spent.
//! Everything happens sequentially on a single page.

use crate::browser::page::ExplorerPage;
use crate::config::ExplorerConfig;
use crate::error::{ExplorerError, Result};
use crate::filler;
use crate::fingerprint::{fingerprint, Fingerprint};
use crate::proposer::{Action, Proposer, ScoringPolicy};
use crate::snapshot;
use crate::store::{
    ActionPhase, ActionRecord, RunMetadata, RunSettings, StepArtifacts, StepLocation, StepMeta,
    StepStore,
};

/// Action type recorded for the post-fill step.
pub const AUTOFILL_ACTION: &str = "autofill";

/// Result of a single [`capture`] call.
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    /// True when the page matched the previous fingerprint and nothing was written
    pub skipped: bool,
    pub fingerprint: Fingerprint,
    pub step: Option<StepLocation>,
}

/// Snapshot the page and persist a step unless it matches `last`.
///
/// A skipped capture writes nothing and consumes no step ordinal.
pub async fn capture<P: ExplorerPage + ?Sized>(
    page: &P,
    store: &StepStore,
    reason: &str,
    last: Option<&Fingerprint>,
) -> Result<CaptureOutcome> {
    let snapshot = snapshot::extract(page).await?;
    let fp = fingerprint(&snapshot);

    if last == Some(&fp) {
        log::debug!("Capture {} skipped, UI unchanged ({})", reason, fp);
        return Ok(CaptureOutcome {
            skipped: true,
            fingerprint: fp,
            step: None,
        });
    }

    let screenshot = page.screenshot().await?;
    let html = page.content().await?;
    let url = page.url().await?;

    let meta = StepMeta {
        reason: reason.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        fingerprint: fp.clone(),
        url,
        title: snapshot.title.clone(),
    };
    let step = store
        .write_step(StepArtifacts {
            screenshot: &screenshot,
            html: &html,
            snapshot: &snapshot,
            meta: &meta,
        })
        .await?;

    Ok(CaptureOutcome {
        skipped: false,
        fingerprint: fp,
        step: Some(step),
    })
}

/// Why a run ended. Both are normal endings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    NoProposal,
    BudgetExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub steps_written: usize,
    pub iterations: usize,
    pub skipped_captures: usize,
    pub failed_iterations: usize,
    pub stop_reason: StopReason,
}

impl RunSummary {
    fn new() -> Self {
        Self {
            steps_written: 0,
            iterations: 0,
            skipped_captures: 0,
            failed_iterations: 0,
            stop_reason: StopReason::BudgetExhausted,
        }
    }
}

/// Drives one exploration run over a page.
pub struct Explorer<'a, P: ExplorerPage + ?Sized> {
    page: &'a P,
    store: StepStore,
    proposer: Proposer,
    config: ExplorerConfig,
}

impl<'a, P: ExplorerPage + ?Sized> Explorer<'a, P> {
    pub fn new(page: &'a P, store: StepStore, config: ExplorerConfig) -> Self {
        let proposer = Proposer::new(ScoringPolicy::new(
            config.allow_destructive,
            config.hints.clone(),
        ));
        Self {
            page,
            store,
            proposer,
            config,
        }
    }

    /// Replace the proposer, e.g. to use a different vocabulary.
    pub fn with_proposer(mut self, proposer: Proposer) -> Self {
        self.proposer = proposer;
        self
    }

    /// Run until nothing is proposed or the step budget is exhausted.
    ///
    /// Only setup (run metadata, navigation, initial capture) can fail the
    /// run; faults inside an iteration abandon that iteration and the loop
    /// moves on.
    pub async fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::new();

        self.store
            .write_run_metadata(&RunMetadata {
                task: self.config.task.clone(),
                start_url: self.config.start_url.clone(),
                created_at: chrono::Utc::now().to_rfc3339(),
                settings: RunSettings {
                    max_steps: self.config.max_steps,
                    allow_destructive: self.config.allow_destructive,
                },
            })
            .await?;

        // INIT
        if let Err(e) = self.page.install_mutation_probe().await {
            log::warn!("Mutation probe unavailable, settling without it: {}", e);
        }
        self.page.navigate(&self.config.start_url).await?;
        if let Some(hold) = self.config.hold {
            log::info!("⏸️  Holding {:?} for manual setup", hold);
            tokio::time::sleep(hold).await;
        }
        let initial = self.capture_counted("initial", None, &mut summary).await?;
        let mut last = initial.fingerprint;

        // ITERATE
        for iteration in 1..=self.config.max_steps {
            summary.iterations = iteration;

            let action = match self.proposer.propose(self.page).await {
                Ok(Some(action)) => action,
                Ok(None) => {
                    log::info!("No further action proposed, stopping");
                    summary.stop_reason = StopReason::NoProposal;
                    return Ok(summary);
                }
                Err(e) => {
                    log::warn!("Iteration {}: proposal failed: {}", iteration, e);
                    summary.failed_iterations += 1;
                    continue;
                }
            };

            log::info!("▶️  Iteration {}/{}: {}", iteration, self.config.max_steps, action);
            match self.iterate(&action, &last, &mut summary).await {
                Ok(Some(fp)) => last = fp,
                Ok(None) => {}
                Err(e) => {
                    log::warn!("Iteration {} abandoned: {}", iteration, e);
                    summary.failed_iterations += 1;
                }
            }
        }

        // TERMINATE
        log::info!("Step budget of {} exhausted", self.config.max_steps);
        summary.stop_reason = StopReason::BudgetExhausted;
        Ok(summary)
    }

    /// One BEFORE → ACT → SETTLE → AFTER → FILL → POST-FILL cycle.
    ///
    /// Every capture is compared against `last`. Returns the new last-known
    /// fingerprint, which is only set by a post-fill capture that was written.
    async fn iterate(
        &self,
        action: &Action<P::Handle>,
        last: &Fingerprint,
        summary: &mut RunSummary,
    ) -> Result<Option<Fingerprint>> {
        let click_record = |phase| ActionRecord {
            action_type: action.kind.as_str().to_string(),
            label: action.label.clone(),
            phase,
        };

        // BEFORE
        let before = self
            .capture_counted(&format!("before:{}", action.label), Some(last), summary)
            .await?;
        self.record(&before, &click_record(ActionPhase::Before))
            .await?;

        // ACT
        tokio::time::timeout(self.config.click_timeout, self.page.click(&action.handle))
            .await
            .map_err(|_| {
                ExplorerError::Timeout(self.config.click_timeout, format!("click {}", action.label))
            })??;

        // SETTLE
        self.settle().await;

        // AFTER-PREFILL
        let after = self
            .capture_counted(&format!("after:{}", action.label), Some(last), summary)
            .await?;
        self.record(&after, &click_record(ActionPhase::AfterPreFill))
            .await?;

        // FILL
        filler::fill(self.page).await?;

        // AFTER-POSTFILL
        let post = self
            .capture_counted(
                &format!("after:{}:postFill", action.label),
                Some(last),
                summary,
            )
            .await?;
        self.record(
            &post,
            &ActionRecord {
                action_type: AUTOFILL_ACTION.to_string(),
                label: AUTOFILL_ACTION.to_string(),
                phase: ActionPhase::AfterPostFill,
            },
        )
        .await?;

        Ok((!post.skipped).then_some(post.fingerprint))
    }

    /// Fixed post-action wait, plus one extra wait if the page is mid-render.
    async fn settle(&self) {
        tokio::time::sleep(self.config.settle_delay).await;
        match self.page.mutation_state().await {
            Ok(state) if state.spiked_within(self.config.spike_window) => {
                log::debug!(
                    "Mutation spike {:?} ago, waiting {:?} more",
                    state.since_last_spike(),
                    self.config.spike_extra_delay
                );
                tokio::time::sleep(self.config.spike_extra_delay).await;
            }
            Ok(_) => {}
            Err(e) => log::debug!("Mutation probe read failed: {}", e),
        }
    }

    async fn capture_counted(
        &self,
        reason: &str,
        last: Option<&Fingerprint>,
        summary: &mut RunSummary,
    ) -> Result<CaptureOutcome> {
        let outcome = capture(self.page, &self.store, reason, last).await?;
        if outcome.skipped {
            summary.skipped_captures += 1;
        } else {
            summary.steps_written += 1;
        }
        Ok(outcome)
    }

    async fn record(&self, outcome: &CaptureOutcome, record: &ActionRecord) -> Result<()> {
        match &outcome.step {
            Some(step) => self.store.write_action(step, record).await,
            None => Ok(()),
        }
    }
}
