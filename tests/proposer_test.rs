//! Action proposal against scripted pages
//!
//! Tests cover:
//! - Dialog priority over page-level controls
//! - Forced dialog choice when nothing in the dialog scores
//! - Visibility filter and destructive veto on the page
//! - Fallback toggles and termination

mod support;

use std::collections::BTreeSet;
use support::{FakePage, Screen};
use ui_explorer::{ChoiceReason, ExplorerError, Proposer, ScoringPolicy};

fn proposer(allow_destructive: bool, hints: &[&str]) -> Proposer {
    let hints: BTreeSet<String> = hints.iter().map(|h| h.to_string()).collect();
    Proposer::new(ScoringPolicy::new(allow_destructive, hints))
}

#[tokio::test]
async fn test_create_project_chosen_over_hidden_delete() -> anyhow::Result<()> {
    let page = FakePage::new(vec![Screen::new("Projects")
        .hidden_button(1, "Delete Project")
        .button(2, "Create Project")]);

    let action = proposer(false, &[])
        .propose(&page)
        .await?
        .expect("an action");

    assert_eq!(action.handle, 2);
    assert_eq!(action.reason, ChoiceReason::VerbMatch);
    assert_eq!(action.label, "verb:Create Project");
    Ok(())
}

#[tokio::test]
async fn test_dialog_wins_over_higher_scoring_page_control() -> anyhow::Result<()> {
    let page = FakePage::new(vec![Screen::new("Board")
        .button(1, "Create new project and save settings")
        .dialog("Invite teammates")
        .dialog_button(10, "Not now")
        .dialog_button(11, "Continue")]);

    let action = proposer(false, &["project"])
        .propose(&page)
        .await?
        .expect("an action");

    // "Not now" still scores via the synthetic button bonus
    assert_eq!(action.handle, 10);
    assert_eq!(action.reason, ChoiceReason::VerbMatch);
    Ok(())
}

#[tokio::test]
async fn test_forced_dialog_choice_for_archive() -> anyhow::Result<()> {
    let page = FakePage::new(vec![Screen::new("Item")
        .button(1, "Edit item")
        .dialog("Archive this item?")
        .dialog_button(20, "Archive")]);

    let action = proposer(false, &[])
        .propose(&page)
        .await?
        .expect("dialogs are never stalled on");

    assert_eq!(action.handle, 20);
    assert_eq!(action.reason, ChoiceReason::ForcedDialog);
    assert_eq!(action.label, "dialog-forced:Archive");
    Ok(())
}

#[tokio::test]
async fn test_archive_in_dialog_scores_when_destructive_allowed() -> anyhow::Result<()> {
    let page = FakePage::new(vec![Screen::new("Item")
        .dialog("Archive this item?")
        .dialog_button(20, "Archive")]);

    let action = proposer(true, &[]).propose(&page).await?.unwrap();
    assert_eq!(action.reason, ChoiceReason::VerbMatch);
    assert!(action.score > 0);
    Ok(())
}

#[tokio::test]
async fn test_dialog_without_controls_falls_through() -> anyhow::Result<()> {
    let page = FakePage::new(vec![Screen::new("Toast")
        .dialog("Saved!")
        .button(3, "Next")]);

    let action = proposer(false, &[]).propose(&page).await?.unwrap();
    assert_eq!(action.handle, 3);
    Ok(())
}

#[tokio::test]
async fn test_hints_steer_choice() -> anyhow::Result<()> {
    let page = FakePage::new(vec![Screen::new("Dashboard")
        .link(1, "Save")
        .link(2, "Invoices")]);

    let without = proposer(false, &[]).propose(&page).await?.unwrap();
    assert_eq!(without.handle, 1);

    let with = proposer(false, &["invoice"]).propose(&page).await?.unwrap();
    assert_eq!(with.handle, 2);
    Ok(())
}

#[tokio::test]
async fn test_fallback_toggle_when_nothing_scores() -> anyhow::Result<()> {
    let page = FakePage::new(vec![Screen::new("Docs")
        .link(1, "About")
        .toggle(5, "☰")]);

    let action = proposer(false, &[]).propose(&page).await?.unwrap();
    assert_eq!(action.handle, 5);
    assert_eq!(action.reason, ChoiceReason::FallbackMenu);
    assert!(action.label.starts_with("fallback-menu:"));
    Ok(())
}

#[tokio::test]
async fn test_nothing_to_do_returns_none() -> anyhow::Result<()> {
    let empty = FakePage::new(vec![Screen::new("Blank")]);
    assert!(proposer(false, &[]).propose(&empty).await?.is_none());

    let only_destructive = FakePage::new(vec![Screen::new("Danger")
        .link(1, "Delete account")
        .link(2, "Reset password")]);
    assert!(proposer(false, &[])
        .propose(&only_destructive)
        .await?
        .is_none());
    Ok(())
}

#[tokio::test]
async fn test_unreachable_page_is_an_error() {
    let page = FakePage::unreachable();
    let result = proposer(false, &[]).propose(&page).await;
    assert!(matches!(result, Err(ExplorerError::PageUnavailable(_))));
}
