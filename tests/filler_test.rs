//! Form filling against scripted pages

mod support;

use support::{FakePage, Screen};
use ui_explorer::filler::{self, MAX_FILLS, SAMPLE_EMAIL, SAMPLE_NUMBER, SAMPLE_TEXT};

#[tokio::test]
async fn test_fills_at_most_three_fields_in_order() -> anyhow::Result<()> {
    let page = FakePage::new(vec![Screen::new("Signup")
        .input(1, "checkbox")
        .input(2, "text")
        .input(3, "email")
        .input(4, "number")
        .input(5, "text")]);

    let filled = filler::fill(&page).await?;

    assert_eq!(filled, MAX_FILLS);
    assert_eq!(
        page.fill_log(),
        vec![
            (2, SAMPLE_TEXT.to_string()),
            (3, SAMPLE_EMAIL.to_string()),
            (4, SAMPLE_NUMBER.to_string()),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_failing_field_is_skipped_and_not_counted() -> anyhow::Result<()> {
    let page = FakePage::new(vec![Screen::new("Profile")
        .input(1, "text")
        .input(2, "email")
        .input(3, "text")
        .input(4, "search")])
    .failing_field(1);

    let filled = filler::fill(&page).await?;

    assert_eq!(filled, 3);
    let ids: Vec<usize> = page.fill_log().into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec![2, 3, 4]);
    Ok(())
}

#[tokio::test]
async fn test_nothing_to_fill() -> anyhow::Result<()> {
    let page = FakePage::new(vec![Screen::new("Plain").button(1, "Next")]);
    assert_eq!(filler::fill(&page).await?, 0);
    assert!(page.fill_log().is_empty());
    Ok(())
}
