//! Best-effort form filling after an action.

use crate::browser::page::{ElementDescriptor, ElementQuery, ExplorerPage};
use crate::error::Result;

/// Maximum number of fields filled per call.
pub const MAX_FILLS: usize = 3;

pub const SAMPLE_EMAIL: &str = "test@example.com";
pub const SAMPLE_NUMBER: &str = "42";
pub const SAMPLE_TEXT: &str = "Sample text";

/// Input types that never take typed text.
const NON_TEXT_TYPES: &[&str] = &[
    "hidden", "checkbox", "radio", "submit", "button", "reset", "file", "image", "range", "color",
];

/// Whether a field is a visible, text-capable input or text area.
pub fn is_fillable(field: &ElementDescriptor) -> bool {
    if !field.styled_visible || !field.has_box(1.0) {
        return false;
    }
    match field.tag.to_ascii_lowercase().as_str() {
        "textarea" => true,
        "input" => {
            let kind = field.input_type.as_deref().unwrap_or("text").to_ascii_lowercase();
            !NON_TEXT_TYPES.contains(&kind.as_str())
        }
        _ => false,
    }
}

/// Canned value for a field based on its declared type.
pub fn sample_value(field: &ElementDescriptor) -> &'static str {
    match field
        .input_type
        .as_deref()
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("email") => SAMPLE_EMAIL,
        Some("number") => SAMPLE_NUMBER,
        _ => SAMPLE_TEXT,
    }
}

/// Fill up to [`MAX_FILLS`] visible text fields in document order.
///
/// A field that cannot be set is skipped and does not count. Only the
/// enumeration itself can fail.
pub async fn fill<P: ExplorerPage + ?Sized>(page: &P) -> Result<usize> {
    let fields = page.query(ElementQuery::TextInputs).await?;
    let mut filled = 0;

    for field in fields.iter().filter(|f| is_fillable(&f.descriptor)) {
        if filled >= MAX_FILLS {
            break;
        }
        let value = sample_value(&field.descriptor);
        match page.set_value(&field.handle, value).await {
            Ok(()) => filled += 1,
            Err(e) => log::debug!("Skipping field {}: {}", field.descriptor.display_name(), e),
        }
    }

    if filled > 0 {
        log::info!("✏️  Filled {} field(s)", filled);
    }
    Ok(filled)
}
