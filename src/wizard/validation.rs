//! Pure completeness predicates over a [`PropertyDraft`].
//!
//! Nothing here mutates state or touches I/O, so the same draft always yields
//! the same answer.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ValidationError;
use crate::models::PropertyDraft;
use crate::wizard::WizardStep;

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

fn present(value: &str) -> bool {
    !value.trim().is_empty()
}

pub fn is_valid_email(value: &str) -> bool {
    email_pattern().is_match(value.trim())
}

/// Whether `step` is complete for `draft`.
pub fn is_step_valid(step: WizardStep, draft: &PropertyDraft) -> bool {
    match step {
        WizardStep::BasicInfo => {
            present(&draft.title)
                && is_valid_email(&draft.contact_email)
                && present(&draft.phone_number)
        }
        WizardStep::Location => {
            let locality = if draft.show_exact_address {
                &draft.address
            } else {
                &draft.approximate_location
            };
            present(&draft.city) && present(locality)
        }
        WizardStep::Pricing => {
            draft.property_type.is_some() && draft.listing_type.is_some() && draft.price > 0.0
        }
        WizardStep::Details => {
            draft.bedrooms.is_some()
                && draft.bathrooms.is_some_and(|n| n.is_finite() && n >= 0.0)
                && draft.square_feet > 0
        }
        WizardStep::Features | WizardStep::AiSummary => true,
        WizardStep::Images => !draft.images.is_empty(),
        WizardStep::Description => present(&draft.description),
        WizardStep::Review => missing_fields(draft).is_empty(),
    }
}

/// Labels of required fields that are empty, zero or unset, in review order.
pub fn missing_fields(draft: &PropertyDraft) -> Vec<&'static str> {
    let checks = [
        ("Title", present(&draft.title)),
        ("Contact Email", present(&draft.contact_email)),
        ("Description", present(&draft.description)),
        ("Property Type", draft.property_type.is_some()),
        ("Bedrooms", draft.bedrooms.is_some_and(|n| n > 0)),
        ("Bathrooms", draft.bathrooms.is_some_and(|n| n > 0.0)),
        ("Square Feet", draft.square_feet > 0),
        ("Images", !draft.images.is_empty()),
    ];

    checks
        .into_iter()
        .filter_map(|(label, ok)| (!ok).then_some(label))
        .collect()
}

/// Aggregate publish gate.
///
/// # Errors
///
/// Returns a [`ValidationError`] listing every missing field.
pub fn ensure_publishable(draft: &PropertyDraft) -> Result<(), ValidationError> {
    let missing = missing_fields(draft);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { missing })
    }
}
