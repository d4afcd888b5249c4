//! Amenity toggles and operator-entered custom features.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::models::CustomFeature;

/// Returns `features` with `name` flipped, and whether it is now selected.
pub fn toggled(features: &BTreeSet<String>, name: &str) -> (BTreeSet<String>, bool) {
    let mut next = features.clone();
    if next.remove(name) {
        (next, false)
    } else {
        next.insert(name.to_string());
        (next, true)
    }
}

/// Appends a custom feature labelled `label` (trimmed). `None` for blank
/// labels or labels already present, compared case-insensitively.
pub fn with_custom_feature(
    existing: &[CustomFeature],
    label: &str,
) -> Option<(Vec<CustomFeature>, CustomFeature)> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }
    let lowered = label.to_lowercase();
    if existing.iter().any(|f| f.label.to_lowercase() == lowered) {
        return None;
    }

    let feature = CustomFeature {
        id: Uuid::new_v4().to_string(),
        label: label.to_string(),
    };
    let mut next = existing.to_vec();
    next.push(feature.clone());
    Some((next, feature))
}

pub fn without_custom_feature(existing: &[CustomFeature], id: &str) -> Option<Vec<CustomFeature>> {
    let position = existing.iter().position(|f| f.id == id)?;
    let mut next = existing.to_vec();
    next.remove(position);
    Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_membership() {
        let (on, selected) = toggled(&BTreeSet::new(), "pool");
        assert!(selected);
        assert!(on.contains("pool"));

        let (off, selected) = toggled(&on, "pool");
        assert!(!selected);
        assert!(off.is_empty());
    }

    #[test]
    fn custom_labels_are_trimmed_and_unique() {
        let (features, added) = with_custom_feature(&[], "  Wine cellar ").unwrap();
        assert_eq!(added.label, "Wine cellar");
        assert!(with_custom_feature(&features, "WINE CELLAR").is_none());
        assert!(with_custom_feature(&features, "   ").is_none());

        let (features, second) = with_custom_feature(&features, "Sauna").unwrap();
        assert_ne!(added.id, second.id);
        assert_eq!(features.len(), 2);
    }

    #[test]
    fn remove_unknown_custom_feature_is_none() {
        let (features, added) = with_custom_feature(&[], "Sauna").unwrap();
        assert!(without_custom_feature(&features, "nope").is_none());
        assert!(without_custom_feature(&features, &added.id).unwrap().is_empty());
    }
}
