use std::collections::{BTreeMap, HashSet};

use super::reference::ReferenceData;
use super::types::DuplicationResult;

/// Find therapeutic duplicates (2+ distinct drugs from one category) and
/// same-ingredient duplicates (one drug entered 2+ times, e.g. brand and generic).
pub fn detect_duplicates<S: AsRef<str>>(
    reference: &ReferenceData,
    medications: &[S],
) -> DuplicationResult {
    let mut by_ingredient: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut by_category: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut placed = HashSet::new();

    for med in medications {
        let name = med.as_ref().trim();
        let canonical = reference.normalize(name);
        let Some(profile) = reference.profile(&canonical) else {
            continue;
        };
        by_ingredient
            .entry(profile.generic_name.clone())
            .or_default()
            .push(name.to_string());

        if !placed.insert(canonical.clone()) {
            continue;
        }
        for category in reference.categories_of(&canonical) {
            by_category
                .entry(category.clone())
                .or_default()
                .push(name.to_string());
        }
    }

    DuplicationResult {
        therapeutic: by_category.into_iter().filter(|(_, v)| v.len() >= 2).collect(),
        same_ingredient: by_ingredient.into_iter().filter(|(_, v)| v.len() >= 2).collect(),
    }
}
