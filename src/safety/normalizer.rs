use std::sync::LazyLock;

use regex::Regex;

use super::reference::AliasTable;

/// Dosage-form suffixes stripped once from the end of a name.
static RE_DOSAGE_FORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+(?:tablets?|capsules?|injection|oral|topical)$").unwrap()
});
/// Release-profile suffixes, stripped after the dosage form.
static RE_RELEASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+(?:sr|er|xr|cr|la|xl)$").unwrap());

/// Lowercase, trim and collapse internal whitespace.
pub fn clean(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Strip one dosage-form suffix, then one release suffix.
pub fn strip_suffixes(name: &str) -> String {
    let without_form = RE_DOSAGE_FORM.replace(name, "");
    RE_RELEASE.replace(&without_form, "").into_owned()
}

/// Map free text to a canonical generic name.
///
/// Exact alias hits win. Otherwise the name is stripped of form and release
/// suffixes and looked up again; an unknown name comes back stripped, so
/// callers can tell it is unrecognized by a failed catalog lookup.
pub fn normalize(raw: &str, aliases: &AliasTable) -> String {
    let cleaned = clean(raw);
    if cleaned.is_empty() {
        return cleaned;
    }
    if let Some(generic) = aliases.resolve(&cleaned) {
        return generic.to_string();
    }
    let stripped = strip_suffixes(&cleaned);
    if stripped != cleaned {
        if let Some(generic) = aliases.resolve(&stripped) {
            return generic.to_string();
        }
    }
    stripped
}
