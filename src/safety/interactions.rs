use std::collections::HashSet;

use super::reference::ReferenceData;
use super::types::{
    CombinationKey, InteractionFinding, InteractionRecord, InteractionRiskScore, InteractionScan,
    ScoreBand, Severity,
};

/// Lazily yields every k-sized index combination of `0..n` in lexicographic
/// order, so combinations follow the caller's list order.
#[derive(Debug, Clone)]
pub struct Combinations {
    n: usize,
    indices: Vec<usize>,
    started: bool,
    done: bool,
}

impl Combinations {
    pub fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            indices: (0..k).collect(),
            started: false,
            done: k == 0 || k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.indices.clone());
        }
        let k = self.indices.len();
        for i in (0..k).rev() {
            if self.indices[i] < self.n - k + i {
                self.indices[i] += 1;
                for j in i + 1..k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
                return Some(self.indices.clone());
            }
        }
        self.done = true;
        None
    }
}

/// Look up the record for a specific 2- or 3-drug combination, in any order.
///
/// Names are normalized first. Lists of any other size, or lists whose names
/// collapse onto fewer distinct drugs, have no record.
pub fn find_interaction<'a, S: AsRef<str>>(
    reference: &'a ReferenceData,
    names: &[S],
) -> Option<&'a InteractionRecord> {
    if !(2..=3).contains(&names.len()) {
        return None;
    }
    let canonical: Vec<String> = names
        .iter()
        .map(|n| reference.normalize(n.as_ref()))
        .collect();
    let key = CombinationKey::new(&canonical)?;
    if key.len() != names.len() {
        return None;
    }
    reference.interaction(&key)
}

/// Check every pair, then every triple, of distinct drugs in the list.
///
/// Repeats of one canonical drug are scanned once, under the first name the
/// caller used for it. Each record is reported at most once.
pub fn scan_all<S: AsRef<str>>(reference: &ReferenceData, medications: &[S]) -> InteractionScan {
    let mut seen_names = HashSet::new();
    let (display, canonical): (Vec<&str>, Vec<String>) = medications
        .iter()
        .map(|m| (m.as_ref().trim(), reference.normalize(m.as_ref())))
        .filter(|(_, c)| !c.is_empty() && seen_names.insert(c.clone()))
        .unzip();

    let mut scan = InteractionScan::default();
    let mut reported: HashSet<CombinationKey> = HashSet::new();

    for size in 2..=3 {
        for combo in Combinations::new(canonical.len(), size) {
            if size == 2 {
                scan.pairs_checked += 1;
            } else {
                scan.triples_checked += 1;
            }
            let Some(key) = CombinationKey::new(combo.iter().map(|&i| &canonical[i])) else {
                continue;
            };
            let Some(record) = reference.interaction(&key) else {
                continue;
            };
            if reported.insert(key) {
                scan.tier_mut(record.severity).push(InteractionFinding {
                    medications: combo.iter().map(|&i| display[i].to_string()).collect(),
                    record: record.clone(),
                });
            }
        }
    }

    tracing::debug!(
        medications = canonical.len(),
        pairs = scan.pairs_checked,
        triples = scan.triples_checked,
        found = scan.total(),
        "Interaction scan complete"
    );

    scan
}

fn severity_weight(severity: Severity) -> u32 {
    match severity {
        Severity::Critical => 4,
        Severity::High => 3,
        Severity::Moderate => 2,
        Severity::Low => 1,
    }
}

/// Weighted interaction risk score. Display only; never feeds the overall level.
pub fn interaction_risk_score(scan: &InteractionScan) -> InteractionRiskScore {
    let score: u32 = Severity::DESCENDING
        .into_iter()
        .map(|s| severity_weight(s) * scan.tier(s).len() as u32)
        .sum();
    let band = match score {
        s if s >= 10 => ScoreBand::High,
        s if s >= 4 => ScoreBand::Moderate,
        _ => ScoreBand::Low,
    };
    InteractionRiskScore { score, band }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::types::RiskLevel;
    use proptest::prelude::*;

    fn reference() -> ReferenceData {
        ReferenceData::load_test()
    }

    #[test]
    fn combinations_in_list_order() {
        let pairs: Vec<_> = Combinations::new(3, 2).collect();
        assert_eq!(pairs, vec![vec![0, 1], vec![0, 2], vec![1, 2]]);
        assert_eq!(Combinations::new(4, 3).count(), 4);
        assert_eq!(Combinations::new(2, 3).count(), 0);
        assert_eq!(Combinations::new(5, 0).count(), 0);
    }

    #[test]
    fn find_pair_any_order_and_alias() {
        let data = reference();
        let a = find_interaction(&data, &["Warfarin", "Bactrim"]).unwrap();
        let b = find_interaction(&data, &["TMP/SMX", "coumadin"]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.severity, Severity::Critical);
    }

    #[test]
    fn find_triple_any_order() {
        let data = reference();
        let rec = find_interaction(&data, &["ibuprofen", "furosemide", "lisinopril"]).unwrap();
        assert!(rec.is_triple());
        assert_eq!(rec.severity, Severity::Critical);
    }

    #[test]
    fn find_rejects_wrong_sizes() {
        let data = reference();
        assert!(find_interaction(&data, &["warfarin"]).is_none());
        assert!(find_interaction::<&str>(&data, &[]).is_none());
        assert!(find_interaction(&data, &["warfarin", "aspirin", "ibuprofen", "lisinopril"]).is_none());
        assert!(find_interaction(&data, &["advil", "ibuprofen"]).is_none());
        assert!(find_interaction(&data, &["acetaminophen", "metformin"]).is_none());
    }

    #[test]
    fn scan_groups_by_severity() {
        let data = reference();
        let scan = scan_all(&data, &["Warfarin", "Bactrim", "Ibuprofen", "Aspirin"]);
        assert_eq!(scan.critical.len(), 1);
        assert_eq!(scan.critical[0].medications, vec!["Warfarin", "Bactrim"]);
        assert_eq!(scan.high.len(), 2);
        assert_eq!(scan.moderate.len(), 1);
        assert!(scan.low.is_empty());
        assert_eq!(scan.pairs_checked, 6);
        assert_eq!(scan.triples_checked, 4);
        assert_eq!(scan.risk_level(), RiskLevel::Critical);
    }

    #[test]
    fn scan_finds_triple_and_its_pairs() {
        let data = reference();
        let scan = scan_all(&data, &["Lisinopril", "Furosemide", "Ibuprofen"]);
        assert_eq!(scan.critical.len(), 1);
        assert!(scan.critical[0].record.is_triple());
        assert_eq!(scan.moderate.len(), 2);
    }

    #[test]
    fn scan_single_and_empty() {
        let data = reference();
        assert_eq!(scan_all(&data, &["warfarin"]).total(), 0);
        let empty: [&str; 0] = [];
        let scan = scan_all(&data, &empty);
        assert_eq!(scan.total(), 0);
        assert_eq!(scan.pairs_checked, 0);
    }

    #[test]
    fn scan_collapses_repeated_drug() {
        let data = reference();
        let scan = scan_all(&data, &["Advil", "ibuprofen", "warfarin"]);
        assert_eq!(scan.high.len(), 1);
        assert_eq!(scan.high[0].medications, vec!["Advil", "warfarin"]);
        assert_eq!(scan.pairs_checked, 1);
    }

    #[test]
    fn risk_score_weights() {
        let data = reference();
        let scan = scan_all(&data, &["Warfarin", "Bactrim", "Ibuprofen", "Aspirin"]);
        let score = interaction_risk_score(&scan);
        assert_eq!(score.score, 4 + 3 * 2 + 2);
        assert_eq!(score.band, ScoreBand::High);
        assert_eq!(interaction_risk_score(&InteractionScan::default()).band, ScoreBand::Low);
    }

    proptest! {
        #[test]
        fn pair_lookup_is_symmetric(a in 0usize..17, b in 0usize..17) {
            let data = reference();
            let mut names: Vec<String> = data.profiles().map(|p| p.generic_name.clone()).collect();
            names.sort();
            let forward = find_interaction(&data, &[&names[a], &names[b]]);
            let backward = find_interaction(&data, &[&names[b], &names[a]]);
            prop_assert_eq!(forward, backward);
        }

        #[test]
        fn scan_is_order_independent(seed in proptest::collection::vec(0usize..17, 0..6)) {
            let data = reference();
            let mut names: Vec<String> = data.profiles().map(|p| p.generic_name.clone()).collect();
            names.sort();
            let list: Vec<&str> = seed.iter().map(|&i| names[i].as_str()).collect();
            let mut reversed = list.clone();
            reversed.reverse();
            let keys = |scan: &InteractionScan| {
                let mut k: Vec<_> = scan.iter().map(|f| f.record.drugs.clone()).collect();
                k.sort();
                k
            };
            prop_assert_eq!(keys(&scan_all(&data, &list)), keys(&scan_all(&data, &reversed)));
        }
    }
}
