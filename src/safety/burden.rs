use std::collections::HashSet;

use super::reference::ReferenceData;
use super::types::{BeersFinding, BurdenContributor, BurdenDimension, BurdenResult};

/// Age added to the fall-risk total: +2 from 80, +1 from 75.
pub fn fall_risk_age_offset(age: Option<u32>) -> u32 {
    match age {
        Some(a) if a >= 80 => 2,
        Some(a) if a >= 75 => 1,
        _ => 0,
    }
}

/// Sum one dimension's per-drug scores across a medication list.
///
/// Each canonical drug counts once; later repeats and zero-score drugs are
/// listed as non-contributing, unknown names as unrecognized.
pub fn score_burden<S: AsRef<str>>(
    dimension: BurdenDimension,
    reference: &ReferenceData,
    medications: &[S],
    age_offset: u32,
) -> BurdenResult {
    let mut seen = HashSet::new();
    let mut total = age_offset;
    let mut contributing = Vec::new();
    let mut non_contributing = Vec::new();
    let mut unrecognized = Vec::new();

    for med in medications {
        let name = med.as_ref().trim();
        let canonical = reference.normalize(name);
        let Some(profile) = reference.profile(&canonical) else {
            unrecognized.push(name.to_string());
            continue;
        };
        let score = dimension.score_of(profile);
        if !seen.insert(canonical) || score == 0 {
            non_contributing.push(name.to_string());
            continue;
        }
        total += score;
        contributing.push(BurdenContributor {
            name: name.to_string(),
            generic_name: profile.generic_name.clone(),
            score,
            drug_class: profile.drug_class.clone(),
        });
    }

    BurdenResult {
        dimension,
        total,
        tier: dimension.classify(total),
        age_offset,
        contributing,
        non_contributing,
        unrecognized,
    }
}

/// Anticholinergic Cognitive Burden total.
pub fn score_anticholinergic<S: AsRef<str>>(
    reference: &ReferenceData,
    medications: &[S],
) -> BurdenResult {
    score_burden(BurdenDimension::Anticholinergic, reference, medications, 0)
}

pub fn score_sedative<S: AsRef<str>>(reference: &ReferenceData, medications: &[S]) -> BurdenResult {
    score_burden(BurdenDimension::Sedative, reference, medications, 0)
}

/// Fall-risk total; an optional age folds its offset into the total.
pub fn score_fall_risk<S: AsRef<str>>(
    reference: &ReferenceData,
    medications: &[S],
    age: Option<u32>,
) -> BurdenResult {
    score_burden(
        BurdenDimension::FallRisk,
        reference,
        medications,
        fall_risk_age_offset(age),
    )
}

/// Recognized drugs on the Beers potentially-inappropriate list, once each.
pub fn screen_beers<S: AsRef<str>>(reference: &ReferenceData, medications: &[S]) -> Vec<BeersFinding> {
    let mut seen = HashSet::new();
    medications
        .iter()
        .filter_map(|m| {
            let name = m.as_ref().trim();
            let profile = reference.resolve(name)?;
            (profile.beers_flag && seen.insert(profile.generic_name.clone())).then(|| {
                BeersFinding {
                    name: name.to_string(),
                    generic_name: profile.generic_name.clone(),
                    drug_class: profile.drug_class.clone(),
                    rationale: profile.beers_rationale.clone(),
                    recommendation: profile.beers_recommendation.clone(),
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::types::BurdenTier;
    use proptest::prelude::*;

    fn reference() -> ReferenceData {
        ReferenceData::load_test()
    }

    #[test]
    fn anticholinergic_sums_and_classifies() {
        let data = reference();
        let result = score_anticholinergic(&data, &["Benadryl", "oxybutynin", "warfarin"]);
        assert_eq!(result.total, 7);
        assert_eq!(result.tier, BurdenTier::Critical);
        assert_eq!(result.contributing.len(), 3);
        assert_eq!(result.contributing[0].generic_name, "diphenhydramine");
    }

    #[test]
    fn zero_score_and_unknown_are_separated() {
        let data = reference();
        let result = score_anticholinergic(&data, &["Tylenol", "Zyxorin"]);
        assert_eq!(result.total, 0);
        assert_eq!(result.tier, BurdenTier::None);
        assert_eq!(result.non_contributing, vec!["Tylenol"]);
        assert_eq!(result.unrecognized, vec!["Zyxorin"]);
    }

    #[test]
    fn repeated_drug_counted_once() {
        let data = reference();
        let result = score_sedative(&data, &["Ambien", "zolpidem", "ZOLPIDEM"]);
        assert_eq!(result.total, 3);
        assert_eq!(result.tier, BurdenTier::High);
        assert_eq!(result.non_contributing, vec!["zolpidem", "ZOLPIDEM"]);
    }

    #[test]
    fn empty_list_is_floor_tier() {
        let data = reference();
        let empty: [&str; 0] = [];
        assert_eq!(score_sedative(&data, &empty).tier, BurdenTier::None);
        assert_eq!(score_fall_risk(&data, &empty, None).tier, BurdenTier::Minimal);
    }

    #[test]
    fn fall_risk_age_offset_folds_into_total() {
        let data = reference();
        let meds = ["diazepam", "furosemide"];
        assert_eq!(score_fall_risk(&data, &meds, None).total, 4);
        assert_eq!(score_fall_risk(&data, &meds, Some(74)).total, 4);
        assert_eq!(score_fall_risk(&data, &meds, Some(75)).total, 5);
        let old = score_fall_risk(&data, &meds, Some(85));
        assert_eq!(old.total, 6);
        assert_eq!(old.age_offset, 2);
        assert_eq!(old.tier, BurdenTier::Moderate);
    }

    #[test]
    fn age_alone_reaches_low_tier() {
        let data = reference();
        let result = score_fall_risk(&data, &["acetaminophen"], Some(90));
        assert_eq!(result.total, 2);
        assert_eq!(result.tier, BurdenTier::Low);
    }

    #[test]
    fn anticholinergic_tier_boundary_is_exact() {
        let data = reference();
        let five = score_anticholinergic(&data, &["oxybutynin", "tolterodine"]);
        assert_eq!(five.total, 5);
        assert_eq!(five.tier, BurdenTier::Critical);
        let four = score_anticholinergic(&data, &["oxybutynin", "warfarin"]);
        assert_eq!(four.total, 4);
        assert_eq!(four.tier, BurdenTier::High);
    }

    #[test]
    fn beers_screen_deduplicates() {
        let data = reference();
        let flagged = screen_beers(&data, &["Benadryl", "diphenhydramine", "warfarin", "Ambien"]);
        let names: Vec<_> = flagged.iter().map(|f| f.generic_name.as_str()).collect();
        assert_eq!(names, vec!["diphenhydramine", "zolpidem"]);
        assert_eq!(flagged[0].name, "Benadryl");
        assert!(flagged[0].rationale.is_some());
    }

    proptest! {
        #[test]
        fn totals_are_additive_and_every_entry_accounted(
            picks in proptest::collection::vec(0usize..19, 0..10),
            age in proptest::option::of(60u32..100),
        ) {
            let data = reference();
            let mut pool: Vec<String> = data.profiles().map(|p| p.generic_name.clone()).collect();
            pool.sort();
            pool.push("Zyxorin".into());
            pool.push("Benadryl".into());
            let list: Vec<&str> = picks.iter().map(|&i| pool[i].as_str()).collect();

            for result in [
                score_anticholinergic(&data, &list),
                score_sedative(&data, &list),
                score_fall_risk(&data, &list, age),
            ] {
                let sum: u32 = result.contributing.iter().map(|c| c.score).sum();
                prop_assert_eq!(result.total, sum + result.age_offset);
                prop_assert_eq!(
                    result.contributing.len() + result.non_contributing.len() + result.unrecognized.len(),
                    list.len()
                );
                prop_assert_eq!(result.tier, result.dimension.classify(result.total));
            }
        }
    }
}
