use std::collections::HashSet;

use super::reference::ReferenceData;
use super::types::{BurdenResult, CombinedCnsResult, DualMechanismDrug};

/// Inflation applied to the combined anticholinergic + sedative total.
pub fn synergy_multiplier(total: u32) -> f64 {
    match total {
        t if t >= 8 => 1.5,
        t if t >= 5 => 1.3,
        t if t >= 3 => 1.2,
        _ => 1.0,
    }
}

/// Merge the anticholinergic and sedative results into one CNS view.
///
/// The combined figures are reported alongside the two tiers and carry no
/// tier of their own.
///
/// Dual-mechanism drugs (nonzero on both axes) are listed by combined score,
/// highest first; ties keep input order.
pub fn combine_cns<S: AsRef<str>>(
    reference: &ReferenceData,
    medications: &[S],
    anticholinergic: &BurdenResult,
    sedative: &BurdenResult,
) -> CombinedCnsResult {
    let total = anticholinergic.total + sedative.total;
    let synergy_multiplier = synergy_multiplier(total);
    let effective_burden = (f64::from(total) * synergy_multiplier * 10.0).round() / 10.0;

    let mut seen = HashSet::new();
    let mut dual_mechanism_medications: Vec<DualMechanismDrug> = medications
        .iter()
        .filter_map(|m| {
            let name = m.as_ref().trim();
            let profile = reference.resolve(name)?;
            (profile.is_dual_mechanism() && seen.insert(profile.generic_name.clone())).then(|| {
                let acb = u32::from(profile.anticholinergic_score);
                let sed = u32::from(profile.sedative_score);
                DualMechanismDrug {
                    name: name.to_string(),
                    generic_name: profile.generic_name.clone(),
                    anticholinergic_score: acb,
                    sedative_score: sed,
                    combined_score: acb + sed,
                }
            })
        })
        .collect();
    dual_mechanism_medications.sort_by(|a, b| b.combined_score.cmp(&a.combined_score));

    CombinedCnsResult {
        anticholinergic_total: anticholinergic.total,
        sedative_total: sedative.total,
        total,
        synergy_multiplier,
        effective_burden,
        dual_mechanism_medications,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::burden::{score_anticholinergic, score_sedative};
    use proptest::prelude::*;

    fn combined(meds: &[&str]) -> CombinedCnsResult {
        let data = ReferenceData::load_test();
        let acb = score_anticholinergic(&data, meds);
        let sed = score_sedative(&data, meds);
        combine_cns(&data, meds, &acb, &sed)
    }

    #[test]
    fn multiplier_bands() {
        assert_eq!(synergy_multiplier(0), 1.0);
        assert_eq!(synergy_multiplier(2), 1.0);
        assert_eq!(synergy_multiplier(3), 1.2);
        assert_eq!(synergy_multiplier(4), 1.2);
        assert_eq!(synergy_multiplier(5), 1.3);
        assert_eq!(synergy_multiplier(7), 1.3);
        assert_eq!(synergy_multiplier(8), 1.5);
    }

    #[test]
    fn diphenhydramine_and_zolpidem() {
        let result = combined(&["Diphenhydramine", "Zolpidem"]);
        assert_eq!(result.anticholinergic_total, 3);
        assert_eq!(result.sedative_total, 6);
        assert_eq!(result.total, 9);
        assert_eq!(result.synergy_multiplier, 1.5);
        assert_eq!(result.effective_burden, 13.5);
        assert_eq!(result.dual_mechanism_medications.len(), 1);
        assert_eq!(result.dual_mechanism_medications[0].generic_name, "diphenhydramine");
    }

    #[test]
    fn effective_burden_rounded_to_one_decimal() {
        // oxybutynin 3+1, zolpidem 0+3 => 7 * 1.3 = 9.1
        let result = combined(&["oxybutynin", "zolpidem"]);
        assert_eq!(result.total, 7);
        assert_eq!(result.effective_burden, 9.1);
    }

    #[test]
    fn dual_mechanism_sorted_descending_stable() {
        let result = combined(&["oxybutynin", "amitriptyline", "Benadryl"]);
        let names: Vec<_> = result
            .dual_mechanism_medications
            .iter()
            .map(|d| d.generic_name.as_str())
            .collect();
        assert_eq!(names, vec!["amitriptyline", "diphenhydramine", "oxybutynin"]);
    }

    #[test]
    fn empty_list_has_no_burden() {
        let result = combined(&[]);
        assert_eq!(result.total, 0);
        assert_eq!(result.effective_burden, 0.0);
        assert!(result.dual_mechanism_medications.is_empty());
    }

    proptest! {
        #[test]
        fn dual_mechanism_list_is_complete_and_exact(picks in proptest::collection::vec(0usize..17, 0..8)) {
            let data = ReferenceData::load_test();
            let mut pool: Vec<String> = data.profiles().map(|p| p.generic_name.clone()).collect();
            pool.sort();
            let list: Vec<&str> = picks.iter().map(|&i| pool[i].as_str()).collect();
            let result = combined(&list);

            let listed: Vec<&str> = result
                .dual_mechanism_medications
                .iter()
                .map(|d| d.generic_name.as_str())
                .collect();
            for name in &list {
                let profile = data.profile(name).unwrap();
                prop_assert_eq!(profile.is_dual_mechanism(), listed.contains(name));
            }
            prop_assert!(result
                .dual_mechanism_medications
                .windows(2)
                .all(|w| w[0].combined_score >= w[1].combined_score));
            prop_assert_eq!(result.total, result.anticholinergic_total + result.sedative_total);
        }
    }
}
