use super::types::{DualMechanismDrug, InteractionFinding, ScoreBand};

/// Message template builder for the clinician-facing report text.
/// Every action names the medications it is about, as the caller entered them.
pub struct ActionTemplates;

impl ActionTemplates {
    /// One entry per critical interaction.
    pub fn critical_interaction(finding: &InteractionFinding) -> String {
        let action = if finding.record.action.is_empty() {
            "Review this combination with the prescriber."
        } else {
            finding.record.action.as_str()
        };
        format!(
            "CRITICAL INTERACTION: {}. {} {}",
            finding.medications.join(" + "),
            finding.record.description,
            action,
        )
    }

    pub fn dual_mechanism(drugs: &[DualMechanismDrug]) -> String {
        let names: Vec<&str> = drugs.iter().map(|d| d.name.as_str()).collect();
        format!(
            "Deprescribing priority: {} add to both anticholinergic and sedative burden. \
             Consider tapering or substituting first.",
            names.join(", "),
        )
    }

    pub fn cns_burden(total: u32, effective: f64) -> String {
        format!(
            "Combined CNS burden is {} (effective {:.1} with synergy). \
             High risk of delirium and cognitive decline.",
            total, effective,
        )
    }

    pub fn fall_risk(total: u32) -> String {
        format!(
            "Fall risk score is {}. Arrange a fall-prevention review and \
             reduce fall-risk-increasing drugs where possible.",
            total,
        )
    }

    /// Single summary entry for all high-severity interactions.
    pub fn high_interactions(findings: &[InteractionFinding]) -> String {
        let pairs: Vec<String> = findings.iter().map(|f| f.medications.join(" + ")).collect();
        format!(
            "{} high-severity interaction(s) need review: {}.",
            findings.len(),
            pairs.join("; "),
        )
    }

    pub fn beers(names: &[&str]) -> String {
        format!(
            "{} Beers Criteria medications ({}). \
             Review each for a safer alternative.",
            names.len(),
            names.join(", "),
        )
    }

    pub fn duplicates(groups: &[String]) -> String {
        format!(
            "Possible duplicate therapy: {}. Confirm each is intended.",
            groups.join("; "),
        )
    }

    pub fn no_critical_issues() -> String {
        "No critical issues identified. Continue routine medication review.".to_string()
    }

    /// Concern text attached to a pill-burden band.
    pub fn pill_burden_concern(band: ScoreBand) -> &'static str {
        match band {
            ScoreBand::VeryHigh => "Extremely difficult to manage; high risk of non-adherence",
            ScoreBand::High => "Challenging regimen; consider simplification",
            ScoreBand::Moderate => "Manageable but benefits from organization",
            ScoreBand::Low => "Reasonable medication burden",
        }
    }

    pub fn extended_release(medication: &str, doses: u32) -> String {
        format!(
            "{}: currently {}x daily. Ask about an extended-release \
             formulation for once-daily dosing.",
            medication, doses,
        )
    }

    pub fn pill_burden_review(total_doses: u32) -> String {
        format!(
            "Total daily pill burden is {}. Review for drugs that could be \
             discontinued or combined.",
            total_doses,
        )
    }

    pub fn deprescribing_review() -> String {
        "With 8 or more medications, a comprehensive deprescribing review may find \
         drugs that are no longer necessary."
            .to_string()
    }

    pub fn caregiver_warning(adherence: f64) -> String {
        format!(
            "Predicted adherence is {:.1}% without caregiver support. \
             Consider involving family or home care services.",
            adherence,
        )
    }
}
