use std::collections::BTreeSet;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::messages::ActionTemplates;
use super::reference::ReferenceData;
use super::types::{
    CognitiveLoadScore, MedicationEntry, PatientContext, PillBurden, RegimenSummary, ScheduleSlot,
    ScoreBand,
};

/// Adherence below this, with no caregiver, triggers a warning.
pub const CAREGIVER_ADHERENCE_THRESHOLD: f64 = 70.0;

fn at(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default()
}

/// Clock times of the four daily dosing slots.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleTimes {
    pub morning: NaiveTime,
    pub noon: NaiveTime,
    pub evening: NaiveTime,
    pub bedtime: NaiveTime,
}

impl Default for ScheduleTimes {
    fn default() -> Self {
        Self {
            morning: at(8),
            noon: at(12),
            evening: at(18),
            bedtime: at(22),
        }
    }
}

impl ScheduleTimes {
    fn slots(&self) -> [(&'static str, NaiveTime); 4] {
        [
            ("Morning", self.morning),
            ("Noon", self.noon),
            ("Evening", self.evening),
            ("Bedtime", self.bedtime),
        ]
    }
}

/// Slot indices (morning=0, noon=1, evening=2, bedtime=3) a dose count occupies.
fn slot_indices(doses: u32) -> &'static [usize] {
    match doses {
        0 => &[],
        1 => &[0],
        2 => &[0, 2],
        3 => &[0, 1, 2],
        _ => &[0, 1, 2, 3],
    }
}

pub fn pill_burden(medications: &[MedicationEntry]) -> PillBurden {
    let total_doses_per_day: u32 = medications.iter().map(MedicationEntry::daily_doses).sum();
    let band = match total_doses_per_day {
        t if t >= 15 => ScoreBand::VeryHigh,
        t if t >= 10 => ScoreBand::High,
        t if t >= 6 => ScoreBand::Moderate,
        _ => ScoreBand::Low,
    };
    PillBurden {
        total_doses_per_day,
        total_medications: medications.len(),
        band,
        concern: ActionTemplates::pill_burden_concern(band).to_string(),
    }
}

/// Predicted adherence percentage, clamped to 0..=100 and rounded to one decimal.
pub fn predict_adherence(medications: &[MedicationEntry], patient: &PatientContext) -> f64 {
    let count = medications.len() as f64;
    let total_doses: u32 = medications.iter().map(MedicationEntry::daily_doses).sum();

    let mut score = 100.0;
    score -= (count - 1.0).max(0.0) * 3.0;
    score -= (f64::from(total_doses) - count).max(0.0) * 2.0;

    score -= match patient.age {
        Some(a) if a >= 80 => 10.0,
        Some(a) if a >= 75 => 5.0,
        _ => 0.0,
    };
    if patient.cognitive_impairment {
        score -= 20.0;
    }

    let timing_complexity: u32 = medications
        .iter()
        .map(|m| match m.daily_doses() {
            d if d >= 3 => 2,
            2 => 1,
            _ => 0,
        })
        .sum();
    score -= f64::from(timing_complexity) * 2.0;

    (score.clamp(0.0, 100.0) * 10.0).round() / 10.0
}

/// Place each medication into the four daily slots by doses per day.
pub fn daily_schedule(medications: &[MedicationEntry], times: &ScheduleTimes) -> Vec<ScheduleSlot> {
    let mut slots: Vec<ScheduleSlot> = times
        .slots()
        .into_iter()
        .map(|(label, time)| ScheduleSlot {
            label: format!("{} ({})", label, time.format("%H:%M")),
            time,
            medications: Vec::new(),
        })
        .collect();
    for med in medications {
        for &i in slot_indices(med.daily_doses()) {
            slots[i].medications.push(med.name.trim().to_string());
        }
    }
    slots
}

/// Distinct times per day the patient must remember to take something.
pub fn memory_actions_per_day(medications: &[MedicationEntry]) -> usize {
    medications
        .iter()
        .flat_map(|m| slot_indices(m.daily_doses()).iter().copied())
        .collect::<BTreeSet<_>>()
        .len()
}

pub fn simplification_recommendations(medications: &[MedicationEntry]) -> Vec<String> {
    let mut recommendations: Vec<String> = medications
        .iter()
        .filter(|m| m.daily_doses() >= 3)
        .map(|m| ActionTemplates::extended_release(m.name.trim(), m.daily_doses()))
        .collect();

    let total_doses: u32 = medications.iter().map(MedicationEntry::daily_doses).sum();
    if total_doses >= 10 {
        recommendations.push(ActionTemplates::pill_burden_review(total_doses));
    }
    if medications.len() >= 8 {
        recommendations.push(ActionTemplates::deprescribing_review());
    }
    recommendations
}

/// Medication Cognitive Load Score.
///
/// Sedative and anticholinergic flags come from the catalog; unrecognized
/// medications still add their polypharmacy and dosing load.
pub fn cognitive_load(reference: &ReferenceData, medications: &[MedicationEntry]) -> CognitiveLoadScore {
    let count = medications.len() as u32;
    let mut score = count * 2;
    let mut total_doses = 0;
    let mut sedatives = 0;
    let mut anticholinergics = 0;

    for med in medications {
        let doses = med.daily_doses();
        total_doses += doses;
        score += doses;
        if let Some(profile) = reference.resolve(&med.name) {
            if profile.sedative_score > 0 {
                score += 7;
                sedatives += 1;
            }
            if profile.anticholinergic_score > 0 {
                score += 5;
                anticholinergics += 1;
            }
        }
    }

    let mut parts = Vec::new();
    if count > 1 {
        parts.push(format!("{count} medications"));
    }
    if total_doses > count {
        parts.push(format!("total of {total_doses} daily doses"));
    }
    if sedatives > 0 {
        parts.push(format!("{sedatives} sedative(s)"));
    }
    if anticholinergics > 0 {
        parts.push(format!("{anticholinergics} anticholinergic(s)"));
    }
    if sedatives >= 2 {
        score += 10;
        parts.push("sedative synergy penalty applied".to_string());
    }

    let band = match score {
        s if s <= 7 => ScoreBand::Low,
        s if s <= 15 => ScoreBand::Moderate,
        _ => ScoreBand::High,
    };
    let explanation = if parts.is_empty() {
        "Low cognitive burden".to_string()
    } else {
        format!("Cognitive burden due to {}", parts.join(", "))
    };

    CognitiveLoadScore {
        score,
        band,
        explanation,
    }
}

/// Everything regimen-related in one summary.
pub fn summarize(
    medications: &[MedicationEntry],
    patient: &PatientContext,
    times: &ScheduleTimes,
) -> RegimenSummary {
    let predicted_adherence = predict_adherence(medications, patient);
    let caregiver_warning = (!patient.caregiver_present
        && predicted_adherence < CAREGIVER_ADHERENCE_THRESHOLD)
        .then(|| ActionTemplates::caregiver_warning(predicted_adherence));

    RegimenSummary {
        pill_burden: pill_burden(medications),
        predicted_adherence,
        memory_actions_per_day: memory_actions_per_day(medications),
        schedule: daily_schedule(medications, times),
        simplification: simplification_recommendations(medications),
        caregiver_warning,
    }
}
