use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::config::{EngineConfig, MAX_DOSES_PER_DAY, MAX_PATIENT_AGE};

use super::burden::{score_anticholinergic, score_fall_risk, score_sedative, screen_beers};
use super::duplication::detect_duplicates;
use super::interactions::{interaction_risk_score, scan_all};
use super::messages::ActionTemplates;
use super::reference::ReferenceData;
use super::regimen;
use super::synergy::combine_cns;
use super::types::{
    AssessmentRequest, AssessmentResult, BeersFinding, BurdenResult, CombinedCnsResult,
    DuplicationResult, InputError, InteractionScan, RiskLevel, SafetyEngine,
};

/// CNS total at which the combined burden becomes a priority action.
const CNS_ACTION_THRESHOLD: u32 = 8;
/// Fall-risk total at which fall prevention becomes a priority action.
const FALL_ACTION_THRESHOLD: u32 = 15;
/// Beers-flagged count at which a Beers review becomes a priority action.
const BEERS_ACTION_THRESHOLD: usize = 3;

/// Default implementation of the safety engine.
/// Holds the shared read-only reference tables; every call is independent.
pub struct DefaultSafetyEngine {
    pub(crate) reference: Arc<ReferenceData>,
    pub(crate) config: EngineConfig,
}

impl DefaultSafetyEngine {
    pub fn new(reference: Arc<ReferenceData>) -> Self {
        Self::with_config(reference, EngineConfig::default())
    }

    pub fn with_config(reference: Arc<ReferenceData>, config: EngineConfig) -> Self {
        Self { reference, config }
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    /// Reject malformed input before any scoring.
    fn validate(&self, request: &AssessmentRequest) -> Result<(), InputError> {
        if let Some(age) = request.patient.age.filter(|a| *a > MAX_PATIENT_AGE) {
            return Err(InputError::InvalidAge(age));
        }
        for (index, entry) in request.medications.iter().enumerate() {
            let name = entry.name.trim();
            if name.is_empty() {
                return Err(InputError::BlankEntry { index });
            }
            if name.chars().count() > self.config.max_name_len {
                return Err(InputError::EntryTooLong {
                    index,
                    max: self.config.max_name_len,
                });
            }
            if name.chars().any(char::is_control) {
                return Err(InputError::ControlCharacters { index });
            }
            if let Some(doses) = entry
                .doses_per_day
                .filter(|d| *d == 0 || *d > MAX_DOSES_PER_DAY)
            {
                return Err(InputError::InvalidDoses { index, doses });
            }
        }
        Ok(())
    }

    /// Deterministic id over the normalized input, so repeated calls on the
    /// same input produce identical results.
    fn assessment_id(&self, request: &AssessmentRequest) -> Uuid {
        let mut material: Vec<String> = request
            .medications
            .iter()
            .map(|m| format!("{}:{}", self.reference.normalize(&m.name), m.daily_doses()))
            .collect();
        let patient = &request.patient;
        material.push(format!(
            "age={:?};impaired={};caregiver={}",
            patient.age, patient.cognitive_impairment, patient.caregiver_present,
        ));
        Uuid::new_v5(&Uuid::NAMESPACE_OID, material.join("|").as_bytes())
    }

    /// Ranked actions in fixed precedence, capped. Never empty.
    fn priority_actions(
        &self,
        interactions: &InteractionScan,
        cns: &CombinedCnsResult,
        fall_risk: &BurdenResult,
        beers: &[BeersFinding],
        duplicates: &DuplicationResult,
    ) -> Vec<String> {
        let mut actions: Vec<String> = interactions
            .critical
            .iter()
            .map(ActionTemplates::critical_interaction)
            .collect();

        if !cns.dual_mechanism_medications.is_empty() {
            actions.push(ActionTemplates::dual_mechanism(&cns.dual_mechanism_medications));
        }
        if cns.total >= CNS_ACTION_THRESHOLD {
            actions.push(ActionTemplates::cns_burden(cns.total, cns.effective_burden));
        }
        if fall_risk.total >= FALL_ACTION_THRESHOLD {
            actions.push(ActionTemplates::fall_risk(fall_risk.total));
        }
        if !interactions.high.is_empty() {
            actions.push(ActionTemplates::high_interactions(&interactions.high));
        }
        if beers.len() >= BEERS_ACTION_THRESHOLD {
            let names: Vec<&str> = beers.iter().map(|b| b.name.as_str()).collect();
            actions.push(ActionTemplates::beers(&names));
        }
        if duplicates.has_duplicates() {
            let groups: Vec<String> = duplicates
                .therapeutic
                .iter()
                .map(|(category, names)| format!("{} ({})", category, names.join(", ")))
                .chain(
                    duplicates
                        .same_ingredient
                        .iter()
                        .map(|(generic, names)| format!("{} entered as {}", generic, names.join(", "))),
                )
                .collect();
            actions.push(ActionTemplates::duplicates(&groups));
        }

        if actions.is_empty() {
            actions.push(ActionTemplates::no_critical_issues());
        }
        actions.truncate(self.config.max_priority_actions.max(1));
        actions
    }
}

impl SafetyEngine for DefaultSafetyEngine {
    fn assess(&self, medications: &[String]) -> Result<AssessmentResult, InputError> {
        self.assess_request(&AssessmentRequest::from_names(medications))
    }

    fn assess_request(&self, request: &AssessmentRequest) -> Result<AssessmentResult, InputError> {
        let start = Instant::now();
        self.validate(request)?;

        let reference = self.reference.as_ref();
        let (recognized, unrecognized): (Vec<String>, Vec<String>) = request
            .medications
            .iter()
            .map(|m| m.name.trim().to_string())
            .partition(|name| reference.resolve(name).is_some());

        for name in &unrecognized {
            tracing::debug!(medication = %name, "Unrecognized medication");
        }

        let interactions = scan_all(reference, &recognized);
        let anticholinergic = score_anticholinergic(reference, &recognized);
        let sedative = score_sedative(reference, &recognized);
        let fall_risk = score_fall_risk(reference, &recognized, request.patient.age);
        let cns = combine_cns(reference, &recognized, &anticholinergic, &sedative);
        let duplicates = detect_duplicates(reference, &recognized);
        let beers_flagged = screen_beers(reference, &recognized);

        let overall_risk_level = [
            interactions.risk_level(),
            anticholinergic.tier.risk_level(),
            sedative.tier.risk_level(),
            fall_risk.tier.risk_level(),
        ]
        .into_iter()
        .max()
        .unwrap_or(RiskLevel::None);

        let priority_actions = self.priority_actions(
            &interactions,
            &cns,
            &fall_risk,
            &beers_flagged,
            &duplicates,
        );

        let interaction_risk = interaction_risk_score(&interactions);
        let cognitive_load = regimen::cognitive_load(reference, &request.medications);
        let regimen = regimen::summarize(
            &request.medications,
            &request.patient,
            &self.config.schedule,
        );

        let ordinal = overall_risk_level.ordinal();
        let result = AssessmentResult {
            assessment_id: self.assessment_id(request),
            recognized,
            unrecognized,
            interactions,
            anticholinergic,
            sedative,
            fall_risk,
            cns,
            duplicates,
            beers_flagged,
            interaction_risk,
            cognitive_load,
            regimen,
            overall_risk_level,
            priority_actions,
            requires_immediate_action: ordinal >= 4,
            requires_urgent_action: ordinal >= 3,
        };

        tracing::info!(
            assessment_id = %result.assessment_id,
            medications = request.medications.len(),
            recognized = result.recognized.len(),
            interactions = result.interactions.total(),
            risk = result.overall_risk_level.as_str(),
            processing_ms = start.elapsed().as_millis() as u64,
            "Medication safety assessment complete"
        );

        Ok(result)
    }

    fn assess_json(&self, input: &serde_json::Value) -> Result<AssessmentResult, InputError> {
        let items = input.as_array().ok_or(InputError::NotAList)?;
        let names = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or(InputError::NonStringEntry { index })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.assess(&names)
    }
}
