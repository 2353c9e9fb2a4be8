use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::normalizer;

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Interaction severity. Variant order is ascending so `Ord` compares by danger.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Moderate,
    High,
    Critical,
}

impl Severity {
    /// Report order: most severe first.
    pub const DESCENDING: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Moderate,
        Severity::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

// ---------------------------------------------------------------------------
// RiskLevel
// ---------------------------------------------------------------------------

/// Overall ordinal risk shared by every sub-assessment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    #[default]
    None,
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Low => 1,
            Self::Moderate => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Low => "LOW",
            Self::Moderate => "MODERATE",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

// ---------------------------------------------------------------------------
// Burden dimensions and tiers
// ---------------------------------------------------------------------------

/// Severity tier of a burden total. `Minimal` is the fall-risk floor,
/// `None` the floor of the other two dimensions; both rank as zero.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BurdenTier {
    None,
    Minimal,
    Low,
    Moderate,
    High,
    Critical,
}

impl BurdenTier {
    pub fn risk_level(&self) -> RiskLevel {
        match self {
            Self::None | Self::Minimal => RiskLevel::None,
            Self::Low => RiskLevel::Low,
            Self::Moderate => RiskLevel::Moderate,
            Self::High => RiskLevel::High,
            Self::Critical => RiskLevel::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Minimal => "minimal",
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BurdenDimension {
    Anticholinergic,
    Sedative,
    FallRisk,
}

impl BurdenDimension {
    /// Lower bounds, highest tier first. The first bound the total reaches wins.
    fn thresholds(&self) -> &'static [(u32, BurdenTier)] {
        match self {
            Self::Anticholinergic | Self::Sedative => &[
                (5, BurdenTier::Critical),
                (3, BurdenTier::High),
                (2, BurdenTier::Moderate),
                (1, BurdenTier::Low),
            ],
            Self::FallRisk => &[
                (15, BurdenTier::Critical),
                (10, BurdenTier::High),
                (5, BurdenTier::Moderate),
                (1, BurdenTier::Low),
            ],
        }
    }

    fn floor(&self) -> BurdenTier {
        match self {
            Self::FallRisk => BurdenTier::Minimal,
            _ => BurdenTier::None,
        }
    }

    pub fn classify(&self, total: u32) -> BurdenTier {
        self.thresholds()
            .iter()
            .find(|(min, _)| total >= *min)
            .map(|(_, tier)| *tier)
            .unwrap_or_else(|| self.floor())
    }

    /// The per-drug score this dimension reads from a profile.
    pub fn score_of(&self, profile: &DrugProfile) -> u32 {
        match self {
            Self::Anticholinergic => u32::from(profile.anticholinergic_score),
            Self::Sedative => u32::from(profile.sedative_score),
            Self::FallRisk => u32::from(profile.fall_risk_score),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anticholinergic => "anticholinergic",
            Self::Sedative => "sedative",
            Self::FallRisk => "fall_risk",
        }
    }
}

// ---------------------------------------------------------------------------
// DrugProfile
// ---------------------------------------------------------------------------

pub const MAX_ANTICHOLINERGIC_SCORE: u8 = 3;
pub const MAX_SEDATIVE_SCORE: u8 = 3;
pub const MAX_FALL_RISK_SCORE: u8 = 10;

/// Profile row as stored in `drug_profiles.json`, before bounds are checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugProfileRecord {
    pub generic_name: String,
    #[serde(default)]
    pub brand_names: Vec<String>,
    pub drug_class: String,
    #[serde(default)]
    pub anticholinergic_score: i64,
    #[serde(default)]
    pub sedative_score: i64,
    #[serde(default)]
    pub fall_risk_score: i64,
    #[serde(default)]
    pub beers_flag: bool,
    #[serde(default)]
    pub renal_adjustment: bool,
    #[serde(default)]
    pub metabolic_pathways: Vec<String>,
    #[serde(default)]
    pub beers_rationale: Option<String>,
    #[serde(default)]
    pub beers_recommendation: Option<String>,
}

/// Immutable catalog entry. Only constructible through `TryFrom<DrugProfileRecord>`,
/// so every profile in a catalog has in-bounds scores.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DrugProfile {
    pub generic_name: String,
    pub brand_names: Vec<String>,
    pub drug_class: String,
    pub anticholinergic_score: u8,
    pub sedative_score: u8,
    pub fall_risk_score: u8,
    pub beers_flag: bool,
    pub renal_adjustment: bool,
    pub metabolic_pathways: Vec<String>,
    pub beers_rationale: Option<String>,
    pub beers_recommendation: Option<String>,
}

impl DrugProfile {
    pub fn is_dual_mechanism(&self) -> bool {
        self.anticholinergic_score > 0 && self.sedative_score > 0
    }
}

fn bounded(
    drug: &str,
    field: &'static str,
    value: i64,
    max: u8,
) -> Result<u8, IntegrityIssue> {
    if (0..=i64::from(max)).contains(&value) {
        Ok(value as u8)
    } else {
        Err(IntegrityIssue::ScoreOutOfBounds {
            drug: drug.to_string(),
            field,
            value,
            max,
        })
    }
}

impl TryFrom<DrugProfileRecord> for DrugProfile {
    type Error = IntegrityIssue;

    fn try_from(record: DrugProfileRecord) -> Result<Self, Self::Error> {
        let name = normalizer::clean(&record.generic_name);
        if name.is_empty() {
            return Err(IntegrityIssue::BlankProfileName);
        }
        let anticholinergic_score = bounded(
            &name,
            "anticholinergic_score",
            record.anticholinergic_score,
            MAX_ANTICHOLINERGIC_SCORE,
        )?;
        let sedative_score =
            bounded(&name, "sedative_score", record.sedative_score, MAX_SEDATIVE_SCORE)?;
        let fall_risk_score = bounded(
            &name,
            "fall_risk_score",
            record.fall_risk_score,
            MAX_FALL_RISK_SCORE,
        )?;

        let mut metabolic_pathways = record.metabolic_pathways;
        metabolic_pathways.sort();
        metabolic_pathways.dedup();

        Ok(Self {
            generic_name: name,
            brand_names: record.brand_names,
            drug_class: record.drug_class,
            anticholinergic_score,
            sedative_score,
            fall_risk_score,
            beers_flag: record.beers_flag,
            renal_adjustment: record.renal_adjustment,
            metabolic_pathways,
            beers_rationale: record.beers_rationale,
            beers_recommendation: record.beers_recommendation,
        })
    }
}

// ---------------------------------------------------------------------------
// CombinationKey & InteractionRecord
// ---------------------------------------------------------------------------

/// Unordered set of 2 or 3 canonical drug names, stored sorted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CombinationKey(Vec<String>);

impl CombinationKey {
    /// Build a key from any ordering of names. Returns `None` unless the
    /// distinct names number exactly 2 or 3.
    pub fn new<I, S>(names: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut members: Vec<String> = names
            .into_iter()
            .map(|n| n.as_ref().to_string())
            .collect();
        members.sort();
        members.dedup();
        if (2..=3).contains(&members.len()) {
            Some(Self(members))
        } else {
            None
        }
    }

    pub fn members(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|m| m == name)
    }
}

/// Interaction row as stored in `interactions.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecordRaw {
    pub drugs: Vec<String>,
    pub severity: Severity,
    pub description: String,
    #[serde(default)]
    pub mechanism: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub fall_risk_increase: u32,
    #[serde(default)]
    pub delirium_risk: bool,
    #[serde(default)]
    pub renal_risk: bool,
}

/// Structured interaction record. `fall_risk_increase`, `delirium_risk` and
/// `renal_risk` are display fields and never feed any score.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InteractionRecord {
    pub drugs: CombinationKey,
    pub severity: Severity,
    pub description: String,
    pub mechanism: String,
    pub action: String,
    pub fall_risk_increase: u32,
    pub delirium_risk: bool,
    pub renal_risk: bool,
}

impl InteractionRecord {
    pub fn is_triple(&self) -> bool {
        self.drugs.len() == 3
    }
}

// ---------------------------------------------------------------------------
// Integrity
// ---------------------------------------------------------------------------

/// One data-integrity defect in the static tables.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    BlankProfileName,
    DuplicateProfile { drug: String },
    ScoreOutOfBounds { drug: String, field: &'static str, value: i64, max: u8 },
    InvalidCombinationSize { drugs: Vec<String> },
    UnknownInteractionMember { drugs: Vec<String>, unknown: String },
    DuplicateInteraction { drugs: Vec<String> },
    UnknownAliasTarget { alias: String, target: String },
    ConflictingAlias { alias: String, targets: Vec<String> },
    UnknownCategoryMember { category: String, drug: String },
}

impl std::fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankProfileName => write!(f, "drug profile with blank generic_name"),
            Self::DuplicateProfile { drug } => write!(f, "duplicate drug profile: {drug}"),
            Self::ScoreOutOfBounds { drug, field, value, max } => {
                write!(f, "{drug}: {field}={value} outside 0..={max}")
            }
            Self::InvalidCombinationSize { drugs } => {
                write!(f, "interaction key must name 2 or 3 distinct drugs: {drugs:?}")
            }
            Self::UnknownInteractionMember { drugs, unknown } => {
                write!(f, "interaction {drugs:?} references unknown drug {unknown}")
            }
            Self::DuplicateInteraction { drugs } => {
                write!(f, "interaction key listed more than once: {drugs:?}")
            }
            Self::UnknownAliasTarget { alias, target } => {
                write!(f, "alias {alias} points at unknown drug {target}")
            }
            Self::ConflictingAlias { alias, targets } => {
                write!(f, "alias {alias} maps to more than one drug: {targets:?}")
            }
            Self::UnknownCategoryMember { category, drug } => {
                write!(f, "category {category} lists unknown drug {drug}")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct IntegrityReport {
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One medication as supplied by the caller. Lives for a single assessment call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MedicationEntry {
    pub name: String,
    #[serde(default)]
    pub doses_per_day: Option<u32>,
}

impl MedicationEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doses_per_day: None,
        }
    }

    pub fn with_doses(name: impl Into<String>, doses_per_day: u32) -> Self {
        Self {
            name: name.into(),
            doses_per_day: Some(doses_per_day),
        }
    }

    /// Doses per day used for regimen scoring; unspecified counts as once daily.
    pub fn daily_doses(&self) -> u32 {
        self.doses_per_day.unwrap_or(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PatientContext {
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub cognitive_impairment: bool,
    #[serde(default)]
    pub caregiver_present: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AssessmentRequest {
    pub medications: Vec<MedicationEntry>,
    #[serde(default)]
    pub patient: PatientContext,
}

impl AssessmentRequest {
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            medications: names
                .iter()
                .map(|n| MedicationEntry::new(n.as_ref()))
                .collect(),
            patient: PatientContext::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sub-results
// ---------------------------------------------------------------------------

/// An interaction found in a medication list, with the caller's names for it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InteractionFinding {
    pub medications: Vec<String>,
    pub record: InteractionRecord,
}

/// Interactions grouped by severity. All four tiers are always present.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct InteractionScan {
    pub critical: Vec<InteractionFinding>,
    pub high: Vec<InteractionFinding>,
    pub moderate: Vec<InteractionFinding>,
    pub low: Vec<InteractionFinding>,
    pub pairs_checked: usize,
    pub triples_checked: usize,
}

impl InteractionScan {
    pub fn tier(&self, severity: Severity) -> &[InteractionFinding] {
        match severity {
            Severity::Critical => &self.critical,
            Severity::High => &self.high,
            Severity::Moderate => &self.moderate,
            Severity::Low => &self.low,
        }
    }

    pub(crate) fn tier_mut(&mut self, severity: Severity) -> &mut Vec<InteractionFinding> {
        match severity {
            Severity::Critical => &mut self.critical,
            Severity::High => &mut self.high,
            Severity::Moderate => &mut self.moderate,
            Severity::Low => &mut self.low,
        }
    }

    pub fn total(&self) -> usize {
        self.critical.len() + self.high.len() + self.moderate.len() + self.low.len()
    }

    /// Interactions contribute 4 for any critical finding, 3 for any high, else 0.
    pub fn risk_level(&self) -> RiskLevel {
        if !self.critical.is_empty() {
            RiskLevel::Critical
        } else if !self.high.is_empty() {
            RiskLevel::High
        } else {
            RiskLevel::None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &InteractionFinding> {
        Severity::DESCENDING
            .into_iter()
            .flat_map(move |s| self.tier(s).iter())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BurdenContributor {
    pub name: String,
    pub generic_name: String,
    pub score: u32,
    pub drug_class: String,
}

/// Output shared by the three burden scorers.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BurdenResult {
    pub dimension: BurdenDimension,
    pub total: u32,
    pub tier: BurdenTier,
    /// Age offset folded into `total` (fall risk only; zero elsewhere).
    #[serde(skip_serializing)]
    pub age_offset: u32,
    pub contributing: Vec<BurdenContributor>,
    pub non_contributing: Vec<String>,
    pub unrecognized: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DualMechanismDrug {
    pub name: String,
    pub generic_name: String,
    pub anticholinergic_score: u32,
    pub sedative_score: u32,
    pub combined_score: u32,
}

/// Merged anticholinergic + sedative view with the synergy inflator.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CombinedCnsResult {
    pub anticholinergic_total: u32,
    pub sedative_total: u32,
    pub total: u32,
    pub synergy_multiplier: f64,
    pub effective_burden: f64,
    pub dual_mechanism_medications: Vec<DualMechanismDrug>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct DuplicationResult {
    /// Therapeutic category -> input names, only categories with 2+ members.
    pub therapeutic: BTreeMap<String, Vec<String>>,
    /// Canonical drug -> input names, when one drug was entered under 2+ names.
    pub same_ingredient: BTreeMap<String, Vec<String>>,
}

impl DuplicationResult {
    pub fn has_duplicates(&self) -> bool {
        !self.therapeutic.is_empty() || !self.same_ingredient.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BeersFinding {
    pub name: String,
    pub generic_name: String,
    pub drug_class: String,
    pub rationale: Option<String>,
    pub recommendation: Option<String>,
}

// ---------------------------------------------------------------------------
// Secondary scores
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreBand {
    Low,
    Moderate,
    High,
    VeryHigh,
}

/// Weighted interaction count (display only).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InteractionRiskScore {
    pub score: u32,
    pub band: ScoreBand,
}

/// Medication Cognitive Load Score (display only).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CognitiveLoadScore {
    pub score: u32,
    pub band: ScoreBand,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PillBurden {
    pub total_doses_per_day: u32,
    pub total_medications: usize,
    pub band: ScoreBand,
    pub concern: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScheduleSlot {
    pub label: String,
    pub time: chrono::NaiveTime,
    pub medications: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RegimenSummary {
    pub pill_burden: PillBurden,
    pub predicted_adherence: f64,
    pub memory_actions_per_day: usize,
    pub schedule: Vec<ScheduleSlot>,
    pub simplification: Vec<String>,
    pub caregiver_warning: Option<String>,
}

// ---------------------------------------------------------------------------
// AssessmentResult
// ---------------------------------------------------------------------------

/// Complete report for one assessment call. Built once, never mutated.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AssessmentResult {
    pub assessment_id: Uuid,
    pub recognized: Vec<String>,
    pub unrecognized: Vec<String>,
    pub interactions: InteractionScan,
    pub anticholinergic: BurdenResult,
    pub sedative: BurdenResult,
    pub fall_risk: BurdenResult,
    pub cns: CombinedCnsResult,
    pub duplicates: DuplicationResult,
    pub beers_flagged: Vec<BeersFinding>,
    pub interaction_risk: InteractionRiskScore,
    pub cognitive_load: CognitiveLoadScore,
    pub regimen: RegimenSummary,
    pub overall_risk_level: RiskLevel,
    pub priority_actions: Vec<String>,
    pub requires_immediate_action: bool,
    pub requires_urgent_action: bool,
}

// ---------------------------------------------------------------------------
// Engine trait
// ---------------------------------------------------------------------------

/// Medication safety engine. One call, one independent result.
pub trait SafetyEngine {
    /// Assess a plain list of medication names with no patient context.
    fn assess(&self, medications: &[String]) -> Result<AssessmentResult, InputError>;

    /// Assess medications with doses per day and patient context.
    fn assess_request(&self, request: &AssessmentRequest) -> Result<AssessmentResult, InputError>;

    /// Assess loosely-typed input: must be a JSON array of strings.
    fn assess_json(&self, input: &serde_json::Value) -> Result<AssessmentResult, InputError>;
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Malformed call-time input. Raised before any scoring begins.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Medication input must be a list")]
    NotAList,

    #[error("Medication entry {index} is not a string")]
    NonStringEntry { index: usize },

    #[error("Medication entry {index} is blank")]
    BlankEntry { index: usize },

    #[error("Medication entry {index} exceeds {max} characters")]
    EntryTooLong { index: usize, max: usize },

    #[error("Medication entry {index} contains control characters")]
    ControlCharacters { index: usize },

    #[error("Medication entry {index} has implausible doses per day: {doses}")]
    InvalidDoses { index: usize, doses: u32 },

    #[error("Implausible patient age: {0}")]
    InvalidAge(u32),
}

#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("Reference data load failed ({0}): {1}")]
    ReferenceDataLoad(String, String),

    #[error("Reference data parse failed ({0}): {1}")]
    ReferenceDataParse(String, String),
}
