use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::normalizer;
use super::types::{
    CombinationKey, DrugProfile, DrugProfileRecord, IntegrityIssue, IntegrityReport,
    InteractionRecord, InteractionRecordRaw, ReferenceError, Severity,
};

pub const PROFILES_FILE: &str = "drug_profiles.json";
pub const INTERACTIONS_FILE: &str = "interactions.json";
pub const ALIASES_FILE: &str = "medication_aliases.json";
pub const CATEGORIES_FILE: &str = "therapeutic_categories.json";

/// Free-text variant to canonical generic mapping (loaded from medication_aliases.json).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationAlias {
    pub alias: String,
    pub generic_name: String,
}

/// Named group of canonical drugs sharing a class, used for duplication checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TherapeuticCategory {
    pub name: String,
    pub members: Vec<String>,
}

/// Lowercase variant -> canonical generic name. Many-to-one.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: HashMap<String, String>,
}

impl AliasTable {
    pub fn resolve(&self, variant: &str) -> Option<&str> {
        self.entries.get(variant).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First mapping for a variant wins. A later mapping to a different
    /// drug is refused and returned as a conflict.
    pub(crate) fn insert(&mut self, variant: &str, generic: &str) -> Option<IntegrityIssue> {
        let key = normalizer::clean(variant);
        if key.is_empty() || key == generic {
            return None;
        }
        match self.entries.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(generic.to_string());
                None
            }
            Entry::Occupied(slot) if slot.get() == generic => None,
            Entry::Occupied(slot) => Some(IntegrityIssue::ConflictingAlias {
                alias: slot.key().clone(),
                targets: vec![slot.get().clone(), generic.to_string()],
            }),
        }
    }
}

/// Read-only static tables consumed by the engine.
///
/// Defective rows found while building are quarantined (kept out of the
/// lookup tables) and reported by [`ReferenceData::validate`], so an
/// assessment never sees an out-of-bounds profile or a dangling key.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    catalog: HashMap<String, DrugProfile>,
    interactions: HashMap<CombinationKey, InteractionRecord>,
    aliases: AliasTable,
    categories: Vec<TherapeuticCategory>,
    categories_by_drug: HashMap<String, Vec<String>>,
    issues: Vec<IntegrityIssue>,
}

impl ReferenceData {
    /// Build the tables and run the integrity pass.
    pub fn from_tables(
        profiles: Vec<DrugProfileRecord>,
        interactions: Vec<InteractionRecordRaw>,
        aliases: Vec<MedicationAlias>,
        categories: Vec<TherapeuticCategory>,
    ) -> Self {
        let mut data = Self::default();

        // Brand names on profiles act as aliases, in profile order; the alias
        // file may add more.
        let mut brand_pairs = Vec::new();
        for record in profiles {
            match DrugProfile::try_from(record) {
                Ok(profile) => match data.catalog.entry(profile.generic_name.clone()) {
                    Entry::Occupied(_) => data.issues.push(IntegrityIssue::DuplicateProfile {
                        drug: profile.generic_name,
                    }),
                    Entry::Vacant(slot) => {
                        brand_pairs.extend(
                            profile
                                .brand_names
                                .iter()
                                .map(|b| (b.clone(), profile.generic_name.clone())),
                        );
                        slot.insert(profile);
                    }
                },
                Err(issue) => data.issues.push(issue),
            }
        }

        for (brand, generic) in brand_pairs {
            if let Some(conflict) = data.aliases.insert(&brand, &generic) {
                data.issues.push(conflict);
            }
        }
        for alias in aliases {
            let target = normalizer::clean(&alias.generic_name);
            if data.catalog.contains_key(&target) {
                if let Some(conflict) = data.aliases.insert(&alias.alias, &target) {
                    data.issues.push(conflict);
                }
            } else {
                data.issues.push(IntegrityIssue::UnknownAliasTarget {
                    alias: alias.alias,
                    target,
                });
            }
        }

        for raw in interactions {
            let names: Vec<String> = raw.drugs.iter().map(|d| normalizer::clean(d)).collect();
            let Some(key) = CombinationKey::new(&names).filter(|k| k.len() == names.len()) else {
                data.issues
                    .push(IntegrityIssue::InvalidCombinationSize { drugs: raw.drugs });
                continue;
            };
            if let Some(unknown) = key.members().iter().find(|m| !data.catalog.contains_key(*m)) {
                data.issues.push(IntegrityIssue::UnknownInteractionMember {
                    drugs: key.members().to_vec(),
                    unknown: unknown.clone(),
                });
                continue;
            }
            match data.interactions.entry(key.clone()) {
                Entry::Occupied(_) => data.issues.push(IntegrityIssue::DuplicateInteraction {
                    drugs: key.members().to_vec(),
                }),
                Entry::Vacant(slot) => {
                    slot.insert(InteractionRecord {
                        drugs: key,
                        severity: raw.severity,
                        description: raw.description,
                        mechanism: raw.mechanism,
                        action: raw.action,
                        fall_risk_increase: raw.fall_risk_increase,
                        delirium_risk: raw.delirium_risk,
                        renal_risk: raw.renal_risk,
                    });
                }
            }
        }

        for category in categories {
            let mut members = Vec::new();
            let mut seen = HashSet::new();
            for member in &category.members {
                let name = normalizer::clean(member);
                if !data.catalog.contains_key(&name) {
                    data.issues.push(IntegrityIssue::UnknownCategoryMember {
                        category: category.name.clone(),
                        drug: name,
                    });
                    continue;
                }
                if seen.insert(name.clone()) {
                    data.categories_by_drug
                        .entry(name.clone())
                        .or_default()
                        .push(category.name.clone());
                    members.push(name);
                }
            }
            data.categories.push(TherapeuticCategory {
                name: category.name,
                members,
            });
        }

        for issue in &data.issues {
            tracing::warn!(issue = %issue, "Reference data integrity issue");
        }

        data
    }

    /// Load reference data from the four JSON files in `dir`.
    pub fn load(dir: &Path) -> Result<Self, ReferenceError> {
        let data = Self::from_tables(
            read_table(dir, PROFILES_FILE)?,
            read_table(dir, INTERACTIONS_FILE)?,
            read_table(dir, ALIASES_FILE)?,
            read_table(dir, CATEGORIES_FILE)?,
        );
        tracing::info!(
            dir = %dir.display(),
            drugs = data.catalog.len(),
            interactions = data.interactions.len(),
            issues = data.issues.len(),
            "Reference data loaded"
        );
        Ok(data)
    }

    /// Tables compiled into the binary.
    pub fn bundled() -> Result<Self, ReferenceError> {
        Ok(Self::from_tables(
            parse_table(PROFILES_FILE, include_str!("../../resources/drug_profiles.json"))?,
            parse_table(
                INTERACTIONS_FILE,
                include_str!("../../resources/interactions.json"),
            )?,
            parse_table(
                ALIASES_FILE,
                include_str!("../../resources/medication_aliases.json"),
            )?,
            parse_table(
                CATEGORIES_FILE,
                include_str!("../../resources/therapeutic_categories.json"),
            )?,
        ))
    }

    /// Small synthetic tables for tests (no file I/O).
    pub fn load_test() -> Self {
        let profiles = vec![
            test_profile("acetaminophen", "analgesic", 0, 0, 0, false, &["Tylenol"]),
            test_profile("warfarin", "anticoagulant", 1, 0, 0, false, &["Coumadin"]),
            test_profile(
                "sulfamethoxazole-trimethoprim",
                "sulfonamide_antibiotic",
                0,
                0,
                0,
                false,
                &["Bactrim"],
            ),
            test_profile("aspirin", "antiplatelet", 0, 0, 0, false, &[]),
            test_profile("ibuprofen", "nsaid", 0, 0, 0, false, &["Advil", "Motrin"]),
            test_profile("naproxen", "nsaid", 0, 0, 0, false, &["Aleve"]),
            test_profile("lisinopril", "ace_inhibitor", 0, 0, 0, false, &["Zestril"]),
            test_profile("enalapril", "ace_inhibitor", 0, 0, 0, false, &[]),
            test_profile("furosemide", "loop_diuretic", 1, 0, 1, false, &["Lasix"]),
            test_profile("metformin", "biguanide", 0, 0, 0, false, &[]),
            test_profile(
                "diphenhydramine",
                "first_generation_antihistamine",
                3,
                3,
                3,
                true,
                &["Benadryl"],
            ),
            test_profile("zolpidem", "z_drug_hypnotic", 0, 3, 2, true, &["Ambien"]),
            test_profile("amitriptyline", "tricyclic_antidepressant", 3, 3, 3, true, &[]),
            test_profile("oxybutynin", "urinary_antimuscarinic", 3, 1, 1, true, &[]),
            test_profile("diazepam", "benzodiazepine", 0, 3, 3, true, &["Valium"]),
            test_profile("tolterodine", "urinary_antimuscarinic", 2, 0, 1, false, &[]),
            test_profile("metoprolol", "beta_blocker", 0, 0, 1, false, &["Toprol"]),
        ];

        let interactions = vec![
            test_interaction(
                &["warfarin", "sulfamethoxazole-trimethoprim"],
                Severity::Critical,
                "Bactrim increases warfarin effect",
            ),
            test_interaction(
                &["warfarin", "ibuprofen"],
                Severity::High,
                "NSAIDs increase bleeding risk with warfarin",
            ),
            test_interaction(
                &["warfarin", "aspirin"],
                Severity::High,
                "Additive bleeding risk",
            ),
            test_interaction(
                &["ibuprofen", "aspirin"],
                Severity::Moderate,
                "GI bleeding; reduced cardioprotection",
            ),
            test_interaction(
                &["ibuprofen", "lisinopril"],
                Severity::Moderate,
                "NSAIDs blunt ACE inhibitor effect",
            ),
            test_interaction(
                &["ibuprofen", "furosemide"],
                Severity::Moderate,
                "NSAIDs blunt diuretic effect",
            ),
            test_interaction(
                &["lisinopril", "furosemide", "ibuprofen"],
                Severity::Critical,
                "Triple Whammy: acute kidney injury",
            ),
            test_interaction(
                &["metformin", "furosemide"],
                Severity::Low,
                "Diuretics may raise metformin levels",
            ),
            test_interaction(
                &["diazepam", "zolpidem"],
                Severity::High,
                "Duplicate GABA-A sedation",
            ),
        ];

        let aliases = vec![
            MedicationAlias {
                alias: "paracetamol".into(),
                generic_name: "acetaminophen".into(),
            },
            MedicationAlias {
                alias: "tmp/smx".into(),
                generic_name: "sulfamethoxazole-trimethoprim".into(),
            },
            MedicationAlias {
                alias: "toprol xl".into(),
                generic_name: "metoprolol".into(),
            },
        ];

        let categories = vec![
            TherapeuticCategory {
                name: "ace_inhibitors".into(),
                members: vec!["lisinopril".into(), "enalapril".into()],
            },
            TherapeuticCategory {
                name: "nsaids".into(),
                members: vec!["ibuprofen".into(), "naproxen".into()],
            },
            TherapeuticCategory {
                name: "hypnotic_sedatives".into(),
                members: vec!["zolpidem".into(), "diazepam".into()],
            },
        ];

        Self::from_tables(profiles, interactions, aliases, categories)
    }

    /// Integrity report produced when the tables were built. Independent of
    /// any assessment call.
    pub fn validate(&self) -> IntegrityReport {
        IntegrityReport {
            issues: self.issues.clone(),
        }
    }

    /// Canonical identity for a free-text name.
    pub fn normalize(&self, raw: &str) -> String {
        normalizer::normalize(raw, &self.aliases)
    }

    pub fn profile(&self, canonical: &str) -> Option<&DrugProfile> {
        self.catalog.get(canonical)
    }

    /// Normalize then look up.
    pub fn resolve(&self, raw: &str) -> Option<&DrugProfile> {
        self.profile(&self.normalize(raw))
    }

    pub fn interaction(&self, key: &CombinationKey) -> Option<&InteractionRecord> {
        self.interactions.get(key)
    }

    pub fn categories_of(&self, canonical: &str) -> &[String] {
        self.categories_by_drug
            .get(canonical)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn categories(&self) -> &[TherapeuticCategory] {
        &self.categories
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn drug_count(&self) -> usize {
        self.catalog.len()
    }

    pub fn interaction_count(&self) -> usize {
        self.interactions.len()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &DrugProfile> {
        self.catalog.values()
    }

    pub fn interaction_records(&self) -> impl Iterator<Item = &InteractionRecord> {
        self.interactions.values()
    }
}

fn read_table<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T, ReferenceError> {
    let path = dir.join(file);
    let json = std::fs::read_to_string(&path).map_err(|e| {
        ReferenceError::ReferenceDataLoad(path.display().to_string(), e.to_string())
    })?;
    parse_table(file, &json)
}

fn parse_table<T: DeserializeOwned>(file: &str, json: &str) -> Result<T, ReferenceError> {
    serde_json::from_str(json)
        .map_err(|e| ReferenceError::ReferenceDataParse(file.to_string(), e.to_string()))
}

fn test_profile(
    name: &str,
    class: &str,
    acb: i64,
    sedative: i64,
    fall: i64,
    beers: bool,
    brands: &[&str],
) -> DrugProfileRecord {
    DrugProfileRecord {
        generic_name: name.into(),
        brand_names: brands.iter().map(|b| b.to_string()).collect(),
        drug_class: class.into(),
        anticholinergic_score: acb,
        sedative_score: sedative,
        fall_risk_score: fall,
        beers_flag: beers,
        renal_adjustment: false,
        metabolic_pathways: vec![],
        beers_rationale: beers.then(|| format!("{name} is potentially inappropriate")),
        beers_recommendation: beers.then(|| "Avoid".to_string()),
    }
}

fn test_interaction(
    drugs: &[&str],
    severity: Severity,
    description: &str,
) -> InteractionRecordRaw {
    InteractionRecordRaw {
        drugs: drugs.iter().map(|d| d.to_string()).collect(),
        severity,
        description: description.into(),
        mechanism: String::new(),
        action: format!("Review {}", drugs.join(" + ")),
        fall_risk_increase: 0,
        delirium_risk: false,
        renal_risk: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_are_clean() {
        let data = ReferenceData::load_test();
        assert!(data.validate().is_clean(), "{:?}", data.validate().issues);
        assert_eq!(data.drug_count(), 17);
        assert_eq!(data.interaction_count(), 9);
    }

    #[test]
    fn bundled_tables_are_clean() {
        let data = ReferenceData::bundled().unwrap();
        let report = data.validate();
        assert!(report.is_clean(), "{:?}", report.issues);
        assert!(data.drug_count() > 50);
        assert!(data.interaction_count() > 100);
    }

    #[test]
    fn bundled_profiles_respect_bounds() {
        let data = ReferenceData::bundled().unwrap();
        for p in data.profiles() {
            assert!(p.anticholinergic_score <= 3, "{}", p.generic_name);
            assert!(p.sedative_score <= 3, "{}", p.generic_name);
            assert!(p.fall_risk_score <= 10, "{}", p.generic_name);
        }
    }

    #[test]
    fn bundled_interaction_members_all_resolve() {
        let data = ReferenceData::bundled().unwrap();
        for record in data.interaction_records() {
            for member in record.drugs.members() {
                assert!(data.profile(member).is_some(), "dangling {member}");
            }
        }
    }

    #[test]
    fn resolve_brand_case_insensitive() {
        let data = ReferenceData::load_test();
        assert_eq!(data.resolve("BENADRYL").unwrap().generic_name, "diphenhydramine");
        assert_eq!(data.resolve("Tylenol").unwrap().generic_name, "acetaminophen");
        assert!(data.resolve("UnknownBrand").is_none());
    }

    #[test]
    fn out_of_bounds_profile_is_quarantined() {
        let bad = test_profile("badrug", "test", 7, 0, 0, false, &[]);
        let data = ReferenceData::from_tables(
            vec![bad, test_profile("aspirin", "antiplatelet", 0, 0, 0, false, &[])],
            vec![],
            vec![],
            vec![],
        );
        assert!(data.profile("badrug").is_none());
        let report = data.validate();
        assert_eq!(report.issues.len(), 1);
        assert!(matches!(
            report.issues[0],
            IntegrityIssue::ScoreOutOfBounds { value: 7, .. }
        ));
    }

    #[test]
    fn dangling_references_are_reported() {
        let data = ReferenceData::from_tables(
            vec![test_profile("aspirin", "antiplatelet", 0, 0, 0, false, &[])],
            vec![
                test_interaction(&["aspirin", "ghost"], Severity::High, "x"),
                test_interaction(&["aspirin"], Severity::High, "x"),
            ],
            vec![MedicationAlias {
                alias: "phantom".into(),
                generic_name: "ghost".into(),
            }],
            vec![TherapeuticCategory {
                name: "antiplatelets".into(),
                members: vec!["aspirin".into(), "ghost".into()],
            }],
        );
        let issues = data.validate().issues;
        assert_eq!(issues.len(), 4);
        assert!(issues.iter().any(|i| matches!(
            i,
            IntegrityIssue::UnknownInteractionMember { unknown, .. } if unknown == "ghost"
        )));
        assert!(issues
            .iter()
            .any(|i| matches!(i, IntegrityIssue::InvalidCombinationSize { .. })));
        assert!(issues
            .iter()
            .any(|i| matches!(i, IntegrityIssue::UnknownAliasTarget { .. })));
        assert!(issues
            .iter()
            .any(|i| matches!(i, IntegrityIssue::UnknownCategoryMember { .. })));
        assert_eq!(data.interaction_count(), 0);
        assert_eq!(data.categories()[0].members, vec!["aspirin".to_string()]);
    }

    #[test]
    fn conflicting_brand_keeps_first_profile_and_is_reported() {
        for _ in 0..50 {
            let data = ReferenceData::from_tables(
                vec![
                    test_profile("alpha", "test", 0, 0, 0, false, &["Dupbrand"]),
                    test_profile("beta", "test", 0, 0, 0, false, &["Dupbrand", "Betabrand"]),
                ],
                vec![],
                vec![
                    MedicationAlias {
                        alias: "betabrand".into(),
                        generic_name: "alpha".into(),
                    },
                    MedicationAlias {
                        alias: "DUPBRAND".into(),
                        generic_name: "alpha".into(),
                    },
                ],
                vec![],
            );
            assert_eq!(data.normalize("Dupbrand"), "alpha");
            assert_eq!(data.normalize("Betabrand"), "beta");
            let issues = data.validate().issues;
            assert_eq!(
                issues,
                vec![
                    IntegrityIssue::ConflictingAlias {
                        alias: "dupbrand".into(),
                        targets: vec!["alpha".into(), "beta".into()],
                    },
                    IntegrityIssue::ConflictingAlias {
                        alias: "betabrand".into(),
                        targets: vec!["beta".into(), "alpha".into()],
                    },
                ]
            );
        }
    }

    #[test]
    fn profile_names_are_whitespace_collapsed() {
        let data = ReferenceData::from_tables(
            vec![
                test_profile("  Sulfa   Trim ", "test", 0, 0, 0, false, &[]),
                test_profile("warfarin", "anticoagulant", 1, 0, 0, false, &[]),
            ],
            vec![test_interaction(&["sulfa trim", "warfarin"], Severity::Critical, "x")],
            vec![],
            vec![],
        );
        assert!(data.validate().is_clean(), "{:?}", data.validate().issues);
        assert!(data.profile("sulfa trim").is_some());
        assert!(data.resolve("Sulfa  Trim").is_some());
        assert_eq!(data.interaction_count(), 1);
    }

    #[test]
    fn duplicate_interaction_keeps_first() {
        let data = ReferenceData::from_tables(
            vec![
                test_profile("aspirin", "antiplatelet", 0, 0, 0, false, &[]),
                test_profile("warfarin", "anticoagulant", 1, 0, 0, false, &[]),
            ],
            vec![
                test_interaction(&["aspirin", "warfarin"], Severity::High, "first"),
                test_interaction(&["warfarin", "aspirin"], Severity::Low, "second"),
            ],
            vec![],
            vec![],
        );
        let key = CombinationKey::new(["warfarin", "aspirin"]).unwrap();
        assert_eq!(data.interaction(&key).unwrap().description, "first");
        assert_eq!(data.validate().issues.len(), 1);
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PROFILES_FILE),
            r#"[{"generic_name":"warfarin","drug_class":"anticoagulant","anticholinergic_score":1,"brand_names":["Coumadin"]},
               {"generic_name":"aspirin","drug_class":"antiplatelet"}]"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join(INTERACTIONS_FILE),
            r#"[{"drugs":["aspirin","warfarin"],"severity":"high","description":"bleeding"}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join(ALIASES_FILE), "[]").unwrap();
        std::fs::write(dir.path().join(CATEGORIES_FILE), "[]").unwrap();

        let data = ReferenceData::load(dir.path()).unwrap();
        assert_eq!(data.drug_count(), 2);
        assert_eq!(data.resolve("coumadin").unwrap().anticholinergic_score, 1);
        let key = CombinationKey::new(["warfarin", "aspirin"]).unwrap();
        assert_eq!(data.interaction(&key).unwrap().severity, Severity::High);
    }

    #[test]
    fn load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReferenceData::load(dir.path()).unwrap_err();
        assert!(matches!(err, ReferenceError::ReferenceDataLoad(..)));
    }

    #[test]
    fn load_malformed_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PROFILES_FILE), "{not json").unwrap();
        let err = ReferenceData::load(dir.path()).unwrap_err();
        assert!(matches!(err, ReferenceError::ReferenceDataParse(ref f, _) if f == PROFILES_FILE));
    }
}
