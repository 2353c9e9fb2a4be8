//! Medication safety risk engine for elderly polypharmacy.
//!
//! Normalizes free-text medication names, scans pairs and triples for
//! interactions, scores anticholinergic, sedative and fall-risk burden,
//! combines the CNS dimensions with a synergy inflator, flags duplicate
//! therapy and ranks the resulting clinical actions. Reference tables are
//! loaded once and shared read-only across calls.

pub mod burden;
pub mod duplication;
pub mod engine;
pub mod interactions;
pub mod messages;
pub mod normalizer;
pub mod reference;
pub mod regimen;
pub mod synergy;
pub mod types;

pub use engine::DefaultSafetyEngine;
pub use interactions::{find_interaction, scan_all};
pub use reference::ReferenceData;
pub use types::*;
