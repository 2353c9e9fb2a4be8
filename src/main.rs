//! MedBurden command line front end.
//!
//! Collects medication names and patient context, runs one assessment and
//! prints the result as JSON.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use thiserror::Error;

use medburden_lib::config;
use medburden_lib::safety::{
    AssessmentRequest, DefaultSafetyEngine, InputError, MedicationEntry, PatientContext,
    ReferenceError, SafetyEngine,
};

#[derive(Parser)]
#[command(name = "medburden", version)]
#[command(about = "Medication safety risk assessment for elderly polypharmacy")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess a medication list
    Assess {
        /// Medication names, optionally as name:doses_per_day
        #[arg(required = true)]
        medications: Vec<String>,

        /// Patient age in years
        #[arg(short, long)]
        age: Option<u32>,

        /// Patient has cognitive impairment
        #[arg(long)]
        cognitive_impairment: bool,

        /// A caregiver manages the medications
        #[arg(long)]
        caregiver: bool,

        /// Directory holding the reference JSON tables
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Refuse lists longer than this
        #[arg(long, default_value = "25")]
        max_medications: usize,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Check the reference tables for integrity defects
    Validate {
        /// Directory holding the reference JSON tables
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[derive(Error, Debug)]
enum CliError {
    #[error("Invalid doses in '{0}': expected name:doses_per_day")]
    InvalidDoseSpec(String),

    #[error("{count} medications exceeds the limit of {max}")]
    TooManyMedications { count: usize, max: usize },

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error("Output serialization failed: {0}")]
    Output(#[from] serde_json::Error),
}

/// Parse `name` or `name:doses`. A colon not followed by digits is part of the name.
fn parse_entry(raw: &str) -> Result<MedicationEntry, CliError> {
    match raw.rsplit_once(':') {
        Some((name, doses))
            if !doses.trim().is_empty() && doses.trim().bytes().all(|b| b.is_ascii_digit()) =>
        {
            doses
                .trim()
                .parse::<u32>()
                .map(|d| MedicationEntry::with_doses(name, d))
                .map_err(|_| CliError::InvalidDoseSpec(raw.to_string()))
        }
        _ => Ok(MedicationEntry::new(raw)),
    }
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}

fn run(cli: Cli) -> Result<ExitCode, CliError> {
    match cli.command {
        Commands::Assess {
            medications,
            age,
            cognitive_impairment,
            caregiver,
            data_dir,
            max_medications,
            pretty,
        } => {
            if medications.len() > max_medications {
                return Err(CliError::TooManyMedications {
                    count: medications.len(),
                    max: max_medications,
                });
            }
            let request = AssessmentRequest {
                medications: medications
                    .iter()
                    .map(|m| parse_entry(m))
                    .collect::<Result<_, _>>()?,
                patient: PatientContext {
                    age,
                    cognitive_impairment,
                    caregiver_present: caregiver,
                },
            };
            let reference = medburden_lib::load_reference(data_dir.as_deref())?;
            let engine = DefaultSafetyEngine::new(Arc::new(reference));
            let result = engine.assess_request(&request)?;
            println!("{}", to_json(&result, pretty)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate { data_dir } => {
            let reference = medburden_lib::load_reference(data_dir.as_deref())?;
            let report = reference.validate();
            println!("{}", to_json(&report, true)?);
            tracing::info!(
                drugs = reference.drug_count(),
                interactions = reference.interaction_count(),
                issues = report.issues.len(),
                "Reference data validated"
            );
            Ok(if report.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn main() -> ExitCode {
    medburden_lib::init_tracing();
    tracing::debug!("{} v{}", config::APP_NAME, config::APP_VERSION);

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "medburden failed");
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}
