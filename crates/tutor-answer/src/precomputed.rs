//! Canned answers keyed by trigger phrases.
//!
//! The built-in table can be replaced by a TOML file:
//!
//! ```toml
//! [[entries]]
//! key = "ohm"
//! subject = "electrical"
//! triggers = ["ohm", "ohm's law"]
//! answer = "..."
//! ```
//!
//! Entries are scanned in declared order; the first trigger hit wins.

use figment::providers::{Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;

use tutor_core::error::{Error, Result};
use tutor_core::text::{contains_phrase, tokens};
use tutor_core::Subject;

use crate::templates::Templates;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecomputedEntry {
    pub key: String,
    pub subject: Subject,
    pub triggers: Vec<String>,
    pub answer: String,
}

/// Shape of an answers file: canned entries plus optional template overrides.
#[derive(Debug, Default, Deserialize)]
pub struct AnswersFile {
    #[serde(default)]
    pub entries: Vec<PrecomputedEntry>,
    #[serde(default)]
    pub templates: Option<Templates>,
}

impl AnswersFile {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Configuration(format!("answers file not found: {}", path.display())));
        }
        let file: AnswersFile = Figment::from(Toml::file(path))
            .extract()
            .map_err(|e| Error::Configuration(format!("{}: {e}", path.display())))?;
        if let Some(bad) = file.entries.iter().find(|e| e.answer.trim().is_empty() || e.triggers.is_empty()) {
            return Err(Error::Configuration(format!("entry '{}' needs an answer and triggers", bad.key)));
        }
        Ok(file)
    }
}

#[derive(Debug, Clone)]
struct Compiled {
    entry: PrecomputedEntry,
    triggers: Vec<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct PrecomputedTable {
    entries: Vec<Compiled>,
}

impl PrecomputedTable {
    pub fn new(entries: Vec<PrecomputedEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| {
                let triggers = entry.triggers.iter().map(|t| tokens(t)).filter(|t| !t.is_empty()).collect();
                Compiled { entry, triggers }
            })
            .collect();
        Self { entries }
    }

    pub fn builtin() -> Self {
        Self::new(builtin_entries())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, query: &str) -> Option<&PrecomputedEntry> {
        let words = tokens(query);
        self.entries
            .iter()
            .find(|c| c.triggers.iter().any(|t| contains_phrase(&words, t)))
            .map(|c| &c.entry)
    }
}

fn entry(key: &str, subject: Subject, triggers: &[&str], answer: &str) -> PrecomputedEntry {
    PrecomputedEntry {
        key: key.to_string(),
        subject,
        triggers: triggers.iter().map(|t| t.to_string()).collect(),
        answer: answer.to_string(),
    }
}

fn builtin_entries() -> Vec<PrecomputedEntry> {
    vec![
        entry(
            "ohm",
            Subject::Electrical,
            &["ohm", "ohm's law"],
            "**OHM'S LAW**\n\n\
             **Formula:** U = R × I\n\n\
             - U = voltage (volts)\n\
             - R = resistance (ohms)\n\
             - I = current (amperes)\n\n\
             **Example:** a 100 Ω resistor carrying 0.5 A drops U = 100 × 0.5 = 50 V.\n\n\
             **Applications:** circuit calculations, component sizing, power analysis (P = U × I).",
        ),
        entry(
            "transistor",
            Subject::Electrical,
            &["transistor"],
            "**TRANSISTORS**\n\n\
             **Main types:** bipolar (NPN, PNP) and field-effect (MOSFET).\n\n\
             **Principle:** a three-terminal device where a small signal on the base/gate controls \
             the current between collector/drain and emitter/source.\n\n\
             **Applications:** signal amplification, ON/OFF switching, logic gates.",
        ),
        entry(
            "derivative",
            Subject::Mathematics,
            &["derivative of", "derivatives of", "differentiate"],
            "**DERIVATIVES**\n\n\
             **Definition:** f'(x) = lim(h→0) [f(x+h) − f(x)] / h\n\n\
             **Basic rules:**\n\
             - (xⁿ)' = n·xⁿ⁻¹\n\
             - (sin x)' = cos x\n\
             - (eˣ)' = eˣ\n\
             - (ln x)' = 1/x\n\n\
             **Example:** f(x) = x³ + 2x² − 5x + 1 gives f'(x) = 3x² + 4x − 5.",
        ),
        entry(
            "ph",
            Subject::Chemistry,
            &["ph"],
            "**pH: ACIDITY AND BASICITY**\n\n\
             **Formula:** pH = −log[H⁺]\n\n\
             - pH < 7: acidic\n\
             - pH = 7: neutral\n\
             - pH > 7: basic\n\n\
             **Inverse:** [H⁺] = 10^(−pH). For [H⁺] = 10⁻³ M, pH = 3.",
        ),
    ]
}
