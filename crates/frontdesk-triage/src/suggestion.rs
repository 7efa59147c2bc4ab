//! Triage suggestion types and response parsing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Triage errors.
#[derive(Error, Debug)]
pub enum TriageError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    #[error("Triage backend error: {0}")]
    Backend(String),
}

pub type TriageResult<T> = Result<T, TriageError>;

/// Input handed to a triage provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageRequest {
    pub reason: String,
    pub age: String,
    pub gender: String,
}

/// Department suggested by triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuggestedDepartment {
    #[serde(rename = "OPD")]
    Opd,
    #[serde(rename = "EMERGENCY")]
    Emergency,
}

impl SuggestedDepartment {
    /// Anything other than "EMERGENCY" (case-insensitive) is treated as OPD.
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("EMERGENCY") {
            SuggestedDepartment::Emergency
        } else {
            SuggestedDepartment::Opd
        }
    }
}

/// Priority level suggested by triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Unknown labels fall back to Medium.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Priority::Low,
            "high" => Priority::High,
            _ => Priority::Medium,
        }
    }
}

/// Structured triage suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageSuggestion {
    pub department: SuggestedDepartment,
    pub priority: Priority,
    pub note: String,
}

/// Raw model output before normalization.
#[derive(Debug, Clone, Deserialize)]
struct RawSuggestion {
    department: String,
    priority: String,
    note: String,
}

/// Parse a model response into a suggestion.
pub fn parse_triage_response(text: &str) -> TriageResult<TriageSuggestion> {
    // Models sometimes wrap the object in prose or code fences
    let json_start = text.find('{').ok_or_else(|| {
        TriageError::InvalidFormat("No JSON object found in response".into())
    })?;
    let json_end = text.rfind('}').ok_or_else(|| {
        TriageError::InvalidFormat("No closing brace found in response".into())
    })?;
    if json_end < json_start {
        return Err(TriageError::InvalidFormat(
            "Closing brace precedes opening brace".into(),
        ));
    }

    let raw: RawSuggestion = serde_json::from_str(&text[json_start..=json_end])?;

    Ok(TriageSuggestion {
        department: SuggestedDepartment::from_label(&raw.department),
        priority: Priority::from_label(&raw.priority),
        note: raw.note.trim().to_string(),
    })
}

/// A source of triage suggestions.
pub trait TriageProvider: Send + Sync {
    fn suggest(&self, request: &TriageRequest) -> TriageResult<TriageSuggestion>;
}

/// Ask a provider for a suggestion, treating any failure as "no suggestion".
pub fn suggest_or_none(
    provider: &dyn TriageProvider,
    request: &TriageRequest,
) -> Option<TriageSuggestion> {
    match provider.suggest(request) {
        Ok(suggestion) => Some(suggestion),
        Err(e) => {
            tracing::warn!(error = %e, "Triage suggestion failed");
            None
        }
    }
}

/// Keyword-based provider for testing and offline use.
pub struct MockTriage;

const EMERGENCY_KEYWORDS: &[&str] = &[
    "chest pain",
    "bleeding",
    "unconscious",
    "breath",
    "accident",
    "fracture",
    "seizure",
    "burn",
    "stroke",
    "poison",
];

impl MockTriage {
    /// Classify a request using simple keyword rules.
    pub fn classify(request: &TriageRequest) -> TriageSuggestion {
        let reason = request.reason.to_lowercase();

        if let Some(keyword) = EMERGENCY_KEYWORDS.iter().find(|k| reason.contains(**k)) {
            return TriageSuggestion {
                department: SuggestedDepartment::Emergency,
                priority: Priority::High,
                note: format!("Reported {keyword}; route to emergency for immediate assessment."),
            };
        }

        let priority = match request.age.trim().parse::<u32>() {
            Ok(age) if age >= 65 || age < 5 => Priority::Medium,
            _ => Priority::Low,
        };

        TriageSuggestion {
            department: SuggestedDepartment::Opd,
            priority,
            note: "No red-flag symptoms reported; routine outpatient review.".into(),
        }
    }
}

impl TriageProvider for MockTriage {
    fn suggest(&self, request: &TriageRequest) -> TriageResult<TriageSuggestion> {
        Ok(Self::classify(request))
    }
}
