//! Triage prompts for the hosted model.
//!
//! The model is asked for a JSON object constrained by [`RESPONSE_SCHEMA`].

use crate::suggestion::TriageRequest;

/// Build the triage prompt for a single patient.
pub fn make_triage_prompt(request: &TriageRequest) -> String {
    format!(
        r#"Perform clinical triage for a patient.
Patient Info: Age {}, Gender {}.
Reason for visit: "{}".
Decide if they belong in OPD or EMERGENCY.
Provide a brief priority level (Low, Medium, High) and a one-sentence clinical note."#,
        request.age, request.gender, request.reason
    )
}

/// JSON schema the model response must satisfy.
pub const RESPONSE_SCHEMA: &str = r#"{
  "type": "OBJECT",
  "properties": {
    "department": { "type": "STRING", "description": "Either 'OPD' or 'EMERGENCY'" },
    "priority": { "type": "STRING", "description": "Low, Medium, or High" },
    "note": { "type": "STRING", "description": "Concise medical note" }
  },
  "required": ["department", "priority", "note"]
}"#;
