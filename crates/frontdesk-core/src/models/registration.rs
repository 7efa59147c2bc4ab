//! Registration form: the caller-side draft of a patient record.

use thiserror::Error;

use frontdesk_triage::{Priority, SuggestedDepartment, TriageRequest, TriageSuggestion};

use super::record::{Department, Gender, MaritalStatus, PatientRecord, PaymentStatus, TriagePriority};

/// Form validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Patient name is required")]
    MissingName,

    #[error("Patient age is required")]
    MissingAge,

    #[error("Reason for visit is required for triage")]
    MissingReason,
}

/// Registration form state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegistrationForm {
    pub name: String,
    pub contact_number: String,
    pub age: String,
    pub gender: Gender,
    pub marital_status: MaritalStatus,
    pub department: Department,
    pub reason: String,
    pub needs_ultrasound: bool,
    pub payment_status: PaymentStatus,
    pub triage_note: Option<String>,
    pub triage_priority: Option<TriagePriority>,
}

impl RegistrationForm {
    /// Check the mandatory fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        if self.age.trim().is_empty() {
            return Err(ValidationError::MissingAge);
        }
        Ok(())
    }

    /// Build the triage input; needs both age and reason.
    pub fn triage_request(&self) -> Result<TriageRequest, ValidationError> {
        if self.reason.trim().is_empty() {
            return Err(ValidationError::MissingReason);
        }
        if self.age.trim().is_empty() {
            return Err(ValidationError::MissingAge);
        }
        Ok(TriageRequest {
            reason: self.reason.clone(),
            age: self.age.clone(),
            gender: self.gender.as_str().to_string(),
        })
    }

    /// Apply a triage suggestion. A missing suggestion leaves the form as is.
    pub fn apply_triage(&mut self, suggestion: Option<TriageSuggestion>) {
        if let Some(suggestion) = suggestion {
            self.department = suggestion.department.into();
            self.triage_priority = Some(suggestion.priority.into());
            self.triage_note = Some(suggestion.note);
        }
    }

    /// Clear the form back to its defaults.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Build a record from the form. Does not validate.
    pub fn to_record(&self, id: String, token_number: String, timestamp: String) -> PatientRecord {
        PatientRecord {
            id,
            token_number,
            name: self.name.trim().to_string(),
            contact_number: self.contact_number.trim().to_string(),
            age: self.age.trim().to_string(),
            gender: self.gender,
            marital_status: self.marital_status,
            department: self.department,
            reason_for_visit: self.reason.clone(),
            timestamp,
            payment_status: self.payment_status,
            triage_note: self.triage_note.clone(),
            triage_priority: self.triage_priority,
            needs_ultrasound: self.needs_ultrasound,
        }
    }
}

impl From<SuggestedDepartment> for Department {
    fn from(department: SuggestedDepartment) -> Self {
        match department {
            SuggestedDepartment::Opd => Department::Opd,
            SuggestedDepartment::Emergency => Department::Emergency,
        }
    }
}

impl From<Priority> for TriagePriority {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Low => TriagePriority::Low,
            Priority::Medium => TriagePriority::Medium,
            Priority::High => TriagePriority::High,
        }
    }
}
