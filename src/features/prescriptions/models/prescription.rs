use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::shared::constants::{DEFAULT_DOCTOR_NAME, PRESCRIPTION_STATUS_ACTIVE};

/// A finalized prescription sent from a doctor to a patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Prescription {
    pub id: String,
    #[serde(default)]
    pub patient_id: Option<i64>,
    pub patient_name: String,
    #[serde(default = "default_doctor_name")]
    pub doctor_name: String,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(deserialize_with = "crate::shared::timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default, deserialize_with = "crate::shared::timestamp::option::deserialize")]
    pub read_at: Option<DateTime<Utc>>,
}

fn default_doctor_name() -> String {
    DEFAULT_DOCTOR_NAME.to_string()
}

fn default_status() -> String {
    PRESCRIPTION_STATUS_ACTIVE.to_string()
}

impl Prescription {
    pub fn new(
        patient_id: Option<i64>,
        patient_name: String,
        doctor_name: Option<String>,
        medications: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            patient_id,
            patient_name,
            doctor_name: doctor_name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(default_doctor_name),
            medications,
            created_at: Utc::now(),
            status: default_status(),
            read: false,
            read_at: None,
        }
    }

    pub fn mark_read(&mut self, now: DateTime<Utc>) {
        self.read = true;
        self.read_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_applies_defaults() {
        let p = Prescription::new(Some(7), "Ana".to_string(), Some("  ".to_string()), vec![]);
        assert_eq!(p.doctor_name, DEFAULT_DOCTOR_NAME);
        assert_eq!(p.status, "active");
        assert!(!p.read);
        assert!(p.read_at.is_none());
        assert!(Uuid::parse_str(&p.id).is_ok());
    }

    #[test]
    fn test_deserialize_legacy_record() {
        let raw = r#"{
            "id": "rx-1",
            "patient_id": null,
            "patient_name": "Ana",
            "medications": ["Metformin 500mg"],
            "created_at": "2025-03-02T09:15:00.250000",
            "read": false
        }"#;

        let p: Prescription = serde_json::from_str(raw).unwrap();
        assert_eq!(p.doctor_name, DEFAULT_DOCTOR_NAME);
        assert_eq!(p.status, "active");
        assert_eq!(p.medications.len(), 1);
        assert!(p.read_at.is_none());
    }
}
