use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::core::error::{AppError, Result};
use crate::features::prescriptions::dtos::{
    FinalizePrescriptionDto, FinalizePrescriptionResponseDto,
};
use crate::features::prescriptions::models::Prescription;
use crate::features::prescriptions::services::PrescriptionStore;

pub struct PrescriptionService {
    store: Arc<PrescriptionStore>,
}

impl PrescriptionService {
    pub fn new(store: Arc<PrescriptionStore>) -> Self {
        Self { store }
    }

    /// Record a prescription for a patient. Blank medication lines are dropped
    /// before the non-empty check.
    pub async fn finalize(
        &self,
        dto: FinalizePrescriptionDto,
    ) -> Result<(FinalizePrescriptionResponseDto, String)> {
        let patient_name = dto.patient_name.trim().to_string();
        if patient_name.is_empty() {
            return Err(AppError::Validation("patient_name is required".to_string()));
        }

        let medications: Vec<String> = dto
            .medications
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        if medications.is_empty() {
            return Err(AppError::Validation(
                "At least one medication is required".to_string(),
            ));
        }

        let prescription = self
            .store
            .append(Prescription::new(
                dto.patient_id,
                patient_name,
                dto.doctor_name,
                medications,
            ))
            .await?;

        info!(
            "Prescription {} finalized for {} ({} medications)",
            prescription.id,
            prescription.patient_name,
            prescription.medications.len()
        );

        let message = format!("Prescription sent to {}", prescription.patient_name);
        Ok((
            FinalizePrescriptionResponseDto {
                prescription_id: prescription.id,
                medications_count: prescription.medications.len(),
            },
            message,
        ))
    }

    /// Prescriptions newest first, optionally for one patient
    pub async fn list(&self, patient_id: Option<i64>) -> Vec<Prescription> {
        let mut prescriptions: Vec<Prescription> = self
            .store
            .list()
            .await
            .into_iter()
            .filter(|p| patient_id.is_none() || p.patient_id == patient_id)
            .collect();
        prescriptions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        prescriptions
    }

    pub async fn mark_read(&self, id: &str) -> Result<Prescription> {
        let now = Utc::now();
        let prescription = self.store.update_in_place(id, |p| p.mark_read(now)).await?;
        info!("Prescription {} marked as read", prescription.id);
        Ok(prescription)
    }
}
