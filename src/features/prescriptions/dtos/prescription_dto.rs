use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct FinalizePrescriptionDto {
    pub patient_id: Option<i64>,

    #[validate(length(min = 1, max = 256, message = "Patient name must be 1-256 characters"))]
    #[schema(example = "Ana Lopez")]
    pub patient_name: String,

    #[validate(length(min = 1, message = "At least one medication is required"))]
    #[schema(example = json!(["Metformin 500mg twice daily"]))]
    pub medications: Vec<String>,

    /// Defaults to "Dr. Smith" when omitted
    pub doctor_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FinalizePrescriptionResponseDto {
    pub prescription_id: String,
    pub medications_count: usize,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListPrescriptionsQuery {
    /// Only prescriptions for this patient
    pub patient_id: Option<i64>,
}
