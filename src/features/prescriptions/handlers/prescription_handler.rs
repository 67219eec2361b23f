use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, AppQuery};
use crate::features::prescriptions::dtos::{
    FinalizePrescriptionDto, FinalizePrescriptionResponseDto, ListPrescriptionsQuery,
};
use crate::features::prescriptions::models::Prescription;
use crate::features::prescriptions::services::PrescriptionService;
use crate::shared::types::{ApiResponse, Meta};

#[utoipa::path(
    post,
    path = "/api/prescription/finalize",
    request_body = FinalizePrescriptionDto,
    responses(
        (status = 201, description = "Prescription sent to the patient", body = ApiResponse<FinalizePrescriptionResponseDto>),
        (status = 400, description = "Validation error")
    ),
    tag = "prescriptions"
)]
pub async fn finalize_prescription(
    State(service): State<Arc<PrescriptionService>>,
    AppJson(dto): AppJson<FinalizePrescriptionDto>,
) -> Result<(StatusCode, Json<ApiResponse<FinalizePrescriptionResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let (response, message) = service.finalize(dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(response), Some(message), None)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/prescription/list",
    params(ListPrescriptionsQuery),
    responses(
        (status = 200, description = "Prescriptions, newest first", body = ApiResponse<Vec<Prescription>>),
        (status = 400, description = "Invalid query parameters")
    ),
    tag = "prescriptions"
)]
pub async fn list_prescriptions(
    State(service): State<Arc<PrescriptionService>>,
    AppQuery(query): AppQuery<ListPrescriptionsQuery>,
) -> Result<Json<ApiResponse<Vec<Prescription>>>> {
    let prescriptions = service.list(query.patient_id).await;
    let total = prescriptions.len();

    Ok(Json(ApiResponse::success(
        Some(prescriptions),
        None,
        Some(Meta::total(total)),
    )))
}

#[utoipa::path(
    put,
    path = "/api/prescription/{id}/read",
    params(
        ("id" = String, Path, description = "Prescription ID")
    ),
    responses(
        (status = 200, description = "Prescription marked as read", body = ApiResponse<Prescription>),
        (status = 404, description = "Prescription not found")
    ),
    tag = "prescriptions"
)]
pub async fn mark_prescription_read(
    State(service): State<Arc<PrescriptionService>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Prescription>>> {
    let prescription = service.mark_read(&id).await?;
    Ok(Json(ApiResponse::success(
        Some(prescription),
        Some("Prescription marked as read".to_string()),
        None,
    )))
}
