use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::features::prescriptions::handlers::{
    finalize_prescription, list_prescriptions, mark_prescription_read,
};
use crate::features::prescriptions::services::PrescriptionService;

/// Create routes for the prescriptions feature
pub fn routes(prescription_service: Arc<PrescriptionService>) -> Router {
    Router::new()
        .route("/api/prescription/finalize", post(finalize_prescription))
        .route("/api/prescription/list", get(list_prescriptions))
        .route("/api/prescription/{id}/read", put(mark_prescription_read))
        .with_state(prescription_service)
}
