use utoipa::{Modify, OpenApi};

use crate::features::prescriptions::{
    dtos as prescriptions_dtos, handlers as prescriptions_handlers,
    models as prescriptions_models,
};
use crate::features::videos::{
    dtos as videos_dtos, handlers as videos_handlers, models as videos_models,
};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Videos
        videos_handlers::upload_video,
        videos_handlers::list_videos,
        videos_handlers::get_video,
        videos_handlers::update_video_status,
        videos_handlers::reconcile_videos,
        videos_handlers::stream_video,
        // Prescriptions
        prescriptions_handlers::finalize_prescription,
        prescriptions_handlers::list_prescriptions,
        prescriptions_handlers::mark_prescription_read,
    ),
    components(
        schemas(
            // Shared
            Meta,
            // Videos
            videos_models::VideoRecord,
            videos_models::Caption,
            videos_models::WatchStatus,
            videos_dtos::UploadVideoDto,
            videos_dtos::UploadVideoResponseDto,
            videos_dtos::PatientVideoDto,
            videos_dtos::StatusUpdateResponseDto,
            videos_dtos::ReconcileResponseDto,
            // Prescriptions
            prescriptions_models::Prescription,
            prescriptions_dtos::FinalizePrescriptionDto,
            prescriptions_dtos::FinalizePrescriptionResponseDto,
            // Response wrappers
            ApiResponse<videos_dtos::UploadVideoResponseDto>,
            ApiResponse<Vec<videos_dtos::PatientVideoDto>>,
            ApiResponse<videos_models::VideoRecord>,
            ApiResponse<videos_dtos::StatusUpdateResponseDto>,
            ApiResponse<videos_dtos::ReconcileResponseDto>,
            ApiResponse<prescriptions_dtos::FinalizePrescriptionResponseDto>,
            ApiResponse<Vec<prescriptions_models::Prescription>>,
            ApiResponse<prescriptions_models::Prescription>,
        )
    ),
    tags(
        (name = "videos", description = "Doctor-recorded video library and range streaming"),
        (name = "prescriptions", description = "Prescriptions sent from doctors to patients"),
    ),
    info(
        title = "CareBridge API",
        version = "1.0.0",
        description = "API documentation for CareBridge",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
