use axum::{
    extract::{multipart::Field, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::core::error::AppError;
use crate::core::extractor::AppQuery;
use crate::features::videos::dtos::{
    PatientVideoDto, ReconcileResponseDto, StatusUpdateResponseDto, UpdateStatusQuery,
    UploadVideoDto, UploadVideoResponseDto,
};
use crate::features::videos::models::VideoRecord;
use crate::features::videos::services::{PendingUpload, StreamingService, VideoService};
use crate::shared::constants::MAX_TEXT_FIELD_SIZE;
use crate::shared::types::{ApiResponse, Meta};

#[derive(Default)]
struct UploadForm {
    video: Option<PendingUpload>,
    title: Option<String>,
    description: Option<String>,
    subtitles: Option<String>,
}

/// Read a text field chunk by chunk, failing as soon as it passes the cap
async fn read_text(mut field: Field<'_>, name: &str) -> Result<String, AppError> {
    let mut buffer = Vec::new();

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read {} field: {}", name, e)))?
    {
        if buffer.len() + chunk.len() > MAX_TEXT_FIELD_SIZE {
            return Err(AppError::BadRequest(format!(
                "Field '{}' exceeds {} bytes",
                name, MAX_TEXT_FIELD_SIZE
            )));
        }
        buffer.extend_from_slice(&chunk);
    }

    String::from_utf8(buffer)
        .map_err(|_| AppError::BadRequest(format!("Field '{}' is not valid UTF-8", name)))
}

/// Drain the multipart body into `form`. The video body is written straight
/// to disk; text fields are kept in memory.
async fn read_upload_form(
    service: &VideoService,
    multipart: &mut Multipart,
    form: &mut UploadForm,
) -> Result<(), AppError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "video" if form.video.is_none() => {
                let original_filename = field.file_name().map(|s| s.to_string());
                let pending = service
                    .store_body(original_filename.as_deref(), field)
                    .await?;
                form.video = Some(pending);
            }
            "title" => form.title = Some(read_text(field, "title").await?),
            "description" => form.description = Some(read_text(field, "description").await?),
            "subtitles" => form.subtitles = Some(read_text(field, "subtitles").await?),
            _ => {
                debug!("Ignoring multipart field: {}", field_name);
            }
        }
    }

    Ok(())
}

/// Upload a recorded video
///
/// Accepts multipart/form-data with:
/// - `video`: the recording (required)
/// - `title`: shown to the patient (required)
/// - `description`: optional summary
/// - `subtitles`: optional JSON array of captions
#[utoipa::path(
    post,
    path = "/api/videos/upload",
    tag = "videos",
    request_body(
        content = UploadVideoDto,
        content_type = "multipart/form-data",
        description = "Video upload form",
    ),
    responses(
        (status = 201, description = "Video uploaded successfully", body = ApiResponse<UploadVideoResponseDto>),
        (status = 400, description = "Missing video or title"),
        (status = 413, description = "Video too large")
    )
)]
pub async fn upload_video(
    State(service): State<Arc<VideoService>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<UploadVideoResponseDto>>), AppError> {
    let mut form = UploadForm::default();

    if let Err(e) = read_upload_form(&service, &mut multipart, &mut form).await {
        if let Some(pending) = form.video.take() {
            service.discard(pending).await;
        }
        return Err(e);
    }

    let pending = form
        .video
        .ok_or_else(|| AppError::BadRequest("Video file is required".to_string()))?;

    let response = service
        .register_upload(
            pending,
            form.title.unwrap_or_default(),
            form.description.unwrap_or_default(),
            form.subtitles.as_deref(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(response),
            Some("Video uploaded successfully".to_string()),
            None,
        )),
    ))
}

/// List videos for the patient view
#[utoipa::path(
    get,
    path = "/api/videos/list",
    tag = "videos",
    responses(
        (status = 200, description = "Videos in upload order", body = ApiResponse<Vec<PatientVideoDto>>)
    )
)]
pub async fn list_videos(
    State(service): State<Arc<VideoService>>,
) -> Result<Json<ApiResponse<Vec<PatientVideoDto>>>, AppError> {
    let videos = service.list_for_patient().await;
    let total = videos.len();

    Ok(Json(ApiResponse::success(
        Some(videos),
        None,
        Some(Meta::total(total)),
    )))
}

/// Get a video record
#[utoipa::path(
    get,
    path = "/api/videos/{id}",
    tag = "videos",
    params(
        ("id" = String, Path, description = "Video ID")
    ),
    responses(
        (status = 200, description = "Video record", body = ApiResponse<VideoRecord>),
        (status = 404, description = "Video not found")
    )
)]
pub async fn get_video(
    State(service): State<Arc<VideoService>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<VideoRecord>>, AppError> {
    let video = service.get(&id).await?;
    Ok(Json(ApiResponse::success(Some(video), None, None)))
}

/// Mark a video watched or unwatched
#[utoipa::path(
    put,
    path = "/api/videos/{id}/status",
    tag = "videos",
    params(
        ("id" = String, Path, description = "Video ID"),
        UpdateStatusQuery
    ),
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<StatusUpdateResponseDto>),
        (status = 400, description = "Unknown status value"),
        (status = 404, description = "Video not found")
    )
)]
pub async fn update_video_status(
    State(service): State<Arc<VideoService>>,
    Path(id): Path<String>,
    AppQuery(query): AppQuery<UpdateStatusQuery>,
) -> Result<Json<ApiResponse<StatusUpdateResponseDto>>, AppError> {
    let response = service.update_status(&id, &query.status).await?;
    Ok(Json(ApiResponse::success(
        Some(response),
        Some("Status updated".to_string()),
        None,
    )))
}

/// Drop records whose video file is missing
#[utoipa::path(
    post,
    path = "/api/videos/reconcile",
    tag = "videos",
    responses(
        (status = 200, description = "Reconciliation finished", body = ApiResponse<ReconcileResponseDto>)
    )
)]
pub async fn reconcile_videos(
    State(service): State<Arc<VideoService>>,
) -> Result<Json<ApiResponse<ReconcileResponseDto>>, AppError> {
    let response = service.reconcile().await;
    Ok(Json(ApiResponse::success(Some(response), None, None)))
}

/// Stream a video, honouring a single HTTP byte range
#[utoipa::path(
    get,
    path = "/api/videos/stream/{id}",
    tag = "videos",
    params(
        ("id" = String, Path, description = "Video ID"),
        ("Range" = Option<String>, Header, description = "Byte range, e.g. bytes=0-1023")
    ),
    responses(
        (status = 200, description = "Whole file"),
        (status = 206, description = "Requested byte range with Content-Range"),
        (status = 404, description = "Video or its file not found")
    )
)]
pub async fn stream_video(
    State(service): State<Arc<StreamingService>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    // A header that is not visible ASCII is still a Range header, just an unusable one
    let range = headers
        .get(header::RANGE)
        .map(|value| value.to_str().unwrap_or_default());

    let stream = service.open(&id, range).await?;
    Ok(stream.into_response())
}
