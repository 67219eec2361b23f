use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::features::videos::handlers::{
    get_video, list_videos, reconcile_videos, stream_video, update_video_status, upload_video,
};
use crate::features::videos::services::{StreamingService, VideoService};

/// Headroom over the configured upload size for multipart boundaries and text fields
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Create routes for the videos feature
pub fn routes(
    video_service: Arc<VideoService>,
    streaming_service: Arc<StreamingService>,
    max_upload_size: usize,
) -> Router {
    let library = Router::new()
        .route(
            "/api/videos/upload",
            post(upload_video).layer(DefaultBodyLimit::max(
                max_upload_size.saturating_add(MULTIPART_OVERHEAD),
            )),
        )
        .route("/api/videos/list", get(list_videos))
        .route("/api/videos/reconcile", post(reconcile_videos))
        .route("/api/videos/{id}", get(get_video))
        .route("/api/videos/{id}/status", put(update_video_status))
        .with_state(video_service);

    let streaming = Router::new()
        .route("/api/videos/stream/{id}", get(stream_video))
        .with_state(streaming_service);

    library.merge(streaming)
}
