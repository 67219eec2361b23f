mod streaming_service;
mod video_service;
mod video_store;

pub use streaming_service::StreamingService;
pub use video_service::{PendingUpload, VideoService};
pub use video_store::VideoStore;
