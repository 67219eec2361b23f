mod video;

pub use video::{Caption, VideoRecord, WatchStatus};
