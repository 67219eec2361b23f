mod video_dto;

pub use video_dto::*;
