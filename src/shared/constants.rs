/// Upper bound on a single multipart field other than the video body
pub const MAX_TEXT_FIELD_SIZE: usize = 64 * 1024;

// =============================================================================
// MEDIA TYPES
// =============================================================================

/// Content type served when the file extension is not recognized
pub const FALLBACK_VIDEO_CONTENT_TYPE: &str = "video/webm";

/// Extension used when an uploaded file name carries none
pub const DEFAULT_VIDEO_EXTENSION: &str = "webm";

/// Known video extensions and the content type served for each
pub const VIDEO_CONTENT_TYPES: &[(&str, &str)] = &[
    ("webm", "video/webm"),
    ("mp4", "video/mp4"),
    ("mov", "video/quicktime"),
    ("avi", "video/x-msvideo"),
];

// =============================================================================
// RECORD DEFAULTS
// =============================================================================

/// Category label attached to every doctor-uploaded video
pub const DEFAULT_VIDEO_KIND: &str = "Doctor Instruction";

/// Doctor name recorded when a prescription does not name one
pub const DEFAULT_DOCTOR_NAME: &str = "Dr. Smith";

/// Status assigned to newly finalized prescriptions
pub const PRESCRIPTION_STATUS_ACTIVE: &str = "active";
