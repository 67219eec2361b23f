//! Doctor-recorded video library.
//!
//! Doctors upload recordings with captions; patients list them, stream them
//! with HTTP range support, and mark them watched. Metadata is kept in a
//! JSON-backed store and reconciled against the files on disk at startup.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/api/videos/upload` | Upload a video (multipart) |
//! | GET | `/api/videos/list` | Patient view of all videos |
//! | GET | `/api/videos/{id}` | Full video record |
//! | PUT | `/api/videos/{id}/status` | Mark watched / unwatched |
//! | POST | `/api/videos/reconcile` | Prune records whose file is missing |
//! | GET | `/api/videos/stream/{id}` | Stream bytes, honouring `Range` |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use routes::routes;
pub use services::{StreamingService, VideoService, VideoStore};
