use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub storage: StorageConfig,
    pub swagger: SwaggerConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub max_upload_size: usize,
}

/// File-backed storage locations for uploaded media and JSON record stores
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding uploaded video files (`{id}.{ext}`)
    pub videos_dir: PathBuf,
    /// JSON file holding the video metadata collection
    pub video_metadata_file: PathBuf,
    /// JSON file holding finalized prescriptions
    pub prescriptions_file: PathBuf,
    /// Upper bound for a single read when streaming video bytes
    pub stream_chunk_size: usize,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
        })
    }
}

impl AppConfig {
    const DEFAULT_MAX_UPLOAD_SIZE: usize = 500 * 1024 * 1024; // 500MB

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        // Parse CORS allowed origins from comma-separated string
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_upload_size = env::var("MAX_UPLOAD_SIZE")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_UPLOAD_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| "MAX_UPLOAD_SIZE must be a valid number".to_string())?;

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
            max_upload_size,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl StorageConfig {
    const DEFAULT_VIDEOS_DIR: &'static str = "uploaded_videos";
    const DEFAULT_PRESCRIPTIONS_FILE: &'static str = "prescriptions_data/prescriptions.json";
    const DEFAULT_STREAM_CHUNK_SIZE: usize = 8 * 1024; // 8KB

    pub fn from_env() -> Result<Self, String> {
        let videos_dir = PathBuf::from(
            env::var("VIDEOS_DIR").unwrap_or_else(|_| Self::DEFAULT_VIDEOS_DIR.to_string()),
        );

        // Metadata lives next to the videos unless told otherwise
        let video_metadata_file = env::var("VIDEO_METADATA_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| videos_dir.join("videos.json"));

        let prescriptions_file = PathBuf::from(
            env::var("PRESCRIPTIONS_FILE")
                .unwrap_or_else(|_| Self::DEFAULT_PRESCRIPTIONS_FILE.to_string()),
        );

        let stream_chunk_size = env::var("STREAM_CHUNK_SIZE")
            .unwrap_or_else(|_| Self::DEFAULT_STREAM_CHUNK_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| "STREAM_CHUNK_SIZE must be a valid number".to_string())?;

        if stream_chunk_size == 0 {
            return Err("STREAM_CHUNK_SIZE must be greater than zero".to_string());
        }

        Ok(Self {
            videos_dir,
            video_metadata_file,
            prescriptions_file,
            stream_chunk_size,
        })
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        // Only use credentials if they are non-empty
        let username = env::var("SWAGGER_USERNAME").ok().filter(|s| !s.is_empty());
        let password = env::var("SWAGGER_PASSWORD").ok().filter(|s| !s.is_empty());
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "CareBridge API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "1.0.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "Backend API for patient care video and prescription records".to_string());

        Ok(Self {
            username,
            password,
            title,
            version,
            description,
        })
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swagger_credentials_require_both_parts() {
        let mut swagger = SwaggerConfig {
            username: Some("admin".to_string()),
            password: None,
            title: "t".to_string(),
            version: "v".to_string(),
            description: "d".to_string(),
        };
        assert_eq!(swagger.credentials(), None);

        swagger.password = Some("secret".to_string());
        assert_eq!(swagger.credentials(), Some("admin:secret".to_string()));
    }

    #[test]
    fn test_server_address() {
        let app = AppConfig {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_allowed_origins: vec!["*".to_string()],
            max_upload_size: 1024,
        };
        assert_eq!(app.server_address(), "0.0.0.0:8000");
    }
}
