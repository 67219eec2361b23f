mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::Config;
use crate::core::middleware;
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::features::prescriptions::{
    routes as prescriptions_routes, PrescriptionService, PrescriptionStore,
};
use crate::features::videos::{
    routes as videos_routes, StreamingService, VideoService, VideoStore,
};
use crate::modules::storage::JsonFileBackend;
use axum::{middleware::from_fn, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    // Log system info
    let available_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);
    tracing::info!(
        "System info: available_cpus={}, tokio_worker_threads={}, pid={}",
        available_cpus,
        worker_threads,
        std::process::id()
    );

    tracing::info!("Configuration loaded successfully");

    // Prepare the upload directory
    tokio::fs::create_dir_all(&config.storage.videos_dir)
        .await
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to create videos directory {}: {}",
                config.storage.videos_dir.display(),
                e
            )
        })?;

    // Initialize video library and drop records whose files are gone
    let video_backend = Arc::new(JsonFileBackend::new(
        config.storage.video_metadata_file.clone(),
    ));
    let video_store =
        Arc::new(VideoStore::open(video_backend, config.storage.videos_dir.clone()).await);
    let outcome = video_store.reconcile_orphans().await;
    tracing::info!(
        "Video library ready: {} records ({} orphans pruned)",
        outcome.remaining,
        outcome.removed
    );

    let video_service = Arc::new(VideoService::new(Arc::clone(&video_store)));
    let streaming_service = Arc::new(StreamingService::new(
        Arc::clone(&video_store),
        config.storage.stream_chunk_size,
    ));
    tracing::info!(
        "Video services initialized (chunk size {} bytes, upload limit {} bytes)",
        config.storage.stream_chunk_size,
        config.app.max_upload_size
    );

    // Initialize Prescription Service
    let prescription_backend = Arc::new(JsonFileBackend::new(
        config.storage.prescriptions_file.clone(),
    ));
    let prescription_store = Arc::new(PrescriptionStore::open(prescription_backend).await);
    let prescription_service = Arc::new(PrescriptionService::new(Arc::clone(&prescription_store)));
    tracing::info!("Prescription service initialized");

    // Build application router with dynamic swagger config
    let swagger_modifier = SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    // Build swagger router
    let swagger = if let Some(credentials) = config.swagger.credentials() {
        tracing::info!("Swagger UI basic auth enabled");
        Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
            .layer(from_fn(middleware::basic_auth_middleware(Arc::new(
                credentials,
            ))))
    } else {
        tracing::info!("Swagger UI basic auth disabled (no credentials configured)");
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
    };

    // Simple health check endpoint
    async fn health_check() -> axum::http::StatusCode {
        axum::http::StatusCode::OK
    }

    async fn root() -> Json<Value> {
        Json(json!({
            "message": "CareBridge API is running",
            "version": env!("CARGO_PKG_VERSION"),
        }))
    }

    let base_routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check));

    let api_routes = Router::new()
        .merge(videos_routes::routes(
            video_service,
            streaming_service,
            config.app.max_upload_size,
        ))
        .merge(prescriptions_routes::routes(prescription_service));

    let app = Router::new()
        .merge(swagger)
        .merge(api_routes)
        .merge(base_routes)
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    // Start server
    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    // Use socket2 for TCP listener configuration
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nodelay(true)?;

    // Larger buffers help long video responses
    socket.set_recv_buffer_size(256 * 1024)?;
    socket.set_send_buffer_size(512 * 1024)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on {}", format!("http://{}", addr));
    tracing::info!(
        "Swagger UI available at {}",
        format!("http://{}/swagger-ui/", addr)
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Retry writes that failed while serving; a clean store is left untouched
    match video_store.flush_if_dirty().await {
        Ok(true) => tracing::info!(
            "Flushed {} video records before exit",
            video_store.count().await
        ),
        Ok(false) => {}
        Err(e) => tracing::error!("Failed to flush video metadata on shutdown: {}", e),
    }
    match prescription_store.flush_if_dirty().await {
        Ok(true) => tracing::info!(
            "Flushed {} prescriptions before exit",
            prescription_store.count().await
        ),
        Ok(false) => {}
        Err(e) => tracing::error!("Failed to flush prescriptions on shutdown: {}", e),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
