//! Mappoint server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Method, header},
};
use mappoint_api::{AppState, SseBroadcaster};
use mappoint_common::{AppResult, Config, build_image_host, config::ImageHostConfig};
use mappoint_core::{
    ActivityService, AdminService, AnnouncementService, AuthService, CommentService,
    ExpoPushGateway, FollowService, MarkerAggregator, MarkerService, NotificationService,
    NotificationSinkService, PushService, TokenInfoVerifier, TokenService, UserService,
    build_mailer,
};
use mappoint_db::repositories::{
    ActiveUserRepository, AnnouncementRepository, FollowRepository, MarkerCommentRepository,
    MarkerImageRepository, MarkerRatingRepository, MarkerRepository, NotificationRepository,
    PasswordResetRepository, PushTokenRepository, RatingLabelRepository, UserRepository,
};
use sea_orm::DatabaseConnection;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Idle stream channels are dropped this often.
const SSE_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mappoint=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Build services and wire them together.
fn build_state(config: &Config, db: Arc<DatabaseConnection>) -> AppResult<AppState> {
    let user_repo = UserRepository::new(Arc::clone(&db));
    let follow_repo = FollowRepository::new(Arc::clone(&db));
    let marker_repo = MarkerRepository::new(Arc::clone(&db));
    let image_repo = MarkerImageRepository::new(Arc::clone(&db));
    let rating_repo = MarkerRatingRepository::new(Arc::clone(&db));
    let label_repo = RatingLabelRepository::new(Arc::clone(&db));
    let comment_repo = MarkerCommentRepository::new(Arc::clone(&db));
    let notification_repo = NotificationRepository::new(Arc::clone(&db));
    let push_repo = PushTokenRepository::new(Arc::clone(&db));
    let activity_repo = ActiveUserRepository::new(Arc::clone(&db));

    let image_host = build_image_host(&config.images);
    let sse_broadcaster = SseBroadcaster::new();
    let sink: NotificationSinkService = Arc::new(sse_broadcaster.clone());

    let aggregator = MarkerAggregator::new(
        image_repo.clone(),
        rating_repo.clone(),
        comment_repo.clone(),
    );

    let mut notification_service = NotificationService::new(
        notification_repo.clone(),
        follow_repo.clone(),
        user_repo.clone(),
    );
    notification_service.set_sink(Arc::clone(&sink));

    let mut follow_service = FollowService::new(follow_repo.clone(), user_repo.clone());
    follow_service.set_notifications(notification_service.clone());

    let mut marker_service = MarkerService::new(
        marker_repo.clone(),
        image_repo,
        rating_repo.clone(),
        label_repo.clone(),
        follow_repo.clone(),
        aggregator.clone(),
        image_host.clone(),
        config.images.marker_folder.clone(),
    );
    marker_service.set_notifications(notification_service.clone());
    marker_service.set_sink(sink);

    let mut comment_service =
        CommentService::new(comment_repo.clone(), marker_repo.clone(), follow_repo.clone());
    comment_service.set_notifications(notification_service.clone());

    let mut auth_service = AuthService::new(
        user_repo.clone(),
        PasswordResetRepository::new(Arc::clone(&db)),
        TokenService::new(&config.auth.jwt_secret, config.auth.token_ttl_secs),
        image_host,
        config.images.profile_folder.clone(),
    );
    auth_service.set_google_verifier(Arc::new(TokenInfoVerifier::new(
        config.auth.google_tokeninfo_url.clone(),
        config.auth.google_client_id.clone(),
    )));
    auth_service.set_mailer(build_mailer(config.email.as_ref())?);
    if let Some(url) = &config.auth.password_reset_url {
        auth_service.set_password_reset(config.auth.password_reset_ttl_secs, url.clone());
    } else {
        auth_service.set_password_reset(
            config.auth.password_reset_ttl_secs,
            format!(
                "{}/reset-password",
                config.server.public_url.trim_end_matches('/')
            ),
        );
    }

    Ok(AppState {
        auth_service,
        user_service: UserService::new(
            user_repo.clone(),
            follow_repo,
            notification_repo,
            push_repo.clone(),
        ),
        marker_service,
        comment_service,
        follow_service,
        notification_service,
        push_service: PushService::new(
            push_repo,
            Arc::new(ExpoPushGateway::new(config.push.gateway_url.clone())),
        ),
        announcement_service: AnnouncementService::new(AnnouncementRepository::new(
            Arc::clone(&db),
        )),
        admin_service: AdminService::new(
            marker_repo,
            label_repo,
            user_repo,
            comment_repo,
            rating_repo,
            activity_repo.clone(),
            aggregator,
        ),
        activity_service: ActivityService::new(activity_repo),
        sse_broadcaster,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting mappoint server...");

    // Load configuration; missing secrets abort here
    let config = Config::load()?;

    let db = mappoint_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    mappoint_db::migrate(&db).await?;
    info!("Migrations completed");

    let state = build_state(&config, Arc::new(db))?;

    let broadcaster = state.sse_broadcaster.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SSE_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            broadcaster.cleanup().await;
        }
    });

    let mut app: Router = mappoint_api::app(state);

    if let ImageHostConfig::Local {
        base_path,
        base_url,
    } = &config.images.host
        && base_url.starts_with('/')
    {
        info!(path = %base_path.display(), url = %base_url, "Serving local images");
        app = app.nest_service(base_url, ServeDir::new(base_path));
    }

    let app = app
        .layer(DefaultBodyLimit::max(config.server.body_limit))
        .layer(RequestBodyLimitLayer::new(config.server.body_limit))
        .layer(TimeoutLayer::new(Duration::from_secs(60)))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
