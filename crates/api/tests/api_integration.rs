//! API integration tests.
//!
//! Requests go through the full router, middleware included, against a
//! mock database.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::redundant_clone)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use mappoint_api::{AppState, SseBroadcaster, app};
use mappoint_common::{ImageHostService, LocalImageHost};
use mappoint_core::{
    ActivityService, AdminService, AnnouncementService, AuthService, CommentService,
    ExpoPushGateway, FollowService, MarkerAggregator, MarkerService, NotificationService,
    PushService, TokenService, UserService,
};
use mappoint_db::entities::{
    marker, marker_comment, marker_image, marker_rating, notification, rating_label, user,
};
use mappoint_db::repositories::{
    ActiveUserRepository, AnnouncementRepository, FollowRepository, MarkerCommentRepository,
    MarkerImageRepository, MarkerRatingRepository, MarkerRepository, NotificationRepository,
    PasswordResetRepository, PushTokenRepository, RatingLabelRepository, UserRepository,
};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "integration-secret";

fn test_user(id: &str, role: user::UserRole) -> user::Model {
    user::Model {
        id: id.to_string(),
        username: format!("user_{id}"),
        email: format!("{id}@example.com"),
        password_hash: None,
        gender: user::Gender::Other,
        profile_image_url: None,
        role,
        connection_type: user::ConnectionType::Mail,
        joined_at: Utc::now().into(),
        last_login: None,
        updated_at: None,
    }
}

fn bearer(user: &user::Model) -> String {
    let token = TokenService::new(SECRET, 3600).issue(user).unwrap();
    format!("Bearer {token}")
}

/// Create test app state on top of `db`.
fn create_test_state(db: DatabaseConnection) -> AppState {
    create_shared_state(Arc::new(db))
}

/// Like [`create_test_state`], keeping a handle on the connection for its log.
fn create_shared_state(db: Arc<DatabaseConnection>) -> AppState {
    // Activity writes are spawned; keep them off the scripted connection.
    let activity_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

    let user_repo = UserRepository::new(Arc::clone(&db));
    let follow_repo = FollowRepository::new(Arc::clone(&db));
    let marker_repo = MarkerRepository::new(Arc::clone(&db));
    let image_repo = MarkerImageRepository::new(Arc::clone(&db));
    let rating_repo = MarkerRatingRepository::new(Arc::clone(&db));
    let label_repo = RatingLabelRepository::new(Arc::clone(&db));
    let comment_repo = MarkerCommentRepository::new(Arc::clone(&db));
    let notification_repo = NotificationRepository::new(Arc::clone(&db));
    let push_repo = PushTokenRepository::new(Arc::clone(&db));

    let image_host: ImageHostService = Arc::new(LocalImageHost::new(
        std::env::temp_dir().join("mappoint-api-tests"),
        "/files".to_string(),
    ));
    let aggregator = MarkerAggregator::new(
        image_repo.clone(),
        rating_repo.clone(),
        comment_repo.clone(),
    );
    let notification_service = NotificationService::new(
        notification_repo.clone(),
        follow_repo.clone(),
        user_repo.clone(),
    );

    AppState {
        auth_service: AuthService::new(
            user_repo.clone(),
            PasswordResetRepository::new(Arc::clone(&db)),
            TokenService::new(SECRET, 3600),
            image_host.clone(),
            "profiles".to_string(),
        ),
        user_service: UserService::new(
            user_repo.clone(),
            follow_repo.clone(),
            notification_repo,
            push_repo.clone(),
        ),
        marker_service: MarkerService::new(
            marker_repo.clone(),
            image_repo,
            rating_repo.clone(),
            label_repo.clone(),
            follow_repo.clone(),
            aggregator.clone(),
            image_host,
            "markers".to_string(),
        ),
        comment_service: CommentService::new(
            comment_repo.clone(),
            marker_repo.clone(),
            follow_repo.clone(),
        ),
        follow_service: FollowService::new(follow_repo, user_repo.clone()),
        notification_service,
        push_service: PushService::new(
            push_repo,
            Arc::new(ExpoPushGateway::new("http://127.0.0.1:9/push")),
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
            ActiveUserRepository::new(Arc::clone(&db)),
            aggregator,
        ),
        activity_service: ActivityService::new(ActiveUserRepository::new(activity_db)),
        sse_broadcaster: SseBroadcaster::new(),
    }
}

fn empty_app() -> Router {
    app(create_test_state(
        MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
    ))
}

/// App whose first query resolves the bearer token's user.
fn app_for(user: &user::Model) -> Router {
    app(create_test_state(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user.clone()]])
            .into_connection(),
    ))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, auth: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

const BOUNDARY: &str = "mappoint-test-boundary";

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a [u8]),
}

fn multipart_request(uri: &str, auth: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
            Part::File(file_name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"images\"; filename=\"{file_name}\"\r\n\
                         Content-Type: image/jpeg\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::AUTHORIZATION, auth)
        .body(Body::from(body))
        .unwrap()
}

fn park_marker(id: &str, owner: &str) -> marker::Model {
    marker::Model {
        id: id.to_string(),
        user_id: owner.to_string(),
        title: "Central Park".to_string(),
        description: None,
        latitude: 40.785_091,
        longitude: -73.968_285,
        marker_type: marker::MarkerType::Park,
        comment: None,
        visibility: marker::Visibility::Public,
        blocked: false,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

fn park_label(id: &str, label: &str) -> rating_label::Model {
    rating_label::Model {
        id: id.to_string(),
        marker_type: marker::MarkerType::Park,
        label: label.to_string(),
        created_at: Utc::now().into(),
    }
}

fn exec_ok() -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected: 1,
    }
}

const JPEG: &[u8] = &[0xff, 0xd8, 0xff, 0xe0];

fn marker_fields<'a>(ratings: &'a str) -> Vec<Part<'a>> {
    vec![
        Part::Text("title", "Central Park"),
        Part::Text("latitude", "40.785091"),
        Part::Text("longitude", "-73.968285"),
        Part::Text("type", "park"),
        Part::Text("visibility", "public"),
        Part::Text("ratings", ratings),
    ]
}

/// Mock scripted for one marker create by `user` against the park catalog.
fn create_marker_db(user: &user::Model) -> Arc<DatabaseConnection> {
    Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user.clone()]])
            .append_query_results([[
                park_label("l1", "cleanliness"),
                park_label("l2", "view"),
                park_label("l3", "noise"),
            ]])
            .append_query_results([[park_marker("m1", &user.id)]])
            .append_exec_results([exec_ok(), exec_ok(), exec_ok()])
            .into_connection(),
    )
}

fn rating_inserts(db: Arc<DatabaseConnection>) -> usize {
    let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
    format!("{log:?}")
        .matches("INSERT INTO \\\"marker_ratings\\\"")
        .count()
}

#[tokio::test]
async fn test_health() {
    let response = empty_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "success"}));
}

#[tokio::test]
async fn test_markers_require_token() {
    let response = empty_app()
        .oneshot(
            Request::builder()
                .uri("/marker?visibility=public")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["status"], "error");
}

#[tokio::test]
async fn test_invalid_token_is_unauthorized() {
    let response = empty_app()
        .oneshot(
            Request::builder()
                .uri("/user")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_of_deleted_user_is_unauthorized() {
    let ghost = test_user("ghost", user::UserRole::User);
    let app = app(create_test_state(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection(),
    ));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/user")
                .header(header::AUTHORIZATION, bearer(&ghost))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_scope_is_bad_request() {
    let alice = test_user("alice", user::UserRole::User);

    let response = app_for(&alice)
        .oneshot(
            Request::builder()
                .uri("/marker?visibility=everyone")
                .header(header::AUTHORIZATION, bearer(&alice))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["status"], "error");
}

#[tokio::test]
async fn test_admin_routes_forbid_regular_users() {
    let alice = test_user("alice", user::UserRole::User);

    let response = app_for(&alice)
        .oneshot(
            Request::builder()
                .uri("/admin/stats/overview")
                .header(header::AUTHORIZATION, bearer(&alice))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_empty_notifications_is_not_found() {
    let alice = test_user("alice", user::UserRole::User);
    let app = app(create_test_state(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[alice.clone()]])
            .append_query_results([Vec::<notification::Model>::new()])
            .into_connection(),
    ));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/notifications")
                .header(header::AUTHORIZATION, bearer(&alice))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cannot_follow_self() {
    let alice = test_user("alice", user::UserRole::User);
    let auth = bearer(&alice);

    let response = app_for(&alice)
        .oneshot(json_request(
            "POST",
            "/friends/send-request",
            Some(&auth),
            &json!({"friendId": "alice"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_comment_rating_out_of_range() {
    let alice = test_user("alice", user::UserRole::User);
    let auth = bearer(&alice);

    let response = app_for(&alice)
        .oneshot(json_request(
            "POST",
            "/comments",
            Some(&auth),
            &json!({"marker_id": "m1", "comment": "Nice", "rating": 9}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_add_blank_push_token_is_public_but_validated() {
    let response = empty_app()
        .oneshot(json_request(
            "POST",
            "/push/add-token",
            None,
            &json!({"token": "  "}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_change_password_mismatch() {
    let alice = test_user("alice", user::UserRole::User);
    let auth = bearer(&alice);

    let response = app_for(&alice)
        .oneshot(json_request(
            "PUT",
            "/user/change-password",
            Some(&auth),
            &json!({
                "oldPassword": "Old1pass",
                "newPassword": "New1pass",
                "confirmPassword": "Other1pass"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_marker_returns_marker_id() {
    let alice = test_user("alice", user::UserRole::User);
    let db = create_marker_db(&alice);

    let mut parts = marker_fields(r#"{"cleanliness": 5}"#);
    parts.push(Part::Text("ratings[view]", "4"));
    parts.push(Part::Text("ratings[noise]", "loud"));
    parts.push(Part::File("a.jpg", JPEG));
    parts.push(Part::File("empty.jpg", &[]));
    parts.push(Part::File("b.jpg", JPEG));

    let response = app(create_shared_state(db.clone()))
        .oneshot(multipart_request("/marker/create", &bearer(&alice), &parts))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["markerId"], "m1");
    // JSON map and bracketed field both count; the non-numeric score does not.
    assert_eq!(rating_inserts(db), 2);
}

#[tokio::test]
async fn test_create_marker_ignores_malformed_ratings_json() {
    let alice = test_user("alice", user::UserRole::User);
    let db = create_marker_db(&alice);

    let mut parts = marker_fields("{not json");
    parts.push(Part::Text("ratings[cleanliness]", "5"));
    parts.push(Part::File("a.jpg", JPEG));
    parts.push(Part::File("b.jpg", JPEG));

    let response = app(create_shared_state(db.clone()))
        .oneshot(multipart_request("/marker/create", &bearer(&alice), &parts))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["markerId"], "m1");
    assert_eq!(rating_inserts(db), 1);
}

#[tokio::test]
async fn test_create_marker_skips_empty_image_parts() {
    let alice = test_user("alice", user::UserRole::User);

    let mut parts = marker_fields("{}");
    parts.push(Part::File("a.jpg", JPEG));
    parts.push(Part::File("empty.jpg", &[]));

    let response = app_for(&alice)
        .oneshot(multipart_request("/marker/create", &bearer(&alice), &parts))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_marker_with_images_and_ratings() {
    let alice = test_user("alice", user::UserRole::User);
    let image = |id: &str| marker_image::Model {
        id: id.to_string(),
        marker_id: "m1".to_string(),
        user_id: "alice".to_string(),
        image_url: format!("/files/markers/{id}.jpg"),
        public_id: format!("markers/{id}.jpg"),
        original_name: format!("{id}.jpg"),
        created_at: Utc::now().into(),
    };
    let rating = marker_rating::Model {
        id: "r1".to_string(),
        marker_id: "m1".to_string(),
        label_id: "l1".to_string(),
        rating: 5,
        created_at: Utc::now().into(),
        updated_at: None,
    };

    let app = app(create_test_state(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[alice.clone()]])
            .append_query_results([[park_marker("m1", "alice")]])
            .append_query_results([[image("i1"), image("i2")]])
            .append_query_results([[(rating, park_label("l1", "cleanliness"))]])
            .append_query_results([Vec::<marker_comment::Model>::new()])
            .into_connection(),
    ));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/marker/m1")
                .header(header::AUTHORIZATION, bearer(&alice))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let data = &body_json(response).await["data"];
    assert_eq!(data["id"], "m1");
    assert_eq!(data["images"].as_array().unwrap().len(), 2);
    assert_eq!(data["ratings"], json!([{"label": "cleanliness", "rating": 5}]));
    assert_eq!(data["average_rating"], 5.0);
}
