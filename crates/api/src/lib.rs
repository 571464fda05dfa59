//! HTTP API layer for mappoint.
//!
//! This crate provides the REST API and real-time notification stream:
//!
//! - **Endpoints**: auth, users, markers, comments, friends, notifications,
//!   push tokens, announcements and admin
//! - **Extractors**: `AuthUser` / `AdminUser` from the verified bearer token
//! - **Middleware**: authentication and monthly activity tracking
//! - **Streaming**: Server-Sent Events backing the notification sink
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod sse;

pub use endpoints::{app, router};
pub use middleware::AppState;
pub use sse::{SseBroadcaster, SseEvent};
