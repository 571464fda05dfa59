//! Core business logic for mappoint.

pub mod services;

pub use services::*;
