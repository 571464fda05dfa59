//! Common utilities and shared types for mappoint.
//!
//! This crate provides foundational components used across all mappoint crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Image hosting**: Local and Cloudinary backends via [`ImageHost`]
//!
//! # Example
//!
//! ```no_run
//! use mappoint_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Listening on {}:{} ({id})", config.server.host, config.server.port);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod image_host;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use image_host::{
    CloudinaryImageHost, HostedImage, ImageHost, ImageHostService, LocalImageHost,
    build_image_host, generate_storage_key,
};
