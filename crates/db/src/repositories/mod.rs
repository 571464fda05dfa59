//! Database repositories.

pub mod active_user;
pub mod announcement;
pub mod follow;
pub mod marker;
pub mod marker_comment;
pub mod marker_image;
pub mod marker_rating;
pub mod notification;
pub mod password_reset;
pub mod push_token;
pub mod rating_label;
pub mod user;

pub use active_user::{ActiveUserRepository, MonthlyActiveCount};
pub use announcement::AnnouncementRepository;
pub use follow::FollowRepository;
pub use marker::{MarkerRepository, MarkerTypeCount};
pub use marker_comment::MarkerCommentRepository;
pub use marker_image::MarkerImageRepository;
pub use marker_rating::MarkerRatingRepository;
pub use notification::NotificationRepository;
pub use password_reset::PasswordResetRepository;
pub use push_token::PushTokenRepository;
pub use rating_label::RatingLabelRepository;
pub use user::{ConnectionTypeCount, UserRepository};
