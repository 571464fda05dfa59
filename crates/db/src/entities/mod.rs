//! Database entities.

pub mod active_user;
pub mod announcement;
pub mod follow;
pub mod marker;
pub mod marker_comment;
pub mod marker_image;
pub mod marker_rating;
pub mod notification;
pub mod password_reset_token;
pub mod push_token;
pub mod rating_label;
pub mod user;
pub mod user_push_token;

pub use active_user::Entity as ActiveUser;
pub use announcement::Entity as Announcement;
pub use follow::Entity as Follow;
pub use marker::Entity as Marker;
pub use marker_comment::Entity as MarkerComment;
pub use marker_image::Entity as MarkerImage;
pub use marker_rating::Entity as MarkerRating;
pub use notification::Entity as Notification;
pub use password_reset_token::Entity as PasswordResetToken;
pub use push_token::Entity as PushToken;
pub use rating_label::Entity as RatingLabel;
pub use user::Entity as User;
pub use user_push_token::Entity as UserPushToken;
