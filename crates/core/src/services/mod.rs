//! Business logic services.

#![allow(missing_docs)]

pub mod activity;
pub mod admin;
pub mod aggregator;
pub mod announcement;
pub mod auth;
pub mod comment;
pub mod email;
pub mod following;
pub mod marker;
pub mod notification;
pub mod notification_sink;
pub mod password;
pub mod push;
pub mod ratings;
pub mod user;
pub mod visibility;

#[cfg(test)]
mod test_fixtures;

pub use activity::ActivityService;
pub use admin::{AdminService, StatsOverview};
pub use aggregator::{LabelRating, MarkerAggregator, MarkerView};
pub use announcement::{AnnouncementService, AnnouncementSummary, markdown_from_bytes};
pub use auth::{
    AuthService, AuthenticatedIdentity, Claims, GoogleIdentity, GoogleLogin, GoogleVerifier,
    GoogleVerifierService, RegisterInput, TokenInfoVerifier, TokenService,
};
pub use comment::{CommentService, CommentView, CreateCommentInput, UpdateCommentInput};
pub use email::{EmailMessage, LogMailer, Mailer, MailerService, SmtpMailer, build_mailer};
pub use following::{FollowListEntry, FollowRequestEntry, FollowService};
pub use marker::{MIN_MARKER_IMAGES, MarkerInput, MarkerService, UploadedImage, parse_enum};
pub use notification::{
    FanOutReport, NotificationItem, NotificationService, NotifyOutcome, SenderFollowStatus,
};
pub use notification_sink::{
    NoOpNotificationSink, NotificationEvent, NotificationSink, NotificationSinkService,
};
pub use push::{
    ExpoPushGateway, PushGateway, PushGatewayService, PushMessage, PushService, RegisteredToken,
};
pub use ratings::RatingInput;
pub use user::{ChangePasswordInput, UpdateUserInput, UserService, UserSummary};
pub use visibility::{Viewer, VisibilityScope};
