//! Model builders shared by service tests.

use chrono::Utc;
use mappoint_db::entities::{
    follow::{self, FollowStatus},
    marker, notification, user,
};

pub fn user(id: &str, username: &str) -> user::Model {
    user::Model {
        id: id.to_string(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: None,
        gender: user::Gender::Other,
        profile_image_url: None,
        role: user::UserRole::User,
        connection_type: user::ConnectionType::Mail,
        joined_at: Utc::now().into(),
        last_login: None,
        updated_at: None,
    }
}

pub fn admin(id: &str) -> user::Model {
    user::Model {
        role: user::UserRole::Admin,
        ..user(id, "admin")
    }
}

pub fn edge(follower_id: &str, followee_id: &str, status: FollowStatus) -> follow::Model {
    follow::Model {
        id: format!("{follower_id}-{followee_id}"),
        follower_id: follower_id.to_string(),
        followee_id: followee_id.to_string(),
        status,
        created_at: Utc::now().into(),
        status_changed_at: Utc::now().into(),
    }
}

pub fn marker(id: &str, owner: &str, visibility: marker::Visibility) -> marker::Model {
    marker::Model {
        id: id.to_string(),
        user_id: owner.to_string(),
        title: "Central Park".to_string(),
        description: None,
        latitude: 40.785_091,
        longitude: -73.968_285,
        marker_type: marker::MarkerType::Park,
        comment: None,
        visibility,
        blocked: false,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

pub fn notification(
    id: &str,
    receiver_id: &str,
    sender_id: &str,
    notification_type: notification::NotificationType,
    content: Option<&str>,
) -> notification::Model {
    notification::Model {
        id: id.to_string(),
        receiver_id: receiver_id.to_string(),
        sender_id: sender_id.to_string(),
        notification_type,
        content: content.map(str::to_string),
        is_read: false,
        event_id: None,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

/// Image host keeping uploads in memory.
#[derive(Default)]
pub struct RecordingImageHost {
    pub uploaded: std::sync::Mutex<Vec<String>>,
    pub destroyed: std::sync::Mutex<Vec<String>>,
    pub fail_uploads: bool,
}

#[allow(clippy::unwrap_used)]
impl RecordingImageHost {
    pub fn failing() -> Self {
        Self {
            fail_uploads: true,
            ..Self::default()
        }
    }

    pub fn uploaded(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }

    pub fn destroyed(&self) -> Vec<String> {
        self.destroyed.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
#[allow(clippy::unwrap_used)]
impl mappoint_common::ImageHost for RecordingImageHost {
    async fn upload(
        &self,
        folder: &str,
        file_name: &str,
        _data: &[u8],
        _content_type: &str,
    ) -> mappoint_common::AppResult<mappoint_common::HostedImage> {
        if self.fail_uploads {
            return Err(mappoint_common::AppError::ExternalService(
                "upload refused".to_string(),
            ));
        }
        let public_id = format!("{folder}/{file_name}");
        self.uploaded.lock().unwrap().push(public_id.clone());
        Ok(mappoint_common::HostedImage {
            url: format!("https://img.example.com/{public_id}"),
            public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> mappoint_common::AppResult<()> {
        self.destroyed.lock().unwrap().push(public_id.to_string());
        Ok(())
    }
}
