//! Marker visibility rules.
//!
//! Turns `(viewer, requested scope)` into a query condition over `markers`,
//! and answers the same question for a single already-loaded marker.
//!
//! Follow edges only count once accepted. A followed user's private markers
//! stay private in every scope; only the owner (or an admin) sees them.
//! Blocked markers are hidden from everyone but admins, owners included.

use std::str::FromStr;

use mappoint_common::{AppError, AppResult};
use mappoint_db::{
    entities::{
        follow::{self, FollowStatus},
        marker::{self, Visibility},
        user::UserRole,
    },
    repositories::{FollowRepository, MarkerRepository},
};
use sea_orm::{
    ColumnTrait, Condition,
    sea_query::{Query, SelectStatement},
};

/// Scope requested by `GET /marker?visibility=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityScope {
    /// The viewer's own markers.
    Private,
    /// Own markers plus friends-only markers of accepted followees.
    Friends,
    /// Public markers, own markers and friends-only markers of accepted followees.
    Public,
    /// Everything, admins only.
    All,
}

impl FromStr for VisibilityScope {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "friends" => Ok(Self::Friends),
            "public" => Ok(Self::Public),
            "all" => Ok(Self::All),
            other => Err(AppError::InvalidScope(other.to_string())),
        }
    }
}

/// The caller a marker query is evaluated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: String,
    pub is_admin: bool,
}

impl Viewer {
    #[must_use]
    pub fn new(user_id: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id: user_id.into(),
            is_admin: role == UserRole::Admin,
        }
    }
}

/// `SELECT followee_id FROM follow WHERE follower_id = ? AND status = 'accepted'`
fn accepted_followees(viewer_id: &str) -> SelectStatement {
    Query::select()
        .column(follow::Column::FolloweeId)
        .from(follow::Entity)
        .and_where(follow::Column::FollowerId.eq(viewer_id))
        .and_where(follow::Column::Status.eq(FollowStatus::Accepted))
        .to_owned()
}

fn friends_of_followees(viewer_id: &str) -> Condition {
    Condition::all()
        .add(marker::Column::Visibility.eq(Visibility::Friends))
        .add(marker::Column::UserId.in_subquery(accepted_followees(viewer_id)))
}

fn hide_blocked(viewer: &Viewer, condition: Condition) -> Condition {
    if viewer.is_admin {
        condition
    } else {
        Condition::all()
            .add(condition)
            .add(marker::Column::Blocked.eq(false))
    }
}

/// Build the condition selecting the markers `viewer` may list in `scope`.
pub fn scope_condition(viewer: &Viewer, scope: VisibilityScope) -> AppResult<Condition> {
    let own = marker::Column::UserId.eq(viewer.user_id.as_str());

    let condition = match scope {
        VisibilityScope::Private => Condition::all().add(own),
        VisibilityScope::Friends => Condition::any()
            .add(own)
            .add(friends_of_followees(&viewer.user_id)),
        VisibilityScope::Public => Condition::any()
            .add(marker::Column::Visibility.eq(Visibility::Public))
            .add(own)
            .add(friends_of_followees(&viewer.user_id)),
        VisibilityScope::All => {
            if !viewer.is_admin {
                return Err(AppError::Forbidden(
                    "Only administrators can list every marker".to_string(),
                ));
            }
            Condition::all()
        }
    };

    Ok(hide_blocked(viewer, condition))
}

/// Condition for one owner's markers as seen by `viewer`.
#[must_use]
pub fn owner_condition(viewer: &Viewer, owner_id: &str, follows_owner: bool) -> Condition {
    let owned = marker::Column::UserId.eq(owner_id);

    if viewer.is_admin {
        return Condition::all().add(owned);
    }
    if viewer.user_id == owner_id {
        return hide_blocked(viewer, Condition::all().add(owned));
    }

    let mut visible = Condition::any().add(marker::Column::Visibility.eq(Visibility::Public));
    if follows_owner {
        visible = visible.add(marker::Column::Visibility.eq(Visibility::Friends));
    }

    hide_blocked(viewer, Condition::all().add(owned).add(visible))
}

/// Whether `viewer` may read a single marker.
///
/// `follows_owner` is the accepted-follow state from the viewer to the owner.
#[must_use]
pub fn permits(viewer: &Viewer, marker: &marker::Model, follows_owner: bool) -> bool {
    if viewer.is_admin {
        return true;
    }
    if marker.blocked {
        return false;
    }
    if viewer.user_id == marker.user_id {
        return true;
    }
    match marker.visibility {
        Visibility::Public => true,
        Visibility::Friends => follows_owner,
        Visibility::Private => false,
    }
}

/// Load a marker `viewer` may read. Hidden markers read as missing.
///
/// The follow edge is only looked up for someone else's friends-only marker.
pub async fn load_visible(
    markers: &MarkerRepository,
    follows: &FollowRepository,
    viewer: &Viewer,
    marker_id: &str,
) -> AppResult<marker::Model> {
    let marker = markers.get_by_id(marker_id).await?;

    let follows_owner = marker.visibility == Visibility::Friends
        && !viewer.is_admin
        && viewer.user_id != marker.user_id
        && follows.is_following(&viewer.user_id, &marker.user_id).await?;
    if !permits(viewer, &marker, follows_owner) {
        return Err(AppError::MarkerNotFound(marker_id.to_string()));
    }
    Ok(marker)
}
