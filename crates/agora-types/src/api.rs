use serde::{Deserialize, Serialize};

use crate::models::MemberGroup;

// -- Session --

/// JWT claims for a logged-in member. `sub` carries the member id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub member_id: i64,
    pub member_name: String,
    pub token: String,
}

// -- Boards --

#[derive(Debug, Serialize, Deserialize)]
pub struct BoardSummary {
    pub id: i64,
    pub name: String,
    pub num_topics: i64,
    pub num_posts: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BoardIndexResponse {
    pub group: MemberGroup,
    pub boards: Vec<BoardSummary>,
}

// -- Notifications --

/// Notification state of one member for one target, before or after a change.
#[derive(Debug, Serialize, Deserialize)]
pub struct NotifyStateResponse {
    pub target: String,
    pub item_id: i64,
    pub member_id: i64,
    /// Effective 2-bit preference (0 none, 1 alert, 2 email, 3 both).
    pub pref: u8,
    /// UI mode code matching `pref`.
    pub mode: i8,
    pub watching: bool,
    pub ignored: bool,
    pub changed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AlertResponse {
    pub id: i64,
    pub content_type: String,
    pub content_id: i64,
    pub content_action: String,
    pub is_read: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkReadResponse {
    pub marked: usize,
}

// -- Posting --

#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub topic_id: i64,
    pub message_id: i64,
    pub alerts_sent: usize,
    pub emails_queued: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MoveTopicResponse {
    pub topic_id: i64,
    pub from_board: i64,
    pub to_board: i64,
}

// -- Search --

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchHit {
    pub message_id: i64,
    pub topic_id: i64,
    pub board_id: i64,
    pub subject: String,
    pub excerpt: String,
    pub poster_time: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub start: u32,
    pub limit: u32,
    pub results: Vec<SearchHit>,
}
