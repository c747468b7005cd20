/// Database row types. These map directly to SQLite rows and are
/// distinct from the agora-types wire models.

pub struct MemberRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password: String,
    pub group_id: i64,
}

pub struct BoardRow {
    pub id: i64,
    pub name: String,
    pub member_groups: String,
    pub num_topics: i64,
    pub num_posts: i64,
}

pub struct TopicRow {
    pub id: i64,
    pub board_id: i64,
    pub started_by: i64,
    pub subject: String,
    pub num_replies: i64,
    pub locked: bool,
}

pub struct SearchRow {
    pub message_id: i64,
    pub topic_id: i64,
    pub board_id: i64,
    pub subject: String,
    pub body: String,
    pub poster_time: String,
}

pub struct AttachmentRow {
    pub id: i64,
    pub message_id: i64,
    pub filename: String,
    pub file_hash: String,
    pub size: i64,
    pub mime_type: String,
    pub downloads: i64,
    /// `member_groups` of the board the attachment was posted in.
    pub board_groups: String,
}

pub struct AlertRow {
    pub id: i64,
    pub member_id: i64,
    pub content_type: String,
    pub content_id: i64,
    pub content_action: String,
    pub is_read: bool,
    pub created_at: String,
}

pub struct MailRow {
    pub id: i64,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}
