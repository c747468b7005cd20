use crate::Database;
use crate::models::{AlertRow, AttachmentRow, BoardRow, MailRow, MemberRow, SearchRow, TopicRow};
use anyhow::{Result, anyhow};
use rusqlite::types::ToSql;
use rusqlite::{Connection, Row, params, params_from_iter};
use sha2::{Digest, Sha256};

impl Database {
    // -- Members --

    pub fn create_member(&self, name: &str, email: &str, password_hash: &str, group_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO members (member_name, email_address, passwd, id_group) VALUES (?1, ?2, ?3, ?4)",
                params![name, email, password_hash, group_id],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_member_by_name(&self, name: &str) -> Result<Option<MemberRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id_member, member_name, email_address, passwd, id_group
                 FROM members WHERE member_name = ?1 COLLATE NOCASE",
                [name],
                member_from_row,
            )
            .optional()
        })
    }

    pub fn get_member_by_id(&self, id: i64) -> Result<Option<MemberRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id_member, member_name, email_address, passwd, id_group
                 FROM members WHERE id_member = ?1",
                [id],
                member_from_row,
            )
            .optional()
        })
    }

    pub fn get_members_by_ids(&self, ids: &[i64]) -> Result<Vec<MemberRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id_member, member_name, email_address, passwd, id_group
                 FROM members WHERE id_member IN ({}) ORDER BY id_member",
                placeholders(1, ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(ids.iter()), member_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Boards --

    pub fn create_board(&self, name: &str, member_groups: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO boards (name, member_groups) VALUES (?1, ?2)",
                (name, member_groups),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_board(&self, id: i64) -> Result<Option<BoardRow>> {
        self.with_conn(|conn| query_board(conn, id))
    }

    pub fn list_boards(&self) -> Result<Vec<BoardRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id_board, name, member_groups, num_topics, num_posts FROM boards ORDER BY id_board",
            )?;
            let rows = stmt
                .query_map([], board_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Topics --

    pub fn get_topic(&self, id: i64) -> Result<Option<TopicRow>> {
        self.with_conn(|conn| query_topic(conn, id))
    }

    /// Creates a topic with its first message. Returns (topic id, message id).
    pub fn create_topic(&self, board_id: i64, member_id: i64, subject: &str, body: &str) -> Result<(i64, i64)> {
        self.with_tx(|conn| {
            conn.execute(
                "INSERT INTO topics (id_board, id_member_started, subject) VALUES (?1, ?2, ?3)",
                params![board_id, member_id, subject],
            )?;
            let topic_id = conn.last_insert_rowid();
            let message_id = insert_message(conn, topic_id, board_id, member_id, subject, body)?;

            conn.execute(
                "UPDATE boards SET num_topics = num_topics + 1, num_posts = num_posts + 1 WHERE id_board = ?1",
                [board_id],
            )?;
            Ok((topic_id, message_id))
        })
    }

    /// Appends a reply to a topic. Returns the new message id.
    pub fn add_reply(&self, topic_id: i64, member_id: i64, subject: &str, body: &str) -> Result<i64> {
        self.with_tx(|conn| {
            let topic = query_topic(conn, topic_id)?.ok_or_else(|| anyhow!("Topic not found: {}", topic_id))?;
            let message_id = insert_message(conn, topic_id, topic.board_id, member_id, subject, body)?;

            conn.execute(
                "UPDATE topics SET num_replies = num_replies + 1 WHERE id_topic = ?1",
                [topic_id],
            )?;
            conn.execute(
                "UPDATE boards SET num_posts = num_posts + 1 WHERE id_board = ?1",
                [topic.board_id],
            )?;
            Ok(message_id)
        })
    }

    pub fn set_topic_locked(&self, topic_id: i64, locked: bool) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE topics SET locked = ?1 WHERE id_topic = ?2",
                params![locked, topic_id],
            )?;
            Ok(())
        })
    }

    /// Moves a topic and its messages to another board, adjusting both boards' counters.
    pub fn move_topic(&self, topic_id: i64, to_board: i64) -> Result<()> {
        self.with_tx(|conn| {
            let topic = query_topic(conn, topic_id)?.ok_or_else(|| anyhow!("Topic not found: {}", topic_id))?;
            let posts = topic.num_replies + 1;

            conn.execute("UPDATE topics SET id_board = ?1 WHERE id_topic = ?2", [to_board, topic_id])?;
            conn.execute("UPDATE messages SET id_board = ?1 WHERE id_topic = ?2", [to_board, topic_id])?;
            conn.execute(
                "UPDATE boards SET num_topics = num_topics - 1, num_posts = num_posts - ?1 WHERE id_board = ?2",
                [posts, topic.board_id],
            )?;
            conn.execute(
                "UPDATE boards SET num_topics = num_topics + 1, num_posts = num_posts + ?1 WHERE id_board = ?2",
                [posts, to_board],
            )?;
            Ok(())
        })
    }

    // -- Search --

    /// Case-insensitive substring search over subjects and bodies, newest first.
    pub fn search_messages(&self, needle: &str, boards: &[i64], start: u32, limit: u32) -> Result<Vec<SearchRow>> {
        if boards.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id_msg, id_topic, id_board, subject, body, poster_time
                 FROM messages
                 WHERE id_board IN ({})
                   AND (subject LIKE ?1 ESCAPE '\\' OR body LIKE ?1 ESCAPE '\\')
                 ORDER BY id_msg DESC
                 LIMIT ?2 OFFSET ?3",
                placeholders(4, boards.len())
            );
            let pattern = format!("%{}%", escape_like(needle));

            let mut values: Vec<&dyn ToSql> = vec![&pattern, &limit, &start];
            values.extend(boards.iter().map(|b| b as &dyn ToSql));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(values.as_slice(), |row| {
                    Ok(SearchRow {
                        message_id: row.get(0)?,
                        topic_id: row.get(1)?,
                        board_id: row.get(2)?,
                        subject: row.get(3)?,
                        body: row.get(4)?,
                        poster_time: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Attachments --

    /// Records an attachment. The content hash doubles as the on-disk file suffix.
    /// Returns (attachment id, file hash).
    pub fn insert_attachment(
        &self,
        message_id: i64,
        filename: &str,
        mime_type: &str,
        content: &[u8],
    ) -> Result<(i64, String)> {
        let file_hash = hex::encode(Sha256::digest(content));
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO attachments (id_msg, filename, file_hash, size, mime_type) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![message_id, filename, &file_hash, content.len() as i64, mime_type],
            )?;
            Ok((conn.last_insert_rowid(), file_hash.clone()))
        })
    }

    pub fn get_attachment(&self, id: i64) -> Result<Option<AttachmentRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT a.id_attach, a.id_msg, a.filename, a.file_hash, a.size, a.mime_type, a.downloads,
                        b.member_groups
                 FROM attachments a
                 JOIN messages m ON m.id_msg = a.id_msg
                 JOIN boards b ON b.id_board = m.id_board
                 WHERE a.id_attach = ?1",
                [id],
                |row| {
                    Ok(AttachmentRow {
                        id: row.get(0)?,
                        message_id: row.get(1)?,
                        filename: row.get(2)?,
                        file_hash: row.get(3)?,
                        size: row.get(4)?,
                        mime_type: row.get(5)?,
                        downloads: row.get(6)?,
                        board_groups: row.get(7)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn increment_downloads(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE attachments SET downloads = downloads + 1 WHERE id_attach = ?1",
                [id],
            )?;
            Ok(())
        })
    }

    // -- Alerts and mail --

    pub fn insert_alert(&self, member_id: i64, content_type: &str, content_id: i64, content_action: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_alerts (id_member, content_type, content_id, content_action) VALUES (?1, ?2, ?3, ?4)",
                params![member_id, content_type, content_id, content_action],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_alerts(&self, member_id: i64, limit: u32) -> Result<Vec<AlertRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id_alert, id_member, content_type, content_id, content_action, is_read, created_at
                 FROM user_alerts
                 WHERE id_member = ?1
                 ORDER BY id_alert DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![member_id, limit], |row| {
                    Ok(AlertRow {
                        id: row.get(0)?,
                        member_id: row.get(1)?,
                        content_type: row.get(2)?,
                        content_id: row.get(3)?,
                        content_action: row.get(4)?,
                        is_read: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn mark_alerts_read(&self, member_id: i64) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE user_alerts SET is_read = 1 WHERE id_member = ?1 AND is_read = 0",
                [member_id],
            )?;
            Ok(n)
        })
    }

    pub fn queue_mail(&self, recipient: &str, subject: &str, body: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO mail_queue (recipient, subject, body) VALUES (?1, ?2, ?3)",
                (recipient, subject, body),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_mail_queue(&self) -> Result<Vec<MailRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id_mail, recipient, subject, body FROM mail_queue ORDER BY id_mail")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(MailRow {
                        id: row.get(0)?,
                        recipient: row.get(1)?,
                        subject: row.get(2)?,
                        body: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn insert_message(
    conn: &Connection,
    topic_id: i64,
    board_id: i64,
    member_id: i64,
    subject: &str,
    body: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO messages (id_topic, id_board, id_member, subject, body) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![topic_id, board_id, member_id, subject, body],
    )?;
    Ok(conn.last_insert_rowid())
}

fn query_board(conn: &Connection, id: i64) -> Result<Option<BoardRow>> {
    conn.query_row(
        "SELECT id_board, name, member_groups, num_topics, num_posts FROM boards WHERE id_board = ?1",
        [id],
        board_from_row,
    )
    .optional()
}

fn query_topic(conn: &Connection, id: i64) -> Result<Option<TopicRow>> {
    conn.query_row(
        "SELECT id_topic, id_board, id_member_started, subject, num_replies, locked
         FROM topics WHERE id_topic = ?1",
        [id],
        |row| {
            Ok(TopicRow {
                id: row.get(0)?,
                board_id: row.get(1)?,
                started_by: row.get(2)?,
                subject: row.get(3)?,
                num_replies: row.get(4)?,
                locked: row.get(5)?,
            })
        },
    )
    .optional()
}

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<MemberRow> {
    Ok(MemberRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        group_id: row.get(4)?,
    })
}

fn board_from_row(row: &Row<'_>) -> rusqlite::Result<BoardRow> {
    Ok(BoardRow {
        id: row.get(0)?,
        name: row.get(1)?,
        member_groups: row.get(2)?,
        num_topics: row.get(3)?,
        num_posts: row.get(4)?,
    })
}

/// `?first, ?first+1, ...` for `count` bound values.
pub(crate) fn placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
