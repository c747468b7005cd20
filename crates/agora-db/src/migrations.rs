use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE members (
                id_member       INTEGER PRIMARY KEY AUTOINCREMENT,
                member_name     TEXT NOT NULL UNIQUE,
                email_address   TEXT NOT NULL,
                passwd          TEXT NOT NULL,
                id_group        INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE boards (
                id_board        INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL,
                member_groups   TEXT NOT NULL DEFAULT '-1,0',
                num_topics      INTEGER NOT NULL DEFAULT 0,
                num_posts       INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE topics (
                id_topic            INTEGER PRIMARY KEY AUTOINCREMENT,
                id_board            INTEGER NOT NULL REFERENCES boards(id_board),
                id_member_started   INTEGER NOT NULL,
                subject             TEXT NOT NULL,
                num_replies         INTEGER NOT NULL DEFAULT 0,
                locked              INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_topics_board ON topics(id_board);

            CREATE TABLE messages (
                id_msg          INTEGER PRIMARY KEY AUTOINCREMENT,
                id_topic        INTEGER NOT NULL REFERENCES topics(id_topic),
                id_board        INTEGER NOT NULL,
                id_member       INTEGER NOT NULL,
                subject         TEXT NOT NULL,
                body            TEXT NOT NULL,
                poster_time     TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_messages_topic ON messages(id_topic, id_msg);
            CREATE INDEX idx_messages_board ON messages(id_board);

            CREATE TABLE attachments (
                id_attach       INTEGER PRIMARY KEY AUTOINCREMENT,
                id_msg          INTEGER NOT NULL REFERENCES messages(id_msg),
                filename        TEXT NOT NULL,
                file_hash       TEXT NOT NULL,
                size            INTEGER NOT NULL,
                mime_type       TEXT NOT NULL,
                downloads       INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE user_alerts_prefs (
                id_member       INTEGER NOT NULL,
                alert_pref      TEXT NOT NULL,
                alert_value     INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (id_member, alert_pref)
            );

            CREATE TABLE log_notify (
                id_member       INTEGER NOT NULL,
                id_topic        INTEGER NOT NULL DEFAULT 0,
                id_board        INTEGER NOT NULL DEFAULT 0,
                sent            INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (id_member, id_topic, id_board)
            );

            CREATE INDEX idx_log_notify_topic ON log_notify(id_topic, id_member);
            CREATE INDEX idx_log_notify_board ON log_notify(id_board, id_member);

            CREATE TABLE log_topics (
                id_member       INTEGER NOT NULL,
                id_topic        INTEGER NOT NULL,
                unwatched       INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (id_member, id_topic)
            );

            CREATE TABLE user_alerts (
                id_alert        INTEGER PRIMARY KEY AUTOINCREMENT,
                id_member       INTEGER NOT NULL,
                content_type    TEXT NOT NULL,
                content_id      INTEGER NOT NULL,
                content_action  TEXT NOT NULL,
                is_read         INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_user_alerts_member ON user_alerts(id_member, is_read);

            CREATE TABLE mail_queue (
                id_mail         INTEGER PRIMARY KEY AUTOINCREMENT,
                recipient       TEXT NOT NULL,
                subject         TEXT NOT NULL,
                body            TEXT NOT NULL,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- Member 0 holds the forum-wide defaults
            INSERT INTO user_alerts_prefs (id_member, alert_pref, alert_value) VALUES
                (0, 'announcements', 0),
                (0, 'board_notify', 1),
                (0, 'topic_notify', 1),
                (0, 'msg_auto_notify', 1),
                (0, 'msg_mention', 1),
                (0, 'msg_quote', 1),
                (0, 'pm_new', 1);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
