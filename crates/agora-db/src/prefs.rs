use std::collections::HashMap;

use anyhow::Result;
use rusqlite::types::ToSql;
use rusqlite::{Connection, params};
use tracing::debug;

use agora_notify::{NotifyMode, NotifyPref, effective_pref};

use crate::Database;
use crate::queries::{OptionalExt, placeholders};

/// Member id whose rows hold the forum-wide default preferences.
pub const DEFAULT_MEMBER: i64 = 0;

/// Preference name -> stored value, for one member.
pub type PrefMap = HashMap<String, i64>;

/// A board or topic notification list (`log_notify`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchTarget {
    Board(i64),
    Topic(i64),
}

impl WatchTarget {
    fn columns(self) -> (i64, i64) {
        match self {
            Self::Board(id) => (0, id),
            Self::Topic(id) => (id, 0),
        }
    }
}

/// Combined preference + watch-list update, applied atomically.
#[derive(Debug, Clone)]
pub struct NotifyChange<'a> {
    pub member_id: i64,
    pub pref_key: &'a str,
    pub value: i64,
    /// Watch list to join (`true`) or leave (`false`).
    pub watch: Option<(WatchTarget, bool)>,
    /// Topic whose ignore flag is set (`true`) or cleared (`false`).
    pub ignore_topic: Option<(i64, bool)>,
}

/// One member's notification settings for one target.
#[derive(Debug, Clone)]
pub struct NotifySlot<'a> {
    pub member_id: i64,
    pub pref_key: &'a str,
    /// Generic key consulted when `pref_key` has no row.
    pub default_key: &'a str,
    pub watch: Option<WatchTarget>,
    pub ignore_topic: Option<i64>,
}

/// Effective preference plus watch-list and ignore state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyState {
    pub pref: NotifyPref,
    /// Watch-list membership; without a list, whether the preference is on.
    pub watching: bool,
    pub ignored: bool,
}

impl Database {
    /// Loads preference rows for `members` plus the default member 0.
    ///
    /// `prefs` narrows the lookup to the given names (empty = all). With
    /// `apply_default`, every requested member gets the defaults merged under its
    /// own rows, and member 0 is dropped unless it was requested.
    pub fn get_notify_prefs(&self, members: &[i64], prefs: &[&str], apply_default: bool) -> Result<HashMap<i64, PrefMap>> {
        self.with_conn(|conn| load_prefs(conn, members, prefs, apply_default))
    }

    /// Replaces the named preferences of one member, clamping values to `i8`.
    /// Defaults (member 0) are owned by migrations and never written here.
    pub fn set_notify_prefs(&self, member_id: i64, prefs: &[(&str, i64)]) -> Result<()> {
        if prefs.is_empty() || member_id == DEFAULT_MEMBER {
            return Ok(());
        }
        self.with_tx(|conn| replace_prefs(conn, member_id, prefs))
    }

    pub fn delete_notify_prefs(&self, member_id: i64, names: &[&str]) -> Result<usize> {
        if names.is_empty() {
            return Ok(0);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "DELETE FROM user_alerts_prefs WHERE id_member = ?1 AND alert_pref IN ({})",
                placeholders(2, names.len())
            );
            let values: Vec<&dyn ToSql> = std::iter::once(&member_id as &dyn ToSql)
                .chain(names.iter().map(|n| n as &dyn ToSql))
                .collect();
            Ok(conn.execute(&sql, values.as_slice())?)
        })
    }

    pub fn is_watching(&self, member_id: i64, target: WatchTarget) -> Result<bool> {
        self.with_conn(|conn| watching(conn, member_id, target))
    }

    pub fn is_ignoring_topic(&self, member_id: i64, topic_id: i64) -> Result<bool> {
        self.with_conn(|conn| ignoring(conn, member_id, topic_id))
    }

    /// Members on a watch list, ascending by id.
    pub fn watchers(&self, target: WatchTarget) -> Result<Vec<i64>> {
        let (topic, board) = target.columns();
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id_member FROM log_notify WHERE id_topic = ?1 AND id_board = ?2 ORDER BY id_member",
            )?;
            let ids = stmt
                .query_map([topic, board], |row| row.get::<_, i64>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    /// Members who marked the topic as ignored.
    pub fn topic_ignorers(&self, topic_id: i64) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id_member FROM log_topics WHERE id_topic = ?1 AND unwatched = 1")?;
            let ids = stmt
                .query_map([topic_id], |row| row.get::<_, i64>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    /// Writes a preference together with its watch-list and ignore-flag rows.
    pub fn apply_notify_change(&self, change: &NotifyChange<'_>) -> Result<()> {
        self.with_tx(|conn| write_change(conn, change))
    }

    /// Current state of a slot, read under one lock.
    pub fn notify_state(&self, slot: &NotifySlot<'_>) -> Result<NotifyState> {
        self.with_conn(|conn| {
            let pref = current_pref(conn, slot)?;
            read_state(conn, slot, pref)
        })
    }

    /// Applies a UI mode to a slot: reads the effective preference, writes the
    /// new one with its paired watch-list and ignore-flag rows, and returns the
    /// resulting state, all in one transaction.
    ///
    /// `EmailOff` never joins a watch list; it only leaves one when no alerts
    /// remain. Every other mode keeps the watch row iff the preference is not NONE.
    pub fn apply_notify_mode(&self, slot: &NotifySlot<'_>, mode: NotifyMode) -> Result<NotifyState> {
        self.with_tx(|conn| {
            let pref = mode.apply(current_pref(conn, slot)?);
            let watch = slot.watch.and_then(|list| match mode {
                NotifyMode::EmailOff if !pref.is_none() => None,
                _ => Some((list, !pref.is_none())),
            });

            write_change(
                conn,
                &NotifyChange {
                    member_id: slot.member_id,
                    pref_key: slot.pref_key,
                    value: pref.value(),
                    watch,
                    ignore_topic: slot.ignore_topic.map(|topic| (topic, mode == NotifyMode::Ignore)),
                },
            )?;

            read_state(conn, slot, pref)
        })
    }
}

fn load_prefs(conn: &Connection, members: &[i64], prefs: &[&str], apply_default: bool) -> Result<HashMap<i64, PrefMap>> {
    let mut ids = members.to_vec();
    if !ids.contains(&DEFAULT_MEMBER) {
        ids.push(DEFAULT_MEMBER);
    }

    let mut sql = format!(
        "SELECT id_member, alert_pref, alert_value FROM user_alerts_prefs WHERE id_member IN ({})",
        placeholders(1, ids.len())
    );
    if !prefs.is_empty() {
        sql.push_str(&format!(" AND alert_pref IN ({})", placeholders(ids.len() + 1, prefs.len())));
    }

    let values: Vec<&dyn ToSql> = ids
        .iter()
        .map(|id| id as &dyn ToSql)
        .chain(prefs.iter().map(|p| p as &dyn ToSql))
        .collect();

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(values.as_slice())?;
    let mut result: HashMap<i64, PrefMap> = HashMap::new();
    while let Some(row) = rows.next()? {
        let member: i64 = row.get(0)?;
        result.entry(member).or_default().insert(row.get(1)?, row.get(2)?);
    }

    if apply_default {
        let defaults = result.get(&DEFAULT_MEMBER).cloned().unwrap_or_default();
        for member in members {
            let entry = result.entry(*member).or_default();
            for (name, value) in &defaults {
                entry.entry(name.clone()).or_insert(*value);
            }
        }
        if !members.contains(&DEFAULT_MEMBER) {
            result.remove(&DEFAULT_MEMBER);
        }
    }

    Ok(result)
}

fn current_pref(conn: &Connection, slot: &NotifySlot<'_>) -> Result<NotifyPref> {
    let prefs = load_prefs(conn, &[slot.member_id], &[slot.pref_key, slot.default_key], true)?;
    Ok(effective_pref(prefs.get(&slot.member_id), slot.pref_key, slot.default_key))
}

fn read_state(conn: &Connection, slot: &NotifySlot<'_>, pref: NotifyPref) -> Result<NotifyState> {
    let watching = match slot.watch {
        Some(list) => watching(conn, slot.member_id, list)?,
        None => !pref.is_none(),
    };
    let ignored = match slot.ignore_topic {
        Some(topic) => ignoring(conn, slot.member_id, topic)?,
        None => false,
    };
    Ok(NotifyState { pref, watching, ignored })
}

fn watching(conn: &Connection, member_id: i64, target: WatchTarget) -> Result<bool> {
    let (topic, board) = target.columns();
    let found = conn
        .query_row(
            "SELECT 1 FROM log_notify WHERE id_member = ?1 AND id_topic = ?2 AND id_board = ?3",
            [member_id, topic, board],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn ignoring(conn: &Connection, member_id: i64, topic_id: i64) -> Result<bool> {
    let unwatched = conn
        .query_row(
            "SELECT unwatched FROM log_topics WHERE id_member = ?1 AND id_topic = ?2",
            [member_id, topic_id],
            |row| row.get::<_, bool>(0),
        )
        .optional()?;
    Ok(unwatched.unwrap_or(false))
}

fn write_change(conn: &Connection, change: &NotifyChange<'_>) -> Result<()> {
    replace_prefs(conn, change.member_id, &[(change.pref_key, change.value)])?;

    if let Some((target, join)) = change.watch {
        let (topic, board) = target.columns();
        if join {
            conn.execute(
                "INSERT OR IGNORE INTO log_notify (id_member, id_topic, id_board) VALUES (?1, ?2, ?3)",
                [change.member_id, topic, board],
            )?;
        } else {
            conn.execute(
                "DELETE FROM log_notify WHERE id_member = ?1 AND id_topic = ?2 AND id_board = ?3",
                [change.member_id, topic, board],
            )?;
        }
    }

    if let Some((topic_id, ignored)) = change.ignore_topic {
        conn.execute(
            "INSERT INTO log_topics (id_member, id_topic, unwatched) VALUES (?1, ?2, ?3)
             ON CONFLICT (id_member, id_topic) DO UPDATE SET unwatched = excluded.unwatched",
            params![change.member_id, topic_id, ignored],
        )?;
    }

    debug!(
        "Notify change for member {}: {} = {}",
        change.member_id, change.pref_key, change.value
    );
    Ok(())
}

fn replace_prefs(conn: &Connection, member_id: i64, prefs: &[(&str, i64)]) -> Result<()> {
    let mut stmt = conn.prepare(
        "REPLACE INTO user_alerts_prefs (id_member, alert_pref, alert_value) VALUES (?1, ?2, ?3)",
    )?;
    for (name, value) in prefs {
        let clamped = (*value).clamp(i8::MIN as i64, i8::MAX as i64);
        stmt.execute(params![member_id, name, clamped])?;
    }
    Ok(())
}
