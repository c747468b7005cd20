use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::NotifyError;

/// Generic key holding a member's default for board notifications.
pub const BOARD_DEFAULT_KEY: &str = "board_notify";
/// Generic key holding a member's default for topic notifications.
pub const TOPIC_DEFAULT_KEY: &str = "topic_notify";
/// Whether posting automatically watches the topic.
pub const AUTO_NOTIFY_KEY: &str = "msg_auto_notify";
pub const ANNOUNCEMENTS_KEY: &str = "announcements";

/// 2-bit notification preference: bit 0 = alert, bit 1 = email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotifyPref(u8);

impl NotifyPref {
    pub const NONE: Self = Self(0);
    pub const ALERT: Self = Self(1);
    pub const EMAIL: Self = Self(2);
    pub const BOTH: Self = Self(3);

    /// Interprets a stored value. Non-positive values mean no notifications.
    pub fn from_value(value: i64) -> Self {
        if value <= 0 {
            Self::NONE
        } else {
            Self((value & 0b11) as u8)
        }
    }

    pub fn value(self) -> i64 {
        self.0 as i64
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn wants_alert(self) -> bool {
        self.0 & Self::ALERT.0 != 0
    }

    pub fn wants_email(self) -> bool {
        self.0 & Self::EMAIL.0 != 0
    }

    pub fn with_email_cleared(self) -> Self {
        Self(self.0 & Self::ALERT.0)
    }
}

/// Signed mode code sent by the UI and by unsubscribe links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyMode {
    /// Stop emails but keep alerts; used by unsubscribe links.
    EmailOff,
    /// Ignore the target. For topics this also marks it unwatched.
    Ignore,
    Off,
    /// Following without notifications. Stored the same as `Off`.
    Follow,
    Alerts,
    AlertsAndEmail,
}

impl NotifyMode {
    pub fn code(self) -> i8 {
        match self {
            Self::EmailOff => -2,
            Self::Ignore => -1,
            Self::Off => 0,
            Self::Follow => 1,
            Self::Alerts => 2,
            Self::AlertsAndEmail => 3,
        }
    }

    /// Maps the mode onto a new preference. Only `EmailOff` depends on the current one.
    pub fn apply(self, current: NotifyPref) -> NotifyPref {
        match self {
            Self::EmailOff => current.with_email_cleared(),
            Self::Ignore | Self::Off | Self::Follow => NotifyPref::NONE,
            Self::Alerts => NotifyPref::ALERT,
            Self::AlertsAndEmail => NotifyPref::BOTH,
        }
    }

    /// Mode shown for a stored preference and watch state.
    ///
    /// `Follow` clears the preference like `Off` and drops the watch row, so
    /// both read back as `Off`.
    pub fn for_state(pref: NotifyPref, watching: bool, ignored: bool) -> Self {
        if ignored {
            return Self::Ignore;
        }
        if !watching || pref.is_none() {
            Self::Off
        } else if pref == NotifyPref::ALERT {
            Self::Alerts
        } else {
            Self::AlertsAndEmail
        }
    }
}

impl TryFrom<i64> for NotifyMode {
    type Error = NotifyError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            -2 => Ok(Self::EmailOff),
            -1 => Ok(Self::Ignore),
            0 => Ok(Self::Off),
            1 => Ok(Self::Follow),
            2 => Ok(Self::Alerts),
            3 => Ok(Self::AlertsAndEmail),
            other => Err(NotifyError::InvalidMode(other)),
        }
    }
}

/// The three kinds of notification target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyKind {
    Board,
    Topic,
    Announcements,
}

impl NotifyKind {
    /// Type string mixed into unsubscribe tokens.
    pub fn token_type(self) -> &'static str {
        match self {
            Self::Board => "board",
            Self::Topic => "topic",
            Self::Announcements => "announcements",
        }
    }

    pub fn action(self) -> &'static str {
        match self {
            Self::Board => "notifyboard",
            Self::Topic => "notifytopic",
            Self::Announcements => "notifyannouncements",
        }
    }

    /// Request parameter carrying the item id, if the kind has items.
    pub fn item_param(self) -> Option<&'static str> {
        match self {
            Self::Board => Some("board"),
            Self::Topic => Some("topic"),
            Self::Announcements => None,
        }
    }

    pub fn pref_key(self, item_id: i64) -> String {
        match self {
            Self::Board => format!("{BOARD_DEFAULT_KEY}_{item_id}"),
            Self::Topic => format!("{TOPIC_DEFAULT_KEY}_{item_id}"),
            Self::Announcements => ANNOUNCEMENTS_KEY.to_string(),
        }
    }

    /// Member-wide fallback key consulted when no per-item row exists.
    pub fn default_key(self) -> &'static str {
        match self {
            Self::Board => BOARD_DEFAULT_KEY,
            Self::Topic => TOPIC_DEFAULT_KEY,
            Self::Announcements => ANNOUNCEMENTS_KEY,
        }
    }
}

/// Resolves a preference from one member's merged preference map.
///
/// A per-item row wins even at 0, so clearing a preference shadows the defaults.
pub fn effective_pref(prefs: Option<&HashMap<String, i64>>, key: &str, default_key: &str) -> NotifyPref {
    let Some(prefs) = prefs else {
        return NotifyPref::NONE;
    };
    prefs
        .get(key)
        .or_else(|| prefs.get(default_key))
        .map(|v| NotifyPref::from_value(*v))
        .unwrap_or(NotifyPref::NONE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_table() {
        let current = NotifyPref::BOTH;
        let expected = [
            (-2, NotifyPref::ALERT),
            (-1, NotifyPref::NONE),
            (0, NotifyPref::NONE),
            (1, NotifyPref::NONE),
            (2, NotifyPref::ALERT),
            (3, NotifyPref::BOTH),
        ];
        for (code, pref) in expected {
            let mode = NotifyMode::try_from(code).unwrap();
            assert_eq!(mode.code() as i64, code);
            assert_eq!(mode.apply(current), pref, "mode {code}");
        }
    }

    #[test]
    fn mode_out_of_range() {
        assert_eq!(NotifyMode::try_from(4), Err(NotifyError::InvalidMode(4)));
        assert_eq!(NotifyMode::try_from(-3), Err(NotifyError::InvalidMode(-3)));
    }

    #[test]
    fn email_off_keeps_alert_bit_only() {
        assert_eq!(NotifyMode::EmailOff.apply(NotifyPref::EMAIL), NotifyPref::NONE);
        assert_eq!(NotifyMode::EmailOff.apply(NotifyPref::ALERT), NotifyPref::ALERT);
        assert_eq!(NotifyMode::EmailOff.apply(NotifyPref::NONE), NotifyPref::NONE);
    }

    #[test]
    fn stored_values_are_masked() {
        assert_eq!(NotifyPref::from_value(-5), NotifyPref::NONE);
        assert_eq!(NotifyPref::from_value(7), NotifyPref::BOTH);
        assert!(NotifyPref::from_value(2).wants_email());
        assert!(!NotifyPref::from_value(2).wants_alert());
    }

    #[test]
    fn tombstone_shadows_default() {
        let mut prefs = HashMap::new();
        prefs.insert("topic_notify".to_string(), 3);
        assert_eq!(effective_pref(Some(&prefs), "topic_notify_9", "topic_notify"), NotifyPref::BOTH);

        prefs.insert("topic_notify_9".to_string(), 0);
        assert_eq!(effective_pref(Some(&prefs), "topic_notify_9", "topic_notify"), NotifyPref::NONE);
        assert_eq!(effective_pref(None, "topic_notify_9", "topic_notify"), NotifyPref::NONE);
    }

    #[test]
    fn displayed_mode() {
        assert_eq!(NotifyMode::for_state(NotifyPref::BOTH, true, true), NotifyMode::Ignore);
        assert_eq!(NotifyMode::for_state(NotifyPref::BOTH, false, false), NotifyMode::Off);
        assert_eq!(NotifyMode::for_state(NotifyPref::NONE, true, false), NotifyMode::Off);
        assert_eq!(NotifyMode::for_state(NotifyPref::ALERT, true, false), NotifyMode::Alerts);
        assert_eq!(NotifyMode::for_state(NotifyPref::EMAIL, true, false), NotifyMode::AlertsAndEmail);
    }

    #[test]
    fn keys_per_kind() {
        assert_eq!(NotifyKind::Board.pref_key(4), "board_notify_4");
        assert_eq!(NotifyKind::Topic.pref_key(12), "topic_notify_12");
        assert_eq!(NotifyKind::Announcements.pref_key(99), "announcements");
        assert_eq!(NotifyKind::Topic.item_param(), Some("topic"));
    }
}
