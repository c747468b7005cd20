use anyhow::{Result, anyhow};
use tracing::debug;

use agora_db::WatchTarget;
use agora_notify::{NotifyKind, effective_pref, unsubscribe_url};
use agora_types::models::MemberGroup;

use crate::auth::AppStateInner;
use crate::lang;

/// A freshly stored post whose watchers should hear about it.
#[derive(Debug, Clone)]
pub struct PostEvent<'a> {
    pub board_id: i64,
    pub topic_id: i64,
    pub message_id: i64,
    pub poster_id: i64,
    pub subject: &'a str,
    pub new_topic: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub alerts: usize,
    pub emails: usize,
}

/// Alerts and emails the watchers of a new topic's board or a reply's topic.
///
/// The poster, members ignoring the topic and members who can no longer see
/// the board are skipped. The ALERT bit writes an alert row; the EMAIL bit
/// queues a mail carrying a one-click unsubscribe link.
pub fn deliver_post(state: &AppStateInner, event: &PostEvent<'_>) -> Result<DeliveryReport> {
    let (kind, item_id, list) = if event.new_topic {
        (NotifyKind::Board, event.board_id, WatchTarget::Board(event.board_id))
    } else {
        (NotifyKind::Topic, event.topic_id, WatchTarget::Topic(event.topic_id))
    };

    let ignoring = state.db.topic_ignorers(event.topic_id)?;
    let recipients: Vec<i64> = state
        .db
        .watchers(list)?
        .into_iter()
        .filter(|id| *id != event.poster_id && !ignoring.contains(id))
        .collect();

    let mut report = DeliveryReport::default();
    if recipients.is_empty() {
        return Ok(report);
    }

    let board = state
        .db
        .get_board(event.board_id)?
        .ok_or_else(|| anyhow!("Board not found: {}", event.board_id))?;
    let key = kind.pref_key(item_id);
    let prefs = state
        .db
        .get_notify_prefs(&recipients, &[key.as_str(), kind.default_key()], true)?;

    let content_action = if event.new_topic { "new_topic" } else { "reply" };
    let topic_url = format!("{}?topic={};msg={}", state.board_url, event.topic_id, event.message_id);

    for member in state.db.get_members_by_ids(&recipients)? {
        if !MemberGroup::from_id(member.group_id).can_see(&board.member_groups) {
            continue;
        }

        let pref = effective_pref(prefs.get(&member.id), &key, kind.default_key());
        if pref.wants_alert() {
            state
                .db
                .insert_alert(member.id, "topic", event.topic_id, content_action)?;
            report.alerts += 1;
        }
        if pref.wants_email() {
            let unsubscribe = unsubscribe_url(
                &state.board_url,
                state.auth_secret.as_bytes(),
                member.id,
                &member.email,
                kind,
                item_id,
            );
            let (subject, body) = lang::notify_email(event.new_topic, event.subject, &topic_url, &unsubscribe);
            state.db.queue_mail(&member.email, &subject, &body)?;
            report.emails += 1;
        }
    }

    debug!(
        "Delivered message {}: {} alerts, {} emails",
        event.message_id, report.alerts, report.emails
    );
    Ok(report)
}
