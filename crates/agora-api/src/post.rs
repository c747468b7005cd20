use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, info};

use agora_db::{NotifyChange, WatchTarget};
use agora_notify::NotifyKind;
use agora_notify::pref::{AUTO_NOTIFY_KEY, TOPIC_DEFAULT_KEY};
use agora_types::api::PostResponse;

use crate::auth::{AppState, AppStateInner};
use crate::boards::visible_board;
use crate::dispatch::RequestParams;
use crate::error::ActionError;
use crate::notify::{DeliveryReport, PostEvent, deliver_post};
use crate::run_blocking;
use crate::session::{CurrentMember, require_member};

const MAX_SUBJECT_CHARS: usize = 80;

/// `?action=post`: `board` starts a topic, `topic` replies to one.
pub(crate) async fn post(
    state: AppState,
    member: Option<CurrentMember>,
    params: RequestParams,
) -> Result<Response, ActionError> {
    let member = require_member(member, "cannot_post_guest")?;
    let board_id = params.get_i64("board")?;
    let topic_id = params.get_i64("topic")?;
    let subject = params.get("subject").unwrap_or_default().trim().to_string();
    let body = params.get("message").unwrap_or_default().trim().to_string();

    let mut errors = Vec::new();
    if topic_id.is_none() && subject.is_empty() {
        errors.push("no_subject");
    }
    if subject.chars().count() > MAX_SUBJECT_CHARS {
        errors.push("subject_too_long");
    }
    if body.is_empty() {
        errors.push("no_message");
    }
    if !errors.is_empty() {
        return Err(ActionError::Validation(errors));
    }

    let response = run_blocking(move || {
        let target = match (topic_id, board_id) {
            (Some(topic_id), _) => PostTarget::Reply(topic_id),
            (None, Some(board_id)) => PostTarget::NewTopic(board_id),
            (None, None) => return Err(ActionError::bad_request("missing_param")),
        };
        post_message(&state, &member, target, &subject, &body)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(response)).into_response())
}

pub enum PostTarget {
    NewTopic(i64),
    Reply(i64),
}

/// Stores a post, auto-watches the topic for the poster and notifies watchers.
pub fn post_message(
    state: &AppStateInner,
    member: &CurrentMember,
    target: PostTarget,
    subject: &str,
    body: &str,
) -> Result<PostResponse, ActionError> {
    let db = &state.db;

    let (board_id, topic_id, message_id, subject, new_topic) = match target {
        PostTarget::NewTopic(board_id) => {
            visible_board(db, board_id, member.group)?;
            let (topic_id, message_id) = db.create_topic(board_id, member.id, subject, body)?;
            (board_id, topic_id, message_id, subject.to_string(), true)
        }
        PostTarget::Reply(topic_id) => {
            let topic = db
                .get_topic(topic_id)?
                .ok_or_else(|| ActionError::not_found("no_topic"))?;
            visible_board(db, topic.board_id, member.group)?;
            if topic.locked && !member.group.is_admin() {
                return Err(ActionError::forbidden("topic_locked"));
            }

            let subject = if subject.is_empty() {
                format!("Re: {}", topic.subject)
            } else {
                subject.to_string()
            };
            let message_id = db.add_reply(topic_id, member.id, &subject, body)?;
            (topic.board_id, topic_id, message_id, subject, false)
        }
    };

    // The post is committed; from here on failures are logged, not returned.
    if let Err(e) = auto_watch(state, member, topic_id) {
        error!("Auto-watch of topic {} failed for member {}: {}", topic_id, member.id, e);
    }

    let event = PostEvent {
        board_id,
        topic_id,
        message_id,
        poster_id: member.id,
        subject: &subject,
        new_topic,
    };
    let report = deliver_post(state, &event).unwrap_or_else(|e| {
        error!("Notification delivery failed for message {}: {:#}", message_id, e);
        DeliveryReport::default()
    });

    info!(
        "Member {} posted message {} in topic {} (board {})",
        member.id, message_id, topic_id, board_id
    );

    Ok(PostResponse {
        topic_id,
        message_id,
        alerts_sent: report.alerts,
        emails_queued: report.emails,
    })
}

/// Puts the poster on the topic's watch list when their auto-notify preference
/// is on, unless they already watch it, ignore it or cleared its preference.
fn auto_watch(state: &AppStateInner, member: &CurrentMember, topic_id: i64) -> Result<(), ActionError> {
    let db = &state.db;
    let list = WatchTarget::Topic(topic_id);
    if db.is_watching(member.id, list)? || db.is_ignoring_topic(member.id, topic_id)? {
        return Ok(());
    }

    let key = NotifyKind::Topic.pref_key(topic_id);
    let prefs = db.get_notify_prefs(&[member.id], &[AUTO_NOTIFY_KEY, TOPIC_DEFAULT_KEY, key.as_str()], true)?;
    let member_prefs = prefs.get(&member.id);

    let auto = member_prefs
        .and_then(|p| p.get(AUTO_NOTIFY_KEY))
        .is_some_and(|v| *v > 0);
    if !auto {
        return Ok(());
    }

    let pref = agora_notify::effective_pref(member_prefs, &key, TOPIC_DEFAULT_KEY);
    if pref.is_none() {
        return Ok(());
    }

    db.apply_notify_change(&NotifyChange {
        member_id: member.id,
        pref_key: &key,
        value: pref.value(),
        watch: Some((list, true)),
        ignore_topic: None,
    })?;
    Ok(())
}
