//! Notification preference actions.
//!
//! Board, topic and announcement notifications share one flow: resolve the
//! acting member (session or unsubscribe token), authorize the target, then
//! either report the current state or apply a mode and keep the preference row
//! and the watch list in step.

mod announcements;
mod board;
mod deliver;
mod topic;

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use agora_db::{Database, NotifySlot, NotifyState, WatchTarget};
use agora_notify::{NotifyKind, NotifyMode, verify_unsubscribe_token};
use agora_types::api::NotifyStateResponse;

use crate::auth::{AppState, AppStateInner};
use crate::dispatch::RequestParams;
use crate::error::ActionError;
use crate::run_blocking;
use crate::session::CurrentMember;

pub use announcements::AnnouncementsTarget;
pub use board::BoardTarget;
pub use deliver::{DeliveryReport, PostEvent, deliver_post};
pub use topic::TopicTarget;

/// Something a member can receive notifications about.
pub trait NotifyTarget {
    fn kind(&self) -> NotifyKind;

    fn item_id(&self) -> i64;

    /// Checks the target exists and the member may see it.
    fn authorize(&self, db: &Database, member: &CurrentMember) -> Result<(), ActionError>;

    /// Watch list kept in step with the preference, if the target has one.
    fn watch_list(&self) -> Option<WatchTarget> {
        None
    }

    /// Topic whose ignore flag follows `NotifyMode::Ignore`.
    fn ignorable_topic(&self) -> Option<i64> {
        None
    }
}

pub fn target_for(kind: NotifyKind, item_id: i64) -> Box<dyn NotifyTarget> {
    match kind {
        NotifyKind::Board => Box::new(BoardTarget { board_id: item_id }),
        NotifyKind::Topic => Box::new(TopicTarget { topic_id: item_id }),
        NotifyKind::Announcements => Box::new(AnnouncementsTarget),
    }
}

/// `?action=notify{board,topic,announcements}`.
///
/// Parameters: `board` / `topic` (item id), optional `mode` (-2..=3), and
/// optionally `u` + `token` to act for a member without a session.
pub(crate) async fn handle(
    state: AppState,
    member: Option<CurrentMember>,
    params: RequestParams,
    kind: NotifyKind,
) -> Result<Response, ActionError> {
    let item_id = match kind.item_param() {
        Some(param) => params.require_i64(param)?,
        None => 0,
    };
    let mode = params.get_i64("mode")?.map(NotifyMode::try_from).transpose()?;
    let via_token = match (params.get_i64("u")?, params.get("token")) {
        (Some(member_id), Some(token)) => Some((member_id, token.to_string())),
        _ => None,
    };

    let response = run_blocking(move || {
        let member = match via_token {
            Some((member_id, token)) => member_from_token(&state, member_id, &token, kind, item_id)?,
            None => member.ok_or_else(|| ActionError::unauthorized("cannot_notify_guest"))?,
        };

        let target = target_for(kind, item_id);
        target.authorize(&state.db, &member)?;
        change_pref(&state.db, target.as_ref(), &member, mode)
    })
    .await?;

    Ok(Json(response).into_response())
}

/// Loads the member an unsubscribe link was issued to, if the token matches.
fn member_from_token(
    state: &AppStateInner,
    member_id: i64,
    token: &str,
    kind: NotifyKind,
    item_id: i64,
) -> Result<CurrentMember, ActionError> {
    let Some(row) = state.db.get_member_by_id(member_id)? else {
        warn!("Unsubscribe token for unknown member {}", member_id);
        return Err(ActionError::forbidden("unsubscribe_invalid"));
    };

    if !verify_unsubscribe_token(state.auth_secret.as_bytes(), row.id, &row.email, kind, item_id, token) {
        warn!(
            "Rejected {} unsubscribe token for member {} (item {})",
            kind.token_type(),
            member_id,
            item_id
        );
        return Err(ActionError::forbidden("unsubscribe_invalid"));
    }

    Ok(row.into())
}

/// Reports the member's notification state for `target`, applying `mode` first if given.
pub fn change_pref(
    db: &Database,
    target: &dyn NotifyTarget,
    member: &CurrentMember,
    mode: Option<NotifyMode>,
) -> Result<NotifyStateResponse, ActionError> {
    let kind = target.kind();
    let item_id = target.item_id();
    let key = kind.pref_key(item_id);
    let slot = NotifySlot {
        member_id: member.id,
        pref_key: &key,
        default_key: kind.default_key(),
        watch: target.watch_list(),
        ignore_topic: target.ignorable_topic(),
    };

    let Some(mode) = mode else {
        let state = db.notify_state(&slot)?;
        return Ok(state_response(target, member.id, state, false));
    };

    let state = db.apply_notify_mode(&slot, mode)?;
    info!(
        "Member {} set {} notifications for item {} to {} (mode {})",
        member.id,
        kind.token_type(),
        item_id,
        state.pref.bits(),
        mode.code()
    );

    Ok(state_response(target, member.id, state, true))
}

fn state_response(
    target: &dyn NotifyTarget,
    member_id: i64,
    state: NotifyState,
    changed: bool,
) -> NotifyStateResponse {
    NotifyStateResponse {
        target: target.kind().token_type().to_string(),
        item_id: target.item_id(),
        member_id,
        pref: state.pref.bits(),
        mode: NotifyMode::for_state(state.pref, state.watching, state.ignored).code(),
        watching: state.watching,
        ignored: state.ignored,
        changed,
    }
}
