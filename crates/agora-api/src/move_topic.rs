use axum::{
    Json,
    response::{IntoResponse, Response},
};
use tracing::info;

use agora_types::api::MoveTopicResponse;

use crate::auth::AppState;
use crate::boards::visible_board;
use crate::dispatch::RequestParams;
use crate::error::ActionError;
use crate::run_blocking;
use crate::session::{CurrentMember, require_member};

/// `?action=movetopic`: moves `topic` to `toboard`.
/// Administrators may move any topic; members only the ones they started.
pub(crate) async fn move_topic(
    state: AppState,
    member: Option<CurrentMember>,
    params: RequestParams,
) -> Result<Response, ActionError> {
    let member = require_member(member, "login_required")?;
    let topic_id = params.require_i64("topic")?;
    let to_board = params.require_i64("toboard")?;

    let response = run_blocking(move || {
        let db = &state.db;
        let topic = db
            .get_topic(topic_id)?
            .ok_or_else(|| ActionError::not_found("no_topic"))?;
        visible_board(db, topic.board_id, member.group)?;

        if !member.group.is_admin() && topic.started_by != member.id {
            return Err(ActionError::forbidden("cannot_move"));
        }
        if to_board == topic.board_id {
            return Err(ActionError::bad_request("move_same_board"));
        }
        visible_board(db, to_board, member.group)?;

        db.move_topic(topic_id, to_board)?;
        info!(
            "Topic {} moved from board {} to {} by member {}",
            topic_id, topic.board_id, to_board, member.id
        );

        Ok(MoveTopicResponse {
            topic_id,
            from_board: topic.board_id,
            to_board,
        })
    })
    .await?;

    Ok(Json(response).into_response())
}
