use axum::{
    Json,
    response::{IntoResponse, Response},
};

use agora_db::Database;
use agora_db::models::BoardRow;
use agora_types::api::{BoardIndexResponse, BoardSummary};
use agora_types::models::MemberGroup;

use crate::auth::AppState;
use crate::error::ActionError;
use crate::run_blocking;
use crate::session::{CurrentMember, group_of};

/// Loads a board the given group is allowed to see.
pub fn visible_board(db: &Database, board_id: i64, group: MemberGroup) -> Result<BoardRow, ActionError> {
    let board = db
        .get_board(board_id)?
        .ok_or_else(|| ActionError::not_found("no_board"))?;
    if !group.can_see(&board.member_groups) {
        return Err(ActionError::forbidden("no_access"));
    }
    Ok(board)
}

/// Board index: every board visible to the requester.
pub(crate) async fn index(state: AppState, member: Option<CurrentMember>) -> Result<Response, ActionError> {
    let group = group_of(member.as_ref());

    let boards = run_blocking(move || Ok(state.db.list_boards()?)).await?;
    let boards = boards
        .into_iter()
        .filter(|b| group.can_see(&b.member_groups))
        .map(|b| BoardSummary {
            id: b.id,
            name: b.name,
            num_topics: b.num_topics,
            num_posts: b.num_posts,
        })
        .collect();

    Ok(Json(BoardIndexResponse { group, boards }).into_response())
}
