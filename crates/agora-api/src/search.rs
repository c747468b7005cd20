use axum::{
    Json,
    response::{IntoResponse, Response},
};

use agora_types::api::{SearchHit, SearchResponse};

use crate::auth::AppState;
use crate::dispatch::RequestParams;
use crate::error::ActionError;
use crate::session::{CurrentMember, group_of};
use crate::{parse_timestamp, run_blocking};

const MIN_SEARCH_CHARS: usize = 3;
const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;
const EXCERPT_CHARS: usize = 120;

/// `?action=search;search=<text>[;brd=<board>][;start=<n>][;limit=<n>]`
pub(crate) async fn search(
    state: AppState,
    member: Option<CurrentMember>,
    params: RequestParams,
) -> Result<Response, ActionError> {
    let query = params.get("search").unwrap_or_default().trim().to_string();
    if query.chars().count() < MIN_SEARCH_CHARS {
        return Err(ActionError::bad_request("search_string_too_short"));
    }

    let board_filter = params.get_i64("brd")?;
    let start = params.get_i64("start")?.unwrap_or(0).clamp(0, u32::MAX as i64) as u32;
    let limit = params.get_i64("limit")?.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT) as u32;
    let group = group_of(member.as_ref());

    let needle = query.clone();
    let rows = run_blocking(move || {
        let mut boards: Vec<i64> = state
            .db
            .list_boards()?
            .into_iter()
            .filter(|b| group.can_see(&b.member_groups))
            .map(|b| b.id)
            .collect();

        if let Some(board_id) = board_filter {
            if !boards.contains(&board_id) {
                return Err(ActionError::not_found("no_board"));
            }
            boards = vec![board_id];
        }

        Ok(state.db.search_messages(&needle, &boards, start, limit)?)
    })
    .await?;

    let results = rows
        .into_iter()
        .map(|row| SearchHit {
            message_id: row.message_id,
            topic_id: row.topic_id,
            board_id: row.board_id,
            excerpt: excerpt(&row.body),
            subject: row.subject,
            poster_time: parse_timestamp(&row.poster_time),
        })
        .collect();

    Ok(Json(SearchResponse {
        query,
        start,
        limit,
        results,
    })
    .into_response())
}

fn excerpt(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head.trim_end())
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_truncates_on_chars() {
        assert_eq!(excerpt("short"), "short");
        let long = "é".repeat(EXCERPT_CHARS + 5);
        let cut = excerpt(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), EXCERPT_CHARS + 3);
    }
}
