use axum::{
    Json,
    response::{IntoResponse, Response},
};

use agora_types::api::{AlertResponse, MarkReadResponse};

use crate::auth::AppState;
use crate::dispatch::RequestParams;
use crate::error::ActionError;
use crate::session::{CurrentMember, require_member};
use crate::{parse_timestamp, run_blocking};

const ALERT_PAGE: u32 = 50;

/// `?action=alerts` lists the member's alerts; `sa=markread` marks them read.
pub(crate) async fn alerts(
    state: AppState,
    member: Option<CurrentMember>,
    params: RequestParams,
) -> Result<Response, ActionError> {
    let member = require_member(member, "login_required")?;

    match params.sub_action() {
        None | Some("list") => {
            let rows = run_blocking(move || Ok(state.db.get_alerts(member.id, ALERT_PAGE)?)).await?;
            let alerts: Vec<AlertResponse> = rows
                .into_iter()
                .map(|row| AlertResponse {
                    id: row.id,
                    content_type: row.content_type,
                    content_id: row.content_id,
                    content_action: row.content_action,
                    is_read: row.is_read,
                    created_at: parse_timestamp(&row.created_at),
                })
                .collect();
            Ok(Json(alerts).into_response())
        }
        Some("markread") => {
            let marked = run_blocking(move || Ok(state.db.mark_alerts_read(member.id)?)).await?;
            Ok(Json(MarkReadResponse { marked }).into_response())
        }
        Some(_) => Err(ActionError::not_found("no_action")),
    }
}
