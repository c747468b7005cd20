use axum::http::HeaderMap;
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, Validation, decode};

use agora_db::models::MemberRow;
use agora_types::api::Claims;
use agora_types::models::MemberGroup;

use crate::auth::AppState;
use crate::error::ActionError;
use crate::run_blocking;

/// The member a request acts for.
#[derive(Debug, Clone)]
pub struct CurrentMember {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub group: MemberGroup,
}

impl From<MemberRow> for CurrentMember {
    fn from(row: MemberRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            group: MemberGroup::from_id(row.group_id),
        }
    }
}

/// Permission group of an optional member; no session means guest.
pub fn group_of(member: Option<&CurrentMember>) -> MemberGroup {
    member.map(|m| m.group).unwrap_or(MemberGroup::Guest)
}

pub fn require_member(member: Option<CurrentMember>, key: &'static str) -> Result<CurrentMember, ActionError> {
    member.ok_or_else(|| ActionError::unauthorized(key))
}

/// Validates a session token and returns the member id it names.
pub fn member_id_from_token(secret: &str, token: &str) -> Option<i64> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;
    data.claims.sub.parse().ok()
}

/// Resolves the Bearer session, if any. A present but invalid token is an error,
/// not a silent downgrade to guest.
pub async fn current_member(state: &AppState, headers: &HeaderMap) -> Result<Option<CurrentMember>, ActionError> {
    let Some(auth) = headers.typed_get::<Authorization<Bearer>>() else {
        return Ok(None);
    };

    let member_id = member_id_from_token(&state.jwt_secret, auth.token())
        .ok_or_else(|| ActionError::unauthorized("session_invalid"))?;

    let db = state.clone();
    let row = run_blocking(move || Ok(db.db.get_member_by_id(member_id)?)).await?;

    row.map(CurrentMember::from)
        .map(Some)
        .ok_or_else(|| ActionError::unauthorized("session_invalid"))
}
