use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{HeaderMap, Method, StatusCode, header},
    response::Response,
};
use tracing::debug;
use url::form_urlencoded;

use agora_notify::NotifyKind;

use crate::auth::{self, AppState};
use crate::error::ActionError;
use crate::{alerts, attachments, boards, move_topic, notify, post, search, session};

/// Actions that change state from a submitted form and refuse plain GETs.
const POST_ONLY: &[&str] = &["register", "login", "post", "movetopic"];

/// Merged request parameters: query string first, form body on top.
#[derive(Debug, Default, Clone)]
pub struct RequestParams {
    values: HashMap<String, String>,
}

impl RequestParams {
    /// Parses a query string. Both `;` and `&` separate pairs.
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        params.extend(query.replace(';', "&").as_bytes());
        params
    }

    /// Merges an `application/x-www-form-urlencoded` body over the query values.
    pub fn merge_form(&mut self, body: &[u8]) {
        self.extend(body);
    }

    fn extend(&mut self, raw: &[u8]) {
        for (name, value) in form_urlencoded::parse(raw) {
            self.values.insert(name.into_owned(), value.into_owned());
        }
    }

    /// Non-empty value of a parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn require(&self, name: &str) -> Result<&str, ActionError> {
        self.get(name).ok_or_else(|| ActionError::bad_request("missing_param"))
    }

    pub fn get_i64(&self, name: &str) -> Result<Option<i64>, ActionError> {
        self.get(name)
            .map(|v| v.trim().parse::<i64>().map_err(|_| ActionError::bad_request("invalid_param")))
            .transpose()
    }

    pub fn require_i64(&self, name: &str) -> Result<i64, ActionError> {
        self.get_i64(name)?.ok_or_else(|| ActionError::bad_request("missing_param"))
    }

    pub fn action(&self) -> Option<&str> {
        self.get("action")
    }

    pub fn sub_action(&self) -> Option<&str> {
        self.get("sa")
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

/// GET/POST `/` and `/index.php`: routes `?action=<name>` to its handler.
pub async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response, ActionError> {
    let mut params = RequestParams::from_query(query.as_deref().unwrap_or_default());
    if method == Method::POST && is_form(&headers) {
        params.merge_form(&body);
    }

    let action = params.action().map(str::to_owned);
    if let Some(name) = action.as_deref() {
        if POST_ONLY.contains(&name) && method != Method::POST {
            return Err(ActionError::fatal("post_required", StatusCode::METHOD_NOT_ALLOWED));
        }
    }

    let member = session::current_member(&state, &headers).await?;
    debug!(
        "Dispatching action {:?} (sa {:?}) for member {:?}",
        action,
        params.sub_action(),
        member.as_ref().map(|m| m.id)
    );

    match action.as_deref() {
        None => boards::index(state, member).await,
        Some("register") => auth::register_action(state, params).await,
        Some("login") => auth::login_action(state, params).await,
        Some("notifyboard") => notify::handle(state, member, params, NotifyKind::Board).await,
        Some("notifytopic") => notify::handle(state, member, params, NotifyKind::Topic).await,
        Some("notifyannouncements") => notify::handle(state, member, params, NotifyKind::Announcements).await,
        Some("post") => post::post(state, member, params).await,
        Some("movetopic") => move_topic::move_topic(state, member, params).await,
        Some("search") => search::search(state, member, params).await,
        Some("dlattach") => attachments::download(state, member, params).await,
        Some("alerts") => alerts::alerts(state, member, params).await,
        Some(_) => Err(ActionError::not_found("no_action")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semicolons_split_like_ampersands() {
        let params = RequestParams::from_query("action=notifytopic;topic=12&sa=on;mode=-2");
        assert_eq!(params.action(), Some("notifytopic"));
        assert_eq!(params.sub_action(), Some("on"));
        assert_eq!(params.require_i64("topic").unwrap(), 12);
        assert_eq!(params.get_i64("mode").unwrap(), Some(-2));
    }

    #[test]
    fn values_are_percent_decoded() {
        let params = RequestParams::from_query("search=caf%C3%A9+au+lait");
        assert_eq!(params.get("search"), Some("café au lait"));
    }

    #[test]
    fn form_body_wins_and_keeps_semicolons() {
        let mut params = RequestParams::from_query("action=post;subject=query");
        params.merge_form(b"subject=form&message=a%3Bb;c");
        assert_eq!(params.get("subject"), Some("form"));
        assert_eq!(params.get("message"), Some("a;b;c"));
    }

    #[test]
    fn empty_and_malformed_numbers() {
        let params = RequestParams::from_query("board=;topic=abc");
        assert_eq!(params.get("board"), None);
        assert_eq!(params.get_i64("board").unwrap(), None);
        assert_eq!(params.get_i64("topic").unwrap_err().key(), "invalid_param");
        assert_eq!(params.require_i64("missing").unwrap_err().key(), "missing_param");
    }
}
