use std::path::{Path, PathBuf};

use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use crate::auth::AppState;
use crate::dispatch::RequestParams;
use crate::error::ActionError;
use crate::run_blocking;
use crate::session::{CurrentMember, group_of};

/// Attachments live on disk as `<id>_<sha256>` so filenames never reach the filesystem.
pub fn attachment_path(dir: &Path, attach_id: i64, file_hash: &str) -> PathBuf {
    dir.join(format!("{}_{}", attach_id, file_hash))
}

/// Records an attachment for a message and writes its bytes under the attachments dir.
pub async fn store_attachment(
    state: &AppState,
    message_id: i64,
    filename: &str,
    mime_type: &str,
    content: Vec<u8>,
) -> Result<i64, ActionError> {
    let db = state.clone();
    let name = filename.to_string();
    let mime = mime_type.to_string();
    let (attach_id, file_hash, content) = run_blocking(move || {
        let (id, hash) = db.db.insert_attachment(message_id, &name, &mime, &content)?;
        Ok((id, hash, content))
    })
    .await?;

    tokio::fs::create_dir_all(&state.attachments_dir)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create attachments dir: {}", e))?;
    let path = attachment_path(&state.attachments_dir, attach_id, &file_hash);
    tokio::fs::write(&path, &content)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to write attachment {}: {}", path.display(), e))?;

    info!("Stored attachment {} ({} bytes) for message {}", attach_id, content.len(), message_id);
    Ok(attach_id)
}

/// `?action=dlattach;attach=<id>`
pub(crate) async fn download(
    state: AppState,
    member: Option<CurrentMember>,
    params: RequestParams,
) -> Result<Response, ActionError> {
    let attach_id = params.require_i64("attach")?;
    let group = group_of(member.as_ref());

    let db = state.clone();
    let row = run_blocking(move || Ok(db.db.get_attachment(attach_id)?))
        .await?
        .ok_or_else(|| ActionError::not_found("no_attachment"))?;

    if !group.can_see(&row.board_groups) {
        return Err(ActionError::forbidden("no_access"));
    }

    let path = attachment_path(&state.attachments_dir, row.id, &row.file_hash);
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        warn!("Failed to read attachment {}: {}", path.display(), e);
        ActionError::not_found("no_attachment")
    })?;

    let db = state.clone();
    run_blocking(move || Ok(db.db.increment_downloads(attach_id)?)).await?;

    let disposition = format!("attachment; filename=\"{}\"", sanitize_filename(&row.filename));
    Ok((
        [
            (header::CONTENT_TYPE, row.mime_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control() && *c != '"' && *c != '\\')
        .collect()
}
