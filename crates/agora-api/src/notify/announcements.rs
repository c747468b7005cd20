use agora_db::Database;
use agora_notify::NotifyKind;

use crate::error::ActionError;
use crate::session::CurrentMember;

use super::NotifyTarget;

/// Forum-wide announcements. No watch list; the preference alone decides.
pub struct AnnouncementsTarget;

impl NotifyTarget for AnnouncementsTarget {
    fn kind(&self) -> NotifyKind {
        NotifyKind::Announcements
    }

    fn item_id(&self) -> i64 {
        0
    }

    fn authorize(&self, _db: &Database, _member: &CurrentMember) -> Result<(), ActionError> {
        Ok(())
    }
}
