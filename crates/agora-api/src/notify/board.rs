use agora_db::{Database, WatchTarget};
use agora_notify::NotifyKind;

use crate::boards::visible_board;
use crate::error::ActionError;
use crate::session::CurrentMember;

use super::NotifyTarget;

/// New-topic notifications for one board.
pub struct BoardTarget {
    pub board_id: i64,
}

impl NotifyTarget for BoardTarget {
    fn kind(&self) -> NotifyKind {
        NotifyKind::Board
    }

    fn item_id(&self) -> i64 {
        self.board_id
    }

    fn authorize(&self, db: &Database, member: &CurrentMember) -> Result<(), ActionError> {
        visible_board(db, self.board_id, member.group).map(|_| ())
    }

    fn watch_list(&self) -> Option<WatchTarget> {
        Some(WatchTarget::Board(self.board_id))
    }
}
