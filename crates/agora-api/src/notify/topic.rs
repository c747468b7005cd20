use agora_db::{Database, WatchTarget};
use agora_notify::NotifyKind;

use crate::boards::visible_board;
use crate::error::ActionError;
use crate::session::CurrentMember;

use super::NotifyTarget;

/// Reply notifications for one topic. Mode -1 also marks the topic ignored.
pub struct TopicTarget {
    pub topic_id: i64,
}

impl NotifyTarget for TopicTarget {
    fn kind(&self) -> NotifyKind {
        NotifyKind::Topic
    }

    fn item_id(&self) -> i64 {
        self.topic_id
    }

    fn authorize(&self, db: &Database, member: &CurrentMember) -> Result<(), ActionError> {
        let topic = db
            .get_topic(self.topic_id)?
            .ok_or_else(|| ActionError::not_found("no_topic"))?;
        visible_board(db, topic.board_id, member.group).map(|_| ())
    }

    fn watch_list(&self) -> Option<WatchTarget> {
        Some(WatchTarget::Topic(self.topic_id))
    }

    fn ignorable_topic(&self) -> Option<i64> {
        Some(self.topic_id)
    }
}
