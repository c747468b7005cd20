use serde::{Deserialize, Serialize};

/// Permission group of a member. Boards list the group ids allowed to see them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberGroup {
    Guest,
    Member,
    Admin,
}

impl MemberGroup {
    pub fn from_id(id: i64) -> Self {
        match id {
            1 => Self::Admin,
            id if id < 0 => Self::Guest,
            _ => Self::Member,
        }
    }

    pub fn id(self) -> i64 {
        match self {
            Self::Guest => -1,
            Self::Member => 0,
            Self::Admin => 1,
        }
    }

    pub fn is_admin(self) -> bool {
        self == Self::Admin
    }

    /// Checks a board's comma-separated `member_groups` list.
    /// Administrators see every board.
    pub fn can_see(self, member_groups: &str) -> bool {
        if self.is_admin() {
            return true;
        }
        member_groups
            .split(',')
            .filter_map(|g| g.trim().parse::<i64>().ok())
            .any(|g| g == self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_visibility() {
        assert!(MemberGroup::Guest.can_see("-1,0"));
        assert!(!MemberGroup::Guest.can_see("0"));
        assert!(MemberGroup::Member.can_see(" -1, 0 "));
        assert!(!MemberGroup::Member.can_see(""));
        assert!(MemberGroup::Admin.can_see(""));
    }

    #[test]
    fn group_ids_roundtrip() {
        for group in [MemberGroup::Guest, MemberGroup::Member, MemberGroup::Admin] {
            assert_eq!(MemberGroup::from_id(group.id()), group);
        }
        assert_eq!(MemberGroup::from_id(7), MemberGroup::Member);
    }
}
