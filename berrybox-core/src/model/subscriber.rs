use crate::{PrimaryKey, Role, UserData};

/// A user's membership in a box
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberData {
    pub box_id: PrimaryKey,
    pub user: UserData,
    pub role: Role,
    pub berries: i64,
}
