mod box_data;
mod queue_item;
mod subscriber;
mod video;

pub use box_data::*;
pub use queue_item::*;
pub use subscriber::*;
pub use video::*;

/// The type used for primary keys of stored records.
pub type PrimaryKey = u32;

/// A berrybox account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserData {
    pub id: PrimaryKey,
    pub name: String,
}
