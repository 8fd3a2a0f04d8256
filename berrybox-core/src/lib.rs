//! The domain of berrybox: boxes and their queues, the transition algorithm,
//! permissions and the berries economy.
//!
//! Nothing in this crate performs I/O. Everything here operates on values that
//! `berrybox-collab` loads from and persists to the store.

mod config;
mod economy;
mod errors;
mod model;
mod permissions;
mod playlist;
mod util;

pub mod feedback;

pub use config::*;
pub use economy::*;
pub use errors::*;
pub use feedback::{FeedbackContext, FeedbackMessage};
pub use model::*;
pub use permissions::*;
pub use playlist::*;
pub use util::*;
