mod duration;
mod id;

pub use duration::*;
pub use id::*;
