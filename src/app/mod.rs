pub mod context;
pub mod error;

pub use context::{AppContext, GuestAccount};
pub use error::{Result, StoryError};
