pub mod source;
pub mod story;
pub mod validation;

pub use source::Source;
pub use story::{NewStory, Story};
