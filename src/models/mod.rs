pub mod health;
pub mod messages;
pub mod note;
pub mod status;

pub use health::*;
pub use status::*;
