pub mod health;
pub mod status;

pub use health::*;
pub use status::*;
