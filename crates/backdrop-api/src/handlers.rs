//! Request handlers.

pub mod health;
pub mod media;
pub mod upload;

pub use health::*;
pub use media::*;
pub use upload::read_upload;
