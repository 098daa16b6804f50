//! Feed controller: one playback session per constructed feed item

pub mod controller;
pub mod handle;

pub use controller::{FeedController, FeedOp, SinkFactory};
pub use handle::FeedHandle;
