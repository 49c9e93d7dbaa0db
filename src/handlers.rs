pub mod shoutout;

pub use shoutout::{ShoutoutHandler, ShoutoutOutcome};
