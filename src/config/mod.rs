//! Configuration helpers shared by the commands.

pub mod duration;

pub use duration::parse_duration;
