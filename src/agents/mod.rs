pub mod agents;
pub use agents::*;

pub mod messages;
pub mod runs;
pub mod threads;
