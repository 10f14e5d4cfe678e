pub mod events;
pub mod models;

pub use events::EngagementEvent;
pub use models::*;
