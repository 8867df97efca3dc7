//! Built-in module handlers
//!
//! One handler per routing module tag. Each is an independent
//! [`crate::dispatch::Handler`]; failures stay local to the command that
//! caused them.

mod chatbot;
mod realtime;
mod search;
mod skills;
mod system;

pub use chatbot::ChatHandler;
pub use realtime::{GeoLocation, LocationHandler, RealtimeClient, TimeHandler, WeatherHandler};
pub use search::SearchHandler;
pub use skills::CommandSkill;
pub use system::SystemCommandHandler;
