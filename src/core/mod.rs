pub mod manager;
pub mod services;
pub mod time;

pub use manager::{PropertyManager, ReloadReport};
pub use time::{Clock, FixedClock, SystemClock};
