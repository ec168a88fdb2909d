pub mod time;

pub use time::{Throttle, Timer};
