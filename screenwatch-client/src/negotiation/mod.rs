mod phase;
mod throttle;

pub use phase::*;
pub use throttle::*;
