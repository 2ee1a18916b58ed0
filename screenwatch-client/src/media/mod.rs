mod capture;
mod remote;

pub use capture::*;
pub use remote::*;
