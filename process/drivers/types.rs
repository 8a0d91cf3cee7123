mod drivers;
mod platform;

pub use drivers::*;
pub use platform::*;
