pub use build::*;
pub use scan::*;
pub use sign::*;

mod build;
mod scan;
mod sign;
