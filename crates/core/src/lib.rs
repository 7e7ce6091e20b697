// crates/core/src/lib.rs
pub mod caption;
pub mod events;
pub mod result;
pub mod sentiment;

pub use caption::*;
pub use events::*;
pub use result::*;
pub use sentiment::*;
