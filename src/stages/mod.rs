pub mod extract;
pub mod normalize;
pub mod orchestrate;

pub use extract::*;
pub use normalize::*;
pub use orchestrate::*;
