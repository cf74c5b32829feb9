pub mod reference;
pub mod transcript;
pub mod update;

pub use reference::*;
pub use transcript::*;
pub use update::*;
