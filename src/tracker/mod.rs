pub mod jira;
pub mod memory;

pub use jira::*;
pub use memory::*;
