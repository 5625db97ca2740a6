pub mod arguments;
pub mod git;
pub mod release;
pub mod selector;
pub mod version;
