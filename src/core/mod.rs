//! Core functionality for ryt-sig

pub mod format;
pub mod resolver;

pub use format::*;
pub use resolver::*;
