//! Utility functions for ryt-sig

pub mod cache;
pub mod js;
pub mod url;

pub use cache::*;
pub use js::*;
pub use self::url::*;
