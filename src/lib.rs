//! # ryt-sig - player signature tooling
//!
//! Locates the signature decipher and n-parameter transform routines inside a
//! video player script, caches them per script, and rewrites format
//! descriptors into directly usable URLs.
//!
//! ## Features
//!
//! - Anchor-based function extraction, no JavaScript parsing
//! - Bracket slicing that skips string and regex literals
//! - Per-script cache with request coalescing
//! - Pluggable script fetching and fragment execution
//!
//! ## Example
//!
//! ```rust,no_run
//! use ryt_sig::{FormatDescriptor, FormatResolver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resolver = FormatResolver::new();
//!     let formats = vec![FormatDescriptor::with_signature_cipher(
//!         "s=abc&sp=sig&url=https%3A%2F%2Fexample.com%2Fvideoplayback%3Fn%3D123",
//!     )];
//!
//!     let result = resolver
//!         .decipher_formats(formats, "https://www.youtube.com/s/player/abcd1234/player_ias.vflset/en_US/base.js")
//!         .await?;
//!     for url in result.formats.keys() {
//!         println!("{}", url);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod core;
pub mod error;
pub mod platform;
pub mod utils;

// Re-export main types
pub use crate::core::{apply_transforms, BatchResult, FormatDescriptor, FormatFailure, FormatResolver};
pub use error::{ErrorKind, SigError};
pub use platform::{
    extract_functions, DenoRunner, FetchOptions, FunctionPair, HttpScriptFetcher, ScriptFetcher,
    ScriptRunner, TransformKind,
};
pub use utils::cache::FunctionCache;

/// Result type alias for ryt-sig operations
pub type Result<T> = std::result::Result<T, SigError>;
