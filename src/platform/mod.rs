//! Player script access: fetching, function extraction and fragment execution

pub mod cipher;
pub mod client;
pub mod runner;

pub use cipher::*;
pub use client::*;
pub use runner::*;
