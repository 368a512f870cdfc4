//! Gateway to the external charging optimizer (solver)

pub mod client;
pub mod types;

pub use client::*;
pub use types::*;
