//! Core data types, hourly grid alignment, and trait seams for wxtrack
//!
//! This crate provides the domain model shared by the refresh loop and the
//! HTTP surface, plus the hourly resolver that aligns a requested hour with
//! a provider forecast grid.

pub mod error;
pub mod grid;
pub mod resolver;
pub mod traits;
pub mod types;

pub use error::*;
pub use grid::*;
pub use resolver::*;
pub use traits::*;
pub use types::*;
