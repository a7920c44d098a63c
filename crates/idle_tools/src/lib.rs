//! # Idle Development Tools
//!
//! Command-line tools for development:
//! - Data validators
//! - Headless simulation
//! - Save file inspection

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod loader;
pub mod simulate;
pub mod validate;
