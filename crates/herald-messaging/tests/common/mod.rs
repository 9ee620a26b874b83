//! Common test infrastructure for herald-messaging tests
//!
//! # Usage
//!
//! In your test file, add:
//! ```ignore
//! mod common;
//! use common::*;
//! ```
//!
//! # Modules
//!
//! - `constants`: Topics, groups and payloads
//! - `fakes`: mockall transports and recording authenticators
//! - `fixtures`: Brokers pre-loaded with events

// Allow unused code in test infrastructure - not every test file uses every helper
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod constants;
pub mod fakes;
pub mod fixtures;

// Re-export all public items for convenience
pub use constants::*;
pub use fakes::*;
pub use fixtures::*;
