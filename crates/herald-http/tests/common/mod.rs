//! Common test infrastructure for herald-http tests
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
//! - `constants`: Endpoints, tokens and payloads
//! - `fakes`: mockall transports and recording authenticators
//! - `mock_server`: Wiremock setup helpers, including a server usable from blocking tests

// Allow unused code in test infrastructure - not every test file uses every helper
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod constants;
pub mod fakes;
pub mod mock_server;

// Re-export all public items for convenience
pub use constants::*;
pub use fakes::*;
pub use mock_server::*;
