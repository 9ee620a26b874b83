//! Type definitions for Herald harness configuration

mod harness_config;

pub use harness_config::*;
