//! gwatch command-line front end
//!
//! Library half of the binary so configuration, logging and locking can be
//! unit tested.

pub mod config;
pub mod daemon;
pub mod locks;
pub mod logging;
