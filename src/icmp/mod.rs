//! ICMP module.
//!
//! This module provides the echo prober:
//! - Echo sessions over `surge-ping` with configured identifier and sequence
//! - Round-trip and loss statistics

mod channel;
pub mod prober;
pub mod types;

pub use prober::{default_identifier, EchoProber};
pub use types::*;
