//! DNS module.
//!
//! This module provides the CNAME-following resolver:
//! - Iterative chain resolution with loop detection
//! - Failover across a pool of DNS servers
//! - Core data types

pub mod resolver;
mod transport;
pub mod types;

pub use resolver::{NameResolver, MAX_HOPS};
pub use types::*;
