//! Snowflake-style key generation for clusters of independent machines.
//!
//! IDs pack a millisecond timestamp (relative to a configurable epoch), a
//! worker ID and a per-millisecond sequence into a `u64` whose sign bit is
//! always clear. They can also be rendered as fixed-width radix-62 strings
//! that sort like the integers they encode.
//!
//! Most applications use [`KeyGenerator`], which starts unbound and is bound
//! to a worker ID once one is known. [`LockSnowflakeGenerator`] and
//! [`AtomicSnowflakeGenerator`] take the worker ID up front and expose the
//! non-blocking [`Poll`] interface.
//!
//! ```
//! use keyflake::{GeneratorConfig, KeyGenerator};
//!
//! let keys = KeyGenerator::from_config(GeneratorConfig {
//!     as_string: true,
//!     ..GeneratorConfig::default()
//! })
//! .unwrap();
//! keys.bind(42).unwrap();
//!
//! let key = keys.generate_key().unwrap();
//! assert_eq!(key.as_text().unwrap().len(), 11);
//! assert_eq!(keys.decode_key(&key).unwrap().machine_id, 42);
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

mod base62;
mod config;
mod error;
mod generator;
mod id;
mod key;
mod layout;
mod time;
mod worker;

pub use crate::base62::Base62Error;
pub use crate::config::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::key::*;
pub use crate::layout::*;
pub use crate::time::*;
pub use crate::worker::{StaticWorkerId, WorkerIdProvider, validate_worker_id};
