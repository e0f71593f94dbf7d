//! Storage interfaces for the puppet bridge.
//!
//! The synchronization core treats storage as an external collaborator. It
//! only relies on the [`EntityStore`] and [`PuppetStore`] traits; the durable
//! engine behind them (SQL dialects, migrations) lives elsewhere.
//!
//! # Backends
//!
//! - [`InMemoryEntityStore`] -- `HashMap`-based store for tests and embedding
//! - [`InMemoryPuppetStore`] -- puppet registry for tests and embedding

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryEntityStore, InMemoryPuppetStore};
pub use traits::{EntityStore, PuppetStore};
