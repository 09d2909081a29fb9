//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the data access contract for shopping-list items.
//! - Isolate SQLite query details and row mapping from the store.
//!
//! # Invariants
//! - Repository writes enforce `Item::validate()` before persistence.
//! - Writes targeting a missing id are no-ops reported as `false`, not errors.

pub mod item_repo;
