//! Domain model for the shopping list.
//!
//! # Responsibility
//! - Define the canonical record shared by storage, live queries and callers.
//!
//! # Invariants
//! - Every persisted item is identified by a store-assigned `ItemId`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod item;
