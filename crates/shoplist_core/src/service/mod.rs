//! Core use-case services.
//!
//! # Responsibility
//! - Offer the caller-facing mutation façade over the item store.
//! - Keep UI callers off the storage thread.

pub mod item_service;
