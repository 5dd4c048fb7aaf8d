//! Greengrocer Core - Shared types library.
//!
//! This crate provides the common types used by the greengrocer bot:
//! document identifiers for backend entities, the Telegram user identity,
//! validated email addresses, prices, and order statuses.
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no
//! storage access. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
