//! Greengrocer bot library.
//!
//! This crate provides the bot functionality as a library, allowing the
//! conversation machine to be tested against in-memory fakes.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod machine;
pub mod session;
pub mod strapi;
pub mod telegram;
pub mod transport;
pub mod views;
