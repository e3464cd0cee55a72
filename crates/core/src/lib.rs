//! Core domain types for zipseed.
//!
//! This crate holds everything the archive pipeline needs that is pure
//! computation: configuration types, the incremental CRC-32 and torrent
//! piece hashers, the ZIP record encoders, and the bencoded torrent
//! metainfo builder.

pub mod bencode;
pub mod config;
pub mod error;
pub mod hash;
pub mod torrent;
pub mod zip;

pub use error::{Error, Result};
