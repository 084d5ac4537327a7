//! Common utilities shared by the SPA gateway crates.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (unverified decoding, size limits, iat checks)
pub mod jwt;
