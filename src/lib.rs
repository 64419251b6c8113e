//! stubattr - post-signing attribution for Windows PE stub installers
//!
//! A signed stub carries a tagged, zero-filled span inside its certificate
//! table. Bytes there are excluded from the Authenticode hash, so an
//! attribution code written into that span leaves the signature valid.
//! This crate locates the span, validates and canonicalizes the code, and
//! writes it without touching anything else.

// Enforce strict code quality and reliability
#![deny(
    // Safety
    unsafe_code,

    // Correctness
    missing_debug_implementations,
    unreachable_pub,

    // Future compatibility
    future_incompatible,

    // Rust 2018 idioms
    rust_2018_idioms,

    // All warnings must be fixed
    warnings,
)]
#![warn(
    // Error handling best practices
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::unimplemented,
    clippy::todo,

    // Performance
    clippy::inefficient_to_string,
    clippy::large_enum_variant,

    // Code clarity and maintainability
    clippy::cognitive_complexity,
    clippy::too_many_arguments,
    clippy::type_complexity,

    // Best practices
    clippy::clone_on_ref_ptr,
    clippy::wildcard_imports,
    clippy::enum_glob_use,
    clippy::if_not_else,
    clippy::single_match_else,
    clippy::needless_continue,
    clippy::explicit_iter_loop,
    clippy::explicit_into_iter_loop,
)]
#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)
)]

pub mod api;
pub mod attribution;
pub mod config;
pub mod exceptions;
pub mod exit_codes;
pub mod logger;
pub mod pe;
pub mod utils;
pub mod version;

// Re-export main API functions
pub use api::{PatchOptions, PatchReport, StubInfo, inspect_file, patch_file, write_stub_file};
pub use attribution::{
    AttributionCode, Bitness, attribute, generate_stub, read_attribution, validate,
    write_attribution,
};
pub use config::Config;
pub use exceptions::{AttributionError, Result};
pub use pe::{DirectoryEntry, find_reserved_offset, locate_cert_directory};
