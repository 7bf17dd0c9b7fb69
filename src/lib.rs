//! # QROrganizer (subscription-gated accounts)
//!
//! `qrorganizer` serves account management for a subscription-gated web
//! application: registration, login, and logout on top of a pluggable identity
//! store, plus read access to the subscription catalog.
//!
//! ## Restricted Environments
//!
//! A deployment started with `--restricted-environment` only creates accounts
//! for callers presenting a valid, unused access code. Each code is consumed
//! atomically, so two concurrent registrations can never share one code.
//!
//! ## Error Shapes
//!
//! Validation failures return `400` with `{"errors": [...]}`. Bad credentials
//! and mismatched password confirmations return `401` without detail, so login
//! probing does not reveal which part of the credential was wrong.

pub mod account;
pub mod cli;
pub mod qrorganizer;
pub mod storage;
pub mod subscription;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
