//! # Officepass (account authentication service)
//!
//! `officepass` registers office staff accounts, verifies passwords and issues
//! short-lived access tokens paired with longer-lived refresh tokens.
//!
//! ## Accounts
//!
//! Email and username are unique and normalized to lowercase before any lookup.
//! Passwords are stored only as Argon2id hashes and never leave the service.
//!
//! ## Sessions
//!
//! Access and refresh tokens are HS256 JWTs signed with separate secrets. Each
//! account holds a single refresh slot: logging in replaces it and logging out
//! clears it. Access tokens issued before the last password change are refused.
//!
//! ## Lockout
//!
//! Consecutive failed logins are counted per account. Reaching the limit locks
//! the account for a fixed window; a successful login resets the counter.
//!
//! ## Roles
//!
//! Every account has one role (`employee`, `hr`, `finance`, `owner`, `admin`). Handlers
//! gate routes on a set of allowed roles after authentication.

pub mod api;
pub mod auth;
pub mod cli;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
