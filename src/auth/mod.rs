//! Authentication and session-security core.
//!
//! [`service::Authenticator`] orchestrates the other pieces; nothing here knows
//! about HTTP.

pub mod account;
pub mod clock;
pub mod config;
pub mod error;
pub mod guard;
pub mod lockout;
pub mod password;
pub mod service;
pub mod store;
pub mod token;

pub use account::{Account, AccountProfile, AccountUpdate, Role};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AuthConfig, HashCost};
pub use error::{AuthError, ErrorKind, FieldError};
pub use guard::{Identity, authenticate, authorize, bearer_token};
pub use service::{
    AuthSession, Authenticator, Credentials, MIN_PASSWORD_LENGTH, Registration,
};
pub use store::{AccountStore, ConflictField, MemoryStore, PostgresStore, StoreError};
