//! Parsing and verification of platform-signed mini-app "init data".
//!
//! The messaging platform hands every mini-app launch a URL-encoded string
//! of `key=value` pairs. One of them, `hash`, is an HMAC-SHA256 over the
//! remaining pairs, keyed by a secret derived from the bot token. This crate
//! parses that blob and checks the signature without performing any I/O.
//!
//! # Example
//! ```
//! use catalog_relay_init_data::InitDataVerifier;
//!
//! let verifier = InitDataVerifier::new("123456:test-token").unwrap();
//! let blob = verifier
//!     .sign(&[("auth_date", "1700000000"), ("user", r#"{"id":42}"#)])
//!     .unwrap();
//! let data = verifier.verify(&blob).unwrap();
//! assert_eq!(data.user_id().unwrap(), Some(42));
//! ```

pub mod error;
pub mod parser;
pub mod verifier;

pub use error::InitDataError;
pub use parser::InitData;
pub use verifier::InitDataVerifier;

/// Domain-separation constant used to derive the signing key from the bot token.
pub const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";

/// Name of the field carrying the hex-encoded signature.
pub const HASH_FIELD: &str = "hash";
