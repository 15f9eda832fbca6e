//! Domain layer: entities and protocol logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod entities;
pub mod error;
pub mod protocol;
pub mod secret;

pub use entities::{Credentials, Session, Token};
pub use error::DomainError;
pub use protocol::{
    decode_or_raise, decode_record, decode_response, encode_request, is_not_authenticated,
    FieldMap, Request, Response, Row, Verb,
};
pub use secret::{is_sha1_digest, normalize_secret};
