//! Identity: signed tokens and password hashing

pub mod password;
pub mod token;

pub use self::token::{Claims, IssueError, TokenCodec, VerificationError};
