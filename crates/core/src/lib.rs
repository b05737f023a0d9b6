//! Functional core for quill.
//!
//! Pure data types and functions shared by the server crates: cache keys,
//! pattern matching, the circuit breaker state machine, reconnect backoff,
//! blog domain types with request validation, and repository contracts.
//! Nothing in this crate performs I/O.

pub mod blog;
pub mod cache;
pub mod serde;
pub mod storage;
