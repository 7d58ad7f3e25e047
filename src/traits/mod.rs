//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - HTTP operations (GET, streaming POST)
//! - [`CredentialsProvider`] - configuration storage and retrieval

pub mod credentials;
pub mod http;

pub use credentials::{CredentialsError, CredentialsProvider};
pub use http::{ByteStream, Headers, HttpClient, HttpError, Response};
