//! Concrete implementations of the trait abstractions.
//!
//! # Adapters
//!
//! - [`ReqwestHttpClient`] - HTTP client using reqwest
//! - [`FileCredentialsProvider`] - JSON-file configuration storage
//!
//! The [`mock`] submodule provides test doubles:
//! [`mock::MockHttpClient`] and [`mock::InMemoryCredentials`].

pub mod file_credentials;
pub mod mock;
pub mod reqwest_http;

pub use file_credentials::FileCredentialsProvider;
pub use mock::{InMemoryCredentials, MockHttpClient};
pub use reqwest_http::ReqwestHttpClient;
