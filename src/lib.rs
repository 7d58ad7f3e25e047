//! Cozeterm - a terminal chat client for Coze agents.
//!
//! The core is the streaming-response decoder in [`sse`] and the driver in
//! [`client`]; [`session`] maps streams onto a conversation transcript, and
//! [`traits`]/[`adapters`] provide the injected HTTP and storage boundaries.

pub mod adapters;
pub mod client;
pub mod models;
pub mod session;
pub mod sse;
pub mod traits;
