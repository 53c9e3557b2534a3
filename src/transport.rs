//! Relay transport: the injected mixnet primitive, the REST-like envelope
//! framing, and the client that speaks it.

pub mod client;
pub mod envelope;
pub mod mixnet;

pub use client::RelayClient;
pub use envelope::{RequestEnvelope, ResponseEnvelope, RestMethod};
pub use mixnet::MixnetRequester;
