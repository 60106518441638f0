//! Client for the credential-hiding gateway's own `/api/chat` endpoint.

pub mod client;

pub use client::RelayClient;
