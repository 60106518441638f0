//! Alibaba DashScope text-generation API, called by the gateway on behalf of clients.

pub mod client;

pub use client::DashScopeClient;
