//! Transport Layer - delivery of tool-call envelopes to ProxyPin
//!
//! This module provides:
//! - The Transport trait the forwarder sends through
//! - HttpTransport, a pooled reqwest client with retries
//! - RetryPolicy, the status/backoff rules shared by transports

mod http;
mod retry;

use async_trait::async_trait;

use crate::envelope::ToolCallRequest;
use crate::error::Result;

pub use http::{HttpTransport, user_agent};
pub use retry::{MAX_BACKOFF, RetryPolicy};

/// Whether a call may change upstream state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Safe to repeat after an ambiguous failure
    ReadOnly,
    /// Repeating after a 5xx or timeout could duplicate side effects
    Mutating,
}

impl CallKind {
    pub fn from_mutating(mutating: bool) -> Self {
        if mutating { Self::Mutating } else { Self::ReadOnly }
    }
}

/// Delivers one envelope and returns the raw body of a 2xx response
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ToolCallRequest, kind: CallKind) -> Result<String>;

    /// Base URL of the upstream service, used in diagnostics
    fn endpoint(&self) -> &str;
}
