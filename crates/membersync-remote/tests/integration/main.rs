//! Integration tests for the downstream system client
//!
//! Uses wiremock to simulate the member API, covering retry behavior,
//! error classification, and envelope parsing.

mod common;
mod test_retry;
mod test_system;
