//! Per-request lookup cache
//!
//! Decimals and the wallet holdings list are read-heavy within a single
//! event pipeline but must never persist across requests. The cache is
//! created per inbound event and passed explicitly through the pipeline.

use std::collections::HashMap;

use crate::balances::HoldingEntry;

/// Request-scoped memo for external lookups
#[derive(Debug, Default)]
pub struct RequestCache {
    decimals: HashMap<String, u8>,
    holdings: Option<Vec<HoldingEntry>>,
}

impl RequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_decimals(&self, mint: &str) -> Option<u8> {
        self.decimals.get(mint).copied()
    }

    pub fn put_decimals(&mut self, mint: &str, decimals: u8) {
        self.decimals.insert(mint.to_string(), decimals);
    }

    pub fn holdings(&self) -> Option<&Vec<HoldingEntry>> {
        self.holdings.as_ref()
    }

    pub fn put_holdings(&mut self, holdings: Vec<HoldingEntry>) {
        self.holdings = Some(holdings);
    }
}
