// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::error::BridgeResult;
use crate::keys::PARAMS_KEY;
use crate::module::{decode, encode, BridgeModule};
use crate::storage::Store;
use serde::{Deserialize, Serialize};

/// Bridge module parameters, persisted as a single record.
///
/// `gravity_id` is the salt mixed into every bridge signature; once the
/// bridge contract is deployed it must never change, otherwise
/// signatures from one deployment could be replayed against another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeParams {
    pub bridge_contract_address: String,
    pub bridge_chain_id: u64,
    pub gravity_id: String,
    /// Average Starcoin block time in milliseconds.
    pub average_block_time_ms: u64,
    /// Average Ethereum block time in milliseconds.
    pub average_ethereum_block_time_ms: u64,
    /// Target lifetime of an outgoing tx on Ethereum, in milliseconds.
    pub target_ethereum_tx_timeout_ms: u64,
    /// When false the surrounding module rejects new work; the core
    /// itself keeps serving reads and writes unchanged.
    pub bridge_active: bool,
}

impl Default for BridgeParams {
    fn default() -> Self {
        Self {
            bridge_contract_address: String::new(),
            bridge_chain_id: 0,
            gravity_id: "defaultgravityid".to_string(),
            average_block_time_ms: 5_000,
            average_ethereum_block_time_ms: 15_000,
            target_ethereum_tx_timeout_ms: 43_200_000,
            bridge_active: true,
        }
    }
}

impl<K: Store> BridgeModule<'_, K> {
    /// Current parameters; defaults when nothing has been stored yet.
    pub fn params(&self) -> BridgeResult<BridgeParams> {
        match self.store().get(&[PARAMS_KEY]) {
            Some(bytes) => decode(&bytes, "bridge params"),
            None => Ok(BridgeParams::default()),
        }
    }

    pub fn set_params(&mut self, params: &BridgeParams) -> BridgeResult<()> {
        let bytes = encode(params, "bridge params")?;
        self.store_mut().set(&[PARAMS_KEY], &bytes);
        Ok(())
    }
}
