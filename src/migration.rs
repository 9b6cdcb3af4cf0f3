// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! State reset for a bridge-contract redeployment.
//!
//! A fresh contract starts with empty checkpoints and zeroed nonces, so
//! everything keyed to the old deployment (outgoing txs, their
//! signatures, event vote records, counters, observed heights) must go
//! in one atomic block. Anything left behind would either never execute
//! or replay against the wrong contract.

use crate::error::BridgeResult;
use crate::keys::{LAST_OUTGOING_BATCH_NONCE_KEY, LATEST_SIGNER_SET_TX_NONCE_KEY};
use crate::module::BridgeModule;
use crate::storage::Store;
use crate::types::SignerSetTx;
use tracing::info;

impl<K: Store> BridgeModule<'_, K> {
    /// Wipe all state tied to the previous bridge contract and point
    /// the module at `new_bridge_address`, deployed at
    /// `bridge_deployment_height` on Ethereum. Intended to run from the
    /// host's upgrade handler, inside a single block commit.
    pub fn migrate_bridge_contract(
        &mut self,
        new_bridge_address: &str,
        bridge_deployment_height: u64,
    ) -> BridgeResult<()> {
        // outgoing txs and their signatures; signatures first, the
        // signature index is only reachable through the tx store index
        let mut store_indexes = Vec::new();
        self.iterate_outgoing_txs(|store_index, _| {
            store_indexes.push(store_index.to_vec());
            false
        })?;
        for store_index in &store_indexes {
            self.delete_ethereum_signatures(store_index);
            self.delete_outgoing_tx(store_index);
        }

        self.write_u64(&[LATEST_SIGNER_SET_TX_NONCE_KEY], 0);

        // event nonces restart from zero for every validator that ever
        // voted, then the vote records themselves go
        self.set_last_observed_event_nonce(0);
        let mut voters = Vec::new();
        let mut record_keys = Vec::new();
        self.iterate_ethereum_event_vote_records(|key, record| {
            record_keys.push(key.to_vec());
            voters.extend(record.votes);
            false
        })?;
        for validator in &voters {
            self.set_last_event_nonce_by_validator(validator, 0);
        }
        for key in &record_keys {
            self.store_mut().delete(key);
        }

        // the first deposit on the new contract must look like the
        // first event ever observed
        self.set_last_observed_ethereum_height(bridge_deployment_height.saturating_sub(1))?;
        self.set_last_observed_signer_set(&SignerSetTx {
            nonce: 0,
            height: 0,
            signers: Vec::new(),
        })?;

        self.write_u64(&[LAST_OUTGOING_BATCH_NONCE_KEY], 0);

        let mut params = self.params()?;
        params.bridge_contract_address = new_bridge_address.to_string();
        self.set_params(&params)?;

        info!(
            new_bridge_address,
            bridge_deployment_height,
            swept_outgoing_txs = store_indexes.len(),
            swept_vote_records = record_keys.len(),
            "bridge contract migrated"
        );
        Ok(())
    }

    /// Flip the bridge to inactive. The surrounding module checks this
    /// flag before accepting new work; existing state stays readable.
    pub fn disable_bridge(&mut self) -> BridgeResult<()> {
        let mut params = self.params()?;
        params.bridge_active = false;
        self.set_params(&params)?;
        info!("bridge is set to inactive");
        Ok(())
    }

}
