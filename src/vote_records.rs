// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Minimal persistence for Ethereum event vote records and event-nonce
//! bookkeeping. The voting protocol itself runs outside this crate;
//! these records exist here so the migration sweep can enumerate the
//! voters and clear the set when the bridge contract is redeployed.

use crate::error::BridgeResult;
use crate::keys::{self, LAST_OBSERVED_EVENT_NONCE_KEY};
use crate::module::{decode, encode, BridgeModule};
use crate::storage::{IterDirection, Store};
use crate::types::{EthereumEventVoteRecord, ValidatorAddress};

impl<K: Store> BridgeModule<'_, K> {
    pub fn set_ethereum_event_vote_record(
        &mut self,
        event_nonce: u64,
        event_id: &[u8],
        record: &EthereumEventVoteRecord,
    ) -> BridgeResult<()> {
        let key = keys::make_ethereum_event_vote_record_key(event_nonce, event_id);
        let bytes = encode(record, "ethereum event vote record")?;
        self.store_mut().set(&key, &bytes);
        Ok(())
    }

    /// Walk all vote records in event-nonce order. The callback
    /// receives the full store key and the record, and returns true to
    /// stop.
    pub fn iterate_ethereum_event_vote_records(
        &self,
        mut cb: impl FnMut(&[u8], EthereumEventVoteRecord) -> bool,
    ) -> BridgeResult<()> {
        let prefix = [keys::ETHEREUM_EVENT_VOTE_RECORD_KEY];
        for (key, value) in self.store().prefix_iter(&prefix, IterDirection::Forward) {
            let record = decode(&value, "ethereum event vote record")?;
            if cb(&key, record) {
                break;
            }
        }
        Ok(())
    }

    pub fn last_event_nonce_by_validator(
        &self,
        validator: &ValidatorAddress,
    ) -> BridgeResult<u64> {
        self.read_u64(&keys::make_last_event_nonce_by_validator_key(validator))
    }

    pub fn set_last_event_nonce_by_validator(
        &mut self,
        validator: &ValidatorAddress,
        event_nonce: u64,
    ) {
        self.write_u64(
            &keys::make_last_event_nonce_by_validator_key(validator),
            event_nonce,
        );
    }

    pub fn last_observed_event_nonce(&self) -> BridgeResult<u64> {
        self.read_u64(&[LAST_OBSERVED_EVENT_NONCE_KEY])
    }

    pub fn set_last_observed_event_nonce(&mut self, event_nonce: u64) {
        self.write_u64(&[LAST_OBSERVED_EVENT_NONCE_KEY], event_nonce);
    }
}
