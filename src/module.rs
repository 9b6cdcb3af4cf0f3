// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The per-block handle over bridge state.
//!
//! [`BridgeModule`] borrows the host's KV store for the duration of one
//! block, carries the block height, and buffers the events the block
//! produces. Operations on the other subsystems (batching, signer
//! sets, signatures, delegate keys, heights, migration) are implemented
//! as `impl` blocks in their own modules; this file holds the handle
//! itself, the persisted counters, and the polymorphic outgoing-tx
//! store.

use crate::error::{BridgeError, BridgeResult};
use crate::event::Event;
use crate::keys::{self, OutgoingTxType, LAST_SLASHED_OUTGOING_TX_BLOCK_KEY, OUTGOING_TX_KEY};
use crate::storage::{IterDirection, Store};
use crate::types::OutgoingTx;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub(crate) fn encode<T: Serialize>(value: &T, context: &str) -> BridgeResult<Vec<u8>> {
    bcs::to_bytes(value).map_err(|e| BridgeError::Serialization(format!("encode {context}: {e}")))
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8], context: &str) -> BridgeResult<T> {
    bcs::from_bytes(bytes)
        .map_err(|e| BridgeError::Serialization(format!("decode {context}: {e}")))
}

/// One block's view of the bridge state machine.
pub struct BridgeModule<'a, K: Store> {
    store: &'a mut K,
    block_height: u64,
    events: Vec<Event>,
}

impl<'a, K: Store> BridgeModule<'a, K> {
    pub fn new(store: &'a mut K, block_height: u64) -> Self {
        Self {
            store,
            block_height,
            events: Vec::new(),
        }
    }

    /// Starcoin height of the block being executed.
    pub fn block_height(&self) -> u64 {
        self.block_height
    }

    pub(crate) fn store(&self) -> &K {
        self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut K {
        self.store
    }

    pub(crate) fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Drain the events buffered so far; the host flushes them with the
    /// block commit.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Read a persisted big-endian u64, defaulting to 0 when unset.
    pub(crate) fn read_u64(&self, key: &[u8]) -> BridgeResult<u64> {
        match self.store.get(key) {
            None => Ok(0),
            Some(bytes) => {
                let arr: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    BridgeError::Serialization(format!(
                        "counter at {} holds {} bytes, expected 8",
                        hex::encode(key),
                        bytes.len()
                    ))
                })?;
                Ok(u64::from_be_bytes(arr))
            }
        }
    }

    pub(crate) fn write_u64(&mut self, key: &[u8], value: u64) {
        self.store.set(key, &value.to_be_bytes());
    }

    // ---- outgoing transactions ----

    pub fn set_outgoing_tx(&mut self, outgoing: &OutgoingTx) -> BridgeResult<()> {
        let bytes = encode(outgoing, "outgoing tx")?;
        self.store
            .set(&keys::make_outgoing_tx_key(&outgoing.store_index()), &bytes);
        Ok(())
    }

    /// Fetch one outgoing tx by store index; `Ok(None)` when absent.
    /// Callers must check for absence, the store is polymorphic and an
    /// unknown index is a normal condition (e.g. re-delivered execution
    /// reports).
    pub fn get_outgoing_tx(&self, store_index: &[u8]) -> BridgeResult<Option<OutgoingTx>> {
        match self.store.get(&keys::make_outgoing_tx_key(store_index)) {
            None => Ok(None),
            Some(bytes) => decode(&bytes, "outgoing tx").map(Some),
        }
    }

    pub fn delete_outgoing_tx(&mut self, store_index: &[u8]) {
        self.store
            .delete(&keys::make_outgoing_tx_key(store_index));
    }

    /// Walk all outgoing txs of one type, newest first. The callback
    /// receives the store index (type tag included) and the decoded tx,
    /// and returns true to stop.
    pub fn iterate_outgoing_txs_by_type(
        &self,
        tx_type: OutgoingTxType,
        mut cb: impl FnMut(&[u8], OutgoingTx) -> bool,
    ) -> BridgeResult<()> {
        let prefix = [OUTGOING_TX_KEY, tx_type.into()];
        for (key, value) in self.store.prefix_iter(&prefix, IterDirection::Reverse) {
            let outgoing = decode(&value, "outgoing tx")?;
            if cb(&key[1..], outgoing) {
                break;
            }
        }
        Ok(())
    }

    /// Walk every outgoing tx regardless of type, newest first within
    /// each type.
    pub fn iterate_outgoing_txs(
        &self,
        mut cb: impl FnMut(&[u8], OutgoingTx) -> bool,
    ) -> BridgeResult<()> {
        for (key, value) in self
            .store
            .prefix_iter(&[OUTGOING_TX_KEY], IterDirection::Reverse)
        {
            let outgoing = decode(&value, "outgoing tx")?;
            if cb(&key[1..], outgoing) {
                break;
            }
        }
        Ok(())
    }

    // ---- slashing bookkeeping ----

    /// Outgoing txs created after the last slashed height and before
    /// `max_height`, for the host's slashing pass.
    pub fn unslashed_outgoing_txs(&self, max_height: u64) -> BridgeResult<Vec<OutgoingTx>> {
        let last_slashed = self.last_slashed_outgoing_tx_block_height()?;
        let mut out = Vec::new();
        self.iterate_outgoing_txs(|_, otx| {
            if otx.starcoin_height() < max_height && otx.starcoin_height() > last_slashed {
                out.push(otx);
            }
            false
        })?;
        Ok(out)
    }

    pub fn last_slashed_outgoing_tx_block_height(&self) -> BridgeResult<u64> {
        self.read_u64(&[LAST_SLASHED_OUTGOING_TX_BLOCK_KEY])
    }

    pub fn set_last_slashed_outgoing_tx_block_height(&mut self, block_height: u64) {
        self.write_u64(&[LAST_SLASHED_OUTGOING_TX_BLOCK_KEY], block_height);
    }
}
