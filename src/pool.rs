// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The unbatched pool: pending `SendToEthereum` intents indexed by
//! (fee token contract, fee amount, id). Reverse iteration over one
//! contract's range yields the highest fees first, which is the order
//! the batch builder consumes.

use crate::error::BridgeResult;
use crate::keys;
use crate::module::{decode, encode, BridgeModule};
use crate::storage::{IterDirection, Store};
use crate::types::SendToEthereum;
use ethers::types::Address as EthAddress;

impl<K: Store> BridgeModule<'_, K> {
    /// Index a transfer into the pool. Ids are assigned by the ingest
    /// path; re-inserting under the same (fee, id) overwrites.
    pub fn set_unbatched_send_to_ethereum(&mut self, ste: &SendToEthereum) -> BridgeResult<()> {
        let key = keys::make_unbatched_send_to_ethereum_key(&ste.erc20_fee, ste.id)?;
        let bytes = encode(ste, "unbatched send to ethereum")?;
        self.store_mut().set(&key, &bytes);
        Ok(())
    }

    /// Remove a transfer from the pool; a no-op when it is not there.
    pub fn delete_unbatched_send_to_ethereum(&mut self, ste: &SendToEthereum) -> BridgeResult<()> {
        let key = keys::make_unbatched_send_to_ethereum_key(&ste.erc20_fee, ste.id)?;
        self.store_mut().delete(&key);
        Ok(())
    }

    /// Walk one token's pooled transfers in fee-descending order. The
    /// callback returns true to stop.
    pub fn iterate_unbatched_send_to_ethereums_by_contract(
        &self,
        token_contract: &EthAddress,
        mut cb: impl FnMut(SendToEthereum) -> bool,
    ) -> BridgeResult<()> {
        let prefix = keys::make_unbatched_send_to_ethereum_prefix(token_contract);
        for (_, value) in self.store().prefix_iter(&prefix, IterDirection::Reverse) {
            let ste = decode(&value, "unbatched send to ethereum")?;
            if cb(ste) {
                break;
            }
        }
        Ok(())
    }

    /// All pooled transfers for one token, fee-descending.
    pub fn unbatched_send_to_ethereums(
        &self,
        token_contract: &EthAddress,
    ) -> BridgeResult<Vec<SendToEthereum>> {
        let mut out = Vec::new();
        self.iterate_unbatched_send_to_ethereums_by_contract(token_contract, |ste| {
            out.push(ste);
            false
        })?;
        Ok(out)
    }
}
