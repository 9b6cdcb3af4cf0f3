// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Ethereum height tracking and the timeout projection derived from it.

use crate::error::{BridgeError, BridgeResult};
use crate::keys::{self, LAST_ETHEREUM_BLOCK_HEIGHT_KEY};
use crate::module::{decode, encode, BridgeModule};
use crate::storage::{IterDirection, Store};
use crate::types::{LatestEthereumBlockHeight, ValidatorAddress};

impl<K: Store> BridgeModule<'_, K> {
    /// Record a validator's view of the Ethereum chain tip, stamped
    /// with the current Starcoin height. Overwrites the prior vote.
    pub fn set_ethereum_height_vote(
        &mut self,
        validator: &ValidatorAddress,
        ethereum_height: u64,
    ) -> BridgeResult<()> {
        let vote = LatestEthereumBlockHeight {
            ethereum_height,
            starcoin_height: self.block_height(),
        };
        let bytes = encode(&vote, "ethereum height vote")?;
        self.store_mut()
            .set(&keys::make_ethereum_height_vote_key(validator), &bytes);
        Ok(())
    }

    /// A validator's latest height vote; the zero record when it has
    /// never voted.
    pub fn ethereum_height_vote(
        &self,
        validator: &ValidatorAddress,
    ) -> BridgeResult<LatestEthereumBlockHeight> {
        match self.store().get(&keys::make_ethereum_height_vote_key(validator)) {
            Some(bytes) => decode(&bytes, "ethereum height vote"),
            None => Ok(LatestEthereumBlockHeight::default()),
        }
    }

    /// Walk all height votes in validator byte order. The callback
    /// returns true to stop.
    pub fn iterate_ethereum_height_votes(
        &self,
        mut cb: impl FnMut(ValidatorAddress, LatestEthereumBlockHeight) -> bool,
    ) -> BridgeResult<()> {
        let prefix = [keys::ETHEREUM_HEIGHT_VOTE_KEY];
        for (key, value) in self.store().prefix_iter(&prefix, IterDirection::Forward) {
            let validator = ValidatorAddress(key[1..].to_vec());
            let vote = decode(&value, "ethereum height vote")?;
            if cb(validator, vote) {
                break;
            }
        }
        Ok(())
    }

    /// The module-level observed Ethereum height the timeout projection
    /// runs from. Which votes roll up into this record is aggregation
    /// policy decided outside the core.
    pub fn last_observed_ethereum_height(&self) -> BridgeResult<LatestEthereumBlockHeight> {
        match self.store().get(&[LAST_ETHEREUM_BLOCK_HEIGHT_KEY]) {
            Some(bytes) => decode(&bytes, "last observed ethereum height"),
            None => Ok(LatestEthereumBlockHeight::default()),
        }
    }

    pub fn set_last_observed_ethereum_height(&mut self, ethereum_height: u64) -> BridgeResult<()> {
        let record = LatestEthereumBlockHeight {
            ethereum_height,
            starcoin_height: self.block_height(),
        };
        let bytes = encode(&record, "last observed ethereum height")?;
        self.store_mut().set(&[LAST_ETHEREUM_BLOCK_HEIGHT_KEY], &bytes);
        Ok(())
    }

    /// Ethereum height after which an outgoing tx created now should be
    /// considered void.
    ///
    /// We project how far the Ethereum chain has advanced since the
    /// last observation (scaled by the two average block times) and add
    /// the configured target lifetime on top. Before the first
    /// observation there is nothing to project from and the result is
    /// the 0 sentinel: no timeout is enforced at creation.
    pub fn timeout_height(&self) -> BridgeResult<u64> {
        let params = self.params()?;
        let heights = self.last_observed_ethereum_height()?;
        if heights.starcoin_height == 0 || heights.ethereum_height == 0 {
            return Ok(0);
        }
        if params.average_ethereum_block_time_ms == 0 {
            return Err(BridgeError::Invariant(
                "average ethereum block time parameter must be positive".to_string(),
            ));
        }
        let projected_millis = self
            .block_height()
            .saturating_sub(heights.starcoin_height)
            * params.average_block_time_ms;
        let projected_current_ethereum_height =
            projected_millis / params.average_ethereum_block_time_ms + heights.ethereum_height;
        let blocks_to_add =
            params.target_ethereum_tx_timeout_ms / params.average_ethereum_block_time_ms;
        Ok(projected_current_ethereum_height + blocks_to_add)
    }
}
