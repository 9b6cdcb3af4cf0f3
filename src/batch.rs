// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Batch lifecycle: selection out of the unbatched pool, nonce
//! assignment, execution bookkeeping and cancellation.

use crate::error::{BridgeError, BridgeResult};
use crate::event::{
    Event, ATTRIBUTE_KEY_BATCH_NONCE, ATTRIBUTE_KEY_BRIDGE_CHAIN_ID,
    ATTRIBUTE_KEY_BRIDGE_CONTRACT, ATTRIBUTE_KEY_MODULE, EVENT_TYPE_OUTGOING_BATCH,
    EVENT_TYPE_OUTGOING_BATCH_CANCELED,
};
use crate::external::{BankProvider, Coin, Erc20Registry};
use crate::keys::{self, OutgoingTxType, LAST_OUTGOING_BATCH_NONCE_KEY};
use crate::module::BridgeModule;
use crate::storage::Store;
use crate::types::{eth_hex, BatchTx, OutgoingTx};
use crate::MODULE_NAME;
use ethers::types::Address as EthAddress;
use num_bigint::BigUint;
use tracing::{debug, error, info};

impl<K: Store> BridgeModule<'_, K> {
    /// Build a batch for `token_contract` out of the highest-fee pooled
    /// transfers, up to `max_elements` of them.
    ///
    /// Returns `Ok(None)` without touching state when `max_elements` is
    /// zero, when the pool holds nothing for the token, or when the
    /// most recent still-pending batch for the token already offers at
    /// least the fees a new batch would: relayers are served strictly
    /// increasing fee totals per token.
    pub fn build_batch_tx(
        &mut self,
        token_contract: &EthAddress,
        max_elements: usize,
    ) -> BridgeResult<Option<BatchTx>> {
        if max_elements == 0 {
            return Ok(None);
        }

        if let Some(last_batch) = self.last_outgoing_batch_by_token_type(token_contract)? {
            let candidate_fees = self.batch_fees_by_token_type(token_contract, max_elements)?;
            if last_batch.fees() >= candidate_fees {
                debug!(
                    token_contract = %eth_hex(token_contract),
                    last_batch_nonce = last_batch.batch_nonce,
                    "pending batch is at least as profitable, not batching"
                );
                return Ok(None);
            }
        }

        let mut selected = Vec::new();
        self.iterate_unbatched_send_to_ethereums_by_contract(token_contract, |ste| {
            selected.push(ste);
            selected.len() == max_elements
        })?;
        // do not create batches that would contain no transactions,
        // even if they are requested
        if selected.is_empty() {
            return Ok(None);
        }
        for ste in &selected {
            self.delete_unbatched_send_to_ethereum(ste)?;
        }

        let batch = BatchTx {
            batch_nonce: self.increment_last_outgoing_batch_nonce()?,
            token_contract: *token_contract,
            timeout: self.timeout_height()?,
            transactions: selected,
            height: self.block_height(),
        };
        self.set_outgoing_tx(&OutgoingTx::Batch(batch.clone()))?;

        let params = self.params()?;
        self.emit(
            Event::new(EVENT_TYPE_OUTGOING_BATCH)
                .attr(ATTRIBUTE_KEY_MODULE, MODULE_NAME)
                .attr(ATTRIBUTE_KEY_BRIDGE_CONTRACT, params.bridge_contract_address)
                .attr(ATTRIBUTE_KEY_BRIDGE_CHAIN_ID, params.bridge_chain_id.to_string())
                .attr(ATTRIBUTE_KEY_BATCH_NONCE, batch.batch_nonce.to_string()),
        );
        info!(
            token_contract = %eth_hex(token_contract),
            batch_nonce = batch.batch_nonce,
            transactions = batch.transactions.len(),
            timeout = batch.timeout,
            "batch tx created"
        );

        Ok(Some(batch))
    }

    /// Record that a batch was executed on Ethereum.
    ///
    /// Deletes the batch, cancels every still-pending batch for the
    /// same token with a lower nonce (the contract will never execute
    /// them), and burns the bridged total for tokens that did not
    /// originate on Starcoin. Reports for unknown batches are logged
    /// and succeed so re-delivered observations stay harmless.
    pub fn batch_tx_executed(
        &mut self,
        bank: &mut impl BankProvider,
        registry: &impl Erc20Registry,
        token_contract: &EthAddress,
        batch_nonce: u64,
    ) -> BridgeResult<()> {
        let store_index = keys::make_batch_tx_store_index(token_contract, batch_nonce);
        let batch = match self.get_outgoing_tx(&store_index)? {
            Some(OutgoingTx::Batch(batch)) => batch,
            _ => {
                error!(
                    token_contract = %eth_hex(token_contract),
                    batch_nonce,
                    "failed to clean up executed batch, unknown batch"
                );
                return Ok(());
            }
        };

        let mut superseded = Vec::new();
        self.iterate_outgoing_txs_by_type(OutgoingTxType::Batch, |_, otx| {
            if let OutgoingTx::Batch(btx) = otx {
                if btx.batch_nonce < batch.batch_nonce && btx.token_contract == batch.token_contract
                {
                    superseded.push(btx);
                }
            }
            false
        })?;
        for btx in &superseded {
            self.cancel_batch_tx(btx)?;
        }

        // vouchers for Ethereum-originated tokens were minted on the
        // Starcoin side at deposit time; executing the batch releases
        // the originals, so the vouchers and their fees burn here
        let (is_starcoin_originated, denom) = registry.erc20_to_denom(&batch.token_contract);
        if !is_starcoin_originated {
            let mut total = BigUint::default();
            for tx in &batch.transactions {
                if tx.erc20_token.contract != batch.token_contract
                    || tx.erc20_fee.contract != batch.token_contract
                {
                    return Err(BridgeError::Invariant(format!(
                        "batch {} for {} contains a tx with a different contract address",
                        batch.batch_nonce,
                        eth_hex(&batch.token_contract),
                    )));
                }
                total += &tx.erc20_token.amount + &tx.erc20_fee.amount;
            }
            bank.burn(MODULE_NAME, &[Coin { denom, amount: total }])?;
        }

        self.delete_outgoing_tx(&store_index);
        Ok(())
    }

    /// Release a batch: every transaction returns to its fee-indexed
    /// slot in the unbatched pool and the batch itself is deleted.
    /// Signatures under the batch's store index stay behind; nonces are
    /// never reused, so they are unreachable garbage until the
    /// migration sweep collects them.
    pub fn cancel_batch_tx(&mut self, batch: &BatchTx) -> BridgeResult<()> {
        for tx in &batch.transactions {
            self.set_unbatched_send_to_ethereum(tx)?;
        }
        self.delete_outgoing_tx(&batch.store_index());

        let params = self.params()?;
        self.emit(
            Event::new(EVENT_TYPE_OUTGOING_BATCH_CANCELED)
                .attr(ATTRIBUTE_KEY_MODULE, MODULE_NAME)
                .attr(ATTRIBUTE_KEY_BRIDGE_CONTRACT, params.bridge_contract_address)
                .attr(ATTRIBUTE_KEY_BRIDGE_CHAIN_ID, params.bridge_chain_id.to_string())
                .attr(ATTRIBUTE_KEY_BATCH_NONCE, batch.batch_nonce.to_string()),
        );
        Ok(())
    }

    /// The fees the next batch of `token_contract` would offer if it
    /// were created now. Shown to relayers so they know when requesting
    /// a batch is worthwhile, and used by the builder's profitability
    /// refusal.
    pub fn batch_fees_by_token_type(
        &self,
        token_contract: &EthAddress,
        max_elements: usize,
    ) -> BridgeResult<BigUint> {
        let mut fee_amount = BigUint::default();
        let mut count = 0;
        self.iterate_unbatched_send_to_ethereums_by_contract(token_contract, |ste| {
            fee_amount += &ste.erc20_fee.amount;
            count += 1;
            count == max_elements
        })?;
        Ok(fee_amount)
    }

    /// The pending batch with the highest nonce for `token_contract`,
    /// found by a linear scan over all pending batches.
    pub fn last_outgoing_batch_by_token_type(
        &self,
        token_contract: &EthAddress,
    ) -> BridgeResult<Option<BatchTx>> {
        let mut last: Option<BatchTx> = None;
        self.iterate_outgoing_txs_by_type(OutgoingTxType::Batch, |_, otx| {
            if let OutgoingTx::Batch(btx) = otx {
                if btx.token_contract == *token_contract
                    && last.as_ref().map_or(0, |b| b.batch_nonce) < btx.batch_nonce
                {
                    last = Some(btx);
                }
            }
            false
        })?;
        Ok(last)
    }

    pub fn last_outgoing_batch_nonce(&self) -> BridgeResult<u64> {
        self.read_u64(&[LAST_OUTGOING_BATCH_NONCE_KEY])
    }

    /// Advance and persist the batch nonce counter. Nonces are strictly
    /// increasing and never reused, even across cancellations.
    pub(crate) fn increment_last_outgoing_batch_nonce(&mut self) -> BridgeResult<u64> {
        let next = self.last_outgoing_batch_nonce()? + 1;
        self.write_u64(&[LAST_OUTGOING_BATCH_NONCE_KEY], next);
        Ok(next)
    }

    /// Cancel every pending batch whose timeout height has passed on
    /// Ethereum, returning their transactions to the pool. A timeout of
    /// 0 means no timeout was projected at creation; such batches never
    /// expire.
    pub fn cancel_timed_out_batch_txs(&mut self) -> BridgeResult<()> {
        let ethereum_height = self.last_observed_ethereum_height()?.ethereum_height;
        let mut timed_out = Vec::new();
        self.iterate_outgoing_txs_by_type(OutgoingTxType::Batch, |_, otx| {
            if let OutgoingTx::Batch(btx) = otx {
                if btx.timeout != 0 && btx.timeout < ethereum_height {
                    timed_out.push(btx);
                }
            }
            false
        })?;
        for btx in &timed_out {
            info!(
                token_contract = %eth_hex(&btx.token_contract),
                batch_nonce = btx.batch_nonce,
                timeout = btx.timeout,
                ethereum_height,
                "batch tx timed out"
            );
            self.cancel_batch_tx(btx)?;
        }
        Ok(())
    }
}
