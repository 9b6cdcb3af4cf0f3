// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Arbitrary contract calls routed through the bridge. Each call is
//! identified by an (invalidation scope, invalidation nonce) pair;
//! executing a nonce invalidates every lower nonce in the same scope,
//! which is what makes replay impossible.

use crate::error::BridgeResult;
use crate::event::{
    Event, ATTRIBUTE_KEY_BRIDGE_CHAIN_ID, ATTRIBUTE_KEY_BRIDGE_CONTRACT,
    ATTRIBUTE_KEY_CONTRACT_CALL_ADDRESS, ATTRIBUTE_KEY_CONTRACT_CALL_FEES,
    ATTRIBUTE_KEY_CONTRACT_CALL_PAYLOAD, ATTRIBUTE_KEY_CONTRACT_CALL_TOKENS,
    ATTRIBUTE_KEY_ETH_TX_TIMEOUT, ATTRIBUTE_KEY_INVALIDATION_NONCE,
    ATTRIBUTE_KEY_INVALIDATION_SCOPE, ATTRIBUTE_KEY_MODULE, EVENT_TYPE_MULTISIG_UPDATE_REQUEST,
};
use crate::keys::{self, OutgoingTxType};
use crate::module::BridgeModule;
use crate::storage::Store;
use crate::types::{eth_hex, ContractCallTx, Erc20Token, OutgoingTx};
use crate::MODULE_NAME;
use ethers::types::Address as EthAddress;
use tracing::{error, info};

fn join_tokens(tokens: &[Erc20Token]) -> String {
    tokens
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join("|")
}

impl<K: Store> BridgeModule<'_, K> {
    /// Persist a governance-authorized contract call as an outgoing tx
    /// and announce it to the orchestrators.
    #[allow(clippy::too_many_arguments)]
    pub fn create_contract_call_tx(
        &mut self,
        invalidation_nonce: u64,
        invalidation_scope: Vec<u8>,
        address: EthAddress,
        payload: Vec<u8>,
        tokens: Vec<Erc20Token>,
        fees: Vec<Erc20Token>,
    ) -> BridgeResult<ContractCallTx> {
        let contract_call_tx = ContractCallTx {
            invalidation_nonce,
            invalidation_scope,
            address,
            payload,
            timeout: self.timeout_height()?,
            tokens,
            fees,
            height: self.block_height(),
        };

        let params = self.params()?;
        self.emit(
            Event::new(EVENT_TYPE_MULTISIG_UPDATE_REQUEST)
                .attr(ATTRIBUTE_KEY_MODULE, MODULE_NAME)
                .attr(ATTRIBUTE_KEY_BRIDGE_CONTRACT, params.bridge_contract_address)
                .attr(ATTRIBUTE_KEY_BRIDGE_CHAIN_ID, params.bridge_chain_id.to_string())
                .attr(
                    ATTRIBUTE_KEY_INVALIDATION_NONCE,
                    contract_call_tx.invalidation_nonce.to_string(),
                )
                .attr(
                    ATTRIBUTE_KEY_INVALIDATION_SCOPE,
                    hex::encode(&contract_call_tx.invalidation_scope),
                )
                .attr(
                    ATTRIBUTE_KEY_CONTRACT_CALL_ADDRESS,
                    eth_hex(&contract_call_tx.address),
                )
                .attr(
                    ATTRIBUTE_KEY_CONTRACT_CALL_PAYLOAD,
                    hex::encode(&contract_call_tx.payload),
                )
                .attr(
                    ATTRIBUTE_KEY_CONTRACT_CALL_TOKENS,
                    join_tokens(&contract_call_tx.tokens),
                )
                .attr(
                    ATTRIBUTE_KEY_CONTRACT_CALL_FEES,
                    join_tokens(&contract_call_tx.fees),
                )
                .attr(
                    ATTRIBUTE_KEY_ETH_TX_TIMEOUT,
                    params.target_ethereum_tx_timeout_ms.to_string(),
                ),
        );
        self.set_outgoing_tx(&OutgoingTx::ContractCall(contract_call_tx.clone()))?;
        info!(
            invalidation_nonce = contract_call_tx.invalidation_nonce,
            invalidation_scope = %hex::encode(&contract_call_tx.invalidation_scope),
            address = %eth_hex(&contract_call_tx.address),
            timeout = contract_call_tx.timeout,
            "contract call tx created"
        );
        Ok(contract_call_tx)
    }

    /// Record that a contract call was executed on Ethereum. The
    /// executed call and every pending call in the same scope with a
    /// lower nonce are dropped: the contract's invalidation counter has
    /// moved past all of them. Unknown calls are logged and succeed.
    pub fn contract_call_executed(
        &mut self,
        invalidation_scope: &[u8],
        invalidation_nonce: u64,
    ) -> BridgeResult<()> {
        let store_index =
            keys::make_contract_call_tx_store_index(invalidation_scope, invalidation_nonce);
        if self.get_outgoing_tx(&store_index)?.is_none() {
            error!(
                invalidation_scope = %hex::encode(invalidation_scope),
                invalidation_nonce,
                "failed to clean up executed contract call, unknown call"
            );
            return Ok(());
        }

        let mut invalidated = Vec::new();
        self.iterate_outgoing_txs_by_type(OutgoingTxType::ContractCall, |index, otx| {
            if let OutgoingTx::ContractCall(cctx) = otx {
                if cctx.invalidation_scope == invalidation_scope
                    && cctx.invalidation_nonce <= invalidation_nonce
                {
                    invalidated.push(index.to_vec());
                }
            }
            false
        })?;
        for index in &invalidated {
            self.delete_outgoing_tx(index);
        }
        info!(
            invalidation_scope = %hex::encode(invalidation_scope),
            invalidation_nonce,
            removed = invalidated.len(),
            "contract call executed on ethereum"
        );
        Ok(())
    }

    /// Drop every pending contract call whose timeout height has passed
    /// on Ethereum. A timeout of 0 means no timeout was projected at
    /// creation; such calls never expire.
    pub fn cancel_timed_out_contract_call_txs(&mut self) -> BridgeResult<()> {
        let ethereum_height = self.last_observed_ethereum_height()?.ethereum_height;
        let mut timed_out = Vec::new();
        self.iterate_outgoing_txs_by_type(OutgoingTxType::ContractCall, |index, otx| {
            if let OutgoingTx::ContractCall(cctx) = otx {
                if cctx.timeout != 0 && cctx.timeout < ethereum_height {
                    info!(
                        invalidation_scope = %hex::encode(&cctx.invalidation_scope),
                        invalidation_nonce = cctx.invalidation_nonce,
                        timeout = cctx.timeout,
                        ethereum_height,
                        "contract call tx timed out"
                    );
                    timed_out.push(index.to_vec());
                }
            }
            false
        })?;
        for index in &timed_out {
            self.delete_outgoing_tx(index);
        }
        Ok(())
    }
}
