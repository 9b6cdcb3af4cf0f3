// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Persistent key layout.
//!
//! Every prefix byte here is part of the on-disk contract: migrations
//! between module versions must preserve them. All multi-byte integers
//! inside keys are big-endian so that lexicographic key order matches
//! numeric order.

use crate::error::{BridgeError, BridgeResult};
use crate::types::{AccountAddress, Erc20Token, ValidatorAddress};
use ethers::types::Address as EthAddress;
use num_bigint::BigUint;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Persisted last-assigned batch nonce (u64, big-endian).
pub const LAST_OUTGOING_BATCH_NONCE_KEY: u8 = 0x01;
/// Persisted last-assigned signer-set nonce (u64, big-endian).
pub const LATEST_SIGNER_SET_TX_NONCE_KEY: u8 = 0x02;
/// Outgoing transactions: prefix ‖ store index.
pub const OUTGOING_TX_KEY: u8 = 0x03;
/// Ethereum signatures: prefix ‖ store index ‖ validator address.
pub const ETHEREUM_SIGNATURE_KEY: u8 = 0x04;
/// Delegate-key index: orchestrator → validator.
pub const ORCHESTRATOR_VALIDATOR_ADDRESS_KEY: u8 = 0x05;
/// Delegate-key index: validator → Ethereum address.
pub const VALIDATOR_ETHEREUM_ADDRESS_KEY: u8 = 0x06;
/// Delegate-key index: Ethereum address → orchestrator.
pub const ETHEREUM_ORCHESTRATOR_ADDRESS_KEY: u8 = 0x07;
/// Unbatched pool: prefix ‖ fee contract ‖ fee amount (32B) ‖ id.
pub const UNBATCHED_SEND_TO_ETHEREUM_KEY: u8 = 0x08;
/// Per-validator Ethereum height votes: prefix ‖ validator address.
pub const ETHEREUM_HEIGHT_VOTE_KEY: u8 = 0x09;
/// Module-level last observed Ethereum block height record.
pub const LAST_ETHEREUM_BLOCK_HEIGHT_KEY: u8 = 0x0a;
/// Last signer set observed as executed on Ethereum.
pub const LAST_OBSERVED_SIGNER_SET_KEY: u8 = 0x0b;
/// Ethereum event vote records: prefix ‖ event nonce ‖ event id.
pub const ETHEREUM_EVENT_VOTE_RECORD_KEY: u8 = 0x0c;
/// Per-validator last voted event nonce: prefix ‖ validator address.
pub const LAST_EVENT_NONCE_BY_VALIDATOR_KEY: u8 = 0x0d;
/// Module-level last observed event nonce (u64, big-endian).
pub const LAST_OBSERVED_EVENT_NONCE_KEY: u8 = 0x0e;
/// Highest Starcoin height whose outgoing txs have been slashed.
pub const LAST_SLASHED_OUTGOING_TX_BLOCK_KEY: u8 = 0x0f;
/// Bridge parameter record.
pub const PARAMS_KEY: u8 = 0x10;

/// Type tag leading every outgoing-transaction store index.
///
/// Reverse iteration under `OUTGOING_TX_KEY ‖ tag` yields the
/// newest entries first (nonces are big-endian), which the batch
/// queries rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum OutgoingTxType {
    SignerSet = 1,
    Batch = 2,
    ContractCall = 3,
}

/// Width of the fee-amount component of unbatched pool keys. Fees are
/// zero-padded to this width so key order follows numeric order.
pub const POOL_FEE_AMOUNT_WIDTH: usize = 32;

pub fn make_outgoing_tx_key(store_index: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + store_index.len());
    key.push(OUTGOING_TX_KEY);
    key.extend_from_slice(store_index);
    key
}

pub fn make_signer_set_tx_store_index(nonce: u64) -> Vec<u8> {
    let mut index = Vec::with_capacity(9);
    index.push(OutgoingTxType::SignerSet.into());
    index.extend_from_slice(&nonce.to_be_bytes());
    index
}

pub fn make_batch_tx_store_index(token_contract: &EthAddress, batch_nonce: u64) -> Vec<u8> {
    let mut index = Vec::with_capacity(29);
    index.push(OutgoingTxType::Batch.into());
    index.extend_from_slice(token_contract.as_bytes());
    index.extend_from_slice(&batch_nonce.to_be_bytes());
    index
}

pub fn make_contract_call_tx_store_index(
    invalidation_scope: &[u8],
    invalidation_nonce: u64,
) -> Vec<u8> {
    let mut index = Vec::with_capacity(9 + invalidation_scope.len());
    index.push(OutgoingTxType::ContractCall.into());
    index.extend_from_slice(invalidation_scope);
    index.extend_from_slice(&invalidation_nonce.to_be_bytes());
    index
}

pub fn make_ethereum_signature_key(store_index: &[u8], validator: &ValidatorAddress) -> Vec<u8> {
    let mut key = make_ethereum_signature_prefix(store_index);
    key.extend_from_slice(validator.as_bytes());
    key
}

/// Prefix under which all signatures for one outgoing tx live.
pub fn make_ethereum_signature_prefix(store_index: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + store_index.len());
    key.push(ETHEREUM_SIGNATURE_KEY);
    key.extend_from_slice(store_index);
    key
}

pub fn make_orchestrator_validator_address_key(orchestrator: &AccountAddress) -> Vec<u8> {
    let mut key = vec![ORCHESTRATOR_VALIDATOR_ADDRESS_KEY];
    key.extend_from_slice(orchestrator.as_bytes());
    key
}

pub fn make_validator_ethereum_address_key(validator: &ValidatorAddress) -> Vec<u8> {
    let mut key = vec![VALIDATOR_ETHEREUM_ADDRESS_KEY];
    key.extend_from_slice(validator.as_bytes());
    key
}

pub fn make_ethereum_orchestrator_address_key(ethereum_address: &EthAddress) -> Vec<u8> {
    let mut key = vec![ETHEREUM_ORCHESTRATOR_ADDRESS_KEY];
    key.extend_from_slice(ethereum_address.as_bytes());
    key
}

/// Key of one pooled transfer. The fee token contract comes first so a
/// single token's queue is one contiguous range; the amount is next so
/// reverse iteration yields the highest fees first.
pub fn make_unbatched_send_to_ethereum_key(fee: &Erc20Token, id: u64) -> BridgeResult<Vec<u8>> {
    let mut key = Vec::with_capacity(1 + 20 + POOL_FEE_AMOUNT_WIDTH + 8);
    key.push(UNBATCHED_SEND_TO_ETHEREUM_KEY);
    key.extend_from_slice(fee.contract.as_bytes());
    key.extend_from_slice(&amount_to_key_bytes(&fee.amount)?);
    key.extend_from_slice(&id.to_be_bytes());
    Ok(key)
}

/// Range prefix covering every pooled transfer for one token contract.
pub fn make_unbatched_send_to_ethereum_prefix(token_contract: &EthAddress) -> Vec<u8> {
    let mut prefix = vec![UNBATCHED_SEND_TO_ETHEREUM_KEY];
    prefix.extend_from_slice(token_contract.as_bytes());
    prefix
}

pub fn make_ethereum_height_vote_key(validator: &ValidatorAddress) -> Vec<u8> {
    let mut key = vec![ETHEREUM_HEIGHT_VOTE_KEY];
    key.extend_from_slice(validator.as_bytes());
    key
}

pub fn make_ethereum_event_vote_record_key(event_nonce: u64, event_id: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(9 + event_id.len());
    key.push(ETHEREUM_EVENT_VOTE_RECORD_KEY);
    key.extend_from_slice(&event_nonce.to_be_bytes());
    key.extend_from_slice(event_id);
    key
}

pub fn make_last_event_nonce_by_validator_key(validator: &ValidatorAddress) -> Vec<u8> {
    let mut key = vec![LAST_EVENT_NONCE_BY_VALIDATOR_KEY];
    key.extend_from_slice(validator.as_bytes());
    key
}

/// Fixed-width big-endian rendering of a fee amount for key use.
///
/// Amounts above 2²⁵⁶−1 cannot be keyed; the pool rejects them before
/// anything is written.
pub fn amount_to_key_bytes(amount: &BigUint) -> BridgeResult<[u8; POOL_FEE_AMOUNT_WIDTH]> {
    let raw = amount.to_bytes_be();
    if raw.len() > POOL_FEE_AMOUNT_WIDTH {
        return Err(BridgeError::Invariant(format!(
            "fee amount {amount} exceeds the {POOL_FEE_AMOUNT_WIDTH}-byte key width"
        )));
    }
    let mut out = [0u8; POOL_FEE_AMOUNT_WIDTH];
    out[POOL_FEE_AMOUNT_WIDTH - raw.len()..].copy_from_slice(&raw);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_bytes_are_distinct() {
        let prefixes = [
            LAST_OUTGOING_BATCH_NONCE_KEY,
            LATEST_SIGNER_SET_TX_NONCE_KEY,
            OUTGOING_TX_KEY,
            ETHEREUM_SIGNATURE_KEY,
            ORCHESTRATOR_VALIDATOR_ADDRESS_KEY,
            VALIDATOR_ETHEREUM_ADDRESS_KEY,
            ETHEREUM_ORCHESTRATOR_ADDRESS_KEY,
            UNBATCHED_SEND_TO_ETHEREUM_KEY,
            ETHEREUM_HEIGHT_VOTE_KEY,
            LAST_ETHEREUM_BLOCK_HEIGHT_KEY,
            LAST_OBSERVED_SIGNER_SET_KEY,
            ETHEREUM_EVENT_VOTE_RECORD_KEY,
            LAST_EVENT_NONCE_BY_VALIDATOR_KEY,
            LAST_OBSERVED_EVENT_NONCE_KEY,
            LAST_SLASHED_OUTGOING_TX_BLOCK_KEY,
            PARAMS_KEY,
        ];
        let unique: std::collections::BTreeSet<_> = prefixes.iter().collect();
        assert_eq!(unique.len(), prefixes.len());
    }

    #[test]
    fn test_batch_store_index_orders_by_nonce() {
        let contract = EthAddress::from_low_u64_be(1);
        let low = make_batch_tx_store_index(&contract, 2);
        let high = make_batch_tx_store_index(&contract, 10);
        // big-endian nonce: lexicographic order == numeric order
        assert!(low < high);
    }

    #[test]
    fn test_unbatched_key_orders_by_fee_then_id() {
        let contract = EthAddress::from_low_u64_be(1);
        let fee = |n: u64| Erc20Token::new(contract, BigUint::from(n));
        let small = make_unbatched_send_to_ethereum_key(&fee(2), 9).unwrap();
        let large = make_unbatched_send_to_ethereum_key(&fee(300), 1).unwrap();
        assert!(small < large);

        let same_fee_low_id = make_unbatched_send_to_ethereum_key(&fee(5), 1).unwrap();
        let same_fee_high_id = make_unbatched_send_to_ethereum_key(&fee(5), 2).unwrap();
        assert!(same_fee_low_id < same_fee_high_id);
    }

    #[test]
    fn test_amount_to_key_bytes_bounds() {
        assert_eq!(
            amount_to_key_bytes(&BigUint::from(1u64)).unwrap()[31],
            0x01
        );
        // 2^256 - 1 still fits
        let max = (BigUint::from(1u8) << 256u32) - 1u8;
        assert_eq!(amount_to_key_bytes(&max).unwrap(), [0xff; 32]);
        // 2^256 does not
        let over = BigUint::from(1u8) << 256u32;
        assert!(amount_to_key_bytes(&over).is_err());
    }

    #[test]
    fn test_contract_call_index_is_unambiguous_per_length() {
        let a = make_contract_call_tx_store_index(b"scope", 1);
        let b = make_contract_call_tx_store_index(b"scope", 2);
        assert_ne!(a, b);
        // a longer scope always yields a longer index, so distinct
        // (scope, nonce) pairs can never collide
        let c = make_contract_call_tx_store_index(b"scopex", 1);
        assert_eq!(c.len(), a.len() + 1);
    }
}
