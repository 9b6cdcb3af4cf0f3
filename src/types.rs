// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Entities persisted by the bridge state machine.
//!
//! Everything here carries serde derives; the at-rest encoding is bcs,
//! which keeps stored bytes deterministic and gives [`OutgoingTx`] a
//! self-describing variant tag so a single iterator can yield all
//! three outgoing-transaction kinds.

use crate::keys;
use ethers::types::Address as EthAddress;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical lowercase hex rendering of an Ethereum address, `0x`-prefixed.
///
/// `EthAddress` implements `Display` as an abbreviated form, which must
/// never reach events or keys; use this helper everywhere a full
/// address string is needed.
pub fn eth_hex(address: &EthAddress) -> String {
    format!("{address:#x}")
}

/// Consensus address of a validator on the Starcoin side.
///
/// Opaque bytes; equality and ordering are plain byte comparison.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValidatorAddress(pub Vec<u8>);

impl ValidatorAddress {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for ValidatorAddress {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Display for ValidatorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

/// A Starcoin account address (message senders, orchestrators).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountAddress(pub Vec<u8>);

impl AccountAddress {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for AccountAddress {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

/// An amount of some ERC20 token. Amounts are unbounded integers:
/// fee sums and burn totals must never truncate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Erc20Token {
    pub contract: EthAddress,
    pub amount: BigUint,
}

impl Erc20Token {
    pub fn new(contract: EthAddress, amount: BigUint) -> Self {
        Self { contract, amount }
    }
}

impl fmt::Display for Erc20Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:#x}", self.amount, self.contract)
    }
}

/// A single asset-transfer intent waiting to be bridged.
///
/// Lives in the unbatched pool until a batch selects it; returns to the
/// pool if that batch is cancelled, and is destroyed when the batch
/// executes on Ethereum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendToEthereum {
    pub id: u64,
    pub sender: AccountAddress,
    pub ethereum_recipient: EthAddress,
    pub erc20_token: Erc20Token,
    pub erc20_fee: Erc20Token,
}

/// A bundle of same-token transfers sharing one execution on Ethereum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTx {
    pub batch_nonce: u64,
    pub token_contract: EthAddress,
    pub transactions: Vec<SendToEthereum>,
    /// Ethereum block height after which the batch is void; 0 means no
    /// timeout was projected at creation.
    pub timeout: u64,
    /// Starcoin block height at creation.
    pub height: u64,
}

impl BatchTx {
    /// Total fee offered by the batch, summed over its transactions.
    pub fn fees(&self) -> BigUint {
        self.transactions
            .iter()
            .fold(BigUint::default(), |acc, tx| acc + &tx.erc20_fee.amount)
    }

    pub fn store_index(&self) -> Vec<u8> {
        keys::make_batch_tx_store_index(&self.token_contract, self.batch_nonce)
    }
}

/// One member of a signer set: an Ethereum address and its normalized
/// voting power.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthereumSigner {
    pub power: u64,
    pub ethereum_address: EthAddress,
}

/// A snapshot of the validator set, normalized for the bridge contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerSetTx {
    pub nonce: u64,
    pub height: u64,
    pub signers: Vec<EthereumSigner>,
}

impl SignerSetTx {
    pub fn store_index(&self) -> Vec<u8> {
        keys::make_signer_set_tx_store_index(self.nonce)
    }
}

/// An arbitrary governance-authorized call to be executed through the
/// bridge contract. Replay is prevented by nonce monotonicity within
/// the invalidation scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCallTx {
    pub invalidation_nonce: u64,
    pub invalidation_scope: Vec<u8>,
    pub address: EthAddress,
    pub payload: Vec<u8>,
    pub timeout: u64,
    pub tokens: Vec<Erc20Token>,
    pub fees: Vec<Erc20Token>,
    pub height: u64,
}

impl ContractCallTx {
    pub fn store_index(&self) -> Vec<u8> {
        keys::make_contract_call_tx_store_index(&self.invalidation_scope, self.invalidation_nonce)
    }
}

/// The closed set of transactions the bridge can send to Ethereum.
///
/// The variant set never grows at runtime, and every algorithm over it
/// (cancel, burn, timeout) branches per variant, so this is a plain
/// enum rather than a trait object. bcs stores the variant index,
/// which makes the wrapper self-describing at rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutgoingTx {
    SignerSet(SignerSetTx),
    Batch(BatchTx),
    ContractCall(ContractCallTx),
}

impl OutgoingTx {
    /// The canonical byte key identifying this transaction regardless
    /// of variant: a 1-byte type tag followed by the variant identity.
    pub fn store_index(&self) -> Vec<u8> {
        match self {
            OutgoingTx::SignerSet(tx) => tx.store_index(),
            OutgoingTx::Batch(tx) => tx.store_index(),
            OutgoingTx::ContractCall(tx) => tx.store_index(),
        }
    }

    /// Starcoin block height at which the transaction was created.
    pub fn starcoin_height(&self) -> u64 {
        match self {
            OutgoingTx::SignerSet(tx) => tx.height,
            OutgoingTx::Batch(tx) => tx.height,
            OutgoingTx::ContractCall(tx) => tx.height,
        }
    }
}

/// The last Ethereum block height we consider observed, paired with the
/// Starcoin height at which the observation was recorded. Used both per
/// validator (height votes) and as the module-level aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestEthereumBlockHeight {
    pub ethereum_height: u64,
    pub starcoin_height: u64,
}

/// A validator's registered key triple, as exported for state dumps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateKeys {
    pub validator_address: ValidatorAddress,
    pub orchestrator_address: AccountAddress,
    pub ethereum_address: EthAddress,
}

/// Votes collected for one observed Ethereum event.
///
/// The voting protocol itself lives outside this crate; the record is
/// persisted here only so the migration sweep can enumerate voters and
/// clear the set when the bridge contract is redeployed. The event
/// payload stays opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthereumEventVoteRecord {
    pub votes: Vec<ValidatorAddress>,
    pub accepted: bool,
    pub event: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eth_hex_is_full_lowercase() {
        let address = EthAddress::from_slice(&[0xAB; 20]);
        let rendered = eth_hex(&address);
        assert_eq!(rendered.len(), 42);
        assert_eq!(rendered, format!("0x{}", "ab".repeat(20)));
    }

    #[test]
    fn test_batch_fees_sums_fee_amounts() {
        let contract = EthAddress::from_low_u64_be(7);
        let tx = |id: u64, fee: u64| SendToEthereum {
            id,
            sender: AccountAddress(vec![1]),
            ethereum_recipient: EthAddress::zero(),
            erc20_token: Erc20Token::new(contract, BigUint::from(10u64)),
            erc20_fee: Erc20Token::new(contract, BigUint::from(fee)),
        };
        let batch = BatchTx {
            batch_nonce: 1,
            token_contract: contract,
            transactions: vec![tx(1, 3), tx(2, 2)],
            timeout: 0,
            height: 1,
        };
        assert_eq!(batch.fees(), BigUint::from(5u64));
    }

    #[test]
    fn test_outgoing_tx_round_trips_through_bcs() {
        let tx = OutgoingTx::SignerSet(SignerSetTx {
            nonce: 3,
            height: 10,
            signers: vec![EthereumSigner {
                power: 42,
                ethereum_address: EthAddress::from_low_u64_be(9),
            }],
        });
        let bytes = bcs::to_bytes(&tx).unwrap();
        let decoded: OutgoingTx = bcs::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, tx);
    }
}
