// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! State-machine core of the Starcoin→Ethereum bridge.
//!
//! This crate turns asset and call intents originating on Starcoin
//! into batched, validator-signed transactions deliverable to the
//! bridge contract on Ethereum, and tracks their lifecycle: the
//! outgoing-transaction store and batch builder, signer-set
//! normalization, the per-validator signature index, the delegate-key
//! directory, Ethereum height tracking with timeout projection, and
//! the state sweep run when the bridge contract is redeployed.
//!
//! Everything lives in an ordered byte-keyed [`storage::Store`]
//! borrowed per block through [`module::BridgeModule`]; operations are
//! synchronous, integer-only and deterministic, because they execute
//! under consensus. Collaborating modules (staking, bank, the
//! ERC20↔denom registry) are reached through the traits in
//! [`external`].

pub mod batch;
pub mod contract_call;
pub mod directory;
pub mod error;
pub mod event;
pub mod external;
pub mod height;
pub mod keys;
pub mod migration;
pub mod module;
pub mod params;
pub mod pool;
pub mod signatures;
pub mod signer_set;
pub mod storage;
pub mod types;
pub mod vote_records;


/// Module name used in events and burn attributions.
pub const MODULE_NAME: &str = "bridge";

pub use error::{BridgeError, BridgeResult};
pub use event::Event;
pub use external::{BankProvider, Coin, Erc20Registry, StakingProvider};
pub use keys::OutgoingTxType;
pub use module::BridgeModule;
pub use params::BridgeParams;
pub use storage::{IterDirection, MemoryStore, Store};
pub use types::{
    AccountAddress, BatchTx, ContractCallTx, DelegateKeys, Erc20Token, EthereumEventVoteRecord,
    EthereumSigner, LatestEthereumBlockHeight, OutgoingTx, SendToEthereum, SignerSetTx,
    ValidatorAddress,
};
