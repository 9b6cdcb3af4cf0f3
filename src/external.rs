// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Interfaces to the modules the bridge collaborates with.
//!
//! The state machine never reaches into staking, bank, or token-registry
//! state directly; hosts hand in implementations of these traits at the
//! call sites that need them. Failures cross the boundary as `anyhow`
//! errors and abort the block.

use crate::types::ValidatorAddress;
use ethers::types::Address as EthAddress;
use num_bigint::BigUint;

/// An amount of a Starcoin-side denomination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    pub denom: String,
    pub amount: BigUint,
}

/// Read-only view of the staking module.
pub trait StakingProvider {
    /// Bonded validators ordered by descending voting power.
    fn bonded_validators_by_power(&self) -> Vec<ValidatorAddress>;

    /// The validator's power as of the last committed block.
    fn last_validator_power(&self, validator: &ValidatorAddress) -> u64;

    /// Tokens-per-unit-of-power divisor used by the staking module.
    fn power_reduction(&self) -> BigUint;
}

/// Token burn entry point of the bank module.
pub trait BankProvider {
    fn burn(&mut self, module_name: &str, coins: &[Coin]) -> anyhow::Result<()>;
}

/// Lookup from an ERC20 contract to its Starcoin-side denomination.
pub trait Erc20Registry {
    /// Returns whether the token originated on Starcoin, and its
    /// denomination. Ethereum-originated vouchers are burned when their
    /// batch executes; Starcoin-originated tokens stay locked in the
    /// bridge contract instead.
    fn erc20_to_denom(&self, contract: &EthAddress) -> (bool, String);
}
