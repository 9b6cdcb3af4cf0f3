// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The delegate-key directory: three indices linking a validator's
//! consensus address, its orchestrator account, and its Ethereum
//! signing address. All three are written together; the individual
//! setters stay private because a partial triple is an inconsistent
//! directory.

use crate::keys;
use crate::module::BridgeModule;
use crate::storage::{IterDirection, Store};
use crate::types::{AccountAddress, DelegateKeys, ValidatorAddress};
use ethers::types::Address as EthAddress;
use tracing::warn;

impl<K: Store> BridgeModule<'_, K> {
    /// Register (or rotate) a validator's delegate keys, updating all
    /// three indices in one call.
    pub fn set_delegate_keys(
        &mut self,
        validator: &ValidatorAddress,
        orchestrator: &AccountAddress,
        ethereum_address: &EthAddress,
    ) {
        self.set_orchestrator_validator_address(orchestrator, validator);
        self.set_validator_ethereum_address(validator, ethereum_address);
        self.set_ethereum_orchestrator_address(ethereum_address, orchestrator);
    }

    fn set_orchestrator_validator_address(
        &mut self,
        orchestrator: &AccountAddress,
        validator: &ValidatorAddress,
    ) {
        let key = keys::make_orchestrator_validator_address_key(orchestrator);
        self.store_mut().set(&key, validator.as_bytes());
    }

    fn set_validator_ethereum_address(
        &mut self,
        validator: &ValidatorAddress,
        ethereum_address: &EthAddress,
    ) {
        let key = keys::make_validator_ethereum_address_key(validator);
        self.store_mut().set(&key, ethereum_address.as_bytes());
    }

    fn set_ethereum_orchestrator_address(
        &mut self,
        ethereum_address: &EthAddress,
        orchestrator: &AccountAddress,
    ) {
        let key = keys::make_ethereum_orchestrator_address_key(ethereum_address);
        self.store_mut().set(&key, orchestrator.as_bytes());
    }

    pub fn orchestrator_validator_address(
        &self,
        orchestrator: &AccountAddress,
    ) -> Option<ValidatorAddress> {
        self.store()
            .get(&keys::make_orchestrator_validator_address_key(orchestrator))
            .map(ValidatorAddress)
    }

    pub fn validator_ethereum_address(&self, validator: &ValidatorAddress) -> Option<EthAddress> {
        self.store()
            .get(&keys::make_validator_ethereum_address_key(validator))
            .filter(|bytes| bytes.len() == 20)
            .map(|bytes| EthAddress::from_slice(&bytes))
    }

    pub fn ethereum_orchestrator_address(
        &self,
        ethereum_address: &EthAddress,
    ) -> Option<AccountAddress> {
        self.store()
            .get(&keys::make_ethereum_orchestrator_address_key(ethereum_address))
            .map(AccountAddress)
    }

    /// Validators registered for a given Ethereum address, by scanning
    /// the validator→Ethereum index. Admin path, O(n) in the validator
    /// count.
    pub fn validators_by_ethereum_address(
        &self,
        ethereum_address: &EthAddress,
    ) -> Vec<ValidatorAddress> {
        let prefix = [keys::VALIDATOR_ETHEREUM_ADDRESS_KEY];
        self.store()
            .prefix_iter(&prefix, IterDirection::Forward)
            .filter(|(_, value)| value.as_slice() == ethereum_address.as_bytes())
            .map(|(key, _)| ValidatorAddress(key[1..].to_vec()))
            .collect()
    }

    /// Ethereum addresses registered for a given orchestrator, by
    /// scanning the Ethereum→orchestrator index. Admin path.
    pub fn ethereum_addresses_by_orchestrator(
        &self,
        orchestrator: &AccountAddress,
    ) -> Vec<EthAddress> {
        let prefix = [keys::ETHEREUM_ORCHESTRATOR_ADDRESS_KEY];
        self.store()
            .prefix_iter(&prefix, IterDirection::Forward)
            .filter(|(_, value)| value.as_slice() == orchestrator.as_bytes())
            .filter(|(key, _)| key.len() == 21)
            .map(|(key, _)| EthAddress::from_slice(&key[1..]))
            .collect()
    }

    /// Export every complete key triple, sorted ascending by Ethereum
    /// address so the output is deterministic across hosts.
    pub fn delegate_keys(&self) -> Vec<DelegateKeys> {
        let prefix = [keys::VALIDATOR_ETHEREUM_ADDRESS_KEY];
        let mut out = Vec::new();
        for (key, value) in self.store().prefix_iter(&prefix, IterDirection::Forward) {
            if value.len() != 20 {
                warn!(key = %hex::encode(&key), "skipping malformed ethereum address entry");
                continue;
            }
            let validator_address = ValidatorAddress(key[1..].to_vec());
            let ethereum_address = EthAddress::from_slice(&value);
            match self.ethereum_orchestrator_address(&ethereum_address) {
                Some(orchestrator_address) => out.push(DelegateKeys {
                    validator_address,
                    orchestrator_address,
                    ethereum_address,
                }),
                None => warn!(
                    validator = %validator_address,
                    ethereum_address = %crate::types::eth_hex(&ethereum_address),
                    "skipping incomplete delegate key triple"
                ),
            }
        }
        out.sort_by(|a, b| a.ethereum_address.cmp(&b.ethereum_address));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn validator(n: u8) -> ValidatorAddress {
        ValidatorAddress(vec![n; 20])
    }

    fn orchestrator(n: u8) -> AccountAddress {
        AccountAddress(vec![n; 16])
    }

    #[test]
    fn test_triple_round_trip() {
        let mut store = MemoryStore::new();
        let mut module = BridgeModule::new(&mut store, 1);
        let eth = EthAddress::from_low_u64_be(0xaa);

        module.set_delegate_keys(&validator(1), &orchestrator(2), &eth);

        assert_eq!(
            module.orchestrator_validator_address(&orchestrator(2)),
            Some(validator(1))
        );
        assert_eq!(module.validator_ethereum_address(&validator(1)), Some(eth));
        assert_eq!(
            module.ethereum_orchestrator_address(&eth),
            Some(orchestrator(2))
        );
    }

    #[test]
    fn test_rotation_overwrites_forward_indices() {
        let mut store = MemoryStore::new();
        let mut module = BridgeModule::new(&mut store, 1);
        let old_eth = EthAddress::from_low_u64_be(0xaa);
        let new_eth = EthAddress::from_low_u64_be(0xbb);

        module.set_delegate_keys(&validator(1), &orchestrator(2), &old_eth);
        module.set_delegate_keys(&validator(1), &orchestrator(2), &new_eth);

        assert_eq!(
            module.validator_ethereum_address(&validator(1)),
            Some(new_eth)
        );
        assert_eq!(
            module.ethereum_orchestrator_address(&new_eth),
            Some(orchestrator(2))
        );
    }

    #[test]
    fn test_reverse_lookups_scan_forward_indices() {
        let mut store = MemoryStore::new();
        let mut module = BridgeModule::new(&mut store, 1);
        let shared_eth = EthAddress::from_low_u64_be(0xaa);

        module.set_delegate_keys(&validator(1), &orchestrator(1), &shared_eth);
        module.set_delegate_keys(&validator(2), &orchestrator(1), &shared_eth);

        let validators = module.validators_by_ethereum_address(&shared_eth);
        assert_eq!(validators, vec![validator(1), validator(2)]);

        let addresses = module.ethereum_addresses_by_orchestrator(&orchestrator(1));
        assert_eq!(addresses, vec![shared_eth]);
    }

    #[test]
    fn test_export_sorts_by_ethereum_address() {
        let mut store = MemoryStore::new();
        let mut module = BridgeModule::new(&mut store, 1);

        // validator order deliberately disagrees with address order
        module.set_delegate_keys(
            &validator(1),
            &orchestrator(1),
            &EthAddress::from_low_u64_be(0xcc),
        );
        module.set_delegate_keys(
            &validator(2),
            &orchestrator(2),
            &EthAddress::from_low_u64_be(0xaa),
        );
        module.set_delegate_keys(
            &validator(3),
            &orchestrator(3),
            &EthAddress::from_low_u64_be(0xbb),
        );

        let exported = module.delegate_keys();
        let addresses: Vec<EthAddress> =
            exported.iter().map(|keys| keys.ethereum_address).collect();
        assert_eq!(
            addresses,
            vec![
                EthAddress::from_low_u64_be(0xaa),
                EthAddress::from_low_u64_be(0xbb),
                EthAddress::from_low_u64_be(0xcc),
            ]
        );
        assert_eq!(exported[0].validator_address, validator(2));
        assert_eq!(exported[0].orchestrator_address, orchestrator(2));
    }
}
