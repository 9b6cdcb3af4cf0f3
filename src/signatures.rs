// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-validator Ethereum signatures over outgoing txs, keyed by the
//! tx's store index. This layer only collects bytes; whether a
//! signature verifies against the signer set is the caller's problem.

use crate::keys;
use crate::module::BridgeModule;
use crate::storage::{IterDirection, Store};
use crate::types::ValidatorAddress;
use std::collections::BTreeMap;

impl<K: Store> BridgeModule<'_, K> {
    /// Store a validator's signature for one outgoing tx. Overwrites
    /// unconditionally; last writer wins within a block.
    pub fn set_ethereum_signature(
        &mut self,
        store_index: &[u8],
        validator: &ValidatorAddress,
        signature: &[u8],
    ) {
        let key = keys::make_ethereum_signature_key(store_index, validator);
        self.store_mut().set(&key, signature);
    }

    pub fn get_ethereum_signature(
        &self,
        store_index: &[u8],
        validator: &ValidatorAddress,
    ) -> Option<Vec<u8>> {
        self.store()
            .get(&keys::make_ethereum_signature_key(store_index, validator))
    }

    /// Walk all signatures for one outgoing tx in ascending validator
    /// byte order. The callback returns true to stop.
    pub fn iterate_ethereum_signatures(
        &self,
        store_index: &[u8],
        mut cb: impl FnMut(ValidatorAddress, Vec<u8>) -> bool,
    ) {
        let prefix = keys::make_ethereum_signature_prefix(store_index);
        for (key, value) in self.store().prefix_iter(&prefix, IterDirection::Forward) {
            let validator = ValidatorAddress(key[prefix.len()..].to_vec());
            if cb(validator, value) {
                break;
            }
        }
    }

    /// All signatures for one outgoing tx, ordered by validator bytes.
    pub fn ethereum_signatures(&self, store_index: &[u8]) -> BTreeMap<ValidatorAddress, Vec<u8>> {
        let mut signatures = BTreeMap::new();
        self.iterate_ethereum_signatures(store_index, |validator, signature| {
            signatures.insert(validator, signature);
            false
        });
        signatures
    }

    /// Sweep every signature stored for one outgoing tx.
    pub fn delete_ethereum_signatures(&mut self, store_index: &[u8]) {
        let prefix = keys::make_ethereum_signature_prefix(store_index);
        let stale: Vec<Vec<u8>> = self
            .store()
            .prefix_iter(&prefix, IterDirection::Forward)
            .map(|(key, _)| key)
            .collect();
        for key in &stale {
            self.store_mut().delete(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::make_batch_tx_store_index;
    use crate::storage::MemoryStore;
    use ethers::types::Address as EthAddress;

    fn validator(n: u8) -> ValidatorAddress {
        ValidatorAddress(vec![n; 20])
    }

    #[test]
    fn test_signature_overwrite_and_lookup() {
        let mut store = MemoryStore::new();
        let mut module = BridgeModule::new(&mut store, 1);
        let index = make_batch_tx_store_index(&EthAddress::from_low_u64_be(1), 1);

        assert!(module.get_ethereum_signature(&index, &validator(1)).is_none());

        module.set_ethereum_signature(&index, &validator(1), b"sig-a");
        module.set_ethereum_signature(&index, &validator(1), b"sig-b");
        assert_eq!(
            module.get_ethereum_signature(&index, &validator(1)),
            Some(b"sig-b".to_vec())
        );
    }

    #[test]
    fn test_signatures_enumerate_in_validator_order() {
        let mut store = MemoryStore::new();
        let mut module = BridgeModule::new(&mut store, 1);
        let index = make_batch_tx_store_index(&EthAddress::from_low_u64_be(1), 1);

        module.set_ethereum_signature(&index, &validator(9), b"c");
        module.set_ethereum_signature(&index, &validator(1), b"a");
        module.set_ethereum_signature(&index, &validator(5), b"b");

        let mut order = Vec::new();
        module.iterate_ethereum_signatures(&index, |val, _| {
            order.push(val);
            false
        });
        assert_eq!(order, vec![validator(1), validator(5), validator(9)]);
    }

    #[test]
    fn test_delete_sweeps_only_the_given_store_index() {
        let mut store = MemoryStore::new();
        let mut module = BridgeModule::new(&mut store, 1);
        let contract = EthAddress::from_low_u64_be(1);
        let first = make_batch_tx_store_index(&contract, 1);
        let second = make_batch_tx_store_index(&contract, 2);

        module.set_ethereum_signature(&first, &validator(1), b"a");
        module.set_ethereum_signature(&first, &validator(2), b"b");
        module.set_ethereum_signature(&second, &validator(1), b"c");

        module.delete_ethereum_signatures(&first);
        assert!(module.ethereum_signatures(&first).is_empty());
        assert_eq!(module.ethereum_signatures(&second).len(), 1);
    }
}
