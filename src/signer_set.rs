// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Signer sets: the validator set normalized into fixed-width weights
//! the bridge contract can verify with integer arithmetic only.

use crate::error::BridgeResult;
use crate::event::{
    Event, ATTRIBUTE_KEY_BRIDGE_CHAIN_ID, ATTRIBUTE_KEY_BRIDGE_CONTRACT, ATTRIBUTE_KEY_MODULE,
    ATTRIBUTE_KEY_SIGNER_SET_NONCE, EVENT_TYPE_MULTISIG_UPDATE_REQUEST,
};
use crate::external::StakingProvider;
use crate::keys::{
    self, OutgoingTxType, LAST_OBSERVED_SIGNER_SET_KEY, LATEST_SIGNER_SET_TX_NONCE_KEY,
};
use crate::module::{decode, encode, BridgeModule};
use crate::storage::Store;
use crate::types::{EthereumSigner, OutgoingTx, SignerSetTx};
use crate::MODULE_NAME;
use ethers::types::Address as EthAddress;
use num_bigint::BigUint;
use tracing::{error, info};

impl<K: Store> BridgeModule<'_, K> {
    /// The current signer set: every bonded validator with a registered
    /// non-zero Ethereum address, weighted by its share of the total
    /// power scaled to 2³²−1.
    ///
    /// Scaling uses unbounded intermediates and truncating division, so
    /// the normalized weights sum to at most 2³²−1 and undershoot it by
    /// less than the number of included signers. Threshold checks on
    /// the contract side must measure against the post-normalization
    /// sum, never the theoretical maximum. Integer-only arithmetic
    /// keeps the result identical across platforms; floating point
    /// here would be a consensus fault.
    pub fn current_signer_set(&self, staking: &impl StakingProvider) -> Vec<EthereumSigner> {
        let mut signers = Vec::new();
        let mut total_power = BigUint::default();
        for validator in staking.bonded_validators_by_power() {
            let power = staking.last_validator_power(&validator);
            match self.validator_ethereum_address(&validator) {
                Some(ethereum_address) if ethereum_address != EthAddress::zero() => {
                    signers.push(EthereumSigner {
                        power,
                        ethereum_address,
                    });
                    total_power += power;
                }
                _ => {}
            }
        }
        if total_power == BigUint::default() {
            return Vec::new();
        }

        for signer in &mut signers {
            let normalized =
                BigUint::from(signer.power) * BigUint::from(u32::MAX) / &total_power;
            // bounded by 2³²−1 after division, the conversion cannot fail
            signer.power = u64::try_from(normalized).expect("normalized power fits in u64");
        }
        signers
    }

    /// Snapshot the current signer set as an outgoing tx under a fresh
    /// nonce and announce it to the orchestrators.
    pub fn create_signer_set_tx(
        &mut self,
        staking: &impl StakingProvider,
    ) -> BridgeResult<SignerSetTx> {
        let nonce = self.increment_latest_signer_set_tx_nonce()?;
        let signer_set_tx = SignerSetTx {
            nonce,
            height: self.block_height(),
            signers: self.current_signer_set(staking),
        };

        let params = self.params()?;
        self.emit(
            Event::new(EVENT_TYPE_MULTISIG_UPDATE_REQUEST)
                .attr(ATTRIBUTE_KEY_MODULE, MODULE_NAME)
                .attr(ATTRIBUTE_KEY_BRIDGE_CONTRACT, params.bridge_contract_address)
                .attr(ATTRIBUTE_KEY_BRIDGE_CHAIN_ID, params.bridge_chain_id.to_string())
                .attr(ATTRIBUTE_KEY_SIGNER_SET_NONCE, nonce.to_string()),
        );
        self.set_outgoing_tx(&OutgoingTx::SignerSet(signer_set_tx.clone()))?;
        info!(
            nonce = signer_set_tx.nonce,
            height = signer_set_tx.height,
            signers = signer_set_tx.signers.len(),
            "signer set tx created"
        );
        Ok(signer_set_tx)
    }

    /// Record that a signer set became the contract's checkpoint.
    ///
    /// The executed set becomes the last observed one, and it plus any
    /// older pending set is dropped from the outgoing store, nothing
    /// will execute them anymore. Unknown nonces are logged and
    /// succeed.
    pub fn signer_set_executed(&mut self, nonce: u64) -> BridgeResult<()> {
        let store_index = keys::make_signer_set_tx_store_index(nonce);
        let signer_set = match self.get_outgoing_tx(&store_index)? {
            Some(OutgoingTx::SignerSet(tx)) => tx,
            _ => {
                error!(nonce, "failed to clean up executed signer set, unknown nonce");
                return Ok(());
            }
        };
        self.set_last_observed_signer_set(&signer_set)?;

        let mut superseded = Vec::new();
        self.iterate_outgoing_txs_by_type(OutgoingTxType::SignerSet, |index, otx| {
            if let OutgoingTx::SignerSet(tx) = otx {
                if tx.nonce <= nonce {
                    superseded.push(index.to_vec());
                }
            }
            false
        })?;
        for index in &superseded {
            self.delete_outgoing_tx(index);
        }
        info!(
            nonce,
            removed = superseded.len(),
            "signer set executed on ethereum"
        );
        Ok(())
    }

    pub fn latest_signer_set_tx_nonce(&self) -> BridgeResult<u64> {
        self.read_u64(&[LATEST_SIGNER_SET_TX_NONCE_KEY])
    }

    pub(crate) fn increment_latest_signer_set_tx_nonce(&mut self) -> BridgeResult<u64> {
        let next = self.latest_signer_set_tx_nonce()? + 1;
        self.write_u64(&[LATEST_SIGNER_SET_TX_NONCE_KEY], next);
        Ok(next)
    }

    /// The most recently created signer set tx, if it is still pending.
    pub fn latest_signer_set_tx(&self) -> BridgeResult<Option<SignerSetTx>> {
        let store_index = keys::make_signer_set_tx_store_index(self.latest_signer_set_tx_nonce()?);
        Ok(match self.get_outgoing_tx(&store_index)? {
            Some(OutgoingTx::SignerSet(tx)) => Some(tx),
            _ => None,
        })
    }

    /// Every pending signer set tx, newest first.
    pub fn signer_set_txs(&self) -> BridgeResult<Vec<SignerSetTx>> {
        let mut out = Vec::new();
        self.iterate_outgoing_txs_by_type(OutgoingTxType::SignerSet, |_, otx| {
            if let OutgoingTx::SignerSet(tx) = otx {
                out.push(tx);
            }
            false
        })?;
        Ok(out)
    }

    /// The signer set last observed as executed on Ethereum.
    pub fn last_observed_signer_set(&self) -> BridgeResult<Option<SignerSetTx>> {
        match self.store().get(&[LAST_OBSERVED_SIGNER_SET_KEY]) {
            Some(bytes) => decode(&bytes, "last observed signer set").map(Some),
            None => Ok(None),
        }
    }

    pub(crate) fn set_last_observed_signer_set(
        &mut self,
        signer_set: &SignerSetTx,
    ) -> BridgeResult<()> {
        let bytes = encode(signer_set, "last observed signer set")?;
        self.store_mut().set(&[LAST_OBSERVED_SIGNER_SET_KEY], &bytes);
        Ok(())
    }
}
