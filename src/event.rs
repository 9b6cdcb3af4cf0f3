// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Block events emitted by the state machine.
//!
//! Events are buffered inside [`crate::module::BridgeModule`] and
//! drained by the host at the end of the block, so an aborted block
//! never leaks a partial event stream.

pub const EVENT_TYPE_OUTGOING_BATCH: &str = "outgoing_batch";
pub const EVENT_TYPE_OUTGOING_BATCH_CANCELED: &str = "outgoing_batch_canceled";
pub const EVENT_TYPE_MULTISIG_UPDATE_REQUEST: &str = "multisig_update_request";

pub const ATTRIBUTE_KEY_MODULE: &str = "module";
pub const ATTRIBUTE_KEY_BRIDGE_CONTRACT: &str = "bridge_contract";
pub const ATTRIBUTE_KEY_BRIDGE_CHAIN_ID: &str = "bridge_chain_id";
pub const ATTRIBUTE_KEY_BATCH_NONCE: &str = "batch_nonce";
pub const ATTRIBUTE_KEY_SIGNER_SET_NONCE: &str = "signer_set_nonce";
pub const ATTRIBUTE_KEY_INVALIDATION_NONCE: &str = "invalidation_nonce";
pub const ATTRIBUTE_KEY_INVALIDATION_SCOPE: &str = "invalidation_scope";
pub const ATTRIBUTE_KEY_CONTRACT_CALL_ADDRESS: &str = "contract_call_address";
pub const ATTRIBUTE_KEY_CONTRACT_CALL_PAYLOAD: &str = "contract_call_payload";
pub const ATTRIBUTE_KEY_CONTRACT_CALL_TOKENS: &str = "contract_call_tokens";
pub const ATTRIBUTE_KEY_CONTRACT_CALL_FEES: &str = "contract_call_fees";
pub const ATTRIBUTE_KEY_ETH_TX_TIMEOUT: &str = "eth_tx_timeout";

/// A single typed event with ordered key/value attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub event_type: &'static str,
    pub attributes: Vec<(&'static str, String)>,
}

impl Event {
    pub fn new(event_type: &'static str) -> Self {
        Self {
            event_type,
            attributes: Vec::new(),
        }
    }

    pub fn attr(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.attributes.push((key, value.into()));
        self
    }

    /// Attribute lookup, first match wins. Test helper mostly.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder_preserves_attribute_order() {
        let event = Event::new(EVENT_TYPE_OUTGOING_BATCH)
            .attr(ATTRIBUTE_KEY_MODULE, "bridge")
            .attr(ATTRIBUTE_KEY_BATCH_NONCE, "7");
        assert_eq!(event.attributes[0].0, ATTRIBUTE_KEY_MODULE);
        assert_eq!(event.attribute(ATTRIBUTE_KEY_BATCH_NONCE), Some("7"));
        assert_eq!(event.attribute("missing"), None);
    }
}
