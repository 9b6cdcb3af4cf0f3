// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Errors surfaced by the bridge state machine.
///
/// `Serialization` and `Invariant` indicate corrupted or inconsistent
/// state; the host must abort the current block when it sees either.
/// `External` carries a failure from a collaborating module (e.g. a
/// bank burn) and also aborts the block. Recoverable conditions such
/// as an unprofitable batch or an unknown batch on execution are not
/// errors at all: the former returns `None`, the latter is logged and
/// treated as success.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("serialization failure: {0}")]
    Serialization(String),

    #[error("invariant violation: {0}")]
    Invariant(String),

    #[error("external module failure: {0}")]
    External(#[from] anyhow::Error),
}

pub type BridgeResult<T> = Result<T, BridgeError>;
