//! Observable wallet events
//!
//! Each wallet keeps an append-only log; subscribers read it by sequence.

use crate::multisig::transaction::hex_bytes;
use crate::multisig::{FeeSplit, Identity, TxDigest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Emitted after a successful dispatch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub initiator: Identity,
    pub destination: Identity,
    pub value: u64,
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
    pub nonce: u64,
    pub digest: TxDigest,
    #[serde(with = "hex_bytes")]
    pub result: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WalletEvent {
    Deposit {
        sender: Identity,
        amount: u64,
        new_balance: u64,
    },
    Execution(ExecutionRecord),
    OwnerChanged {
        identity: Identity,
        added: bool,
    },
    ThresholdChanged {
        threshold: usize,
    },
    FeeDistributed(FeeSplit),
    Payout {
        recipient: Identity,
        amount: u64,
    },
}

/// An event with its position in the log
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub event: WalletEvent,
}

/// Append-only event log
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventLog {
    entries: Vec<LoggedEvent>,
}

impl EventLog {
    pub fn emit(&mut self, event: WalletEvent) {
        let sequence = self.entries.len() as u64;
        self.entries.push(LoggedEvent {
            sequence,
            timestamp: Utc::now(),
            event,
        });
    }

    pub fn entries(&self) -> &[LoggedEvent] {
        &self.entries
    }

    /// Events with a sequence number at or after `sequence`
    pub fn since(&self, sequence: u64) -> &[LoggedEvent] {
        let start = (sequence as usize).min(self.entries.len());
        &self.entries[start..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent execution record, if any
    pub fn last_execution(&self) -> Option<&ExecutionRecord> {
        self.entries.iter().rev().find_map(|entry| match &entry.event {
            WalletEvent::Execution(record) => Some(record),
            _ => None,
        })
    }
}
