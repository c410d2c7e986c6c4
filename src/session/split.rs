use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tracing::warn;

use crate::{
    config::SessionConfig,
    protocol::{encapsulated_packet::EncapsulatedPacket, reliability::Reliability},
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SplitError {
    #[error("Fragment {index} is out of range for a split of {count}.")]
    IndexOutOfRange { index: u32, count: u32 },

    #[error("Split announces {count} fragments, the limit is {limit}.")]
    TooManyFragments { count: u32, limit: u32 },

    /// A fragment disagrees with the ones already buffered under its id.
    #[error("Fragment of split {id} announces {count} fragments, expected {expected}.")]
    Inconsistent { id: u16, count: u32, expected: u32 },
}

#[derive(Debug)]
struct PendingSplit {
    fragments: Vec<Option<Bytes>>,
    received: u32,
    started: Instant,
}

/// Buffers the fragments of split packets until every index of a split id
/// has arrived.
///
/// The number of concurrent split ids and the fragments per split are
/// bounded; when a new split id would exceed the bound, the oldest pending
/// split is evicted. Splits that stay incomplete past the timeout are
/// dropped by [`SplitAssembler::expire`].
#[derive(Debug)]
pub struct SplitAssembler {
    pending: HashMap<u16, PendingSplit>,
    max_splits: usize,
    max_count: u32,
    timeout: Duration,
}

impl SplitAssembler {
    pub fn new(max_splits: usize, max_count: u32, timeout: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            max_splits,
            max_count,
            timeout,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            config.max_split_packets,
            config.max_split_count,
            config.split_timeout,
        )
    }

    /// Stores one fragment. Returns the reassembled packet once the last
    /// fragment of its split arrives; the result carries no reliability
    /// metadata of its own.
    ///
    /// Packets without split metadata are returned as they are.
    pub fn concat(
        &mut self,
        packet: EncapsulatedPacket,
        now: Instant,
    ) -> Result<Option<EncapsulatedPacket>, SplitError> {
        let Some(split) = packet.split else {
            return Ok(Some(packet));
        };

        if split.count > self.max_count {
            return Err(SplitError::TooManyFragments {
                count: split.count,
                limit: self.max_count,
            });
        }
        if split.index >= split.count {
            return Err(SplitError::IndexOutOfRange {
                index: split.index,
                count: split.count,
            });
        }

        if !self.pending.contains_key(&split.id) && self.pending.len() >= self.max_splits {
            self.evict_oldest();
        }

        let entry = self.pending.entry(split.id).or_insert_with(|| PendingSplit {
            fragments: vec![None; split.count as usize],
            received: 0,
            started: now,
        });
        if entry.fragments.len() != split.count as usize {
            return Err(SplitError::Inconsistent {
                id: split.id,
                count: split.count,
                expected: entry.fragments.len() as u32,
            });
        }

        let slot = &mut entry.fragments[split.index as usize];
        if slot.is_none() {
            entry.received += 1;
        }
        *slot = Some(packet.buffer);

        if entry.received < split.count {
            return Ok(None);
        }

        let Some(done) = self.pending.remove(&split.id) else {
            return Ok(None);
        };
        let total = done.fragments.iter().flatten().map(Bytes::len).sum();
        let mut buffer = BytesMut::with_capacity(total);
        for fragment in done.fragments.into_iter().flatten() {
            buffer.extend_from_slice(&fragment);
        }
        Ok(Some(EncapsulatedPacket::new(
            Reliability::Unreliable,
            buffer.freeze(),
        )))
    }

    /// Drops splits that have been incomplete for longer than the timeout.
    /// Returns how many were dropped.
    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.pending.len();
        let timeout = self.timeout;
        self.pending
            .retain(|_, split| now.saturating_duration_since(split.started) <= timeout);
        before - self.pending.len()
    }

    /// Number of split ids with buffered fragments.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .pending
            .iter()
            .min_by_key(|(_, split)| split.started)
            .map(|(id, _)| *id);
        if let Some(id) = oldest {
            warn!(split_id = id, "split container full, evicting oldest split");
            self.pending.remove(&id);
        }
    }
}
