//! Receive-side acceptance windows and send-side index generators.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, info};

use crate::protocol::{
    constants::WINDOW_SIZE, encapsulated_packet::EncapsulatedPacket, types::Sequence24,
};

/// Hands out 24-bit indexes. Every call returns the current index and then
/// moves it.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowIndex {
    current: Sequence24,
}

impl WindowIndex {
    pub fn new(initial: Sequence24) -> Self {
        Self { current: initial }
    }

    pub fn curr(&self) -> Sequence24 {
        self.current
    }

    /// Returns the current index and advances it by `n` (which may be
    /// negative).
    pub fn seek(&mut self, n: i32) -> Sequence24 {
        let index = self.current;
        self.current = self.current + n;
        index
    }

    pub fn next(&mut self) -> Sequence24 {
        self.seek(1)
    }

    pub fn prev(&mut self) -> Sequence24 {
        self.seek(-1)
    }
}

/// Outcome of offering a number to a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// Already seen, or inside the window but not awaited.
    Duplicate,
    /// More than [`WINDOW_SIZE`] behind the newest number.
    TooOld,
}

impl Admission {
    pub fn is_accepted(self) -> bool {
        self == Admission::Accepted
    }
}

/// High-water mark plus the set of missing numbers just behind it.
#[derive(Debug, Clone)]
struct SequenceGate {
    latest: Sequence24,
    waiting: HashSet<Sequence24>,
}

impl Default for SequenceGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceGate {
    fn new() -> Self {
        Self {
            // One before zero, so that zero is the first "newer" number.
            latest: Sequence24::default().prev(),
            waiting: HashSet::new(),
        }
    }

    fn admit(&mut self, seq: Sequence24) -> Admission {
        let window = WINDOW_SIZE as i32;
        let diff = seq.diff(self.latest);
        if diff > 0 {
            let floor = seq + -window;
            self.waiting.retain(|n| n.diff(floor) >= 0);
            let mut n = self.latest.next();
            if n.diff(floor) < 0 {
                n = floor;
            }
            while n != seq {
                self.waiting.insert(n);
                n = n.next();
            }
            self.latest = seq;
            Admission::Accepted
        } else if diff + window >= 0 {
            if self.waiting.remove(&seq) {
                Admission::Accepted
            } else {
                Admission::Duplicate
            }
        } else {
            Admission::TooOld
        }
    }
}

/// Per-session dedup of incoming DataPackets, and the bookkeeping behind
/// the Ack and Nack packets sent back.
#[derive(Debug, Clone)]
pub struct DataPacketWindow {
    gate: SequenceGate,
    ack_seq_nums: HashSet<Sequence24>,
}

impl Default for DataPacketWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl DataPacketWindow {
    pub fn new() -> Self {
        Self {
            gate: SequenceGate::new(),
            ack_seq_nums: HashSet::new(),
        }
    }

    /// Records `seq` for acknowledgement and decides whether its contents
    /// should be processed. Every received number is acknowledged, even a
    /// duplicate, so the peer stops resending it.
    pub fn put(&mut self, seq: Sequence24) -> Admission {
        self.ack_seq_nums.insert(seq);
        let admission = self.gate.admit(seq);
        if admission == Admission::TooOld {
            info!(seq = %seq, latest = %self.gate.latest, "discard old packet");
        }
        admission
    }

    /// Drains the pending ack set and copies the nack set. The nack set
    /// persists until the missing numbers arrive or fall out of the window.
    pub fn get_seq_nums(&mut self) -> (Vec<Sequence24>, Vec<Sequence24>) {
        let acks = self.ack_seq_nums.drain().collect();
        let nacks = self.gate.waiting.iter().copied().collect();
        (acks, nacks)
    }

    pub fn latest(&self) -> Sequence24 {
        self.gate.latest
    }
}

/// Dedup by message index, staleness gating by per-channel order index, and
/// a FIFO of packets ready for processing.
///
/// Accepted packets are released in arrival order. Ordered packets whose
/// order index is behind the newest one delivered on their channel are
/// dropped rather than held back.
#[derive(Debug, Default)]
pub struct EncapsulatedPacketWindow {
    gate: SequenceGate,
    latest_order_index: HashMap<u8, Sequence24>,
    ready: VecDeque<EncapsulatedPacket>,
}

impl EncapsulatedPacketWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, packet: EncapsulatedPacket) -> Admission {
        let Some(index) = packet.message else {
            self.ready.push_back(packet);
            return Admission::Accepted;
        };

        let admission = self.gate.admit(index);
        match admission {
            Admission::Accepted => {}
            Admission::Duplicate => {
                debug!(index = %index, "discard duplicate packet");
                return admission;
            }
            Admission::TooOld => {
                info!(index = %index, "discard old packet");
                return admission;
            }
        }

        if let Some(order) = packet.order {
            match self.latest_order_index.get(&order.channel) {
                // Fragments of one split packet share an order index, so
                // equality passes.
                Some(latest) if order.index.diff(*latest) < 0 => {
                    info!(
                        channel = order.channel,
                        index = %order.index,
                        "discard old ordered packet"
                    );
                    return Admission::Duplicate;
                }
                _ => {
                    self.latest_order_index.insert(order.channel, order.index);
                }
            }
        }

        self.ready.push_back(packet);
        Admission::Accepted
    }

    /// Pops the oldest ready packet.
    pub fn get(&mut self) -> Option<EncapsulatedPacket> {
        self.ready.pop_front()
    }

    pub fn len(&self) -> usize {
        self.ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::protocol::reliability::Reliability;

    fn seq(n: u32) -> Sequence24 {
        Sequence24::new(n)
    }

    fn sorted(mut v: Vec<Sequence24>) -> Vec<u32> {
        v.sort_by_key(|s| s.value());
        v.into_iter().map(|s| s.value()).collect()
    }

    #[test]
    fn window_index_seek() {
        let mut i = WindowIndex::default();
        assert_eq!(i.curr(), seq(0));
        assert_eq!(i.next(), seq(0));
        assert_eq!(i.next(), seq(1));
        assert_eq!(i.seek(5), seq(2));
        assert_eq!(i.curr(), seq(7));
        assert_eq!(i.prev(), seq(7));
        assert_eq!(i.seek(-5), seq(6));
        assert_eq!(i.curr(), seq(1));
    }

    #[test]
    fn in_order_sequence_is_accepted_once() {
        let mut w = DataPacketWindow::new();
        for n in 0..=20 {
            assert_eq!(w.put(seq(n)), Admission::Accepted);
        }
        for n in 13..=20 {
            assert_eq!(w.put(seq(n)), Admission::Duplicate);
        }
        assert_eq!(w.put(seq(21)), Admission::Accepted);
        assert_eq!(w.put(seq(0)), Admission::TooOld);
    }

    #[test]
    fn gaps_become_nacks() {
        let mut w = DataPacketWindow::new();
        w.put(seq(0));
        w.put(seq(2));
        w.put(seq(5));
        let (acks, nacks) = w.get_seq_nums();
        assert_eq!(sorted(acks), vec![0, 2, 5]);
        assert_eq!(sorted(nacks), vec![1, 3, 4]);

        // Acks drain, nacks persist until filled.
        assert_eq!(w.put(seq(3)), Admission::Accepted);
        let (acks, nacks) = w.get_seq_nums();
        assert_eq!(sorted(acks), vec![3]);
        assert_eq!(sorted(nacks), vec![1, 4]);
    }

    #[test]
    fn nacks_age_out_of_the_window() {
        let mut w = DataPacketWindow::new();
        w.put(seq(0));
        w.put(seq(2));
        w.put(seq(12));
        let (_, nacks) = w.get_seq_nums();
        assert_eq!(sorted(nacks), vec![4, 5, 6, 7, 8, 9, 10, 11]);
        assert_eq!(w.put(seq(1)), Admission::TooOld);
    }

    #[test]
    fn huge_jump_only_waits_for_the_window() {
        let mut w = DataPacketWindow::new();
        w.put(seq(0));
        w.put(seq(1_000_000));
        let (_, nacks) = w.get_seq_nums();
        assert_eq!(nacks.len(), WINDOW_SIZE as usize);
    }

    #[test]
    fn too_old_is_still_acked() {
        let mut w = DataPacketWindow::new();
        w.put(seq(30));
        w.get_seq_nums();
        assert_eq!(w.put(seq(3)), Admission::TooOld);
        let (acks, _) = w.get_seq_nums();
        assert_eq!(sorted(acks), vec![3]);
    }

    #[test]
    fn sequence_wraps() {
        let mut w = DataPacketWindow::new();
        w.gate.latest = seq(0xff_fffd);
        assert_eq!(w.put(seq(0xff_fffe)), Admission::Accepted);
        assert_eq!(w.put(seq(1)), Admission::Accepted);
        let (_, nacks) = w.get_seq_nums();
        assert_eq!(sorted(nacks), vec![0, 0xff_ffff]);
        assert_eq!(w.latest(), seq(1));
    }

    fn reliable(index: u32) -> EncapsulatedPacket {
        EncapsulatedPacket::new(Reliability::Reliable, Bytes::from_static(b"\x00"))
            .with_message(seq(index))
    }

    fn ordered(index: u32, order: u32, channel: u8) -> EncapsulatedPacket {
        EncapsulatedPacket::new(Reliability::ReliableOrdered, Bytes::from_static(b"\x00"))
            .with_message(seq(index))
            .with_order(seq(order), channel)
    }

    #[test]
    fn unindexed_packets_bypass_the_gate() {
        let mut w = EncapsulatedPacketWindow::new();
        let pkt = EncapsulatedPacket::new(Reliability::Unreliable, Bytes::from_static(b"a"));
        assert!(w.put(pkt.clone()).is_accepted());
        assert!(w.put(pkt.clone()).is_accepted());
        assert_eq!(w.len(), 2);
    }

    #[test]
    fn message_index_dedup() {
        let mut w = EncapsulatedPacketWindow::new();
        assert!(w.put(reliable(0)).is_accepted());
        assert!(w.put(reliable(2)).is_accepted());
        assert_eq!(w.put(reliable(2)), Admission::Duplicate);
        assert!(w.put(reliable(1)).is_accepted());
        assert_eq!(w.put(reliable(1)), Admission::Duplicate);

        let got: Vec<_> = std::iter::from_fn(|| w.get())
            .map(|p| p.message.unwrap().value())
            .collect();
        assert_eq!(got, vec![0, 2, 1]);
        assert!(w.is_empty());
    }

    #[test]
    fn stale_order_index_is_dropped_per_channel() {
        let mut w = EncapsulatedPacketWindow::new();
        assert!(w.put(ordered(0, 0, 0)).is_accepted());
        assert!(w.put(ordered(2, 2, 0)).is_accepted());
        // Fresh message index, but the channel already delivered order 2.
        assert_eq!(w.put(ordered(1, 1, 0)), Admission::Duplicate);
        // Another channel has its own counter.
        assert!(w.put(ordered(3, 0, 1)).is_accepted());
        // Same order index is accepted (split fragments).
        assert!(w.put(ordered(4, 2, 0)).is_accepted());
        assert_eq!(w.len(), 4);
    }
}
