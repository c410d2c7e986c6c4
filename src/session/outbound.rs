use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, info, trace, warn};

use crate::protocol::{
    constants::{
        DATA_PACKET_IMMEDIATE_ID, MAXIMUM_ORDERING_CHANNELS, RAKNET_DATAGRAM_HEADER_SIZE,
        SPLIT_HEADER_SIZE,
    },
    datagram::DataPacket,
    encapsulated_packet::{EncapsulatedPacket, OrderInfo, SplitInfo},
    packet::{Ack, AckNackPayload, ApplicationPacket, ClientDisconnect, Nack, TransportPacket},
    reliability::Reliability,
};

use super::{AckWait, Session};

impl Session {
    /// Encodes an application packet and sends it to the peer.
    ///
    /// `immediate` sends it in its own DataPacket right away; otherwise it
    /// is batched with other packets until the batch fills up or the next
    /// tick.
    pub fn send_application_packet(
        &mut self,
        packet: &ApplicationPacket,
        reliability: Reliability,
        channel: u8,
        immediate: bool,
    ) {
        trace!(
            peer = %self.addr,
            id = format_args!("0x{:02x}", packet.id()),
            "N<<<"
        );
        self.send_buffer(packet.to_bytes(), reliability, channel, immediate);
    }

    /// Sends an already encoded application packet (id byte included).
    ///
    /// Reliable packets take a message index and ordered ones an order index
    /// on `channel`. Packets that do not fit the MTU are split into
    /// fragments sharing a split id; each fragment goes out immediately.
    pub fn send_buffer(
        &mut self,
        buffer: Bytes,
        reliability: Reliability,
        channel: u8,
        immediate: bool,
    ) {
        if self.is_disconnected() {
            debug!(peer = %self.addr, "send on disconnected session");
            return;
        }
        if self.mtu == 0 {
            warn!(peer = %self.addr, "send before MTU negotiation");
            return;
        }

        let reliability = reliability.without_ack_receipt();
        let channel = if (channel as usize) < MAXIMUM_ORDERING_CHANNELS {
            channel
        } else {
            warn!(peer = %self.addr, channel, "ordering channel out of range, using 0");
            0
        };

        let mut packet = EncapsulatedPacket::new(reliability, buffer.clone());
        if reliability.is_reliable() {
            packet.message = Some(self.send_message_index.next());
        }
        if reliability.is_ordered() {
            packet.order = Some(OrderInfo {
                index: self.channel_index[channel as usize].next(),
                channel,
            });
        }

        let mtu = self.mtu as usize;
        let len = RAKNET_DATAGRAM_HEADER_SIZE + packet.wire_len();
        if len <= mtu {
            self.send_encapsulated(packet, immediate);
            return;
        }

        // Each fragment also carries split metadata.
        let overflow = len - mtu + SPLIT_HEADER_SIZE;
        let Some(chunk) = buffer.len().checked_sub(overflow).filter(|n| *n > 0) else {
            warn!(peer = %self.addr, mtu, len = buffer.len(), "MTU too small to split packet");
            if reliability.is_reliable() {
                self.send_message_index.prev();
            }
            return;
        };

        // The index taken above is reissued to the first fragment.
        if reliability.is_reliable() {
            self.send_message_index.prev();
        }
        let count = buffer.len().div_ceil(chunk) as u32;
        let id = self.split_id;
        self.split_id = self.split_id.wrapping_add(1);
        for (index, start) in (0..buffer.len()).step_by(chunk).enumerate() {
            let end = (start + chunk).min(buffer.len());
            let mut fragment = EncapsulatedPacket::new(reliability, buffer.slice(start..end));
            if reliability.is_reliable() {
                fragment.message = Some(self.send_message_index.next());
            }
            fragment.order = packet.order;
            fragment.split = Some(SplitInfo {
                count,
                id,
                index: index as u32,
            });
            self.send_encapsulated(fragment, true);
        }
    }

    fn send_encapsulated(&mut self, packet: EncapsulatedPacket, immediate: bool) {
        trace!(peer = %self.addr, packet = %packet, "N<<");
        if immediate {
            self.send_waiting_packet();
            let mut datagram = DataPacket::new(DATA_PACKET_IMMEDIATE_ID, self.send_seq_num.next());
            datagram.packets.push(packet);
            self.send_datagram(datagram);
        } else {
            if self.waiting_packet.wire_len() + packet.wire_len() > self.mtu as usize {
                self.send_waiting_packet();
            }
            self.waiting_packet.add(packet);
        }
    }

    /// Sends the batched encapsulated packets, if any.
    pub(super) fn send_waiting_packet(&mut self) {
        if self.waiting_packet.is_empty() {
            return;
        }
        let datagram = self.waiting_packet.take(self.send_seq_num.next());
        self.send_datagram(datagram);
    }

    fn send_datagram(&mut self, datagram: DataPacket) {
        let seq = datagram.seq_num;
        let require_ack = datagram.require_ack();
        let bytes = TransportPacket::from(datagram).to_bytes();
        trace!(peer = %self.addr, seq = %seq, len = bytes.len(), "N<");
        if require_ack {
            self.ack_wait_packets.insert(
                seq,
                AckWait {
                    datagram: bytes.clone(),
                    sent_at: self.now,
                },
            );
        }
        self.outbox.push_back(bytes);
    }

    /// Queues a transport packet as its own datagram.
    pub(super) fn send_transport(&mut self, packet: &TransportPacket) {
        trace!(
            peer = %self.addr,
            id = format_args!("0x{:02x}", packet.id()),
            "N<"
        );
        self.outbox.push_back(packet.to_bytes());
    }

    /// Acknowledges the datagrams received since the last call and reports
    /// the ones still missing.
    pub(super) fn send_acknowledge(&mut self) {
        let (acks, nacks) = self.recv_packets.get_seq_nums();
        if !acks.is_empty() {
            self.send_transport(&Ack(AckNackPayload::from_seq_nums(acks)).into());
        }
        if !nacks.is_empty() {
            self.send_transport(&Nack(AckNackPayload::from_seq_nums(nacks)).into());
        }
    }

    /// Gives up on datagrams that waited longer than the ack timeout.
    pub(super) fn expire_ack_wait(&mut self, now: Instant) {
        let timeout = self.config.ack_timeout;
        let addr = self.addr;
        self.ack_wait_packets.retain(|seq, wait| {
            let alive = now.saturating_duration_since(wait.sent_at) <= timeout;
            if !alive {
                info!(peer = %addr, seq = %seq, "ACK_TIMEOUT");
            }
            alive
        });
    }

    pub(super) fn send_disconnect_notification(&mut self) {
        self.send_application_packet(&ClientDisconnect.into(), Reliability::Unreliable, 0, true);
    }
}
