use std::{
    net::{Ipv4Addr, SocketAddrV4},
    time::Duration,
};

use crate::protocol::types::Magic;

/// RakNet protocol version spoken by the Pocket Edition 0.13 client.
pub const RAKNET_PROTOCOL_VERSION: u8 = 8;

/// Largest MTU the server will ever negotiate.
pub const MAXIMUM_MTU_SIZE: u16 = 1464;

/// Bytes of an `OpenConnectionRequest1` that precede its MTU padding
/// (id + magic + protocol version).
pub const OPEN_CONNECTION_REQUEST_1_HEADER_SIZE: usize = 18;

/// Number of ordering channels tracked per session.
pub const MAXIMUM_ORDERING_CHANNELS: usize = 32;

/// Size of the acceptance window for sequence numbers and message indexes.
pub const WINDOW_SIZE: u32 = 8;

/// `[id][seq_num: u24]`
pub const RAKNET_DATAGRAM_HEADER_SIZE: usize = 4;

/// Extra bytes an encapsulated packet needs once it carries split metadata.
pub const SPLIT_HEADER_SIZE: usize = 10;

/// Size of the buffer handed to `recv_from`.
pub const RECV_BUFFER_SIZE: usize = 4096;

/// A sent datagram waiting this long for an ACK is abandoned.
pub const ACK_TIMEOUT: Duration = Duration::from_secs(60);

/// Time after which a session is closed due to no activity.
pub const SESSION_TIMEOUT: Duration = Duration::from_millis(10000);

/// Time after which an incomplete split packet is discarded.
pub const SPLIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum concurrent split ids buffered per session.
pub const MAXIMUM_SPLIT_PACKETS: usize = 64;

/// Maximum fragments a single split packet may announce.
pub const MAXIMUM_SPLIT_COUNT: u32 = 512;

/// Interval of the transport loop's housekeeping tick.
pub const TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Capacity of the command channel between `ServerHandle`s and the loop.
pub const COMMAND_QUEUE_SIZE: usize = 1024;

/// Upper bound on the inflated size of a `Batch` payload.
pub const MAXIMUM_BATCH_SIZE: usize = 2 * 1024 * 1024;

/// Batches smaller than this are not worth compressing.
pub const BATCH_THRESHOLD: usize = 512;

/// Outgoing DataPacket id used for immediate sends.
pub const DATA_PACKET_IMMEDIATE_ID: u8 = 0x80;

/// Outgoing DataPacket id used for batched sends.
pub const DATA_PACKET_QUEUED_ID: u8 = 0x84;

/// Magic used to identify RakNet packets
pub const DEFAULT_UNCONNECTED_MAGIC: Magic = [
    0x00, 0xFF, 0xFF, 0x00, 0xFE, 0xFE, 0xFE, 0xFE, 0xFD, 0xFD, 0xFD, 0xFD, 0x12, 0x34, 0x56, 0x78,
];

pub const LOOPBACK_V4: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0);
pub const ANY_V4: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);

/// System addresses advertised in `ServerHandshake`.
pub const LOCAL_IP_ADDRESSES_V4: [SocketAddrV4; 10] = [
    LOOPBACK_V4,
    ANY_V4,
    ANY_V4,
    ANY_V4,
    ANY_V4,
    ANY_V4,
    ANY_V4,
    ANY_V4,
    ANY_V4,
    ANY_V4,
];
