//! Server and per-session tunables.
//!
//! Defaults come from [`crate::protocol::constants`]; every field has a
//! builder-style setter.

use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    time::Duration,
};

use crate::protocol::constants::{
    ACK_TIMEOUT, COMMAND_QUEUE_SIZE, MAXIMUM_MTU_SIZE, MAXIMUM_SPLIT_COUNT,
    MAXIMUM_SPLIT_PACKETS, RECV_BUFFER_SIZE, SESSION_TIMEOUT, SPLIT_TIMEOUT, TICK_INTERVAL,
};

/// Default port of Pocket Edition servers.
pub const DEFAULT_PORT: u16 = 19132;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// MTU granted by `OpenConnectionRequest1`; `OpenConnectionRequest2`
    /// can only lower it. Never above [`MAXIMUM_MTU_SIZE`].
    pub max_mtu: u16,
    /// Sent datagrams unacknowledged for this long are abandoned.
    pub ack_timeout: Duration,
    /// Sessions silent for this long are closed.
    pub session_timeout: Duration,
    /// Concurrent split ids buffered per session.
    pub max_split_packets: usize,
    /// Fragments a single split may announce.
    pub max_split_count: u32,
    /// Incomplete splits older than this are dropped.
    pub split_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_mtu: MAXIMUM_MTU_SIZE,
            ack_timeout: ACK_TIMEOUT,
            session_timeout: SESSION_TIMEOUT,
            max_split_packets: MAXIMUM_SPLIT_PACKETS,
            max_split_count: MAXIMUM_SPLIT_COUNT,
            split_timeout: SPLIT_TIMEOUT,
        }
    }
}

impl SessionConfig {
    /// Values above [`MAXIMUM_MTU_SIZE`] are clamped to it.
    pub fn max_mtu(mut self, max_mtu: u16) -> Self {
        self.max_mtu = max_mtu.min(MAXIMUM_MTU_SIZE);
        self
    }

    pub fn ack_timeout(mut self, ack_timeout: Duration) -> Self {
        self.ack_timeout = ack_timeout;
        self
    }

    pub fn session_timeout(mut self, session_timeout: Duration) -> Self {
        self.session_timeout = session_timeout;
        self
    }

    pub fn max_split_packets(mut self, max_split_packets: usize) -> Self {
        self.max_split_packets = max_split_packets;
        self
    }

    pub fn max_split_count(mut self, max_split_count: u32) -> Self {
        self.max_split_count = max_split_count;
        self
    }

    pub fn split_timeout(mut self, split_timeout: Duration) -> Self {
        self.split_timeout = split_timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Identifies this server in offline replies. Random unless set.
    pub server_id: u64,
    pub tick_interval: Duration,
    pub recv_buffer_size: usize,
    /// Capacity of the channel behind [`crate::transport::ServerHandle`].
    pub command_queue: usize,
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            server_id: rand::random(),
            tick_interval: TICK_INTERVAL,
            recv_buffer_size: RECV_BUFFER_SIZE,
            command_queue: COMMAND_QUEUE_SIZE,
            session: SessionConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Self::default()
        }
    }

    pub fn server_id(mut self, server_id: u64) -> Self {
        self.server_id = server_id;
        self
    }

    pub fn tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn recv_buffer_size(mut self, recv_buffer_size: usize) -> Self {
        self.recv_buffer_size = recv_buffer_size;
        self
    }

    pub fn command_queue(mut self, command_queue: usize) -> Self {
        self.command_queue = command_queue;
        self
    }

    pub fn session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }
}
