use std::{
    collections::{HashMap, hash_map},
    net::SocketAddr,
};

use crate::{
    protocol::{packet::ApplicationPacket, reliability::Reliability},
    transport::Message,
};

use super::Session;

/// The view of a session handed to a [`crate::transport::Handler`].
pub struct SessionHandle<'a> {
    session: &'a mut Session,
}

impl<'a> SessionHandle<'a> {
    pub(crate) fn new(session: &'a mut Session) -> Self {
        Self { session }
    }

    pub fn addr(&self) -> SocketAddr {
        self.session.socket_addr()
    }

    /// Server-assigned id, unique for the lifetime of the server.
    pub fn id(&self) -> u64 {
        self.session.id()
    }

    pub fn client_id(&self) -> u64 {
        self.session.client_id()
    }

    pub fn mtu(&self) -> u16 {
        self.session.mtu()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Sends on ordering channel 0.
    pub fn send_packet(
        &mut self,
        packet: &ApplicationPacket,
        reliability: Reliability,
        immediate: bool,
    ) {
        self.session
            .send_application_packet(packet, reliability, 0, immediate);
    }

    pub fn send(&mut self, message: impl Into<Message>) {
        let message = message.into();
        self.session.send_buffer(
            message.buffer,
            message.reliability,
            message.channel,
            message.immediate,
        );
    }
}

/// All live sessions, keyed by peer address.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: HashMap<SocketAddr, Session>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, addr: &SocketAddr) -> bool {
        self.sessions.contains_key(addr)
    }

    pub fn get_mut(&mut self, addr: &SocketAddr) -> Option<SessionHandle<'_>> {
        self.sessions.get_mut(addr).map(SessionHandle::new)
    }

    /// Handles to every connected session.
    pub fn connected(&mut self) -> impl Iterator<Item = SessionHandle<'_>> {
        self.sessions
            .values_mut()
            .filter(|s| s.is_connected())
            .map(SessionHandle::new)
    }

    pub fn addrs(&self) -> impl Iterator<Item = SocketAddr> + '_ {
        self.sessions.keys().copied()
    }

    pub(crate) fn session(&self, addr: &SocketAddr) -> Option<&Session> {
        self.sessions.get(addr)
    }

    pub(crate) fn session_mut(&mut self, addr: &SocketAddr) -> Option<&mut Session> {
        self.sessions.get_mut(addr)
    }

    pub(crate) fn insert(&mut self, session: Session) -> &mut Session {
        match self.sessions.entry(session.socket_addr()) {
            hash_map::Entry::Occupied(mut slot) => {
                slot.insert(session);
                slot.into_mut()
            }
            hash_map::Entry::Vacant(slot) => slot.insert(session),
        }
    }

    pub(crate) fn iter_mut(&mut self) -> hash_map::IterMut<'_, SocketAddr, Session> {
        self.sessions.iter_mut()
    }

    /// Removes disconnected sessions, returning their addresses.
    pub(crate) fn remove_disconnected(&mut self) -> Vec<SocketAddr> {
        let dead: Vec<SocketAddr> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.is_disconnected())
            .map(|(addr, _)| *addr)
            .collect();
        for addr in &dead {
            self.sessions.remove(addr);
        }
        dead
    }
}
