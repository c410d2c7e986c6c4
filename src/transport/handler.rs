use crate::{
    protocol::packet::ApplicationPacket,
    session::{DisconnectReason, SessionHandle, SessionTable},
};

/// Application callbacks driven by the server loop.
///
/// Every callback runs on the loop task, so a handler never needs
/// interior locking. Only `info` and `handle` have to be provided.
pub trait Handler {
    /// Called once, before the first datagram is read.
    fn start(&mut self) {}

    /// Called once, after every session has been closed.
    fn terminate(&mut self) {}

    /// Server info string advertised in `UnconnectedPong`.
    fn info(&self) -> String;

    /// Called after the peer's `ClientHandshake` completes the connection.
    fn open(&mut self, _session: &mut SessionHandle<'_>) {}

    /// Called when a connected session closes, for whatever reason.
    fn close(&mut self, _session: &mut SessionHandle<'_>, _reason: DisconnectReason) {}

    /// Receives every application packet the session itself does not
    /// consume. Game packets arrive as [`ApplicationPacket::Raw`].
    fn handle(&mut self, session: &mut SessionHandle<'_>, packet: ApplicationPacket);

    /// Called on every tick, after the sessions have been updated.
    fn update(&mut self, _sessions: &mut SessionTable) {}
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn start(&mut self) {
        (**self).start()
    }

    fn terminate(&mut self) {
        (**self).terminate()
    }

    fn info(&self) -> String {
        (**self).info()
    }

    fn open(&mut self, session: &mut SessionHandle<'_>) {
        (**self).open(session)
    }

    fn close(&mut self, session: &mut SessionHandle<'_>, reason: DisconnectReason) {
        (**self).close(session, reason)
    }

    fn handle(&mut self, session: &mut SessionHandle<'_>, packet: ApplicationPacket) {
        (**self).handle(session, packet)
    }

    fn update(&mut self, sessions: &mut SessionTable) {
        (**self).update(sessions)
    }
}
