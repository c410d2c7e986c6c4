use std::error::Error;
use std::net::SocketAddr;

use pocket_raknet::protocol::packet::Batch;
use pocket_raknet::{
    ApplicationPacket, DisconnectReason, Handler, Message, RaknetServer, ServerConfig,
    SessionHandle, SessionTable,
};

/// Sends every game packet straight back to the peer that sent it.
struct Echo {
    motd: String,
    echoed: u64,
}

impl Echo {
    fn echo(&mut self, session: &mut SessionHandle<'_>, packet: &ApplicationPacket) {
        let message = match Message::from(packet).compress_if_large() {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(peer = %session.addr(), error = %e, "failed to compress echo");
                return;
            }
        };
        session.send(message);
        self.echoed += 1;
    }
}

impl Handler for Echo {
    fn start(&mut self) {
        println!("Echo server started");
    }

    fn terminate(&mut self) {
        println!("Echo server stopped after {} packets", self.echoed);
    }

    fn info(&self) -> String {
        self.motd.clone()
    }

    fn open(&mut self, session: &mut SessionHandle<'_>) {
        println!("[{}] connected (client id {})", session.addr(), session.client_id());
    }

    fn close(&mut self, session: &mut SessionHandle<'_>, reason: DisconnectReason) {
        println!("[{}] disconnected: {}", session.addr(), reason);
    }

    fn handle(&mut self, session: &mut SessionHandle<'_>, packet: ApplicationPacket) {
        match &packet {
            ApplicationPacket::Batch(batch) => match batch.packets() {
                Ok(inner) => {
                    tracing::debug!(peer = %session.addr(), count = inner.len(), "echoing batch");
                    match Batch::compress(&inner) {
                        Ok(batch) => self.echo(session, &batch.into()),
                        Err(e) => tracing::warn!(error = %e, "failed to rebuild batch"),
                    }
                }
                Err(e) => tracing::warn!(peer = %session.addr(), error = %e, "bad batch"),
            },
            _ => self.echo(session, &packet),
        }
    }

    fn update(&mut self, sessions: &mut SessionTable) {
        tracing::trace!(sessions = sessions.len(), "tick");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let bind_addr: SocketAddr = "0.0.0.0:19132".parse()?;
    let handler = Echo {
        motd: "MCPE;pocket-raknet echo;27;0.11.0;0;20".to_string(),
        echoed: 0,
    };

    let (server, handle) = RaknetServer::bind(ServerConfig::new(bind_addr), handler).await?;
    println!("Listening on: {}", server.local_addr());
    let task = tokio::spawn(server.run());

    tokio::signal::ctrl_c().await?;
    println!("Shutting down...");
    handle.terminate().await?;
    task.await?;
    Ok(())
}
