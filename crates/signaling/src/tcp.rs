//! TCP-Listener des Signal-Servers
//!
//! Bindet den Socket, prueft das Verbindungslimit und startet pro
//! akzeptierter Verbindung eine `ClientConnection` als lokalen Task.
//! Die Verzeichnis-Traits nutzen async fn ohne Send-Garantie, daher
//! laeuft die gesamte Verbindungsverarbeitung in einer
//! `tokio::task::LocalSet` auf einem single-threaded Executor.

use parley_directory::{BenutzerVerzeichnis, GruppenVerzeichnis};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::LocalSet;

use crate::connection::ClientConnection;
use crate::server_state::SignalingState;

/// Wartezeit nach einem fehlgeschlagenen accept, bevor es weitergeht
const ACCEPT_FEHLER_PAUSE: Duration = Duration::from_millis(10);

/// TCP-Signal-Server
pub struct SignalServer<B, G>
where
    B: BenutzerVerzeichnis + 'static,
    G: GruppenVerzeichnis + 'static,
{
    state: Arc<SignalingState<B, G>>,
    bind_addr: SocketAddr,
}

impl<B, G> SignalServer<B, G>
where
    B: BenutzerVerzeichnis + 'static,
    G: GruppenVerzeichnis + 'static,
{
    pub fn neu(state: Arc<SignalingState<B, G>>, bind_addr: SocketAddr) -> Self {
        Self { state, bind_addr }
    }

    /// Bindet den Socket und laeuft bis `shutdown_rx` auf `true` wechselt
    ///
    /// Spannt intern die `LocalSet` auf, in der alle Verbindungs-Tasks
    /// leben; der Aufrufer braucht nur eine current-thread Runtime.
    pub async fn starten(self, shutdown_rx: watch::Receiver<bool>) -> std::io::Result<()> {
        let local = LocalSet::new();
        local.run_until(self.annahme_schleife(shutdown_rx)).await
    }

    async fn annahme_schleife(
        self,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        tracing::info!(adresse = %listener.local_addr()?, "Signal-Server nimmt Verbindungen an");

        loop {
            tokio::select! {
                angenommen = listener.accept() => match angenommen {
                    Ok((stream, peer_addr)) => self.verbindung_starten(stream, peer_addr, &shutdown_rx),
                    Err(e) => {
                        // Kurz durchatmen, sonst dreht die Schleife bei
                        // dauerhaften Fehlern (EMFILE) heiss
                        tracing::error!(fehler = %e, "accept fehlgeschlagen");
                        tokio::time::sleep(ACCEPT_FEHLER_PAUSE).await;
                    }
                },

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Signal-Server faehrt herunter");
        Ok(())
    }

    /// Prueft das Limit und uebergibt die Verbindung an ihren Task
    fn verbindung_starten(
        &self,
        stream: TcpStream,
        peer_addr: SocketAddr,
        shutdown_rx: &watch::Receiver<bool>,
    ) {
        let aktiv = self.state.relay.verbindungs_anzahl() as u32;
        if aktiv >= self.state.config.max_verbindungen {
            tracing::warn!(
                peer = %peer_addr,
                aktiv,
                max = self.state.config.max_verbindungen,
                "Verbindungslimit erreicht – abgewiesen"
            );
            return;
        }

        tracing::debug!(peer = %peer_addr, aktiv, "Verbindung angenommen");
        let verbindung = ClientConnection::neu(Arc::clone(&self.state), peer_addr);
        let shutdown = shutdown_rx.clone();
        tokio::task::spawn_local(async move {
            verbindung.verarbeiten(stream, shutdown).await;
        });
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
