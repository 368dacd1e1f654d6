//! Client-Connection – Verwaltet eine einzelne TCP-Verbindung
//!
//! Jede TCP-Verbindung bekommt eine `ClientConnection` in einem eigenen
//! Task auf dem LocalSet.
//!
//! ## Handshake
//! Der erste Frame MUSS eine `connect`-Nachricht mit der User-ID sein
//! und innerhalb von `handshake_timeout_sek` eintreffen; sonst wird die
//! Verbindung getrennt. Danach laeuft die Verarbeitungsschleife bis zum
//! Disconnect oder Shutdown-Signal.

use futures_util::{SinkExt, StreamExt};
use parley_core::types::{ConnectionId, UserId};
use parley_directory::{BenutzerVerzeichnis, GruppenVerzeichnis};
use parley_protocol::{signal::SignalNachricht, wire::SignalCodec};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::dispatcher::{DispatcherContext, SignalDispatcher};
use crate::error::{SignalingError, SignalingResult};
use crate::server_state::SignalingState;

/// Verarbeitet eine einzelne TCP-Verbindung
///
/// Liest Frames via `SignalCodec`, dispatcht an den `SignalDispatcher`
/// und schreibt die Relay-Queue der Verbindung zurueck auf den Socket.
pub struct ClientConnection<B, G>
where
    B: BenutzerVerzeichnis + 'static,
    G: GruppenVerzeichnis + 'static,
{
    state: Arc<SignalingState<B, G>>,
    peer_addr: SocketAddr,
}

impl<B, G> ClientConnection<B, G>
where
    B: BenutzerVerzeichnis + 'static,
    G: GruppenVerzeichnis + 'static,
{
    /// Erstellt eine neue ClientConnection
    pub fn neu(state: Arc<SignalingState<B, G>>, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis die Verbindung getrennt wird oder ein Shutdown-Signal
    /// eingeht.
    pub async fn verarbeiten(
        self,
        stream: TcpStream,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        let peer_addr = self.peer_addr;
        let verbindung = ConnectionId::new();
        let handshake_frist = Duration::from_secs(self.state.config.handshake_timeout_sek);

        tracing::info!(peer = %peer_addr, verbindung = %verbindung, "Neue Verbindung");

        let mut framed = Framed::new(stream, SignalCodec::new());
        let dispatcher = SignalDispatcher::neu(Arc::clone(&self.state));

        // -------------------------------------------------------------------
        // Handshake: erster Frame muss `connect` sein
        // -------------------------------------------------------------------
        let benutzer = match handshake(&mut framed, handshake_frist).await {
            Ok(benutzer) => benutzer,
            Err(e) => {
                tracing::warn!(
                    peer = %peer_addr,
                    fehler = %e,
                    "Handshake fehlgeschlagen – Verbindung wird getrennt"
                );
                return;
            }
        };

        // Verbindung im Relay registrieren, dann Presence + Broadcasts
        let mut sende_rx = self.state.relay.verbindung_registrieren(verbindung);
        dispatcher.benutzer_anmelden(benutzer, verbindung).await;

        let ctx = DispatcherContext {
            verbindung,
            benutzer: Some(benutzer),
        };

        // -------------------------------------------------------------------
        // Verarbeitungsschleife
        // -------------------------------------------------------------------
        loop {
            tokio::select! {
                // Eingehende Nachricht vom Client
                frame = framed.next() => {
                    match frame {
                        Some(Ok(nachricht)) => {
                            tracing::trace!(
                                peer = %peer_addr,
                                ereignis = nachricht.event_name(),
                                "Nachricht empfangen"
                            );
                            dispatcher.dispatch(nachricht, &ctx).await;
                        }
                        Some(Err(e)) => {
                            tracing::warn!(peer = %peer_addr, fehler = %e, "Frame-Lesefehler");
                            break;
                        }
                        None => {
                            tracing::info!(peer = %peer_addr, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                // Ausgehende Nachricht aus der Relay-Queue
                ausgehend = sende_rx.recv() => {
                    match ausgehend {
                        Some(nachricht) => {
                            if let Err(e) = framed.send(nachricht).await {
                                tracing::warn!(
                                    peer = %peer_addr,
                                    fehler = %e,
                                    "Senden fehlgeschlagen"
                                );
                                break;
                            }
                        }
                        // Relay hat die Verbindung entfernt
                        None => break,
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer_addr, "Shutdown-Signal – Verbindung wird getrennt");
                        break;
                    }
                }
            }
        }

        // Cleanup beim Verbindungsende
        dispatcher.client_cleanup(verbindung).await;
        tracing::info!(peer = %peer_addr, verbindung = %verbindung, "Verbindungs-Task beendet");
    }
}

/// Liest den ersten Frame und validiert ihn als `connect`-Nachricht
async fn handshake<S>(
    framed: &mut Framed<S, SignalCodec>,
    frist: Duration,
) -> SignalingResult<UserId>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match tokio::time::timeout(frist, framed.next()).await {
        Ok(Some(Ok(SignalNachricht::Anmelden { user_id }))) => Ok(user_id),
        Ok(Some(Ok(andere))) => Err(SignalingError::protokoll(format!(
            "erster Frame war '{}' statt connect",
            andere.event_name()
        ))),
        Ok(Some(Err(e))) => Err(SignalingError::Io(e)),
        Ok(None) => Err(SignalingError::VerbindungGetrennt),
        Err(_) => Err(SignalingError::HandshakeTimeout),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn framed_paar() -> (
        Framed<tokio::io::DuplexStream, SignalCodec>,
        Framed<tokio::io::DuplexStream, SignalCodec>,
    ) {
        let (client, server) = tokio::io::duplex(4096);
        (
            Framed::new(client, SignalCodec::new()),
            Framed::new(server, SignalCodec::new()),
        )
    }

    #[tokio::test]
    async fn handshake_akzeptiert_connect() {
        let (mut client, mut server) = framed_paar();
        let benutzer = UserId::new();

        client
            .send(SignalNachricht::Anmelden { user_id: benutzer })
            .await
            .unwrap();

        let ergebnis = handshake(&mut server, Duration::from_secs(1)).await;
        assert_eq!(ergebnis.unwrap(), benutzer);
    }

    #[tokio::test]
    async fn handshake_lehnt_anderen_ersten_frame_ab() {
        let (mut client, mut server) = framed_paar();

        client
            .send(SignalNachricht::EndCall { to: UserId::new() })
            .await
            .unwrap();

        let fehler = handshake(&mut server, Duration::from_secs(1))
            .await
            .expect_err("end-call als erster Frame ist ein Protokollfehler");
        assert!(matches!(fehler, SignalingError::Protokoll(_)));
    }

    #[tokio::test]
    async fn handshake_bei_geschlossener_verbindung() {
        let (client, mut server) = framed_paar();
        drop(client);

        let fehler = handshake(&mut server, Duration::from_secs(1))
            .await
            .expect_err("EOF vor dem Handshake");
        assert!(matches!(fehler, SignalingError::VerbindungGetrennt));
    }

    #[tokio::test(start_paused = true)]
    async fn handshake_timeout_ohne_frame() {
        let (client, mut server) = framed_paar();
        // Client haelt die Verbindung offen, sendet aber nichts
        let _offen = client;

        let fehler = handshake(&mut server, Duration::from_secs(10))
            .await
            .expect_err("kein Frame innerhalb der Frist");
        assert!(matches!(fehler, SignalingError::HandshakeTimeout));
    }
}
