//! Ruf-Treiber – Ereignisschleife um den Einzelruf-Koordinator
//!
//! Der Treiber besitzt den Koordinator und serialisiert alle Zugriffe:
//! Kommandos der Oberflaeche, eingehende Signale vom Server und die
//! Antwortfrist laufen durch eine einzige `select!`-Schleife. Damit wird
//! jedes Ereignis vollstaendig verarbeitet, bevor das naechste ansteht.

use parley_core::types::{CallArt, UserId};
use parley_protocol::signal::{IceKandidat, SignalNachricht};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::einzel::EinzelRufKoordinator;
use crate::medien::MedienQuelle;
use crate::schnittstellen::{PeerFabrik, SignalAusgang};

/// Kommandos der Oberflaeche an den Koordinator
#[derive(Debug)]
pub enum RufKommando {
    /// Ausgehenden Ruf starten
    Anrufen { ziel: UserId, art: CallArt },
    /// Klingelnden Ruf annehmen
    Annehmen,
    /// Klingelnden Ruf ablehnen
    Ablehnen,
    /// Laufenden Ruf beenden
    Beenden,
    /// Letzten fehlgeschlagenen Versuch wiederholen
    ErneutVersuchen,
    /// Lokalen Kandidaten an die Gegenseite senden
    KandidatSenden(IceKandidat),
}

/// Ereignisschleife fuer Einzelrufe
pub struct RufTreiber<S, M, F>
where
    S: SignalAusgang,
    M: MedienQuelle,
    F: PeerFabrik,
{
    koordinator: EinzelRufKoordinator<S, M, F>,
    kommandos: mpsc::Receiver<RufKommando>,
    signale_eingang: mpsc::Receiver<SignalNachricht>,
}

impl<S, M, F> RufTreiber<S, M, F>
where
    S: SignalAusgang,
    M: MedienQuelle,
    F: PeerFabrik,
{
    /// Erstellt einen Treiber um den gegebenen Koordinator
    pub fn neu(
        koordinator: EinzelRufKoordinator<S, M, F>,
        kommandos: mpsc::Receiver<RufKommando>,
        signale_eingang: mpsc::Receiver<SignalNachricht>,
    ) -> Self {
        Self {
            koordinator,
            kommandos,
            signale_eingang,
        }
    }

    /// Laesst die Schleife laufen, bis beide Kanaele geschlossen sind
    pub async fn laufen(mut self) {
        loop {
            // Frist jede Runde neu lesen; sie entsteht und verfaellt mit
            // dem Zustand des Koordinators
            let frist = self.koordinator.timeout_frist();

            tokio::select! {
                kommando = self.kommandos.recv() => {
                    match kommando {
                        Some(kommando) => self.kommando_verarbeiten(kommando).await,
                        None => break,
                    }
                }

                signal = self.signale_eingang.recv() => {
                    match signal {
                        Some(signal) => self.signal_verarbeiten(signal).await,
                        None => break,
                    }
                }

                _ = frist_abwarten(frist) => {
                    self.koordinator.timeout_pruefen(Instant::now());
                }
            }
        }
        tracing::debug!("Ruf-Treiber beendet");
    }

    async fn kommando_verarbeiten(&mut self, kommando: RufKommando) {
        let ergebnis = match kommando {
            RufKommando::Anrufen { ziel, art } => self.koordinator.anrufen(ziel, art).await,
            RufKommando::Annehmen => self.koordinator.annehmen().await,
            RufKommando::Ablehnen => self.koordinator.ablehnen(),
            RufKommando::Beenden => {
                self.koordinator.beenden();
                Ok(())
            }
            RufKommando::ErneutVersuchen => self.koordinator.erneut_versuchen().await,
            RufKommando::KandidatSenden(kandidat) => self.koordinator.kandidat_senden(kandidat),
        };
        if let Err(fehler) = ergebnis {
            // Oberflaechen-relevante Fehler kamen bereits als Ereignis an
            tracing::warn!(fehler = %fehler, "Kommando fehlgeschlagen");
        }
    }

    async fn signal_verarbeiten(&mut self, signal: SignalNachricht) {
        let ergebnis = match signal {
            SignalNachricht::IncomingCall { from, offer, art } => {
                self.koordinator.eingehender_ruf(from, offer, art);
                Ok(())
            }
            SignalNachricht::CallAccepted { answer } => {
                self.koordinator.antwort_empfangen(answer).await
            }
            SignalNachricht::CallRejected {} => {
                self.koordinator.abgelehnt_empfangen();
                Ok(())
            }
            SignalNachricht::CallEnded {} => {
                self.koordinator.beendet_empfangen();
                Ok(())
            }
            SignalNachricht::IceCandidate { candidate, .. } => {
                self.koordinator.kandidat_empfangen(candidate).await
            }
            andere => {
                tracing::debug!(ereignis = andere.event_name(), "Signal nicht fuer Einzelrufe – ignoriert");
                Ok(())
            }
        };
        if let Err(fehler) = ergebnis {
            tracing::warn!(fehler = %fehler, "Signalverarbeitung fehlgeschlagen");
        }
    }
}

/// Wartet auf die Frist; ohne Frist fuer immer
async fn frist_abwarten(frist: Option<Instant>) {
    match frist {
        Some(frist) => tokio::time::sleep_until(frist).await,
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
