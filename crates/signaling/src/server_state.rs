//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt alle geteilten Dienste als Arc-Referenzen, die sicher zwischen
//! tokio-Tasks geteilt werden koennen. Generisch ueber die beiden
//! Verzeichnis-Traits, damit Tests In-Memory-Implementierungen
//! injizieren koennen.

use parley_directory::{BenutzerVerzeichnis, GruppenVerzeichnis};
use std::sync::Arc;
use std::time::Instant;

use crate::gruppen_rufe::GruppenRufRegister;
use crate::presence::PresenceRegistry;
use crate::relay::MessageRelay;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Anzeigename des Servers
    pub server_name: String,
    /// Maximale gleichzeitige Verbindungen
    pub max_verbindungen: u32,
    /// Zeitlimit fuer den connect-Handshake in Sekunden
    pub handshake_timeout_sek: u64,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            server_name: "Parley Server".to_string(),
            max_verbindungen: 512,
            handshake_timeout_sek: 10,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState<B, G>
where
    B: BenutzerVerzeichnis + 'static,
    G: GruppenVerzeichnis + 'static,
{
    /// Server-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Benutzerverzeichnis (Profile, Last-Seen)
    pub benutzer: Arc<B>,
    /// Gruppenverzeichnis (Mitgliedschaften)
    pub gruppen: Arc<G>,
    /// Presence-Registry (wer ist online, mit welchen Verbindungen)
    pub presence: PresenceRegistry,
    /// Message-Relay (Nachrichten an Verbindungen zustellen)
    pub relay: MessageRelay,
    /// Roster der laufenden Gruppenrufe
    pub gruppen_rufe: GruppenRufRegister,
    /// Startzeitpunkt des Servers (fuer Uptime-Berechnung)
    pub start_zeit: Instant,
}

impl<B, G> SignalingState<B, G>
where
    B: BenutzerVerzeichnis + 'static,
    G: GruppenVerzeichnis + 'static,
{
    /// Erstellt einen neuen SignalingState
    pub fn neu(config: SignalingConfig, benutzer: Arc<B>, gruppen: Arc<G>) -> Arc<Self> {
        let presence = PresenceRegistry::neu();
        let relay = MessageRelay::neu(presence.clone());
        Arc::new(Self {
            config: Arc::new(config),
            benutzer,
            gruppen,
            presence,
            relay,
            gruppen_rufe: GruppenRufRegister::neu(),
            start_zeit: Instant::now(),
        })
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_zeit.elapsed().as_secs()
    }
}
