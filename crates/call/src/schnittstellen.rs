//! Schnittstellen zur Aussenwelt – Signalkanal und Peer-Verbindungen
//!
//! Die Koordinatoren sind generisch ueber diese Traits, damit Tests
//! Mock-Implementierungen injizieren koennen und die echte
//! WebRTC/Transport-Anbindung ausserhalb dieses Crates lebt. Kein
//! Send-Bound: alles laeuft auf dem single-threaded Executor.

use parley_protocol::signal::{IceKandidat, Sdp, SignalNachricht};

/// Ausgang zum Signal-Server (fire-and-forget)
pub trait SignalAusgang {
    /// Sendet eine Nachricht; Zustellung ist best-effort
    fn senden(&self, nachricht: SignalNachricht);
}

/// Eine Peer-Verbindung zu genau einem Gegenueber
///
/// Die Implementierung kapselt die Session-Beschreibung und den
/// Kandidaten-Austausch des Transports. Kandidaten duerfen erst nach
/// einer gesetzten Remote-Beschreibung angewendet werden; die Pruefung
/// uebernimmt der `KandidatenPuffer`, nicht die Implementierung.
#[allow(async_fn_in_trait)]
pub trait PeerVerbindung {
    /// Erstellt ein lokales Offer
    async fn offer_erstellen(&mut self) -> anyhow::Result<Sdp>;

    /// Wendet ein entferntes Offer an und erstellt die Antwort darauf
    async fn antwort_erstellen(&mut self, offer: &Sdp) -> anyhow::Result<Sdp>;

    /// Setzt die entfernte Beschreibung (Offer oder Answer)
    async fn remote_beschreibung_setzen(&mut self, sdp: &Sdp) -> anyhow::Result<()>;

    /// Ob bereits eine entfernte Beschreibung gesetzt wurde
    fn hat_remote_beschreibung(&self) -> bool;

    /// Wendet einen entfernten Kandidaten an
    async fn kandidat_hinzufuegen(&mut self, kandidat: &IceKandidat) -> anyhow::Result<()>;

    /// Schliesst die Verbindung und gibt Transport-Ressourcen frei
    fn schliessen(&mut self);
}

/// Fabrik fuer Peer-Verbindungen
pub trait PeerFabrik {
    /// Typ der erzeugten Verbindungen
    type Verbindung: PeerVerbindung;

    /// Erstellt eine neue, unverbundene Peer-Verbindung
    fn erstellen(&self) -> Self::Verbindung;
}
