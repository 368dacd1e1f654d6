//! Message-Relay – Zustellung von Signal-Nachrichten an Verbindungen
//!
//! Das Relay verwaltet die Send-Queues aller verbundenen Clients und
//! stellt Nachrichten an eine Verbindung, an alle Verbindungen eines
//! Benutzers (Fan-out ueber alle Geraete) oder an alle Clients zu.
//!
//! ## Zustellgarantien
//! Best-Effort und ungeordnet ueber verschiedene Empfaenger hinweg;
//! pro Verbindung bleibt die Sendereihenfolge erhalten (eine mpsc-Queue
//! pro Verbindung). Ist eine Verbindung beim Senden bereits weg, wird
//! die Nachricht stillschweigend verworfen – die Signalisierung heilt
//! sich ueber Timeouts und ICE-Restarts selbst.

use dashmap::DashMap;
use parley_core::types::{ConnectionId, UserId};
use parley_protocol::signal::SignalNachricht;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::presence::PresenceRegistry;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Groesse der Send-Queue pro Verbindung
const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// VerbindungsSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer verbundenen Client-Verbindung
#[derive(Clone, Debug)]
pub struct VerbindungsSender {
    pub verbindung: ConnectionId,
    pub tx: mpsc::Sender<SignalNachricht>,
}

impl VerbindungsSender {
    /// Sendet eine Nachricht nicht-blockierend an die Verbindung
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: SignalNachricht) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(n)) => {
                tracing::warn!(
                    verbindung = %self.verbindung,
                    event = n.event_name(),
                    "Send-Queue voll – Nachricht verworfen"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(verbindung = %self.verbindung, "Send-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MessageRelay
// ---------------------------------------------------------------------------

/// Zentrales Relay fuer alle verbundenen Clients
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
/// Die Aufloesung UserId -> Verbindungen laeuft ueber die
/// `PresenceRegistry`.
#[derive(Clone)]
pub struct MessageRelay {
    inner: Arc<MessageRelayInner>,
}

struct MessageRelayInner {
    /// Send-Queues, indiziert nach ConnectionId
    verbindungen: DashMap<ConnectionId, VerbindungsSender>,
    /// Presence-Registry fuer die UserId-Aufloesung
    presence: PresenceRegistry,
}

impl MessageRelay {
    /// Erstellt ein neues Relay, gebunden an eine Presence-Registry
    pub fn neu(presence: PresenceRegistry) -> Self {
        Self {
            inner: Arc::new(MessageRelayInner {
                verbindungen: DashMap::new(),
                presence,
            }),
        }
    }

    /// Registriert eine Verbindung und gibt ihre Empfangs-Queue zurueck
    ///
    /// Die `ClientConnection` liest aus dieser Queue und schreibt via TCP.
    pub fn verbindung_registrieren(
        &self,
        verbindung: ConnectionId,
    ) -> mpsc::Receiver<SignalNachricht> {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        self.inner
            .verbindungen
            .insert(verbindung, VerbindungsSender { verbindung, tx });
        tracing::debug!(verbindung = %verbindung, "Verbindung im Relay registriert");
        rx
    }

    /// Entfernt eine Verbindung aus dem Relay
    pub fn verbindung_entfernen(&self, verbindung: &ConnectionId) {
        self.inner.verbindungen.remove(verbindung);
        tracing::debug!(verbindung = %verbindung, "Verbindung aus Relay entfernt");
    }

    /// Sendet eine Nachricht an genau eine Verbindung
    ///
    /// Gibt `true` zurueck wenn die Nachricht eingereiht wurde.
    pub fn an_verbindung_senden(
        &self,
        verbindung: &ConnectionId,
        nachricht: SignalNachricht,
    ) -> bool {
        match self.inner.verbindungen.get(verbindung) {
            Some(sender) => sender.senden(nachricht),
            None => {
                tracing::debug!(verbindung = %verbindung, "Senden an unbekannte Verbindung");
                false
            }
        }
    }

    /// Sendet eine Nachricht an *jede* Verbindung eines Benutzers
    ///
    /// Fan-out, keine Einzelzustellung: ein Benutzer mit mehreren offenen
    /// Geraeten bekommt das Event auf allen. Gibt die Anzahl der
    /// erfolgreichen Sendungen zurueck; 0 bedeutet nicht erreichbar.
    pub fn an_benutzer_senden(&self, user_id: &UserId, nachricht: SignalNachricht) -> usize {
        let verbindungen = self.inner.presence.aufloesen(user_id);
        if verbindungen.is_empty() {
            tracing::debug!(user_id = %user_id, event = nachricht.event_name(), "Benutzer nicht erreichbar");
            return 0;
        }

        let mut gesendet = 0;
        for verbindung in &verbindungen {
            if let Some(sender) = self.inner.verbindungen.get(verbindung) {
                if sender.senden(nachricht.clone()) {
                    gesendet += 1;
                }
            }
        }
        gesendet
    }

    /// Sendet eine Nachricht an alle verbundenen Clients
    ///
    /// Gibt die Anzahl der erfolgreichen Sendungen zurueck.
    pub fn an_alle_senden(&self, nachricht: SignalNachricht) -> usize {
        let mut gesendet = 0;
        self.inner.verbindungen.iter().for_each(|eintrag| {
            if eintrag.value().senden(nachricht.clone()) {
                gesendet += 1;
            }
        });
        gesendet
    }

    /// Gibt die Anzahl der registrierten Verbindungen zurueck
    pub fn verbindungs_anzahl(&self) -> usize {
        self.inner.verbindungen.len()
    }

    /// Prueft ob eine Verbindung registriert ist
    pub fn ist_registriert(&self, verbindung: &ConnectionId) -> bool {
        self.inner.verbindungen.contains_key(verbindung)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
