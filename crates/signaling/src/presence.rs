//! Presence-Registry – Wer ist online, mit welchen Verbindungen
//!
//! Bildet eine logische UserId auf ihre aktiven Verbindungen ab. Ein
//! Benutzer kann mehrere Verbindungen gleichzeitig halten (mehrere
//! Tabs/Geraete); er gilt als online solange mindestens eine davon lebt.
//!
//! ## Invariante
//! Eine UserId steht genau dann in der Registry, wenn ihre
//! Verbindungsmenge nicht leer ist. Mutationen laufen ausschliesslich
//! ueber `registrieren`/`abmelden`; die Registry ist die einzige
//! Wahrheitsquelle fuer "ist dieser Benutzer erreichbar".

use dashmap::DashMap;
use parley_core::types::{ConnectionId, UserId};
use std::sync::Arc;

/// Verwaltet den Online-Status aller verbundenen Benutzer
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone, Default)]
pub struct PresenceRegistry {
    inner: Arc<PresenceRegistryInner>,
}

#[derive(Default)]
struct PresenceRegistryInner {
    /// UserId -> aktive Verbindungen (nie leer)
    verbindungen: DashMap<UserId, Vec<ConnectionId>>,
    /// Rueckwaerts-Index: welche UserId besitzt eine Verbindung
    besitzer: DashMap<ConnectionId, UserId>,
}

impl PresenceRegistry {
    /// Erstellt eine neue, leere Registry
    pub fn neu() -> Self {
        Self::default()
    }

    /// Registriert eine Verbindung unter einer UserId
    ///
    /// Idempotent pro Verbindung: eine bereits registrierte ConnectionId
    /// wird nicht doppelt aufgenommen.
    pub fn registrieren(&self, user_id: UserId, verbindung: ConnectionId) {
        self.inner.besitzer.insert(verbindung, user_id);

        let mut eintraege = self.inner.verbindungen.entry(user_id).or_default();
        if !eintraege.contains(&verbindung) {
            eintraege.push(verbindung);
        }
        let anzahl = eintraege.len();
        drop(eintraege);

        tracing::debug!(user_id = %user_id, verbindung = %verbindung, anzahl, "Verbindung registriert");
    }

    /// Entfernt eine Verbindung, egal welchem Benutzer sie gehoert
    ///
    /// Gibt `(UserId, ist_jetzt_offline)` zurueck: `ist_jetzt_offline` ist
    /// true wenn das die letzte Verbindung des Benutzers war (der Eintrag
    /// wird dann entfernt – die Nicht-Leer-Invariante).
    pub fn abmelden(&self, verbindung: ConnectionId) -> Option<(UserId, bool)> {
        let (_, user_id) = self.inner.besitzer.remove(&verbindung)?;

        let jetzt_offline = {
            let mut eintraege = self.inner.verbindungen.get_mut(&user_id)?;
            eintraege.retain(|v| *v != verbindung);
            eintraege.is_empty()
        };

        if jetzt_offline {
            self.inner.verbindungen.remove(&user_id);
            tracing::info!(user_id = %user_id, "Benutzer offline");
        } else {
            tracing::debug!(user_id = %user_id, verbindung = %verbindung, "Verbindung abgemeldet");
        }

        Some((user_id, jetzt_offline))
    }

    /// Gibt die aktuell erreichbaren Verbindungen eines Benutzers zurueck
    ///
    /// Leere Liste bedeutet: nicht erreichbar.
    pub fn aufloesen(&self, user_id: &UserId) -> Vec<ConnectionId> {
        self.inner
            .verbindungen
            .get(user_id)
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Gibt alle aktuell online befindlichen UserIds zurueck
    pub fn momentaufnahme(&self) -> Vec<UserId> {
        self.inner.verbindungen.iter().map(|e| *e.key()).collect()
    }

    /// Prueft ob ein Benutzer mindestens eine aktive Verbindung haelt
    pub fn ist_online(&self, user_id: &UserId) -> bool {
        self.inner.verbindungen.contains_key(user_id)
    }

    /// Gibt die Anzahl der online befindlichen Benutzer zurueck
    pub fn online_anzahl(&self) -> usize {
        self.inner.verbindungen.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
