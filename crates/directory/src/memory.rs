//! In-Memory-Verzeichnis
//!
//! DashMap-basierte Implementierung beider Verzeichnis-Traits. Dient dem
//! Server-Betrieb mit Seed-Daten aus der Konfiguration sowie saemtlichen
//! Tests.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parley_core::types::{BenutzerProfil, GroupId, UserId};
use std::sync::Arc;

use crate::verzeichnis::{BenutzerVerzeichnis, GruppenVerzeichnis};

/// In-Memory-Implementierung von Benutzer- und Gruppenverzeichnis
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone, Default)]
pub struct MemoryVerzeichnis {
    inner: Arc<MemoryVerzeichnisInner>,
}

#[derive(Default)]
struct MemoryVerzeichnisInner {
    /// Profile, indiziert nach UserId
    profile: DashMap<UserId, BenutzerProfil>,
    /// Last-Seen-Zeitstempel, indiziert nach UserId
    letzte_aktivitaet: DashMap<UserId, DateTime<Utc>>,
    /// Gruppen-Mitglieder, indiziert nach GroupId
    gruppen: DashMap<GroupId, Vec<UserId>>,
}

impl MemoryVerzeichnis {
    /// Erstellt ein leeres Verzeichnis
    pub fn neu() -> Self {
        Self::default()
    }

    /// Legt ein Benutzerprofil an oder ersetzt es
    pub fn benutzer_anlegen(&self, profil: BenutzerProfil) {
        self.inner.profile.insert(profil.id, profil);
    }

    /// Legt eine Gruppe mit ihren Mitgliedern an oder ersetzt sie
    pub fn gruppe_anlegen(&self, gruppe: GroupId, mitglieder: Vec<UserId>) {
        self.inner.gruppen.insert(gruppe, mitglieder);
    }

    /// Gibt die Anzahl der bekannten Benutzer zurueck
    pub fn benutzer_anzahl(&self) -> usize {
        self.inner.profile.len()
    }
}

impl BenutzerVerzeichnis for MemoryVerzeichnis {
    async fn profil(&self, id: UserId) -> Option<BenutzerProfil> {
        self.inner.profile.get(&id).map(|e| e.clone())
    }

    async fn letzte_aktivitaet_setzen(&self, id: UserId, zeitpunkt: DateTime<Utc>) {
        self.inner.letzte_aktivitaet.insert(id, zeitpunkt);
    }

    async fn letzte_aktivitaet(&self, id: UserId) -> Option<DateTime<Utc>> {
        self.inner.letzte_aktivitaet.get(&id).map(|e| *e)
    }
}

impl GruppenVerzeichnis for MemoryVerzeichnis {
    async fn ist_mitglied(&self, gruppe: GroupId, benutzer: UserId) -> bool {
        self.inner
            .gruppen
            .get(&gruppe)
            .map(|m| m.contains(&benutzer))
            .unwrap_or(false)
    }

    async fn mitglieder(&self, gruppe: GroupId) -> Vec<UserId> {
        self.inner
            .gruppen
            .get(&gruppe)
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
