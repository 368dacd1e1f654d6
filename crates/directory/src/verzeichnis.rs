//! Verzeichnis-Trait-Definitionen
//!
//! Die Traits verwenden `async fn in trait` ohne Send-Garantie wie die
//! uebrigen Parley-Schnittstellen; alle Verbindungs-Tasks laufen auf
//! einer `LocalSet`.

use chrono::{DateTime, Utc};
use parley_core::types::{BenutzerProfil, GroupId, UserId};

/// Lookup fuer Benutzerprofile und Last-Seen-Zeitstempel
#[allow(async_fn_in_trait)]
pub trait BenutzerVerzeichnis: Send + Sync {
    /// Laedt das oeffentliche Profil eines Benutzers
    async fn profil(&self, id: UserId) -> Option<BenutzerProfil>;

    /// Persistiert den Last-Seen-Zeitstempel eines Benutzers
    async fn letzte_aktivitaet_setzen(&self, id: UserId, zeitpunkt: DateTime<Utc>);

    /// Gibt den zuletzt persistierten Last-Seen-Zeitstempel zurueck
    async fn letzte_aktivitaet(&self, id: UserId) -> Option<DateTime<Utc>>;
}

/// Lookup fuer Gruppen-Mitgliedschaften
#[allow(async_fn_in_trait)]
pub trait GruppenVerzeichnis: Send + Sync {
    /// Prueft ob ein Benutzer Mitglied einer Gruppe ist
    async fn ist_mitglied(&self, gruppe: GroupId, benutzer: UserId) -> bool;

    /// Gibt alle Mitglieder einer Gruppe zurueck (leer wenn unbekannt)
    async fn mitglieder(&self, gruppe: GroupId) -> Vec<UserId>;
}
