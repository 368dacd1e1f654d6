//! Fehlertypen der Ruf-Koordination
//!
//! Alle Fehler hier werden lokal aufgeloest (Meldung an die Oberflaeche,
//! ggf. Wiederholung); nichts davon ist fatal fuer den Prozess. Veraltete
//! Signale (Race zwischen lokalem Teardown und in-flight Nachrichten)
//! sind kein Fehler, sie werden in den Koordinatoren geloggt und verworfen.

use thiserror::Error;

use crate::medien::MedienFehler;

/// Fehler der Ruf-Koordination
#[derive(Debug, Error)]
pub enum RufFehler {
    /// Anrufziel ist die eigene User-ID
    #[error("Anruf an die eigene User-ID")]
    SelbstAnruf,

    /// Lokale Medienbeschaffung fehlgeschlagen
    #[error("Medienbeschaffung fehlgeschlagen: {0}")]
    Medien(#[from] MedienFehler),

    /// Gruppenoperation ohne Mitgliedschaft
    #[error("Kein Mitglied der Gruppe")]
    KeinMitglied,

    /// Operation im aktuellen Rufzustand nicht erlaubt
    #[error("Im Zustand '{0}' nicht erlaubt")]
    UngueltigerZustand(&'static str),

    /// Keine Antwort innerhalb der Frist
    #[error("Zeitueberschreitung beim Rufaufbau")]
    Zeitueberschreitung,

    /// Fehler aus der Peer-Verbindung
    #[error("Peer-Verbindung: {0}")]
    Peer(#[from] anyhow::Error),
}

/// Result-Alias fuer die Ruf-Koordination
pub type RufResult<T> = Result<T, RufFehler>;
