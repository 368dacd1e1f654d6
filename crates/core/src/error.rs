//! Fehlertypen fuer Parley
//!
//! Zentraler Fehler-Enum der die crate-uebergreifenden Fehlerzustaende
//! abdeckt. Untermodule definieren eigene Fehler und konvertieren via
//! `#[from]` wo noetig.

use thiserror::Error;

/// Globaler Result-Alias fuer Parley
pub type Result<T> = std::result::Result<T, ParleyError>;

/// Crate-uebergreifende Fehler im Parley-System
#[derive(Debug, Error)]
pub enum ParleyError {
    // --- Verbindung & Netzwerk ---
    #[error("Verbindung fehlgeschlagen: {0}")]
    Verbindung(String),

    #[error("Zeitlimit ueberschritten: {0}")]
    Zeitlimit(String),

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl ParleyError {
    /// Gibt true zurueck wenn der Fehler wiederholbar sein koennte
    pub fn ist_wiederholbar(&self) -> bool {
        matches!(self, Self::Zeitlimit(_) | Self::Verbindung(_))
    }
}
