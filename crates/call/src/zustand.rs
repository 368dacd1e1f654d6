//! Rufzustand – explizite State Machine pro Einzelruf
//!
//! Ein tagged Enum statt loser Flags: Kombinationen wie "anrufend und
//! gleichzeitig aktiv" sind nicht darstellbar. Terminale Ausgaenge
//! (abgelehnt, beendet, Timeout) fuehren zurueck nach `Bereit`.
//!
//! ```text
//! Bereit -> Anrufend --------> Verbindet -> Aktiv
//!    |                             ^          |
//!    +--> Klingelt ----------------+          |
//!    ^                                        |
//!    +---- (beendet/abgelehnt/Timeout) -------+
//! ```

use parley_core::types::{BenutzerProfil, CallArt, UserId};
use parley_protocol::signal::Sdp;
use tokio::time::Instant;

/// Zustand eines Einzelrufs
#[derive(Debug)]
pub enum RufZustand {
    /// Kein Ruf aktiv
    Bereit,
    /// Ausgehender Ruf, wartet auf Antwort bis `frist`
    Anrufend {
        ziel: UserId,
        art: CallArt,
        frist: Instant,
    },
    /// Eingehender Ruf klingelt, Offer liegt bereit
    Klingelt {
        von: BenutzerProfil,
        offer: Sdp,
        art: CallArt,
    },
    /// Beschreibungen ausgetauscht, Transport verbindet
    Verbindet { gegenueber: UserId, art: CallArt },
    /// Ruf laeuft
    Aktiv { gegenueber: UserId, art: CallArt },
}

impl RufZustand {
    /// Kurzname des Zustands (fuer Logs und Fehlermeldungen)
    pub fn name(&self) -> &'static str {
        match self {
            RufZustand::Bereit => "bereit",
            RufZustand::Anrufend { .. } => "anrufend",
            RufZustand::Klingelt { .. } => "klingelt",
            RufZustand::Verbindet { .. } => "verbindet",
            RufZustand::Aktiv { .. } => "aktiv",
        }
    }

    /// Ob gerade kein Ruf laeuft
    pub fn ist_bereit(&self) -> bool {
        matches!(self, RufZustand::Bereit)
    }

    /// Die Gegenseite des laufenden Rufs, falls bekannt
    pub fn gegenueber(&self) -> Option<UserId> {
        match self {
            RufZustand::Bereit => None,
            RufZustand::Anrufend { ziel, .. } => Some(*ziel),
            RufZustand::Klingelt { von, .. } => Some(von.id),
            RufZustand::Verbindet { gegenueber, .. } | RufZustand::Aktiv { gegenueber, .. } => {
                Some(*gegenueber)
            }
        }
    }

    /// Die Antwortfrist, falls ein ausgehender Ruf wartet
    pub fn frist(&self) -> Option<Instant> {
        match self {
            RufZustand::Anrufend { frist, .. } => Some(*frist),
            _ => None,
        }
    }
}
