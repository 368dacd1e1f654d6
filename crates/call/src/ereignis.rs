//! Ruf-Ereignisse – Benachrichtigungen an die Oberflaeche
//!
//! Die Koordinatoren melden Zustandswechsel als Ereignisse ueber einen
//! mpsc-Kanal; die Oberflaeche konsumiert sie, ohne die Koordinatoren zu
//! kennen. Unbounded, weil Ereignisse nie blockieren duerfen und ihre
//! Rate durch Benutzeraktionen begrenzt ist.

use parley_core::types::{BenutzerProfil, CallArt, GroupId, UserId};
use tokio::sync::mpsc;

use crate::medien::MedienFehler;

/// Ereignisse der Ruf-Koordination fuer die Oberflaeche
#[derive(Debug, Clone, PartialEq)]
pub enum RufEreignis {
    /// Eingehender Einzelruf klingelt
    Eingehend { von: BenutzerProfil, art: CallArt },
    /// Gegenseite hat den Ruf angenommen
    Angenommen { gegenueber: UserId },
    /// Gegenseite hat den Ruf abgelehnt
    Abgelehnt,
    /// Ruf wurde beendet (von der Gegenseite oder dem Server)
    Beendet,
    /// Keine Antwort innerhalb der Frist; Ruf wurde abgebrochen
    Zeitueberschreitung { ziel: UserId },
    /// Video war nicht verfuegbar, Ruf laeuft audio-only weiter
    Herabgestuft { von: CallArt, auf: CallArt },
    /// Medienbeschaffung fehlgeschlagen, Ruf kam nicht zustande
    MedienFehlgeschlagen {
        fehler: MedienFehler,
        wiederholbar: bool,
    },
    /// Ein Gruppenruf wurde gestartet, Beitritt moeglich
    GruppenrufEingehend {
        gruppe: GroupId,
        art: CallArt,
        gestartet_von: BenutzerProfil,
    },
    /// Der Gruppenruf wurde fuer alle beendet
    GruppenrufBeendet { gruppe: GroupId },
}

/// Sender-Haelfte des Ereigniskanals
pub type EreignisSender = mpsc::UnboundedSender<RufEreignis>;

/// Empfaenger-Haelfte des Ereigniskanals
pub type EreignisEmpfaenger = mpsc::UnboundedReceiver<RufEreignis>;

/// Erstellt einen neuen Ereigniskanal
pub fn ereignis_kanal() -> (EreignisSender, EreignisEmpfaenger) {
    mpsc::unbounded_channel()
}
