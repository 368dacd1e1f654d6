//! parley-call – Client-seitige Ruf-Koordination
//!
//! Die Gegenstelle zu `parley-signaling`: Zustandsmaschinen fuer Einzel-
//! und Gruppenrufe, die Kandidaten-Reihenfolge-Disziplin und die
//! Medien-Fallback-Politik. Transport (WebRTC o.ae.), Geraetezugriff und
//! der Signalkanal zum Server haengen hinter Traits und werden injiziert.
//!
//! ## Architektur
//!
//! ```text
//! Oberflaeche --RufKommando--> RufTreiber
//!                                  |
//!                                  v
//!                        EinzelRufKoordinator ----+
//!                        GruppenRufKoordinator ---+--> SignalAusgang
//!                                  |                   MedienQuelle
//!                                  v                   PeerFabrik
//!                             RufEreignis --> Oberflaeche
//! ```
//!
//! Alles laeuft single-threaded und ereignisgetrieben; jedes Signal wird
//! vollstaendig verarbeitet, bevor das naechste ansteht. Races existieren
//! nur zwischen Prozessen (Kandidat-vor-Beschreibung, gleichzeitiger
//! Join) und werden ueber den Kandidaten-Puffer bzw. die ID-Ordnung
//! aufgeloest statt ueber globale Reihenfolge-Annahmen.

pub mod einzel;
pub mod ereignis;
pub mod error;
pub mod gruppe;
pub mod kandidaten;
pub mod medien;
pub mod schnittstellen;
pub mod treiber;
pub mod zustand;

#[cfg(test)]
pub(crate) mod testhilfe;

// Bequeme Re-Exporte
pub use einzel::{EinzelRufKoordinator, ANTWORT_FRIST};
pub use ereignis::{ereignis_kanal, EreignisEmpfaenger, EreignisSender, RufEreignis};
pub use error::{RufFehler, RufResult};
pub use gruppe::GruppenRufKoordinator;
pub use kandidaten::KandidatenPuffer;
pub use medien::{MedienFehler, MedienQuelle, MedienStrom};
pub use schnittstellen::{PeerFabrik, PeerVerbindung, SignalAusgang};
pub use treiber::{RufKommando, RufTreiber};
pub use zustand::RufZustand;
