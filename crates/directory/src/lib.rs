//! parley-directory – Verzeichnis-Schnittstellen
//!
//! Der Signaling-Kern konsumiert Benutzer- und Gruppendaten nur ueber
//! schmale Schnittstellen: Profil-Lookup, Gruppen-Mitgliedschaft und
//! Last-Seen-Persistenz. Die eigentliche Datenhaltung (HTTP-CRUD,
//! Datenbank) ist ein externer Kollaborateur und liegt ausserhalb
//! dieses Systems.
//!
//! Das Repository-Pattern entkoppelt die Signaling-Logik von der
//! konkreten Implementierung; fuer Server-Betrieb ohne Backend und fuer
//! Tests liegt eine In-Memory-Implementierung bei.

pub mod memory;
pub mod verzeichnis;

pub use memory::MemoryVerzeichnis;
pub use verzeichnis::{BenutzerVerzeichnis, GruppenVerzeichnis};
