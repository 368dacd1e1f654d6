//! parley-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Parley-Crates gemeinsam genutzt werden: ID-Newtypes, das
//! Benutzerprofil und den zentralen Fehler-Enum.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{ParleyError, Result};
pub use types::{BenutzerProfil, CallArt, ConnectionId, GroupId, UserId};
