//! parley-protocol – Signal-Nachrichten und Wire-Format
//!
//! Definiert alle Signalisierungs-Ereignisse die zwischen Client und
//! Server ausgetauscht werden, sowie das Frame-basierte Wire-Format
//! (Laengen-Prefix + JSON) fuer TCP-Verbindungen.

pub mod signal;
pub mod wire;

pub use signal::{IceKandidat, Sdp, SignalNachricht};
pub use wire::SignalCodec;
