//! parley-signaling – Server-seitiger Signaling-Service
//!
//! Dieser Crate implementiert die Server-Haelfte der Echtzeit-Signalisierung:
//! Presence-Verwaltung, das Nachrichten-Relay zwischen verbundenen Clients
//! und die Weiterleitung der Ruf-Signalisierung (Einzel- und Gruppenrufe).
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalServer)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |  Handshake: erster Frame muss `connect` mit der UserId sein
//!     |
//!     v
//! SignalDispatcher
//!     |
//!     +-- ruf_handler      (call-user, answer-call, reject-call,
//!     |                     ice-candidate, end-call)
//!     +-- gruppen_handler  (start/join/leave/end-group-call,
//!                           group-offer/-answer/-ice-candidate)
//!
//! PresenceRegistry   – welche UserId haelt welche Verbindungen
//! MessageRelay       – Events an eine, mehrere oder alle Verbindungen
//! GruppenRufRegister – Roster der laufenden Gruppenrufe
//! ```
//!
//! Der Server inspiziert Offer/Answer/Kandidaten nie; er reicht sie nur
//! durch. Zustellung ist Fire-and-Forget: verschwindet eine Verbindung vor
//! der Zustellung, wird die Nachricht stillschweigend verworfen.

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod gruppen_rufe;
pub mod handlers;
pub mod presence;
pub mod relay;
pub mod server_state;
pub mod tcp;

// Bequeme Re-Exporte
pub use connection::ClientConnection;
pub use dispatcher::SignalDispatcher;
pub use error::{SignalingError, SignalingResult};
pub use gruppen_rufe::GruppenRufRegister;
pub use presence::PresenceRegistry;
pub use relay::MessageRelay;
pub use server_state::{SignalingConfig, SignalingState};
pub use tcp::SignalServer;
