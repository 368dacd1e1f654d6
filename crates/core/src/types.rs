//! Gemeinsame Identifikationstypen fuer Parley
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Benutzer-ID
///
/// `Ord` ist byte-weise ueber die innere UUID definiert. Diese Ordnung ist
/// die Tie-Break-Regel fuer den Mesh-Aufbau in Gruppenrufen: die kleinere
/// UserId erstellt immer das Offer zur groesseren. Die Ordnung muss auf
/// allen Teilnehmern identisch sein, daher keine String-Repraesentation
/// sondern der rohe Byte-Vergleich.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Erstellt eine neue zufaellige UserId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

/// Eindeutige Gruppen-ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub Uuid);

impl GroupId {
    /// Erstellt eine neue zufaellige GroupId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "group:{}", self.0)
    }
}

/// Eindeutige Verbindungs-ID
///
/// Ein logischer Benutzer kann mehrere Verbindungen gleichzeitig halten
/// (mehrere Tabs/Geraete). Die ConnectionId identifiziert genau eine
/// davon; sie wird beim Verbindungsaufbau erzeugt und nie persistiert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Erstellt eine neue zufaellige ConnectionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

/// Art eines Anrufs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallArt {
    /// Nur Audio
    Audio,
    /// Audio und Video
    Video,
}

impl std::fmt::Display for CallArt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallArt::Audio => write!(f, "audio"),
            CallArt::Video => write!(f, "video"),
        }
    }
}

/// Oeffentliches Benutzerprofil
///
/// Wird bei eingehenden Anrufen mitgesendet, damit der Angerufene den
/// Anrufer anzeigen kann, ohne selbst nachschlagen zu muessen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenutzerProfil {
    /// Benutzer-ID
    pub id: UserId,
    /// Anzeigename
    #[serde(rename = "displayName")]
    pub anzeige_name: String,
    /// Avatar-URL (optional)
    pub avatar: Option<String>,
}
