//! Signal-Protokoll
//!
//! Definiert alle Signalisierungs-Ereignisse die ueber das Relay zwischen
//! Client und Server ausgetauscht werden.
//!
//! ## Design
//! - Fire-and-Forget: keine Request-IDs, keine Acks. Die Koordinatoren
//!   tolerieren Nachrichtenverlust via Timeouts und idempotentem Teardown.
//! - JSON-Serialisierung via serde, tagged Enum (`event` + `data`)
//! - Offer/Answer/Candidate sind opake Payloads und werden nie inspiziert

use chrono::{DateTime, Utc};
use parley_core::types::{BenutzerProfil, CallArt, GroupId, UserId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Opake Payloads
// ---------------------------------------------------------------------------

/// Opake Session-Beschreibung (Offer oder Answer)
///
/// Inhalt wird unveraendert zwischen den Peers durchgereicht; der Server
/// und die Koordinatoren interpretieren ihn nicht.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sdp(pub serde_json::Value);

/// Opaker Netzwerk-Kandidat
///
/// Bedeutungslos sobald die zugehoerige Session zerstoert ist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceKandidat(pub serde_json::Value);

// ---------------------------------------------------------------------------
// SignalNachricht
// ---------------------------------------------------------------------------

/// Alle Signalisierungs-Ereignisse
///
/// Die Event-Namen auf dem Draht entsprechen dem historischen Protokoll
/// (kebab-case, zwei camelCase-Altlasten: `getOnlineUsers` und
/// `userLastSeenUpdate`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum SignalNachricht {
    // -----------------------------------------------------------------------
    // Verbindungsaufbau
    // -----------------------------------------------------------------------
    /// Handshake: erster Frame jeder Verbindung, traegt die eigene UserId
    #[serde(rename = "connect")]
    Anmelden {
        #[serde(rename = "userId")]
        user_id: UserId,
    },

    // -----------------------------------------------------------------------
    // Einzelruf (Client -> Server -> Gegenseite)
    // -----------------------------------------------------------------------
    /// Anruf initiieren (Client -> Server)
    #[serde(rename_all = "camelCase")]
    CallUser {
        to: UserId,
        offer: Sdp,
        #[serde(rename = "type")]
        art: CallArt,
    },

    /// Eingehender Anruf (Server -> Ziel), Anruferprofil vom Server ergaenzt
    #[serde(rename_all = "camelCase")]
    IncomingCall {
        from: BenutzerProfil,
        offer: Sdp,
        #[serde(rename = "type")]
        art: CallArt,
    },

    /// Anruf annehmen (Client -> Server)
    #[serde(rename_all = "camelCase")]
    AnswerCall { to: UserId, answer: Sdp },

    /// Annahme an den Anrufer (Server -> Anrufer)
    #[serde(rename_all = "camelCase")]
    CallAccepted { answer: Sdp },

    /// Anruf ablehnen (Client -> Server)
    #[serde(rename_all = "camelCase")]
    RejectCall { to: UserId },

    /// Ablehnung an den Anrufer (Server -> Anrufer)
    CallRejected {},

    /// Netzwerk-Kandidat (beide Richtungen; `to` nur Client -> Server)
    #[serde(rename_all = "camelCase")]
    IceCandidate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<UserId>,
        candidate: IceKandidat,
    },

    /// Anruf beenden (Client -> Server)
    #[serde(rename_all = "camelCase")]
    EndCall { to: UserId },

    /// Beendigung an die Gegenseite (Server -> Gegenseite)
    CallEnded {},

    // -----------------------------------------------------------------------
    // Gruppenruf
    // -----------------------------------------------------------------------
    /// Gruppenruf starten (Client -> Server)
    #[serde(rename_all = "camelCase")]
    StartGroupCall {
        group_id: GroupId,
        #[serde(rename = "type")]
        art: CallArt,
    },

    /// Gruppenruf gestartet (Server -> Gruppenmitglieder)
    #[serde(rename_all = "camelCase")]
    GroupCallStarted {
        group_id: GroupId,
        #[serde(rename = "type")]
        art: CallArt,
        participants: Vec<UserId>,
        started_by: BenutzerProfil,
    },

    /// Gruppenruf beitreten (Client -> Server)
    #[serde(rename_all = "camelCase")]
    JoinGroupCall { group_id: GroupId },

    /// Teilnehmer beigetreten (Server -> Gruppenmitglieder)
    #[serde(rename_all = "camelCase")]
    GroupParticipantJoined {
        group_id: GroupId,
        participant: UserId,
        participants: Vec<UserId>,
    },

    /// Gruppenruf verlassen (Client -> Server)
    #[serde(rename_all = "camelCase")]
    LeaveGroupCall { group_id: GroupId },

    /// Teilnehmer gegangen (Server -> Gruppenmitglieder)
    #[serde(rename_all = "camelCase")]
    GroupParticipantLeft {
        group_id: GroupId,
        participant: UserId,
        participants: Vec<UserId>,
    },

    /// Gruppenruf fuer alle beenden (Client -> Server)
    #[serde(rename_all = "camelCase")]
    EndGroupCall { group_id: GroupId },

    /// Gruppenruf beendet (Server -> Gruppenmitglieder)
    #[serde(rename_all = "camelCase")]
    GroupCallEnded { group_id: GroupId },

    /// Mesh-Offer an einen Teilnehmer (`from` wird vom Server ergaenzt)
    #[serde(rename_all = "camelCase")]
    GroupOffer {
        group_id: GroupId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_user_id: Option<UserId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<UserId>,
        offer: Sdp,
    },

    /// Mesh-Answer an einen Teilnehmer (`from` wird vom Server ergaenzt)
    #[serde(rename_all = "camelCase")]
    GroupAnswer {
        group_id: GroupId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_user_id: Option<UserId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<UserId>,
        answer: Sdp,
    },

    /// Mesh-Kandidat an einen Teilnehmer (`from` wird vom Server ergaenzt)
    #[serde(rename_all = "camelCase")]
    GroupIceCandidate {
        group_id: GroupId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_user_id: Option<UserId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<UserId>,
        candidate: IceKandidat,
    },

    // -----------------------------------------------------------------------
    // Presence (Server -> alle)
    // -----------------------------------------------------------------------
    /// Aktuelle Online-Liste, bei jeder Presence-Aenderung an alle gesendet
    #[serde(rename = "getOnlineUsers")]
    OnlineBenutzer(Vec<UserId>),

    /// Benutzer ist komplett offline gegangen, mit Last-Seen-Zeitstempel
    #[serde(rename = "userLastSeenUpdate", rename_all = "camelCase")]
    LastSeenUpdate {
        user_id: UserId,
        last_seen: DateTime<Utc>,
    },
}

impl SignalNachricht {
    /// Kurzer Event-Name fuer Log-Ausgaben
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Anmelden { .. } => "connect",
            Self::CallUser { .. } => "call-user",
            Self::IncomingCall { .. } => "incoming-call",
            Self::AnswerCall { .. } => "answer-call",
            Self::CallAccepted { .. } => "call-accepted",
            Self::RejectCall { .. } => "reject-call",
            Self::CallRejected {} => "call-rejected",
            Self::IceCandidate { .. } => "ice-candidate",
            Self::EndCall { .. } => "end-call",
            Self::CallEnded {} => "call-ended",
            Self::StartGroupCall { .. } => "start-group-call",
            Self::GroupCallStarted { .. } => "group-call-started",
            Self::JoinGroupCall { .. } => "join-group-call",
            Self::GroupParticipantJoined { .. } => "group-participant-joined",
            Self::LeaveGroupCall { .. } => "leave-group-call",
            Self::GroupParticipantLeft { .. } => "group-participant-left",
            Self::EndGroupCall { .. } => "end-group-call",
            Self::GroupCallEnded { .. } => "group-call-ended",
            Self::GroupOffer { .. } => "group-offer",
            Self::GroupAnswer { .. } => "group-answer",
            Self::GroupIceCandidate { .. } => "group-ice-candidate",
            Self::OnlineBenutzer(_) => "getOnlineUsers",
            Self::LastSeenUpdate { .. } => "userLastSeenUpdate",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_sdp() -> Sdp {
        Sdp(serde_json::json!({ "type": "offer", "sdp": "v=0..." }))
    }

    #[test]
    fn call_user_wire_format() {
        let nachricht = SignalNachricht::CallUser {
            to: UserId::new(),
            offer: test_sdp(),
            art: CallArt::Video,
        };
        let json = serde_json::to_value(&nachricht).expect("serialisieren");
        assert_eq!(json["event"], "call-user");
        assert_eq!(json["data"]["type"], "video");
        assert!(json["data"]["offer"].is_object());
    }

    #[test]
    fn online_benutzer_ist_array() {
        let nachricht = SignalNachricht::OnlineBenutzer(vec![UserId::new(), UserId::new()]);
        let json = serde_json::to_value(&nachricht).expect("serialisieren");
        assert_eq!(json["event"], "getOnlineUsers");
        assert!(json["data"].is_array());
        assert_eq!(json["data"].as_array().map(|a| a.len()), Some(2));
    }

    #[test]
    fn ice_candidate_ohne_ziel_laesst_to_weg() {
        let nachricht = SignalNachricht::IceCandidate {
            to: None,
            candidate: IceKandidat(serde_json::json!({ "candidate": "..." })),
        };
        let json = serde_json::to_value(&nachricht).expect("serialisieren");
        assert!(json["data"].get("to").is_none());
    }

    #[test]
    fn roundtrip_group_offer_mit_from() {
        let von = UserId::new();
        let nachricht = SignalNachricht::GroupOffer {
            group_id: GroupId::new(),
            target_user_id: None,
            from: Some(von),
            offer: test_sdp(),
        };
        let json = serde_json::to_string(&nachricht).expect("serialisieren");
        let zurueck: SignalNachricht = serde_json::from_str(&json).expect("deserialisieren");
        assert_eq!(nachricht, zurueck);
    }

    #[test]
    fn incoming_call_profil_feldnamen() {
        let nachricht = SignalNachricht::IncomingCall {
            from: BenutzerProfil {
                id: UserId::new(),
                anzeige_name: "Ada".into(),
                avatar: None,
            },
            offer: test_sdp(),
            art: CallArt::Audio,
        };
        let json = serde_json::to_value(&nachricht).expect("serialisieren");
        assert_eq!(json["data"]["from"]["displayName"], "Ada");
    }
}
