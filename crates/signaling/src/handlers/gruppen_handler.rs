//! Gruppen-Handler – Gruppenruf-Signalisierung
//!
//! Start/Join/Leave/End pflegen das server-seitige Roster und verteilen
//! die Ereignisse an die Gruppenmitglieder. Die gezielten Mesh-Nachrichten
//! (`group-offer`, `group-answer`, `group-ice-candidate`) werden mit
//! ergaenztem `from` an genau einen Zielteilnehmer weitergereicht.

use parley_core::types::{CallArt, GroupId, UserId};
use parley_directory::{BenutzerVerzeichnis, GruppenVerzeichnis};
use parley_protocol::signal::{IceKandidat, Sdp, SignalNachricht};
use std::sync::Arc;

use crate::server_state::SignalingState;

/// Sendet eine Nachricht an alle Mitglieder einer Gruppe
async fn an_gruppe_senden<B, G>(
    gruppe: GroupId,
    nachricht: SignalNachricht,
    state: &Arc<SignalingState<B, G>>,
) -> usize
where
    B: BenutzerVerzeichnis + 'static,
    G: GruppenVerzeichnis + 'static,
{
    let mut gesendet = 0;
    for mitglied in state.gruppen.mitglieder(gruppe).await {
        gesendet += state.relay.an_benutzer_senden(&mitglied, nachricht.clone());
    }
    gesendet
}

/// Verarbeitet `start-group-call`
///
/// Mitgliedschaft wird serverseitig geprueft; ein Nicht-Mitglied wird
/// verworfen (der Client prueft lokal dasselbe, der Server traut dem
/// Client nicht). Das `group-call-started`-Event geht an alle Mitglieder,
/// auch an den Starter – dessen Client gleicht sein Roster damit ab.
pub async fn handle_start_group_call<B, G>(
    von: UserId,
    gruppe: GroupId,
    art: CallArt,
    state: &Arc<SignalingState<B, G>>,
) where
    B: BenutzerVerzeichnis + 'static,
    G: GruppenVerzeichnis + 'static,
{
    if !state.gruppen.ist_mitglied(gruppe, von).await {
        tracing::warn!(von = %von, gruppe = %gruppe, "start-group-call von Nicht-Mitglied – verworfen");
        return;
    }

    let starter = match state.benutzer.profil(von).await {
        Some(profil) => profil,
        None => {
            tracing::warn!(von = %von, "start-group-call von unbekanntem Benutzer – verworfen");
            return;
        }
    };

    let ruf = state.gruppen_rufe.starten(gruppe, art, von);

    an_gruppe_senden(
        gruppe,
        SignalNachricht::GroupCallStarted {
            group_id: gruppe,
            art: ruf.art,
            participants: ruf.teilnehmer.clone(),
            started_by: starter,
        },
        state,
    )
    .await;

    tracing::info!(von = %von, gruppe = %gruppe, art = %art, "Gruppenruf gestartet");
}

/// Verarbeitet `join-group-call`
///
/// Ohne laufenden Ruf wird der Beitritt verworfen (Race zwischen Ende des
/// Rufs und Beitritt). Sonst geht `group-participant-joined` mit dem
/// aktualisierten Roster an alle Mitglieder.
pub async fn handle_join_group_call<B, G>(
    von: UserId,
    gruppe: GroupId,
    state: &Arc<SignalingState<B, G>>,
) where
    B: BenutzerVerzeichnis + 'static,
    G: GruppenVerzeichnis + 'static,
{
    if !state.gruppen.ist_mitglied(gruppe, von).await {
        tracing::warn!(von = %von, gruppe = %gruppe, "join-group-call von Nicht-Mitglied – verworfen");
        return;
    }

    let roster = match state.gruppen_rufe.beitreten(&gruppe, von) {
        Some(roster) => roster,
        None => {
            tracing::debug!(von = %von, gruppe = %gruppe, "join-group-call ohne laufenden Ruf – verworfen");
            return;
        }
    };

    an_gruppe_senden(
        gruppe,
        SignalNachricht::GroupParticipantJoined {
            group_id: gruppe,
            participant: von,
            participants: roster,
        },
        state,
    )
    .await;

    tracing::info!(von = %von, gruppe = %gruppe, "Gruppenruf beigetreten");
}

/// Verarbeitet `leave-group-call`
pub async fn handle_leave_group_call<B, G>(
    von: UserId,
    gruppe: GroupId,
    state: &Arc<SignalingState<B, G>>,
) where
    B: BenutzerVerzeichnis + 'static,
    G: GruppenVerzeichnis + 'static,
{
    let roster = match state.gruppen_rufe.verlassen(&gruppe, &von) {
        Some(roster) => roster,
        None => {
            tracing::debug!(von = %von, gruppe = %gruppe, "leave-group-call ohne Teilnahme – verworfen");
            return;
        }
    };

    an_gruppe_senden(
        gruppe,
        SignalNachricht::GroupParticipantLeft {
            group_id: gruppe,
            participant: von,
            participants: roster,
        },
        state,
    )
    .await;

    tracing::info!(von = %von, gruppe = %gruppe, "Gruppenruf verlassen");
}

/// Verarbeitet `end-group-call`: Ruf fuer alle beenden
pub async fn handle_end_group_call<B, G>(
    von: UserId,
    gruppe: GroupId,
    state: &Arc<SignalingState<B, G>>,
) where
    B: BenutzerVerzeichnis + 'static,
    G: GruppenVerzeichnis + 'static,
{
    if state.gruppen_rufe.beenden(&gruppe).is_none() {
        tracing::debug!(von = %von, gruppe = %gruppe, "end-group-call ohne laufenden Ruf – verworfen");
        return;
    }

    an_gruppe_senden(
        gruppe,
        SignalNachricht::GroupCallEnded { group_id: gruppe },
        state,
    )
    .await;

    tracing::info!(von = %von, gruppe = %gruppe, "Gruppenruf beendet");
}

/// Verarbeitet `group-offer`: Mesh-Offer gezielt weiterleiten
pub async fn handle_group_offer<B, G>(
    von: UserId,
    gruppe: GroupId,
    ziel: Option<UserId>,
    offer: Sdp,
    state: &Arc<SignalingState<B, G>>,
) where
    B: BenutzerVerzeichnis + 'static,
    G: GruppenVerzeichnis + 'static,
{
    let ziel = match ziel {
        Some(ziel) => ziel,
        None => {
            tracing::warn!(von = %von, gruppe = %gruppe, "group-offer ohne targetUserId – verworfen");
            return;
        }
    };

    state.relay.an_benutzer_senden(
        &ziel,
        SignalNachricht::GroupOffer {
            group_id: gruppe,
            target_user_id: None,
            from: Some(von),
            offer,
        },
    );
    tracing::debug!(von = %von, ziel = %ziel, gruppe = %gruppe, "group-offer weitergeleitet");
}

/// Verarbeitet `group-answer`: Mesh-Answer gezielt weiterleiten
pub async fn handle_group_answer<B, G>(
    von: UserId,
    gruppe: GroupId,
    ziel: Option<UserId>,
    answer: Sdp,
    state: &Arc<SignalingState<B, G>>,
) where
    B: BenutzerVerzeichnis + 'static,
    G: GruppenVerzeichnis + 'static,
{
    let ziel = match ziel {
        Some(ziel) => ziel,
        None => {
            tracing::warn!(von = %von, gruppe = %gruppe, "group-answer ohne targetUserId – verworfen");
            return;
        }
    };

    state.relay.an_benutzer_senden(
        &ziel,
        SignalNachricht::GroupAnswer {
            group_id: gruppe,
            target_user_id: None,
            from: Some(von),
            answer,
        },
    );
    tracing::debug!(von = %von, ziel = %ziel, gruppe = %gruppe, "group-answer weitergeleitet");
}

/// Verarbeitet `group-ice-candidate`: Mesh-Kandidat gezielt weiterleiten
pub async fn handle_group_ice_candidate<B, G>(
    von: UserId,
    gruppe: GroupId,
    ziel: Option<UserId>,
    candidate: IceKandidat,
    state: &Arc<SignalingState<B, G>>,
) where
    B: BenutzerVerzeichnis + 'static,
    G: GruppenVerzeichnis + 'static,
{
    let ziel = match ziel {
        Some(ziel) => ziel,
        None => {
            tracing::warn!(von = %von, gruppe = %gruppe, "group-ice-candidate ohne targetUserId – verworfen");
            return;
        }
    };

    state.relay.an_benutzer_senden(
        &ziel,
        SignalNachricht::GroupIceCandidate {
            group_id: gruppe,
            target_user_id: None,
            from: Some(von),
            candidate,
        },
    );
    tracing::trace!(von = %von, ziel = %ziel, gruppe = %gruppe, "group-ice-candidate weitergeleitet");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_state::SignalingConfig;
    use parley_core::types::{BenutzerProfil, ConnectionId};
    use parley_directory::MemoryVerzeichnis;
    use tokio::sync::mpsc;

    struct TestUmgebung {
        state: Arc<SignalingState<MemoryVerzeichnis, MemoryVerzeichnis>>,
        verzeichnis: Arc<MemoryVerzeichnis>,
    }

    fn test_umgebung() -> TestUmgebung {
        let verzeichnis = Arc::new(MemoryVerzeichnis::neu());
        let state = SignalingState::neu(
            SignalingConfig::default(),
            Arc::clone(&verzeichnis),
            Arc::clone(&verzeichnis),
        );
        TestUmgebung { state, verzeichnis }
    }

    fn benutzer_verbinden(
        umgebung: &TestUmgebung,
        name: &str,
    ) -> (UserId, mpsc::Receiver<SignalNachricht>) {
        let benutzer = UserId::new();
        let verbindung = ConnectionId::new();
        umgebung.verzeichnis.benutzer_anlegen(BenutzerProfil {
            id: benutzer,
            anzeige_name: name.to_string(),
            avatar: None,
        });
        let rx = umgebung.state.relay.verbindung_registrieren(verbindung);
        umgebung.state.presence.registrieren(benutzer, verbindung);
        (benutzer, rx)
    }

    fn test_sdp() -> Sdp {
        Sdp(serde_json::json!({ "type": "offer", "sdp": "v=0" }))
    }

    #[tokio::test]
    async fn start_benachrichtigt_alle_mitglieder_inklusive_starter() {
        let umgebung = test_umgebung();
        let (a, mut rx_a) = benutzer_verbinden(&umgebung, "a");
        let (b, mut rx_b) = benutzer_verbinden(&umgebung, "b");
        let gruppe = GroupId::new();
        umgebung.verzeichnis.gruppe_anlegen(gruppe, vec![a, b]);

        handle_start_group_call(a, gruppe, CallArt::Video, &umgebung.state).await;

        for rx in [&mut rx_a, &mut rx_b] {
            match rx.try_recv().expect("group-call-started erwartet") {
                SignalNachricht::GroupCallStarted {
                    participants,
                    started_by,
                    ..
                } => {
                    assert_eq!(participants, vec![a]);
                    assert_eq!(started_by.id, a);
                }
                andere => panic!("unerwartete Nachricht: {:?}", andere),
            }
        }
    }

    #[tokio::test]
    async fn start_von_nicht_mitglied_wird_verworfen() {
        let umgebung = test_umgebung();
        let (a, mut rx_a) = benutzer_verbinden(&umgebung, "a");
        let (fremd, _rx_f) = benutzer_verbinden(&umgebung, "fremd");
        let gruppe = GroupId::new();
        umgebung.verzeichnis.gruppe_anlegen(gruppe, vec![a]);

        handle_start_group_call(fremd, gruppe, CallArt::Audio, &umgebung.state).await;

        assert!(umgebung.state.gruppen_rufe.ruf(&gruppe).is_none());
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn join_verteilt_aktualisiertes_roster() {
        let umgebung = test_umgebung();
        let (a, mut rx_a) = benutzer_verbinden(&umgebung, "a");
        let (b, mut rx_b) = benutzer_verbinden(&umgebung, "b");
        let gruppe = GroupId::new();
        umgebung.verzeichnis.gruppe_anlegen(gruppe, vec![a, b]);

        handle_start_group_call(a, gruppe, CallArt::Audio, &umgebung.state).await;
        // started-Events abraeumen
        let _ = rx_a.try_recv();
        let _ = rx_b.try_recv();

        handle_join_group_call(b, gruppe, &umgebung.state).await;

        for rx in [&mut rx_a, &mut rx_b] {
            match rx.try_recv().expect("group-participant-joined erwartet") {
                SignalNachricht::GroupParticipantJoined {
                    participant,
                    participants,
                    ..
                } => {
                    assert_eq!(participant, b);
                    assert_eq!(participants, vec![a, b]);
                }
                andere => panic!("unerwartete Nachricht: {:?}", andere),
            }
        }
    }

    #[tokio::test]
    async fn join_ohne_laufenden_ruf_wird_verworfen() {
        let umgebung = test_umgebung();
        let (a, mut rx_a) = benutzer_verbinden(&umgebung, "a");
        let gruppe = GroupId::new();
        umgebung.verzeichnis.gruppe_anlegen(gruppe, vec![a]);

        handle_join_group_call(a, gruppe, &umgebung.state).await;
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn leave_und_end_raeumen_das_roster() {
        let umgebung = test_umgebung();
        let (a, mut rx_a) = benutzer_verbinden(&umgebung, "a");
        let (b, mut rx_b) = benutzer_verbinden(&umgebung, "b");
        let gruppe = GroupId::new();
        umgebung.verzeichnis.gruppe_anlegen(gruppe, vec![a, b]);

        handle_start_group_call(a, gruppe, CallArt::Video, &umgebung.state).await;
        handle_join_group_call(b, gruppe, &umgebung.state).await;
        while rx_a.try_recv().is_ok() {}
        while rx_b.try_recv().is_ok() {}

        handle_leave_group_call(b, gruppe, &umgebung.state).await;
        match rx_a.try_recv().expect("group-participant-left erwartet") {
            SignalNachricht::GroupParticipantLeft { participants, .. } => {
                assert_eq!(participants, vec![a]);
            }
            andere => panic!("unerwartete Nachricht: {:?}", andere),
        }

        handle_end_group_call(a, gruppe, &umgebung.state).await;
        assert!(umgebung.state.gruppen_rufe.ruf(&gruppe).is_none());
        assert!(matches!(
            rx_b.try_recv(),
            Ok(SignalNachricht::GroupCallEnded { .. })
                | Ok(SignalNachricht::GroupParticipantLeft { .. })
        ));
    }

    #[tokio::test]
    async fn group_offer_bekommt_absender_ergaenzt() {
        let umgebung = test_umgebung();
        let (a, _rx_a) = benutzer_verbinden(&umgebung, "a");
        let (b, mut rx_b) = benutzer_verbinden(&umgebung, "b");
        let gruppe = GroupId::new();

        handle_group_offer(a, gruppe, Some(b), test_sdp(), &umgebung.state).await;

        match rx_b.try_recv().expect("group-offer erwartet") {
            SignalNachricht::GroupOffer { from, target_user_id, .. } => {
                assert_eq!(from, Some(a));
                assert!(target_user_id.is_none());
            }
            andere => panic!("unerwartete Nachricht: {:?}", andere),
        }
    }

    #[tokio::test]
    async fn group_offer_ohne_ziel_wird_verworfen() {
        let umgebung = test_umgebung();
        let (a, _rx_a) = benutzer_verbinden(&umgebung, "a");
        let (_, mut rx_b) = benutzer_verbinden(&umgebung, "b");

        handle_group_offer(a, GroupId::new(), None, test_sdp(), &umgebung.state).await;
        assert!(rx_b.try_recv().is_err());
    }
}
