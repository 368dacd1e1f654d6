//! Signal-Dispatcher – Routet SignalNachrichten an die richtigen Handler
//!
//! Der Dispatcher empfaengt SignalNachrichten von einer ClientConnection
//! und ruft den passenden Handler auf. Signalisierung ist fire-and-forget:
//! es gibt keine Antwort-Envelope, Reaktionen entstehen als eigene
//! Ereignisse an andere Verbindungen.
//!
//! ## Zustandspruefung
//! Vor der Anmeldung (`connect`) wird keine andere Nachricht akzeptiert;
//! die Anmeldung selbst erledigt die ClientConnection im Handshake.

use chrono::Utc;
use parley_core::types::{ConnectionId, UserId};
use parley_directory::{BenutzerVerzeichnis, GruppenVerzeichnis};
use parley_protocol::signal::SignalNachricht;
use std::sync::Arc;

use crate::handlers::{gruppen_handler, ruf_handler};
use crate::server_state::SignalingState;

/// Dispatcher-Kontext – Informationen ueber die aktuelle Verbindung
pub struct DispatcherContext {
    /// ID dieser Verbindung
    pub verbindung: ConnectionId,
    /// Angemeldete User-ID (None bis zum Handshake)
    pub benutzer: Option<UserId>,
}

/// Zentraler Signal-Dispatcher
///
/// Routet eingehende SignalNachrichten an die entsprechenden Handler.
pub struct SignalDispatcher<B, G>
where
    B: BenutzerVerzeichnis + 'static,
    G: GruppenVerzeichnis + 'static,
{
    state: Arc<SignalingState<B, G>>,
}

impl<B, G> SignalDispatcher<B, G>
where
    B: BenutzerVerzeichnis + 'static,
    G: GruppenVerzeichnis + 'static,
{
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SignalingState<B, G>>) -> Self {
        Self { state }
    }

    /// Meldet einen Benutzer auf dieser Verbindung an
    ///
    /// Registriert die Verbindung in der Presence-Registry, aktualisiert
    /// Last-Seen und verteilt die neue Online-Liste an alle Verbindungen.
    pub async fn benutzer_anmelden(&self, benutzer: UserId, verbindung: ConnectionId) {
        self.state.presence.registrieren(benutzer, verbindung);
        self.state
            .benutzer
            .letzte_aktivitaet_setzen(benutzer, Utc::now())
            .await;

        let online = self.state.presence.momentaufnahme();
        self.state
            .relay
            .an_alle_senden(SignalNachricht::OnlineBenutzer(online));

        tracing::info!(benutzer = %benutzer, verbindung = %verbindung, "Benutzer angemeldet");
    }

    /// Verarbeitet eine eingehende SignalNachricht
    ///
    /// Nachrichten ohne angemeldeten Benutzer werden verworfen; die
    /// ClientConnection laesst sie nach dem Handshake nicht mehr zu.
    pub async fn dispatch(&self, nachricht: SignalNachricht, ctx: &DispatcherContext) {
        let von = match ctx.benutzer {
            Some(benutzer) => benutzer,
            None => {
                tracing::warn!(
                    verbindung = %ctx.verbindung,
                    ereignis = nachricht.event_name(),
                    "Nachricht vor Anmeldung – verworfen"
                );
                return;
            }
        };

        match nachricht {
            // -------------------------------------------------------------------
            // Einzelruf
            // -------------------------------------------------------------------
            SignalNachricht::CallUser { to, offer, art } => {
                ruf_handler::handle_call_user(von, to, offer, art, &self.state).await;
            }

            SignalNachricht::AnswerCall { to, answer } => {
                ruf_handler::handle_answer_call(von, to, answer, &self.state).await;
            }

            SignalNachricht::RejectCall { to } => {
                ruf_handler::handle_reject_call(von, to, &self.state).await;
            }

            SignalNachricht::IceCandidate { to, candidate } => match to {
                Some(to) => {
                    ruf_handler::handle_ice_candidate(von, to, candidate, &self.state).await;
                }
                None => {
                    tracing::warn!(von = %von, "ice-candidate ohne Ziel – verworfen");
                }
            },

            SignalNachricht::EndCall { to } => {
                ruf_handler::handle_end_call(von, to, &self.state).await;
            }

            // -------------------------------------------------------------------
            // Gruppenruf
            // -------------------------------------------------------------------
            SignalNachricht::StartGroupCall { group_id, art } => {
                gruppen_handler::handle_start_group_call(von, group_id, art, &self.state).await;
            }

            SignalNachricht::JoinGroupCall { group_id } => {
                gruppen_handler::handle_join_group_call(von, group_id, &self.state).await;
            }

            SignalNachricht::LeaveGroupCall { group_id } => {
                gruppen_handler::handle_leave_group_call(von, group_id, &self.state).await;
            }

            SignalNachricht::EndGroupCall { group_id } => {
                gruppen_handler::handle_end_group_call(von, group_id, &self.state).await;
            }

            SignalNachricht::GroupOffer {
                group_id,
                target_user_id,
                offer,
                ..
            } => {
                gruppen_handler::handle_group_offer(von, group_id, target_user_id, offer, &self.state)
                    .await;
            }

            SignalNachricht::GroupAnswer {
                group_id,
                target_user_id,
                answer,
                ..
            } => {
                gruppen_handler::handle_group_answer(
                    von,
                    group_id,
                    target_user_id,
                    answer,
                    &self.state,
                )
                .await;
            }

            SignalNachricht::GroupIceCandidate {
                group_id,
                target_user_id,
                candidate,
                ..
            } => {
                gruppen_handler::handle_group_ice_candidate(
                    von,
                    group_id,
                    target_user_id,
                    candidate,
                    &self.state,
                )
                .await;
            }

            // -------------------------------------------------------------------
            // Unerwartete Nachrichten
            // -------------------------------------------------------------------
            SignalNachricht::Anmelden { .. } => {
                tracing::warn!(von = %von, "Doppelter connect – ignoriert");
            }

            SignalNachricht::IncomingCall { .. }
            | SignalNachricht::CallAccepted { .. }
            | SignalNachricht::CallRejected {}
            | SignalNachricht::CallEnded {}
            | SignalNachricht::GroupCallStarted { .. }
            | SignalNachricht::GroupParticipantJoined { .. }
            | SignalNachricht::GroupParticipantLeft { .. }
            | SignalNachricht::GroupCallEnded { .. }
            | SignalNachricht::OnlineBenutzer(_)
            | SignalNachricht::LastSeenUpdate { .. } => {
                tracing::warn!(
                    von = %von,
                    ereignis = nachricht.event_name(),
                    "Unerwartete Server->Client Nachricht vom Client empfangen"
                );
            }
        }
    }

    /// Bereinigt alle Ressourcen einer Verbindung beim Trennen
    ///
    /// Geht der letzte Socket eines Benutzers verloren, wird Last-Seen
    /// gesetzt, der Benutzer aus allen Gruppenruf-Rostern ausgetragen und
    /// die neue Online-Liste verteilt.
    pub async fn client_cleanup(&self, verbindung: ConnectionId) {
        self.state.relay.verbindung_entfernen(&verbindung);

        let (benutzer, ist_jetzt_offline) = match self.state.presence.abmelden(verbindung) {
            Some(ergebnis) => ergebnis,
            None => return,
        };

        if ist_jetzt_offline {
            let jetzt = Utc::now();
            self.state
                .benutzer
                .letzte_aktivitaet_setzen(benutzer, jetzt)
                .await;
            self.state.relay.an_alle_senden(SignalNachricht::LastSeenUpdate {
                user_id: benutzer,
                last_seen: jetzt,
            });

            // Aus allen laufenden Gruppenrufen austragen
            for gruppe in self.state.gruppen_rufe.rufe_von(&benutzer) {
                if let Some(roster) = self.state.gruppen_rufe.verlassen(&gruppe, &benutzer) {
                    if !roster.is_empty() {
                        for mitglied in &roster {
                            self.state.relay.an_benutzer_senden(
                                mitglied,
                                SignalNachricht::GroupParticipantLeft {
                                    group_id: gruppe,
                                    participant: benutzer,
                                    participants: roster.clone(),
                                },
                            );
                        }
                    }
                }
            }
        }

        let online = self.state.presence.momentaufnahme();
        self.state
            .relay
            .an_alle_senden(SignalNachricht::OnlineBenutzer(online));

        tracing::debug!(
            benutzer = %benutzer,
            verbindung = %verbindung,
            offline = ist_jetzt_offline,
            "Client-Ressourcen bereinigt"
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
