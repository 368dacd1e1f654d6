//! Ruf-Handler – Weiterleitung der Einzelruf-Signalisierung
//!
//! Der Server reicht Offer/Answer/Kandidaten zwischen Anrufer und
//! Angerufenem durch, ohne sie zu interpretieren. Erreichbarkeit wird
//! absichtlich NICHT vorab geprueft: ein Geraet kann sich zwischen
//! Pruefung und Zustellung neu verbinden. Scheitert die Zustellung,
//! greift client-seitig der Antwort-Timeout.

use parley_core::types::{CallArt, UserId};
use parley_directory::{BenutzerVerzeichnis, GruppenVerzeichnis};
use parley_protocol::signal::{IceKandidat, Sdp, SignalNachricht};
use std::sync::Arc;

use crate::server_state::SignalingState;

/// Verarbeitet `call-user`: Anruf an das Ziel weiterleiten
///
/// Das Anruferprofil wird aus dem Benutzerverzeichnis ergaenzt, damit der
/// Angerufene den Anrufer anzeigen kann. Ein unbekannter Anrufer wird
/// verworfen (Race zwischen Kontoloeschung und laufender Verbindung).
pub async fn handle_call_user<B, G>(
    von: UserId,
    to: UserId,
    offer: Sdp,
    art: CallArt,
    state: &Arc<SignalingState<B, G>>,
) where
    B: BenutzerVerzeichnis + 'static,
    G: GruppenVerzeichnis + 'static,
{
    let anrufer = match state.benutzer.profil(von).await {
        Some(profil) => profil,
        None => {
            tracing::warn!(von = %von, "call-user von unbekanntem Benutzer – verworfen");
            return;
        }
    };

    let zugestellt = state.relay.an_benutzer_senden(
        &to,
        SignalNachricht::IncomingCall {
            from: anrufer,
            offer,
            art,
        },
    );

    tracing::info!(von = %von, to = %to, art = %art, zugestellt, "Anruf weitergeleitet");
}

/// Verarbeitet `answer-call`: Annahme an den Anrufer zurueckleiten
pub async fn handle_answer_call<B, G>(
    von: UserId,
    to: UserId,
    answer: Sdp,
    state: &Arc<SignalingState<B, G>>,
) where
    B: BenutzerVerzeichnis + 'static,
    G: GruppenVerzeichnis + 'static,
{
    let zugestellt = state
        .relay
        .an_benutzer_senden(&to, SignalNachricht::CallAccepted { answer });
    tracing::info!(von = %von, to = %to, zugestellt, "Anruf angenommen");
}

/// Verarbeitet `reject-call`: Ablehnung an den Anrufer zurueckleiten
pub async fn handle_reject_call<B, G>(von: UserId, to: UserId, state: &Arc<SignalingState<B, G>>)
where
    B: BenutzerVerzeichnis + 'static,
    G: GruppenVerzeichnis + 'static,
{
    state
        .relay
        .an_benutzer_senden(&to, SignalNachricht::CallRejected {});
    tracing::info!(von = %von, to = %to, "Anruf abgelehnt");
}

/// Verarbeitet `ice-candidate`: Kandidat an die Gegenseite weiterleiten
///
/// Beim Weiterleiten wird das `to`-Feld entfernt; die Gegenseite braucht
/// nur den Kandidaten selbst.
pub async fn handle_ice_candidate<B, G>(
    von: UserId,
    to: UserId,
    candidate: IceKandidat,
    state: &Arc<SignalingState<B, G>>,
) where
    B: BenutzerVerzeichnis + 'static,
    G: GruppenVerzeichnis + 'static,
{
    state.relay.an_benutzer_senden(
        &to,
        SignalNachricht::IceCandidate {
            to: None,
            candidate,
        },
    );
    tracing::trace!(von = %von, to = %to, "Kandidat weitergeleitet");
}

/// Verarbeitet `end-call`: Beendigung an die Gegenseite weiterleiten
pub async fn handle_end_call<B, G>(von: UserId, to: UserId, state: &Arc<SignalingState<B, G>>)
where
    B: BenutzerVerzeichnis + 'static,
    G: GruppenVerzeichnis + 'static,
{
    state
        .relay
        .an_benutzer_senden(&to, SignalNachricht::CallEnded {});
    tracing::info!(von = %von, to = %to, "Anruf beendet");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
