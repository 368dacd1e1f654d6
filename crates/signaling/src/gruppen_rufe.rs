//! Gruppenruf-Register – Roster der laufenden Gruppenrufe
//!
//! Der Server haelt pro Gruppe hoechstens einen laufenden Ruf mit seinem
//! Teilnehmer-Roster, um Join/Leave-Events mit der aktuellen
//! Teilnehmerliste beantworten zu koennen. Die eigentlichen Peer-Links
//! entstehen ausschliesslich client-seitig; hier wird nur Buch gefuehrt.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parley_core::types::{CallArt, GroupId, UserId};
use std::sync::Arc;

/// Ein laufender Gruppenruf aus Server-Sicht
#[derive(Debug, Clone)]
pub struct LaufenderGruppenruf {
    /// Art des Rufs (Audio/Video)
    pub art: CallArt,
    /// Wer den Ruf gestartet hat
    pub gestartet_von: UserId,
    /// Startzeitpunkt
    pub gestartet_um: DateTime<Utc>,
    /// Aktive Teilnehmer in Beitrittsreihenfolge
    pub teilnehmer: Vec<UserId>,
}

/// Register aller laufenden Gruppenrufe
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone, Default)]
pub struct GruppenRufRegister {
    inner: Arc<DashMap<GroupId, LaufenderGruppenruf>>,
}

impl GruppenRufRegister {
    /// Erstellt ein leeres Register
    pub fn neu() -> Self {
        Self::default()
    }

    /// Startet einen Gruppenruf mit dem Starter als einzigem Teilnehmer
    ///
    /// Laeuft fuer die Gruppe bereits ein Ruf, bleibt dieser bestehen und
    /// der Starter wird wie ein Beitritt behandelt (Race zweier
    /// gleichzeitiger Starts).
    pub fn starten(&self, gruppe: GroupId, art: CallArt, von: UserId) -> LaufenderGruppenruf {
        let eintrag = self
            .inner
            .entry(gruppe)
            .and_modify(|ruf| {
                if !ruf.teilnehmer.contains(&von) {
                    ruf.teilnehmer.push(von);
                }
            })
            .or_insert_with(|| LaufenderGruppenruf {
                art,
                gestartet_von: von,
                gestartet_um: Utc::now(),
                teilnehmer: vec![von],
            });
        eintrag.clone()
    }

    /// Fuegt einen Teilnehmer hinzu und gibt das aktualisierte Roster zurueck
    ///
    /// `None` wenn fuer die Gruppe kein Ruf laeuft. Idempotent pro
    /// Teilnehmer.
    pub fn beitreten(&self, gruppe: &GroupId, benutzer: UserId) -> Option<Vec<UserId>> {
        let mut ruf = self.inner.get_mut(gruppe)?;
        if !ruf.teilnehmer.contains(&benutzer) {
            ruf.teilnehmer.push(benutzer);
        }
        Some(ruf.teilnehmer.clone())
    }

    /// Entfernt einen Teilnehmer und gibt das aktualisierte Roster zurueck
    ///
    /// Verlaesst der letzte Teilnehmer den Ruf, wird der Ruf-Eintrag
    /// entfernt. `None` wenn kein Ruf laeuft oder der Benutzer nicht
    /// Teilnehmer war.
    pub fn verlassen(&self, gruppe: &GroupId, benutzer: &UserId) -> Option<Vec<UserId>> {
        let roster = {
            let mut ruf = self.inner.get_mut(gruppe)?;
            if !ruf.teilnehmer.contains(benutzer) {
                return None;
            }
            ruf.teilnehmer.retain(|t| t != benutzer);
            ruf.teilnehmer.clone()
        };

        if roster.is_empty() {
            self.inner.remove(gruppe);
            tracing::debug!(gruppe = %gruppe, "Letzter Teilnehmer weg – Gruppenruf entfernt");
        }
        Some(roster)
    }

    /// Beendet einen Gruppenruf fuer alle und gibt den letzten Stand zurueck
    pub fn beenden(&self, gruppe: &GroupId) -> Option<LaufenderGruppenruf> {
        self.inner.remove(gruppe).map(|(_, ruf)| ruf)
    }

    /// Gibt den laufenden Ruf einer Gruppe zurueck
    pub fn ruf(&self, gruppe: &GroupId) -> Option<LaufenderGruppenruf> {
        self.inner.get(gruppe).map(|e| e.clone())
    }

    /// Gibt alle Gruppen zurueck, in deren Ruf ein Benutzer Teilnehmer ist
    ///
    /// Wird beim Disconnect genutzt um den Benutzer aus allen Rostern
    /// auszutragen.
    pub fn rufe_von(&self, benutzer: &UserId) -> Vec<GroupId> {
        self.inner
            .iter()
            .filter(|e| e.value().teilnehmer.contains(benutzer))
            .map(|e| *e.key())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
