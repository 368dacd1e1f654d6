//! Gruppenruf-Koordinator – Voll-Mesh mit deterministischer Rollenvergabe
//!
//! Pro anderem Teilnehmer ein `PeerLink`; bei N Teilnehmern entstehen
//! N*(N-1)/2 paarweise Links. Damit bei gleichzeitigen Joins nie beide
//! Seiten ein Offer erstellen, gilt die Ordnung auf `UserId`: die
//! kleinere ID erstellt immer das Offer zur groesseren. Ein trotzdem
//! eintreffendes doppeltes Offer (Join-Race) wird verworfen, ohne die
//! bestehende Verhandlung zu beruehren.

use parley_core::types::{BenutzerProfil, CallArt, GroupId, UserId};
use parley_directory::GruppenVerzeichnis;
use parley_protocol::signal::{IceKandidat, Sdp, SignalNachricht};
use std::collections::HashMap;

use crate::ereignis::{EreignisSender, RufEreignis};
use crate::error::{RufFehler, RufResult};
use crate::kandidaten::KandidatenPuffer;
use crate::medien::{beschaffen_mit_fallback, MedienQuelle, MedienStrom};
use crate::schnittstellen::{PeerFabrik, PeerVerbindung, SignalAusgang};

/// Peer-Link zu genau einem anderen Teilnehmer
struct PeerLink<P> {
    peer: P,
    puffer: KandidatenPuffer,
    /// Ob diese Seite das Offer erstellt hat (Duplikat-Erkennung)
    selbst_initiiert: bool,
}

/// Laufende Gruppenruf-Sitzung aus Client-Sicht
struct GruppenSitzung<P> {
    gruppe: GroupId,
    teilnehmer: Vec<UserId>,
    links: HashMap<UserId, PeerLink<P>>,
    strom: MedienStrom,
}

/// Koordinator fuer Gruppenrufe
///
/// Hoechstens eine aktive Sitzung pro Client. Links entstehen lazy:
/// beim Start noch keiner, erst mit beitretenden Teilnehmern.
pub struct GruppenRufKoordinator<S, M, F, G>
where
    S: SignalAusgang,
    M: MedienQuelle,
    F: PeerFabrik,
    G: GruppenVerzeichnis + 'static,
{
    selbst: UserId,
    signale: S,
    medien: M,
    fabrik: F,
    gruppen: G,
    ereignisse: EreignisSender,
    sitzung: Option<GruppenSitzung<F::Verbindung>>,
    /// Bekannte laufende Rufe, denen beigetreten werden kann.
    /// Ueberleben das eigene Verlassen; erst das Server-Ende entfernt sie.
    einladungen: HashMap<GroupId, CallArt>,
}

impl<S, M, F, G> GruppenRufKoordinator<S, M, F, G>
where
    S: SignalAusgang,
    M: MedienQuelle,
    F: PeerFabrik,
    G: GruppenVerzeichnis + 'static,
{
    /// Erstellt einen Koordinator ohne aktive Sitzung
    pub fn neu(
        selbst: UserId,
        signale: S,
        medien: M,
        fabrik: F,
        gruppen: G,
        ereignisse: EreignisSender,
    ) -> Self {
        Self {
            selbst,
            signale,
            medien,
            fabrik,
            gruppen,
            ereignisse,
            sitzung: None,
            einladungen: HashMap::new(),
        }
    }

    /// Die Gruppe der aktiven Sitzung
    pub fn aktive_gruppe(&self) -> Option<GroupId> {
        self.sitzung.as_ref().map(|s| s.gruppe)
    }

    /// Aktuelles Teilnehmer-Roster der aktiven Sitzung
    pub fn teilnehmer(&self) -> Vec<UserId> {
        self.sitzung
            .as_ref()
            .map(|s| s.teilnehmer.clone())
            .unwrap_or_default()
    }

    /// Anzahl bestehender Peer-Links
    pub fn link_anzahl(&self) -> usize {
        self.sitzung.as_ref().map(|s| s.links.len()).unwrap_or(0)
    }

    // -----------------------------------------------------------------------
    // Start / Beitritt
    // -----------------------------------------------------------------------

    /// Startet einen Gruppenruf
    ///
    /// Lokale Vorbedingung: Mitgliedschaft in der Gruppe; der Fehler wird
    /// nie relayed. Noch keine Peer-Links, die entstehen erst mit
    /// beitretenden Teilnehmern.
    pub async fn starten(&mut self, gruppe: GroupId, art: CallArt) -> RufResult<()> {
        if self.sitzung.is_some() {
            return Err(RufFehler::UngueltigerZustand("im-gruppenruf"));
        }
        if !self.gruppen.ist_mitglied(gruppe, self.selbst).await {
            return Err(RufFehler::KeinMitglied);
        }

        let strom = self.strom_beschaffen(art).await?;
        let effektiv = strom.art();
        self.sitzung = Some(GruppenSitzung {
            gruppe,
            teilnehmer: vec![self.selbst],
            links: HashMap::new(),
            strom,
        });
        // Auch der Starter kann nach einem Verlassen wieder beitreten
        self.einladungen.insert(gruppe, effektiv);
        self.signale.senden(SignalNachricht::StartGroupCall {
            group_id: gruppe,
            art: effektiv,
        });

        tracing::info!(gruppe = %gruppe, art = %effektiv, "Gruppenruf gestartet");
        Ok(())
    }

    /// Ein Gruppenruf wurde gestartet (von uns oder einem anderen Mitglied)
    pub fn mitteilung_gestartet(
        &mut self,
        gruppe: GroupId,
        art: CallArt,
        gestartet_von: BenutzerProfil,
        teilnehmer: Vec<UserId>,
    ) {
        if let Some(s) = self.sitzung.as_mut() {
            if s.gruppe == gruppe {
                // Bestaetigung des eigenen Starts: Roster abgleichen
                s.teilnehmer = teilnehmer;
                return;
            }
        }
        self.einladungen.insert(gruppe, art);
        let _ = self.ereignisse.send(RufEreignis::GruppenrufEingehend {
            gruppe,
            art,
            gestartet_von,
        });
    }

    /// Tritt einem laufenden Gruppenruf bei
    ///
    /// Offers entstehen erst mit der Roster-Bestaetigung des Servers
    /// (`teilnehmer_beigetreten` fuer den eigenen Beitritt), damit Joiner
    /// und Bestand dieselbe Rollenregel anwenden.
    pub async fn beitreten(&mut self, gruppe: GroupId) -> RufResult<()> {
        if self.sitzung.is_some() {
            return Err(RufFehler::UngueltigerZustand("im-gruppenruf"));
        }
        let art = *self
            .einladungen
            .get(&gruppe)
            .ok_or(RufFehler::UngueltigerZustand("keine-einladung"))?;

        let strom = self.strom_beschaffen(art).await?;
        self.sitzung = Some(GruppenSitzung {
            gruppe,
            teilnehmer: vec![self.selbst],
            links: HashMap::new(),
            strom,
        });
        self.signale
            .senden(SignalNachricht::JoinGroupCall { group_id: gruppe });

        tracing::info!(gruppe = %gruppe, "Gruppenruf beigetreten");
        Ok(())
    }

    /// Roster-Update: ein Teilnehmer (ggf. wir selbst) ist beigetreten
    ///
    /// Rollenregel: diese Seite erstellt das Offer genau zu Teilnehmern
    /// mit groesserer ID. Beim eigenen Beitritt heisst das Offers zu allen
    /// Groesseren; die Kleineren erstellen ihre Offers auf dieses Event hin.
    pub async fn teilnehmer_beigetreten(
        &mut self,
        gruppe: GroupId,
        teilnehmer: UserId,
        roster: Vec<UserId>,
    ) -> RufResult<()> {
        match self.sitzung.as_mut() {
            Some(s) if s.gruppe == gruppe => s.teilnehmer = roster.clone(),
            _ => {
                tracing::debug!(gruppe = %gruppe, "participant-joined ohne Sitzung – verworfen");
                return Ok(());
            }
        }

        if teilnehmer == self.selbst {
            for anderer in roster {
                if anderer != self.selbst && self.selbst < anderer {
                    self.link_mit_offer(anderer).await?;
                }
            }
        } else if self.selbst < teilnehmer {
            self.link_mit_offer(teilnehmer).await?;
        }
        Ok(())
    }

    /// Erstellt (falls noetig) einen selbst-initiierten Link samt Offer
    async fn link_mit_offer(&mut self, ziel: UserId) -> RufResult<()> {
        let s = match self.sitzung.as_mut() {
            Some(s) => s,
            None => return Ok(()),
        };
        if s.links.contains_key(&ziel) {
            return Ok(());
        }

        let mut peer = self.fabrik.erstellen();
        let offer = peer.offer_erstellen().await?;
        s.links.insert(
            ziel,
            PeerLink {
                peer,
                puffer: KandidatenPuffer::neu(),
                selbst_initiiert: true,
            },
        );
        self.signale.senden(SignalNachricht::GroupOffer {
            group_id: s.gruppe,
            target_user_id: Some(ziel),
            from: None,
            offer,
        });
        tracing::debug!(ziel = %ziel, "Offer an neuen Teilnehmer");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Mesh-Verhandlung
    // -----------------------------------------------------------------------

    /// Offer eines Teilnehmers: Antwort erstellen und zuruecksenden
    ///
    /// Hat diese Seite bereits selbst ein Offer an `von` erstellt, ist das
    /// eingehende Offer ein Join-Race-Duplikat und wird verworfen.
    pub async fn offer_empfangen(
        &mut self,
        gruppe: GroupId,
        von: UserId,
        offer: Sdp,
    ) -> RufResult<()> {
        let s = match self.sitzung.as_mut() {
            Some(s) if s.gruppe == gruppe => s,
            _ => {
                tracing::debug!(gruppe = %gruppe, von = %von, "group-offer ohne Sitzung – verworfen");
                return Ok(());
            }
        };

        let link = s.links.entry(von).or_insert_with(|| PeerLink {
            peer: self.fabrik.erstellen(),
            puffer: KandidatenPuffer::neu(),
            selbst_initiiert: false,
        });
        if link.selbst_initiiert {
            tracing::debug!(von = %von, "Doppeltes Offer (Join-Race) – verworfen");
            return Ok(());
        }

        let answer = link.peer.antwort_erstellen(&offer).await?;
        link.puffer.leeren_nach_beschreibung(&mut link.peer).await?;
        self.signale.senden(SignalNachricht::GroupAnswer {
            group_id: gruppe,
            target_user_id: Some(von),
            from: None,
            answer,
        });
        Ok(())
    }

    /// Antwort eines Teilnehmers auf unser Offer
    pub async fn antwort_empfangen(
        &mut self,
        gruppe: GroupId,
        von: UserId,
        answer: Sdp,
    ) -> RufResult<()> {
        let s = match self.sitzung.as_mut() {
            Some(s) if s.gruppe == gruppe => s,
            _ => {
                tracing::debug!(gruppe = %gruppe, von = %von, "group-answer ohne Sitzung – verworfen");
                return Ok(());
            }
        };
        let link = match s.links.get_mut(&von) {
            Some(link) => link,
            None => {
                tracing::debug!(von = %von, "group-answer ohne Link – verworfen");
                return Ok(());
            }
        };

        link.peer.remote_beschreibung_setzen(&answer).await?;
        link.puffer.leeren_nach_beschreibung(&mut link.peer).await?;
        Ok(())
    }

    /// Kandidat eines Teilnehmers (queue-or-apply pro Peer)
    ///
    /// Trifft ein Kandidat vor dem Offer ein, wird der Link vorab angelegt
    /// und der Kandidat dort gepuffert.
    pub async fn kandidat_empfangen(
        &mut self,
        gruppe: GroupId,
        von: UserId,
        kandidat: IceKandidat,
    ) -> RufResult<()> {
        let s = match self.sitzung.as_mut() {
            Some(s) if s.gruppe == gruppe => s,
            _ => {
                tracing::debug!(gruppe = %gruppe, von = %von, "group-ice-candidate ohne Sitzung – verworfen");
                return Ok(());
            }
        };

        let link = s.links.entry(von).or_insert_with(|| PeerLink {
            peer: self.fabrik.erstellen(),
            puffer: KandidatenPuffer::neu(),
            selbst_initiiert: false,
        });
        let PeerLink { peer, puffer, .. } = link;
        puffer.aufnehmen_oder_anwenden(peer, kandidat).await
    }

    /// Sendet einen lokalen Kandidaten an einen Teilnehmer
    pub fn kandidat_senden(&self, ziel: UserId, kandidat: IceKandidat) -> RufResult<()> {
        let s = self
            .sitzung
            .as_ref()
            .ok_or(RufFehler::UngueltigerZustand("kein-gruppenruf"))?;
        self.signale.senden(SignalNachricht::GroupIceCandidate {
            group_id: s.gruppe,
            target_user_id: Some(ziel),
            from: None,
            candidate: kandidat,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Verlassen / Beenden
    // -----------------------------------------------------------------------

    /// Roster-Update: ein Teilnehmer ist gegangen
    ///
    /// Schliesst nur dessen Link und Kandidaten-Queue; alle anderen Links
    /// bleiben unberuehrt.
    pub fn teilnehmer_gegangen(&mut self, gruppe: GroupId, teilnehmer: UserId, roster: Vec<UserId>) {
        let s = match self.sitzung.as_mut() {
            Some(s) if s.gruppe == gruppe => s,
            _ => {
                tracing::debug!(gruppe = %gruppe, "participant-left ohne Sitzung – verworfen");
                return;
            }
        };
        s.teilnehmer = roster;
        if let Some(mut link) = s.links.remove(&teilnehmer) {
            link.peer.schliessen();
            tracing::debug!(teilnehmer = %teilnehmer, "Link geschlossen");
        }
    }

    /// Verlaesst den laufenden Gruppenruf (No-op ohne Sitzung)
    pub fn verlassen(&mut self) {
        let gruppe = match self.sitzung_abbauen() {
            Some(gruppe) => gruppe,
            None => return,
        };
        self.signale
            .senden(SignalNachricht::LeaveGroupCall { group_id: gruppe });
        tracing::info!(gruppe = %gruppe, "Gruppenruf verlassen");
    }

    /// Beendet den Gruppenruf fuer alle Teilnehmer
    pub fn beenden(&mut self) {
        let gruppe = match self.sitzung_abbauen() {
            Some(gruppe) => gruppe,
            None => return,
        };
        self.einladungen.remove(&gruppe);
        self.signale
            .senden(SignalNachricht::EndGroupCall { group_id: gruppe });
        tracing::info!(gruppe = %gruppe, "Gruppenruf beendet");
    }

    /// Der Server hat den Ruf fuer alle beendet
    pub fn ruf_beendet_empfangen(&mut self, gruppe: GroupId) {
        self.einladungen.remove(&gruppe);
        match self.aktive_gruppe() {
            Some(aktiv) if aktiv == gruppe => {}
            _ => return,
        }
        self.sitzung_abbauen();
        let _ = self
            .ereignisse
            .send(RufEreignis::GruppenrufBeendet { gruppe });
    }

    /// Schliesst alle Links, gibt Medien frei, entfernt die Sitzung.
    /// Die Einladung bleibt bestehen, solange der Ruf serverseitig laeuft.
    fn sitzung_abbauen(&mut self) -> Option<GroupId> {
        let mut s = self.sitzung.take()?;
        for (_, link) in s.links.iter_mut() {
            link.peer.schliessen();
        }
        let gruppe = s.gruppe;
        s.strom.freigeben();
        Some(gruppe)
    }

    /// Medienbeschaffung mit Fallback-Politik und Ereignismeldung
    async fn strom_beschaffen(&mut self, art: CallArt) -> RufResult<MedienStrom> {
        match beschaffen_mit_fallback(&self.medien, art).await {
            Ok(ergebnis) => {
                if ergebnis.herabgestuft {
                    let _ = self.ereignisse.send(RufEreignis::Herabgestuft {
                        von: art,
                        auf: ergebnis.strom.art(),
                    });
                }
                Ok(ergebnis.strom)
            }
            Err(fehler) => {
                let _ = self.ereignisse.send(RufEreignis::MedienFehlgeschlagen {
                    fehler: fehler.clone(),
                    wiederholbar: fehler.ist_wiederholbar(),
                });
                Err(fehler.into())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
