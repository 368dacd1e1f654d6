//! Einzelruf-Koordinator – Zustandsmaschine fuer 1:1-Rufe
//!
//! Eine Instanz pro Client, hoechstens ein laufender Ruf. Erreichbarkeit
//! des Ziels wird beim Anrufen absichtlich nicht vorab geprueft
//! (fire-and-forget); scheitert die Zustellung, greift die Antwortfrist.
//! Veraltete Signale (z.B. `call-accepted` ohne laufenden Versuch) werden
//! geloggt und verworfen, nie an die Oberflaeche gemeldet.

use parley_core::types::{BenutzerProfil, CallArt, UserId};
use parley_protocol::signal::{IceKandidat, Sdp, SignalNachricht};
use std::time::Duration;
use tokio::time::Instant;

use crate::ereignis::{EreignisSender, RufEreignis};
use crate::error::{RufFehler, RufResult};
use crate::kandidaten::KandidatenPuffer;
use crate::medien::{beschaffen_mit_fallback, MedienQuelle, MedienStrom};
use crate::schnittstellen::{PeerFabrik, PeerVerbindung, SignalAusgang};
use crate::zustand::RufZustand;

/// Frist fuer die Antwort der Gegenseite auf einen ausgehenden Ruf
pub const ANTWORT_FRIST: Duration = Duration::from_secs(30);

/// Koordinator fuer Einzelrufe
///
/// Generisch ueber Signalausgang, Medienquelle und Peer-Fabrik, damit
/// Tests alle Seiten mocken koennen.
pub struct EinzelRufKoordinator<S, M, F>
where
    S: SignalAusgang,
    M: MedienQuelle,
    F: PeerFabrik,
{
    selbst: UserId,
    signale: S,
    medien: M,
    fabrik: F,
    ereignisse: EreignisSender,
    zustand: RufZustand,
    peer: Option<F::Verbindung>,
    strom: Option<MedienStrom>,
    puffer: KandidatenPuffer,
    letzter_versuch: Option<(UserId, CallArt)>,
}

impl<S, M, F> EinzelRufKoordinator<S, M, F>
where
    S: SignalAusgang,
    M: MedienQuelle,
    F: PeerFabrik,
{
    /// Erstellt einen Koordinator im Zustand `Bereit`
    pub fn neu(selbst: UserId, signale: S, medien: M, fabrik: F, ereignisse: EreignisSender) -> Self {
        Self {
            selbst,
            signale,
            medien,
            fabrik,
            ereignisse,
            zustand: RufZustand::Bereit,
            peer: None,
            strom: None,
            puffer: KandidatenPuffer::neu(),
            letzter_versuch: None,
        }
    }

    /// Der aktuelle Rufzustand
    pub fn zustand(&self) -> &RufZustand {
        &self.zustand
    }

    /// Die Antwortfrist des laufenden ausgehenden Rufs
    pub fn timeout_frist(&self) -> Option<Instant> {
        self.zustand.frist()
    }

    // -----------------------------------------------------------------------
    // Ausgehender Ruf
    // -----------------------------------------------------------------------

    /// Startet einen ausgehenden Ruf
    ///
    /// Medienbeschaffung laeuft vor jedem Relay; schlaegt sie fehl, wurde
    /// noch nichts gesendet und `erneut_versuchen` kann den Versuch
    /// wiederholen. Bei Video greift der audio-only Fallback.
    pub async fn anrufen(&mut self, ziel: UserId, art: CallArt) -> RufResult<()> {
        if ziel == self.selbst {
            return Err(RufFehler::SelbstAnruf);
        }
        if !self.zustand.ist_bereit() {
            return Err(RufFehler::UngueltigerZustand(self.zustand.name()));
        }

        self.letzter_versuch = Some((ziel, art));

        let ergebnis = match beschaffen_mit_fallback(&self.medien, art).await {
            Ok(ergebnis) => ergebnis,
            Err(fehler) => {
                let _ = self.ereignisse.send(RufEreignis::MedienFehlgeschlagen {
                    fehler: fehler.clone(),
                    wiederholbar: fehler.ist_wiederholbar(),
                });
                return Err(fehler.into());
            }
        };
        let effektiv = ergebnis.strom.art();
        if ergebnis.herabgestuft {
            let _ = self.ereignisse.send(RufEreignis::Herabgestuft {
                von: art,
                auf: effektiv,
            });
        }

        let mut peer = self.fabrik.erstellen();
        let offer = match peer.offer_erstellen().await {
            Ok(offer) => offer,
            Err(e) => {
                ergebnis.strom.freigeben();
                return Err(e.into());
            }
        };

        self.strom = Some(ergebnis.strom);
        self.peer = Some(peer);
        self.zustand = RufZustand::Anrufend {
            ziel,
            art: effektiv,
            frist: Instant::now() + ANTWORT_FRIST,
        };
        self.signale.senden(SignalNachricht::CallUser {
            to: ziel,
            offer,
            art: effektiv,
        });

        tracing::info!(ziel = %ziel, art = %effektiv, "Ruf gestartet");
        Ok(())
    }

    /// Wiederholt den letzten fehlgeschlagenen Anrufversuch
    pub async fn erneut_versuchen(&mut self) -> RufResult<()> {
        if !self.zustand.ist_bereit() {
            return Err(RufFehler::UngueltigerZustand(self.zustand.name()));
        }
        let (ziel, art) = self
            .letzter_versuch
            .ok_or(RufFehler::UngueltigerZustand("kein-vorheriger-versuch"))?;
        self.anrufen(ziel, art).await
    }

    /// Die Gegenseite hat angenommen: Antwort anwenden, Puffer leeren
    pub async fn antwort_empfangen(&mut self, answer: Sdp) -> RufResult<()> {
        let (ziel, art) = match &self.zustand {
            RufZustand::Anrufend { ziel, art, .. } => (*ziel, *art),
            z => {
                tracing::debug!(zustand = z.name(), "call-accepted ohne laufenden Versuch – verworfen");
                return Ok(());
            }
        };

        let peer = self
            .peer
            .as_mut()
            .ok_or(RufFehler::UngueltigerZustand("anrufend-ohne-peer"))?;
        peer.remote_beschreibung_setzen(&answer).await?;
        self.puffer.leeren_nach_beschreibung(peer).await?;

        self.zustand = RufZustand::Verbindet {
            gegenueber: ziel,
            art,
        };
        let _ = self.ereignisse.send(RufEreignis::Angenommen { gegenueber: ziel });
        tracing::info!(gegenueber = %ziel, "Ruf angenommen");
        Ok(())
    }

    /// Die Gegenseite hat abgelehnt
    pub fn abgelehnt_empfangen(&mut self) {
        if !matches!(self.zustand, RufZustand::Anrufend { .. }) {
            tracing::debug!(zustand = self.zustand.name(), "call-rejected ohne laufenden Versuch – verworfen");
            return;
        }
        self.aufraeumen();
        let _ = self.ereignisse.send(RufEreignis::Abgelehnt);
    }

    // -----------------------------------------------------------------------
    // Eingehender Ruf
    // -----------------------------------------------------------------------

    /// Ein Ruf klingelt
    ///
    /// Ausser dem gespeicherten Offer werden keine Ressourcen belegt;
    /// Medien werden erst bei `annehmen` beschafft.
    pub fn eingehender_ruf(&mut self, von: BenutzerProfil, offer: Sdp, art: CallArt) {
        if !self.zustand.ist_bereit() {
            tracing::debug!(
                von = %von.id,
                zustand = self.zustand.name(),
                "incoming-call waehrend laufendem Ruf – verworfen"
            );
            return;
        }
        let _ = self.ereignisse.send(RufEreignis::Eingehend {
            von: von.clone(),
            art,
        });
        self.zustand = RufZustand::Klingelt { von, offer, art };
    }

    /// Nimmt den klingelnden Ruf an
    ///
    /// Bleibt bei Medienfehlern im Zustand `Klingelt`, damit der Benutzer
    /// nach Behebung erneut annehmen kann.
    pub async fn annehmen(&mut self) -> RufResult<()> {
        let (von, offer, art) = match &self.zustand {
            RufZustand::Klingelt { von, offer, art } => (von.id, offer.clone(), *art),
            z => return Err(RufFehler::UngueltigerZustand(z.name())),
        };

        let ergebnis = match beschaffen_mit_fallback(&self.medien, art).await {
            Ok(ergebnis) => ergebnis,
            Err(fehler) => {
                let _ = self.ereignisse.send(RufEreignis::MedienFehlgeschlagen {
                    fehler: fehler.clone(),
                    wiederholbar: fehler.ist_wiederholbar(),
                });
                return Err(fehler.into());
            }
        };
        let effektiv = ergebnis.strom.art();
        if ergebnis.herabgestuft {
            let _ = self.ereignisse.send(RufEreignis::Herabgestuft {
                von: art,
                auf: effektiv,
            });
        }

        let mut peer = self.fabrik.erstellen();
        let answer = match peer.antwort_erstellen(&offer).await {
            Ok(answer) => answer,
            Err(e) => {
                ergebnis.strom.freigeben();
                return Err(e.into());
            }
        };
        // Waehrend des Klingelns eingetroffene Kandidaten anwenden
        self.puffer.leeren_nach_beschreibung(&mut peer).await?;

        self.strom = Some(ergebnis.strom);
        self.peer = Some(peer);
        self.zustand = RufZustand::Verbindet {
            gegenueber: von,
            art: effektiv,
        };
        self.signale.senden(SignalNachricht::AnswerCall { to: von, answer });

        tracing::info!(gegenueber = %von, "Ruf angenommen");
        Ok(())
    }

    /// Lehnt den klingelnden Ruf ab
    pub fn ablehnen(&mut self) -> RufResult<()> {
        let von = match &self.zustand {
            RufZustand::Klingelt { von, .. } => von.id,
            z => return Err(RufFehler::UngueltigerZustand(z.name())),
        };
        self.signale.senden(SignalNachricht::RejectCall { to: von });
        self.aufraeumen();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Kandidaten
    // -----------------------------------------------------------------------

    /// Ein Kandidat der Gegenseite ist eingetroffen
    ///
    /// Vor der Remote-Beschreibung (oder vor `annehmen`, wenn noch kein
    /// Peer existiert) wird gepuffert, danach direkt angewendet.
    pub async fn kandidat_empfangen(&mut self, kandidat: IceKandidat) -> RufResult<()> {
        if self.zustand.ist_bereit() {
            tracing::debug!("ice-candidate ohne laufenden Ruf – verworfen");
            return Ok(());
        }
        match self.peer.as_mut() {
            Some(peer) => self.puffer.aufnehmen_oder_anwenden(peer, kandidat).await,
            None => {
                self.puffer.aufnehmen(kandidat);
                Ok(())
            }
        }
    }

    /// Sendet einen lokalen Kandidaten an die Gegenseite
    pub fn kandidat_senden(&self, kandidat: IceKandidat) -> RufResult<()> {
        let gegenueber = self
            .zustand
            .gegenueber()
            .ok_or(RufFehler::UngueltigerZustand("bereit"))?;
        self.signale.senden(SignalNachricht::IceCandidate {
            to: Some(gegenueber),
            candidate: kandidat,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Beenden
    // -----------------------------------------------------------------------

    /// Der Transport meldet eine stehende Verbindung
    pub fn verbunden(&mut self) {
        if let RufZustand::Verbindet { gegenueber, art } = self.zustand {
            self.zustand = RufZustand::Aktiv { gegenueber, art };
            tracing::info!(gegenueber = %gegenueber, "Ruf aktiv");
        }
    }

    /// Beendet den laufenden Ruf
    ///
    /// Idempotent: aus `Bereit` ist dies ein No-op ohne Relay und ohne
    /// Fehler (Doppelklick, Beenden nach Timeout).
    pub fn beenden(&mut self) {
        let gegenueber = match self.zustand.gegenueber() {
            Some(gegenueber) => gegenueber,
            None => return,
        };
        self.signale.senden(SignalNachricht::EndCall { to: gegenueber });
        self.aufraeumen();
        tracing::info!(gegenueber = %gegenueber, "Ruf beendet");
    }

    /// Die Gegenseite hat den Ruf beendet
    pub fn beendet_empfangen(&mut self) {
        if self.zustand.ist_bereit() {
            tracing::debug!("call-ended ohne laufenden Ruf – verworfen");
            return;
        }
        self.aufraeumen();
        let _ = self.ereignisse.send(RufEreignis::Beendet);
    }

    /// Prueft die Antwortfrist und bricht einen ueberfaelligen Ruf ab
    ///
    /// Gibt `true` zurueck wenn der Timeout ausgeloest hat. Vom Treiber
    /// aufgerufen, wenn `timeout_frist` erreicht ist.
    pub fn timeout_pruefen(&mut self, jetzt: Instant) -> bool {
        let ziel = match &self.zustand {
            RufZustand::Anrufend { ziel, frist, .. } if jetzt >= *frist => *ziel,
            _ => return false,
        };
        self.signale.senden(SignalNachricht::EndCall { to: ziel });
        self.aufraeumen();
        let _ = self.ereignisse.send(RufEreignis::Zeitueberschreitung { ziel });
        tracing::info!(ziel = %ziel, "Keine Antwort innerhalb der Frist – Ruf abgebrochen");
        true
    }

    /// Gibt Peer, Strom und Puffer frei und kehrt nach `Bereit` zurueck
    fn aufraeumen(&mut self) {
        if let Some(mut peer) = self.peer.take() {
            peer.schliessen();
        }
        if let Some(strom) = self.strom.take() {
            strom.freigeben();
        }
        self.puffer.verwerfen();
        self.zustand = RufZustand::Bereit;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ereignis::{ereignis_kanal, EreignisEmpfaenger};
    use crate::medien::MedienFehler;
    use crate::testhilfe::{test_kandidat, test_sdp, MockFabrik, MockMedien, MockSignale};

    struct TestAufbau {
        koordinator: EinzelRufKoordinator<MockSignale, MockMedien, MockFabrik>,
        signale: MockSignale,
        medien: MockMedien,
        fabrik: MockFabrik,
        ereignisse: EreignisEmpfaenger,
        selbst: UserId,
    }

    fn aufbau() -> TestAufbau {
        let selbst = UserId::new();
        let signale = MockSignale::neu();
        let medien = MockMedien::neu();
        let fabrik = MockFabrik::neu();
        let (tx, rx) = ereignis_kanal();
        let koordinator = EinzelRufKoordinator::neu(
            selbst,
            signale.clone(),
            medien.clone(),
            fabrik.clone(),
            tx,
        );
        TestAufbau {
            koordinator,
            signale,
            medien,
            fabrik,
            ereignisse: rx,
            selbst,
        }
    }

    fn profil(name: &str) -> BenutzerProfil {
        BenutzerProfil {
            id: UserId::new(),
            anzeige_name: name.to_string(),
            avatar: None,
        }
    }

    fn ereignisse_sammeln(rx: &mut EreignisEmpfaenger) -> Vec<RufEreignis> {
        let mut ereignisse = Vec::new();
        while let Ok(e) = rx.try_recv() {
            ereignisse.push(e);
        }
        ereignisse
    }

    #[tokio::test]
    async fn selbstanruf_wird_vor_jedem_relay_abgelehnt() {
        let mut t = aufbau();
        let fehler = t
            .koordinator
            .anrufen(t.selbst, CallArt::Audio)
            .await
            .expect_err("SelbstAnruf erwartet");
        assert!(matches!(fehler, RufFehler::SelbstAnruf));
        assert_eq!(t.signale.anzahl(), 0);
    }

    #[tokio::test]
    async fn anrufen_sendet_call_user() {
        let mut t = aufbau();
        let ziel = UserId::new();

        t.koordinator.anrufen(ziel, CallArt::Video).await.unwrap();

        match &t.signale.gesendet()[..] {
            [SignalNachricht::CallUser { to, art, .. }] => {
                assert_eq!(*to, ziel);
                assert_eq!(*art, CallArt::Video);
            }
            andere => panic!("unerwartete Signale: {:?}", andere),
        }
        assert_eq!(t.koordinator.zustand().name(), "anrufend");
        assert!(t.koordinator.timeout_frist().is_some());
    }

    #[tokio::test]
    async fn belegte_kamera_stuft_auf_audio_herab() {
        let mut t = aufbau();
        t.medien.video_fehler_setzen(MedienFehler::GeraetBelegt);

        t.koordinator.anrufen(UserId::new(), CallArt::Video).await.unwrap();

        match &t.signale.gesendet()[..] {
            [SignalNachricht::CallUser { art, .. }] => assert_eq!(*art, CallArt::Audio),
            andere => panic!("unerwartete Signale: {:?}", andere),
        }
        let ereignisse = ereignisse_sammeln(&mut t.ereignisse);
        assert!(ereignisse.contains(&RufEreignis::Herabgestuft {
            von: CallArt::Video,
            auf: CallArt::Audio,
        }));
    }

    #[tokio::test]
    async fn medienfehler_vor_relay_und_erneuter_versuch() {
        let mut t = aufbau();
        let ziel = UserId::new();
        t.medien.audio_fehler_setzen(MedienFehler::GeraetBelegt);

        let fehler = t
            .koordinator
            .anrufen(ziel, CallArt::Audio)
            .await
            .expect_err("Medienfehler erwartet");
        assert!(matches!(fehler, RufFehler::Medien(MedienFehler::GeraetBelegt)));
        assert_eq!(t.signale.anzahl(), 0, "nichts gesendet vor Medien-Erfolg");
        assert!(ereignisse_sammeln(&mut t.ereignisse).contains(
            &RufEreignis::MedienFehlgeschlagen {
                fehler: MedienFehler::GeraetBelegt,
                wiederholbar: true,
            }
        ));

        // Geraet wieder frei: derselbe Versuch klappt
        t.medien.zuruecksetzen();
        t.koordinator.erneut_versuchen().await.unwrap();
        match &t.signale.gesendet()[..] {
            [SignalNachricht::CallUser { to, .. }] => assert_eq!(*to, ziel),
            andere => panic!("unerwartete Signale: {:?}", andere),
        }
    }

    #[tokio::test]
    async fn kandidaten_vor_der_antwort_werden_nach_ihr_angewendet() {
        let mut t = aufbau();
        t.koordinator.anrufen(UserId::new(), CallArt::Audio).await.unwrap();

        t.koordinator.kandidat_empfangen(test_kandidat(1)).await.unwrap();
        t.koordinator.kandidat_empfangen(test_kandidat(2)).await.unwrap();
        let protokoll = t.fabrik.protokoll();
        assert!(protokoll.kandidaten_von(0).is_empty(), "noch gepuffert");

        t.koordinator.antwort_empfangen(test_sdp("answer")).await.unwrap();
        assert_eq!(
            protokoll.kandidaten_von(0),
            vec![test_kandidat(1), test_kandidat(2)]
        );
        assert_eq!(t.koordinator.zustand().name(), "verbindet");
    }

    #[tokio::test]
    async fn klingeln_belegt_keine_medien_und_puffert_kandidaten() {
        let mut t = aufbau();
        let anrufer = profil("ada");

        t.koordinator.eingehender_ruf(anrufer.clone(), test_sdp("offer"), CallArt::Video);
        assert_eq!(t.fabrik.protokoll().anzahl(), 0, "kein Peer beim Klingeln");

        t.koordinator.kandidat_empfangen(test_kandidat(1)).await.unwrap();
        t.koordinator.annehmen().await.unwrap();

        match &t.signale.gesendet()[..] {
            [SignalNachricht::AnswerCall { to, .. }] => assert_eq!(*to, anrufer.id),
            andere => panic!("unerwartete Signale: {:?}", andere),
        }
        // Offer zuerst, dann der gepufferte Kandidat
        let protokoll = t.fabrik.protokoll();
        assert_eq!(protokoll.beschreibungen_von(0), vec![test_sdp("offer")]);
        assert_eq!(protokoll.kandidaten_von(0), vec![test_kandidat(1)]);
    }

    #[tokio::test]
    async fn ablehnen_sendet_reject_und_kehrt_nach_bereit_zurueck() {
        let mut t = aufbau();
        let anrufer = profil("ada");

        t.koordinator.eingehender_ruf(anrufer.clone(), test_sdp("offer"), CallArt::Audio);
        t.koordinator.ablehnen().unwrap();

        match &t.signale.gesendet()[..] {
            [SignalNachricht::RejectCall { to }] => assert_eq!(*to, anrufer.id),
            andere => panic!("unerwartete Signale: {:?}", andere),
        }
        assert!(t.koordinator.zustand().ist_bereit());
    }

    #[tokio::test]
    async fn timeout_bricht_ab_und_beenden_danach_ist_noop() {
        let mut t = aufbau();
        let ziel = UserId::new();
        t.koordinator.anrufen(ziel, CallArt::Audio).await.unwrap();

        let frist = t.koordinator.timeout_frist().unwrap();
        assert!(t.koordinator.timeout_pruefen(frist));
        assert!(t.koordinator.zustand().ist_bereit());
        assert!(ereignisse_sammeln(&mut t.ereignisse)
            .contains(&RufEreignis::Zeitueberschreitung { ziel }));

        // genau ein end-call, auch wenn danach noch beendet wird
        let vorher = t.signale.anzahl();
        t.koordinator.beenden();
        assert!(!t.koordinator.timeout_pruefen(frist));
        assert_eq!(t.signale.anzahl(), vorher, "kein doppeltes end-call");
    }

    #[tokio::test]
    async fn timeout_vor_der_frist_feuert_nicht() {
        let mut t = aufbau();
        t.koordinator.anrufen(UserId::new(), CallArt::Audio).await.unwrap();

        assert!(!t.koordinator.timeout_pruefen(Instant::now()));
        assert_eq!(t.koordinator.zustand().name(), "anrufend");
    }

    #[tokio::test]
    async fn doppeltes_beenden_aus_bereit_ist_noop() {
        let mut t = aufbau();
        t.koordinator.beenden();
        t.koordinator.beenden();
        assert_eq!(t.signale.anzahl(), 0);
        assert!(t.koordinator.zustand().ist_bereit());
    }

    #[tokio::test]
    async fn veraltete_signale_werden_verworfen() {
        let mut t = aufbau();

        t.koordinator.antwort_empfangen(test_sdp("answer")).await.unwrap();
        t.koordinator.abgelehnt_empfangen();
        t.koordinator.beendet_empfangen();
        t.koordinator.kandidat_empfangen(test_kandidat(1)).await.unwrap();

        assert_eq!(t.signale.anzahl(), 0);
        assert!(ereignisse_sammeln(&mut t.ereignisse).is_empty());
        assert!(t.koordinator.zustand().ist_bereit());
    }

    #[tokio::test]
    async fn angenommener_ruf_wird_aktiv_gemeldet() {
        let mut t = aufbau();
        let ziel = UserId::new();
        t.koordinator.anrufen(ziel, CallArt::Audio).await.unwrap();
        t.koordinator.antwort_empfangen(test_sdp("answer")).await.unwrap();

        assert!(ereignisse_sammeln(&mut t.ereignisse)
            .contains(&RufEreignis::Angenommen { gegenueber: ziel }));

        t.koordinator.verbunden();
        assert_eq!(t.koordinator.zustand().name(), "aktiv");
    }
}
