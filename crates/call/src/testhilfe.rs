//! Mock-Implementierungen der Schnittstellen fuer Tests
//!
//! Alle Mocks protokollieren ihre Aufrufe in Rc-geteiltem Zustand;
//! zulaessig, weil die Tests auf dem single-threaded Executor laufen.

use parley_core::types::CallArt;
use parley_protocol::signal::{IceKandidat, Sdp, SignalNachricht};
use std::cell::RefCell;
use std::rc::Rc;

use crate::medien::{MedienFehler, MedienQuelle, MedienStrom};
use crate::schnittstellen::{PeerFabrik, PeerVerbindung, SignalAusgang};

/// Test-SDP mit angegebenem Typ
pub fn test_sdp(typ: &str) -> Sdp {
    Sdp(serde_json::json!({ "type": typ, "sdp": "v=0" }))
}

/// Test-Kandidat mit laufender Nummer
pub fn test_kandidat(nr: usize) -> IceKandidat {
    IceKandidat(serde_json::json!({ "candidate": format!("kandidat-{nr}") }))
}

// ---------------------------------------------------------------------------
// Signal-Mock
// ---------------------------------------------------------------------------

/// Sammelt gesendete Nachrichten
#[derive(Clone, Default)]
pub struct MockSignale {
    gesendet: Rc<RefCell<Vec<SignalNachricht>>>,
}

impl MockSignale {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Alle bisher gesendeten Nachrichten
    pub fn gesendet(&self) -> Vec<SignalNachricht> {
        self.gesendet.borrow().clone()
    }

    pub fn anzahl(&self) -> usize {
        self.gesendet.borrow().len()
    }
}

impl SignalAusgang for MockSignale {
    fn senden(&self, nachricht: SignalNachricht) {
        self.gesendet.borrow_mut().push(nachricht);
    }
}

// ---------------------------------------------------------------------------
// Medien-Mock
// ---------------------------------------------------------------------------

/// Medienquelle mit konfigurierbaren Fehlern pro Art
#[derive(Clone, Default)]
pub struct MockMedien {
    video_fehler: Rc<RefCell<Option<MedienFehler>>>,
    audio_fehler: Rc<RefCell<Option<MedienFehler>>>,
}

impl MockMedien {
    pub fn neu() -> Self {
        Self::default()
    }

    pub fn video_fehler_setzen(&self, fehler: MedienFehler) {
        *self.video_fehler.borrow_mut() = Some(fehler);
    }

    pub fn audio_fehler_setzen(&self, fehler: MedienFehler) {
        *self.audio_fehler.borrow_mut() = Some(fehler);
    }

    /// Loescht alle konfigurierten Fehler (Geraet wieder frei)
    pub fn zuruecksetzen(&self) {
        *self.video_fehler.borrow_mut() = None;
        *self.audio_fehler.borrow_mut() = None;
    }
}

impl MedienQuelle for MockMedien {
    async fn beschaffen(&self, art: CallArt) -> Result<MedienStrom, MedienFehler> {
        let fehler = match art {
            CallArt::Video => self.video_fehler.borrow().clone(),
            CallArt::Audio => self.audio_fehler.borrow().clone(),
        };
        match fehler {
            Some(fehler) => Err(fehler),
            None => Ok(MedienStrom::neu(art)),
        }
    }
}

// ---------------------------------------------------------------------------
// Peer-Mock
// ---------------------------------------------------------------------------

/// Aufzeichnung eines einzelnen Mock-Peers
#[derive(Debug, Default, Clone)]
pub struct PeerEintrag {
    pub beschreibungen: Vec<Sdp>,
    pub kandidaten: Vec<IceKandidat>,
    pub offers_erstellt: usize,
    pub antworten_erstellt: usize,
    pub geschlossen: bool,
}

/// Protokoll aller von einer Fabrik erzeugten Peers
#[derive(Clone, Default)]
pub struct PeerProtokoll {
    eintraege: Rc<RefCell<Vec<PeerEintrag>>>,
}

impl PeerProtokoll {
    /// Anzahl erzeugter Peers
    pub fn anzahl(&self) -> usize {
        self.eintraege.borrow().len()
    }

    pub fn kandidaten_von(&self, index: usize) -> Vec<IceKandidat> {
        self.eintraege
            .borrow()
            .get(index)
            .map(|e| e.kandidaten.clone())
            .unwrap_or_default()
    }

    pub fn beschreibungen_von(&self, index: usize) -> Vec<Sdp> {
        self.eintraege
            .borrow()
            .get(index)
            .map(|e| e.beschreibungen.clone())
            .unwrap_or_default()
    }

    pub fn offers_von(&self, index: usize) -> usize {
        self.eintraege
            .borrow()
            .get(index)
            .map(|e| e.offers_erstellt)
            .unwrap_or_default()
    }

    /// Summe aller erstellten Offers ueber alle Peers
    pub fn offers_gesamt(&self) -> usize {
        self.eintraege.borrow().iter().map(|e| e.offers_erstellt).sum()
    }

    pub fn ist_geschlossen(&self, index: usize) -> bool {
        self.eintraege
            .borrow()
            .get(index)
            .map(|e| e.geschlossen)
            .unwrap_or_default()
    }
}

/// Fabrik fuer Mock-Peers mit gemeinsamem Protokoll
#[derive(Clone, Default)]
pub struct MockFabrik {
    protokoll: PeerProtokoll,
}

impl MockFabrik {
    pub fn neu() -> Self {
        Self::default()
    }

    pub fn protokoll(&self) -> PeerProtokoll {
        self.protokoll.clone()
    }
}

impl PeerFabrik for MockFabrik {
    type Verbindung = MockPeer;

    fn erstellen(&self) -> MockPeer {
        let index = {
            let mut eintraege = self.protokoll.eintraege.borrow_mut();
            eintraege.push(PeerEintrag::default());
            eintraege.len() - 1
        };
        MockPeer {
            index,
            protokoll: self.protokoll.clone(),
            hat_remote: false,
        }
    }
}

/// Mock-Peer, zeichnet alle Aufrufe im Fabrik-Protokoll auf
pub struct MockPeer {
    index: usize,
    protokoll: PeerProtokoll,
    hat_remote: bool,
}

impl MockPeer {
    fn eintrag<R>(&self, f: impl FnOnce(&mut PeerEintrag) -> R) -> R {
        let mut eintraege = self.protokoll.eintraege.borrow_mut();
        f(&mut eintraege[self.index])
    }
}

impl PeerVerbindung for MockPeer {
    async fn offer_erstellen(&mut self) -> anyhow::Result<Sdp> {
        self.eintrag(|e| e.offers_erstellt += 1);
        Ok(Sdp(serde_json::json!({ "type": "offer", "peer": self.index })))
    }

    async fn antwort_erstellen(&mut self, offer: &Sdp) -> anyhow::Result<Sdp> {
        self.hat_remote = true;
        self.eintrag(|e| {
            e.beschreibungen.push(offer.clone());
            e.antworten_erstellt += 1;
        });
        Ok(Sdp(serde_json::json!({ "type": "answer", "peer": self.index })))
    }

    async fn remote_beschreibung_setzen(&mut self, sdp: &Sdp) -> anyhow::Result<()> {
        self.hat_remote = true;
        self.eintrag(|e| e.beschreibungen.push(sdp.clone()));
        Ok(())
    }

    fn hat_remote_beschreibung(&self) -> bool {
        self.hat_remote
    }

    async fn kandidat_hinzufuegen(&mut self, kandidat: &IceKandidat) -> anyhow::Result<()> {
        let kandidat = kandidat.clone();
        self.eintrag(|e| e.kandidaten.push(kandidat));
        Ok(())
    }

    fn schliessen(&mut self) {
        self.eintrag(|e| e.geschlossen = true);
    }
}
