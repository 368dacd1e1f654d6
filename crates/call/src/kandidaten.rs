//! Kandidaten-Puffer – Reihenfolge-Disziplin fuer ICE-Kandidaten
//!
//! Kandidaten duerfen erst nach der Remote-Beschreibung angewendet werden,
//! koennen aber vorher eintreffen (unterschiedliche Relay-Pfade). Der
//! Puffer nimmt fruehe Kandidaten in FIFO-Reihenfolge auf; nach der
//! Beschreibung wird erst der Puffer geleert, dann jeder neue Kandidat
//! direkt angewendet. Netto-Effekt ist damit unabhaengig von der
//! Ankunftsreihenfolge.

use parley_protocol::signal::IceKandidat;
use std::collections::VecDeque;

use crate::error::RufResult;
use crate::schnittstellen::PeerVerbindung;

/// FIFO-Puffer fuer zu frueh eingetroffene Kandidaten
#[derive(Debug, Default)]
pub struct KandidatenPuffer {
    wartend: VecDeque<IceKandidat>,
}

impl KandidatenPuffer {
    /// Erstellt einen leeren Puffer
    pub fn neu() -> Self {
        Self::default()
    }

    /// Nimmt einen Kandidaten auf oder wendet ihn direkt an
    ///
    /// Ohne Remote-Beschreibung wird gepuffert, sonst direkt angewendet.
    pub async fn aufnehmen_oder_anwenden<P: PeerVerbindung>(
        &mut self,
        peer: &mut P,
        kandidat: IceKandidat,
    ) -> RufResult<()> {
        if peer.hat_remote_beschreibung() {
            peer.kandidat_hinzufuegen(&kandidat).await?;
        } else {
            self.wartend.push_back(kandidat);
            tracing::trace!(wartend = self.wartend.len(), "Kandidat gepuffert");
        }
        Ok(())
    }

    /// Nimmt einen Kandidaten auf ohne Peer (noch keine Verbindung erstellt)
    pub fn aufnehmen(&mut self, kandidat: IceKandidat) {
        self.wartend.push_back(kandidat);
    }

    /// Leert den Puffer in FIFO-Reihenfolge auf den Peer
    ///
    /// Aufzurufen unmittelbar nachdem die Remote-Beschreibung gesetzt
    /// wurde. Gibt die Anzahl angewendeter Kandidaten zurueck.
    pub async fn leeren_nach_beschreibung<P: PeerVerbindung>(
        &mut self,
        peer: &mut P,
    ) -> RufResult<usize> {
        let mut angewendet = 0;
        while let Some(kandidat) = self.wartend.pop_front() {
            peer.kandidat_hinzufuegen(&kandidat).await?;
            angewendet += 1;
        }
        if angewendet > 0 {
            tracing::debug!(angewendet, "Gepufferte Kandidaten angewendet");
        }
        Ok(angewendet)
    }

    /// Anzahl wartender Kandidaten
    pub fn wartend(&self) -> usize {
        self.wartend.len()
    }

    /// Verwirft alle wartenden Kandidaten
    pub fn verwerfen(&mut self) {
        self.wartend.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
