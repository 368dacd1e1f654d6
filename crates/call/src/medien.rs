//! Medienbeschaffung – lokale Audio/Video-Stroeme
//!
//! Die eigentliche Geraete-Anbindung liegt hinter dem `MedienQuelle`-Trait;
//! dieser Crate kennt nur die Fehlertaxonomie und die Fallback-Politik:
//! schlaegt ein Video-Ruf an einem belegten oder fehlenden Geraet fehl,
//! wird automatisch audio-only versucht und eine Herabstufung gemeldet
//! statt eines Fehlers.

use parley_core::types::CallArt;
use thiserror::Error;

/// Fehler bei der Beschaffung lokaler Medien
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MedienFehler {
    /// Benutzer hat den Geraetezugriff verweigert (fatal, keine Wiederholung)
    #[error("Geraetezugriff verweigert")]
    ZugriffVerweigert,

    /// Geraet von einer anderen Anwendung belegt (wiederholbar)
    #[error("Geraet belegt")]
    GeraetBelegt,

    /// Kein passendes Geraet vorhanden (fatal)
    #[error("Kein Geraet gefunden")]
    KeinGeraet,
}

impl MedienFehler {
    /// Ob ein erneuter Versuch sinnvoll ist
    pub fn ist_wiederholbar(&self) -> bool {
        matches!(self, MedienFehler::GeraetBelegt)
    }

    /// Ob bei einem Video-Ruf der audio-only Fallback greift
    ///
    /// Zugriff-verweigert betrifft Audio genauso, ein Fallback wuerde
    /// nur erneut scheitern.
    pub fn erlaubt_audio_fallback(&self) -> bool {
        matches!(self, MedienFehler::GeraetBelegt | MedienFehler::KeinGeraet)
    }
}

/// Ein beschaffter lokaler Medienstrom
///
/// `art` ist die tatsaechlich beschaffte Art; nach einem Fallback kann sie
/// von der angefragten abweichen.
#[derive(Debug)]
pub struct MedienStrom {
    art: CallArt,
}

impl MedienStrom {
    /// Erstellt einen Strom der angegebenen Art
    pub fn neu(art: CallArt) -> Self {
        Self { art }
    }

    /// Die Art dieses Stroms
    pub fn art(&self) -> CallArt {
        self.art
    }

    /// Gibt die zugehoerigen Geraete frei
    pub fn freigeben(self) {
        tracing::debug!(art = %self.art, "Medienstrom freigegeben");
    }
}

/// Abstraktion ueber die lokale Geraete-Anbindung
#[allow(async_fn_in_trait)]
pub trait MedienQuelle {
    /// Beschafft einen lokalen Strom der gewuenschten Art
    async fn beschaffen(&self, art: CallArt) -> Result<MedienStrom, MedienFehler>;
}

/// Ergebnis einer Beschaffung mit Fallback-Politik
#[derive(Debug)]
pub struct BeschaffungsErgebnis {
    /// Der beschaffte Strom
    pub strom: MedienStrom,
    /// Gesetzt wenn statt Video nur Audio beschafft wurde
    pub herabgestuft: bool,
}

/// Beschafft einen Strom, bei Video mit automatischem audio-only Fallback
pub async fn beschaffen_mit_fallback<M: MedienQuelle>(
    quelle: &M,
    art: CallArt,
) -> Result<BeschaffungsErgebnis, MedienFehler> {
    match quelle.beschaffen(art).await {
        Ok(strom) => Ok(BeschaffungsErgebnis {
            strom,
            herabgestuft: false,
        }),
        Err(fehler) if art == CallArt::Video && fehler.erlaubt_audio_fallback() => {
            tracing::info!(fehler = %fehler, "Video fehlgeschlagen – versuche audio-only");
            let strom = quelle.beschaffen(CallArt::Audio).await?;
            Ok(BeschaffungsErgebnis {
                strom,
                herabgestuft: true,
            })
        }
        Err(fehler) => Err(fehler),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testhilfe::MockMedien;

    #[test]
    fn wiederholbarkeit() {
        assert!(MedienFehler::GeraetBelegt.ist_wiederholbar());
        assert!(!MedienFehler::ZugriffVerweigert.ist_wiederholbar());
        assert!(!MedienFehler::KeinGeraet.ist_wiederholbar());
    }

    #[tokio::test]
    async fn belegte_kamera_faellt_auf_audio_zurueck() {
        let quelle = MockMedien::neu();
        quelle.video_fehler_setzen(MedienFehler::GeraetBelegt);

        let ergebnis = beschaffen_mit_fallback(&quelle, CallArt::Video)
            .await
            .expect("Fallback erwartet");
        assert!(ergebnis.herabgestuft);
        assert_eq!(ergebnis.strom.art(), CallArt::Audio);
    }

    #[tokio::test]
    async fn verweigerter_zugriff_hat_keinen_fallback() {
        let quelle = MockMedien::neu();
        quelle.video_fehler_setzen(MedienFehler::ZugriffVerweigert);

        let fehler = beschaffen_mit_fallback(&quelle, CallArt::Video)
            .await
            .expect_err("Fehler erwartet");
        assert_eq!(fehler, MedienFehler::ZugriffVerweigert);
    }

    #[tokio::test]
    async fn audio_fehler_wird_durchgereicht() {
        let quelle = MockMedien::neu();
        quelle.audio_fehler_setzen(MedienFehler::KeinGeraet);

        let fehler = beschaffen_mit_fallback(&quelle, CallArt::Audio)
            .await
            .expect_err("Fehler erwartet");
        assert_eq!(fehler, MedienFehler::KeinGeraet);
    }
}
