//! Wire-Format fuer TCP-Verbindungen
//!
//! Frame-basiertes Protokoll: Laenge (u32 big-endian) + JSON-Payload.
//!
//! ```text
//! +--------+--------+--------+--------+----...----+
//! | Laenge (u32 BE) | 4 Bytes        | Payload    |
//! +--------+--------+--------+--------+----...----+
//! ```
//!
//! Die Laenge gibt die Anzahl der Payload-Bytes an (ohne die 4
//! Laengen-Bytes). Maximale Frame-Groesse ist konfigurierbar
//! (Standard: 1 MB).

use bytes::{Buf, BufMut, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder};

use crate::signal::SignalNachricht;

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Groesse (1 MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Groesse des Laengen-Felds in Bytes
pub const LENGTH_FIELD_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// SignalCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer frame-basierte TCP-Verbindungen
///
/// Implementiert `Encoder<SignalNachricht>` und `Decoder` fuer nahtlose
/// Integration mit `tokio_util::codec::Framed`.
#[derive(Debug, Clone)]
pub struct SignalCodec {
    /// Maximale erlaubte Frame-Groesse in Bytes
    max_frame_size: usize,
}

impl SignalCodec {
    /// Erstellt einen neuen `SignalCodec` mit Standard-Limits
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Erstellt einen `SignalCodec` mit benutzerdefinierter maximaler Frame-Groesse
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Gibt die konfigurierte maximale Frame-Groesse zurueck
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for SignalCodec {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Decoder-Implementierung
// ---------------------------------------------------------------------------

impl Decoder for SignalCodec {
    type Item = SignalNachricht;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Warte auf mindestens 4 Bytes fuer das Laengen-Feld
        if src.len() < LENGTH_FIELD_SIZE {
            return Ok(None);
        }

        // Laenge lesen (big-endian u32) ohne den Buffer zu veraendern
        let length = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

        // Maximale Frame-Groesse pruefen
        if length > self.max_frame_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Frame zu gross: {} Bytes (Maximum: {} Bytes)",
                    length, self.max_frame_size
                ),
            ));
        }

        // Pruefen ob der vollstaendige Frame bereits im Buffer ist
        let total_size = LENGTH_FIELD_SIZE + length;
        if src.len() < total_size {
            // Speicher vorbelegen um Reallocations zu vermeiden
            src.reserve(total_size - src.len());
            return Ok(None);
        }

        // Laengen-Feld verbrauchen
        src.advance(LENGTH_FIELD_SIZE);

        // Payload-Bytes extrahieren
        let payload = src.split_to(length);

        // JSON deserialisieren
        let nachricht: SignalNachricht = serde_json::from_slice(&payload).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON-Deserialisierung fehlgeschlagen: {}", e),
            )
        })?;

        Ok(Some(nachricht))
    }
}

// ---------------------------------------------------------------------------
// Encoder-Implementierung
// ---------------------------------------------------------------------------

impl Encoder<SignalNachricht> for SignalCodec {
    type Error = io::Error;

    fn encode(&mut self, item: SignalNachricht, dst: &mut BytesMut) -> Result<(), Self::Error> {
        // JSON serialisieren
        let json = serde_json::to_vec(&item).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON-Serialisierung fehlgeschlagen: {}", e),
            )
        })?;

        // Groesse pruefen
        if json.len() > self.max_frame_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Nachricht zu gross: {} Bytes (Maximum: {} Bytes)",
                    json.len(),
                    self.max_frame_size
                ),
            ));
        }

        // Laengen-Feld + Payload schreiben
        dst.reserve(LENGTH_FIELD_SIZE + json.len());
        dst.put_u32(json.len() as u32);
        dst.put_slice(&json);

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Hilfsfunktionen fuer direktes async Lesen/Schreiben
// ---------------------------------------------------------------------------

/// Liest einen einzelnen Frame aus einem `AsyncRead`
///
/// # Fehler
/// - `UnexpectedEof` wenn die Verbindung vor Abschluss des Frames getrennt wird
/// - `InvalidData` bei ungueltigem JSON oder zu grossem Frame
pub async fn frame_lesen<R>(reader: &mut R, max_frame_size: usize) -> io::Result<SignalNachricht>
where
    R: AsyncRead + Unpin,
{
    // Laengen-Feld lesen
    let mut len_buf = [0u8; LENGTH_FIELD_SIZE];
    reader.read_exact(&mut len_buf).await?;
    let length = u32::from_be_bytes(len_buf) as usize;

    // Groesse pruefen
    if length > max_frame_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Frame zu gross: {} Bytes (Maximum: {} Bytes)",
                length, max_frame_size
            ),
        ));
    }

    // Payload lesen
    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).await?;

    // JSON deserialisieren
    serde_json::from_slice(&payload).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("JSON-Deserialisierung fehlgeschlagen: {}", e),
        )
    })
}

/// Schreibt einen einzelnen Frame in einen `AsyncWrite`
///
/// # Fehler
/// - `InvalidData` wenn die Nachricht nicht serialisiert werden kann oder zu gross ist
/// - IO-Fehler beim Schreiben
pub async fn frame_schreiben<W>(
    writer: &mut W,
    nachricht: &SignalNachricht,
    max_frame_size: usize,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    // JSON serialisieren
    let json = serde_json::to_vec(nachricht).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("JSON-Serialisierung fehlgeschlagen: {}", e),
        )
    })?;

    // Groesse pruefen
    if json.len() > max_frame_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Nachricht zu gross: {} Bytes (Maximum: {} Bytes)",
                json.len(),
                max_frame_size
            ),
        ));
    }

    // Laengen-Feld + Payload schreiben
    let len_bytes = (json.len() as u32).to_be_bytes();
    writer.write_all(&len_bytes).await?;
    writer.write_all(&json).await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::types::UserId;

    fn test_nachricht() -> SignalNachricht {
        SignalNachricht::Anmelden {
            user_id: UserId::new(),
        }
    }

    #[test]
    fn encode_decode_roundtrip() {
        let mut codec = SignalCodec::new();
        let mut buf = BytesMut::new();

        let original = test_nachricht();
        codec
            .encode(original.clone(), &mut buf)
            .expect("encode muss funktionieren");

        let dekodiert = codec
            .decode(&mut buf)
            .expect("decode muss funktionieren")
            .expect("Frame muss vollstaendig sein");

        assert_eq!(original, dekodiert);
        assert!(buf.is_empty(), "Buffer muss vollstaendig verbraucht sein");
    }

    #[test]
    fn decode_unvollstaendiger_frame() {
        let mut codec = SignalCodec::new();
        let mut buf = BytesMut::new();

        codec
            .encode(test_nachricht(), &mut buf)
            .expect("encode muss funktionieren");

        // Nur die Haelfte des Frames anbieten
        let haelfte = buf.split_to(buf.len() / 2);
        let mut teil = haelfte;
        assert!(codec
            .decode(&mut teil)
            .expect("unvollstaendig ist kein Fehler")
            .is_none());
    }

    #[test]
    fn decode_frame_zu_gross() {
        let mut codec = SignalCodec::with_max_size(16);
        let mut buf = BytesMut::new();

        // Laengen-Feld behauptet 1024 Bytes
        buf.put_u32(1024);
        buf.put_slice(&[0u8; 32]);

        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn decode_ungueltiges_json() {
        let mut codec = SignalCodec::new();
        let mut buf = BytesMut::new();

        let muell = b"kein json";
        buf.put_u32(muell.len() as u32);
        buf.put_slice(muell);

        assert!(codec.decode(&mut buf).is_err());
    }

    #[tokio::test]
    async fn async_frame_lesen_schreiben() {
        let original = test_nachricht();

        let mut puffer: Vec<u8> = Vec::new();
        frame_schreiben(&mut puffer, &original, DEFAULT_MAX_FRAME_SIZE)
            .await
            .expect("schreiben muss funktionieren");

        let mut leser = std::io::Cursor::new(puffer);
        let gelesen = frame_lesen(&mut leser, DEFAULT_MAX_FRAME_SIZE)
            .await
            .expect("lesen muss funktionieren");

        assert_eq!(original, gelesen);
    }

    #[test]
    fn mehrere_frames_im_buffer() {
        let mut codec = SignalCodec::new();
        let mut buf = BytesMut::new();

        let a = test_nachricht();
        let b = test_nachricht();
        codec.encode(a.clone(), &mut buf).expect("encode a");
        codec.encode(b.clone(), &mut buf).expect("encode b");

        let erste = codec.decode(&mut buf).expect("decode").expect("frame a");
        let zweite = codec.decode(&mut buf).expect("decode").expect("frame b");
        assert_eq!(erste, a);
        assert_eq!(zweite, b);
    }
}
