//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist. Das In-Memory-Verzeichnis wird ueber die
//! `[[seed.benutzer]]`- und `[[seed.gruppen]]`-Tabellen befuellt.

use parley_core::ParleyError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Startdaten fuer das In-Memory-Verzeichnis
    pub seed: SeedEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
    /// Maximale Anzahl gleichzeitiger Verbindungen
    pub max_verbindungen: u32,
    /// Zeitlimit fuer den connect-Handshake in Sekunden
    pub handshake_timeout_sek: u64,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Parley Server".into(),
            max_verbindungen: 512,
            handshake_timeout_sek: 10,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse des TCP-Listeners
    pub bind_adresse: String,
    /// Port des TCP-Listeners
    pub port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 9400,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Startdaten: bekannte Benutzer und Gruppen
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedEinstellungen {
    /// Benutzerprofile
    pub benutzer: Vec<SeedBenutzer>,
    /// Gruppen mit Mitgliederlisten
    pub gruppen: Vec<SeedGruppe>,
}

/// Ein Benutzer aus der Konfiguration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedBenutzer {
    /// User-ID (UUID)
    pub id: Uuid,
    /// Anzeigename
    pub anzeige_name: String,
    /// Avatar-URL (optional)
    pub avatar: Option<String>,
}

/// Eine Gruppe aus der Konfiguration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedGruppe {
    /// Gruppen-ID (UUID)
    pub id: Uuid,
    /// Mitglieder (User-IDs)
    pub mitglieder: Vec<Uuid>,
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> Result<Self, ParleyError> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt).map_err(|e| {
                    ParleyError::Konfiguration(format!("Fehler in '{pfad}': {e}"))
                })?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(ParleyError::Konfiguration(format!(
                "Datei '{pfad}' nicht lesbar: {e}"
            ))),
        }
    }

    /// Gibt die vollstaendige Bind-Adresse zurueck
    pub fn bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.server.max_verbindungen, 512);
        assert_eq!(cfg.netzwerk.port, 9400);
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.seed.benutzer.is_empty());
    }

    #[test]
    fn bind_adresse() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_adresse(), "0.0.0.0:9400");
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [server]
            name = "Mein Server"
            max_verbindungen = 100

            [netzwerk]
            port = 10000

            [[seed.benutzer]]
            id = "6e9f2b4a-0d4e-4c5a-9b7e-1f2a3b4c5d6e"
            anzeige_name = "ada"

            [[seed.gruppen]]
            id = "0b1c2d3e-4f5a-6b7c-8d9e-0f1a2b3c4d5e"
            mitglieder = ["6e9f2b4a-0d4e-4c5a-9b7e-1f2a3b4c5d6e"]
        "#;
        let cfg: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.server.name, "Mein Server");
        assert_eq!(cfg.server.max_verbindungen, 100);
        assert_eq!(cfg.netzwerk.port, 10000);
        assert_eq!(cfg.seed.benutzer.len(), 1);
        assert_eq!(cfg.seed.benutzer[0].anzeige_name, "ada");
        assert_eq!(cfg.seed.gruppen[0].mitglieder.len(), 1);
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.server.handshake_timeout_sek, 10);
        assert_eq!(cfg.netzwerk.bind_adresse, "0.0.0.0");
    }
}
