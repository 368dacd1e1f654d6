//! parley-server – Bibliotheks-Root
//!
//! Verdrahtet Verzeichnis, Signaling-Zustand und TCP-Listener und stellt
//! den Einstiegspunkt fuer Integrationstests bereit.

use anyhow::Result;
use parley_core::types::{BenutzerProfil, GroupId, UserId};
use parley_core::ParleyError;
use parley_directory::MemoryVerzeichnis;
use parley_signaling::{SignalServer, SignalingConfig, SignalingState};
use std::sync::Arc;

pub mod config;

use config::ServerConfig;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Befuellt das Verzeichnis aus den Seed-Daten der Konfiguration
    fn verzeichnis_aufbauen(&self) -> MemoryVerzeichnis {
        let verzeichnis = MemoryVerzeichnis::neu();
        for benutzer in &self.config.seed.benutzer {
            verzeichnis.benutzer_anlegen(BenutzerProfil {
                id: UserId(benutzer.id),
                anzeige_name: benutzer.anzeige_name.clone(),
                avatar: benutzer.avatar.clone(),
            });
        }
        for gruppe in &self.config.seed.gruppen {
            verzeichnis.gruppe_anlegen(
                GroupId(gruppe.id),
                gruppe.mitglieder.iter().map(|id| UserId(*id)).collect(),
            );
        }
        tracing::info!(
            benutzer = verzeichnis.benutzer_anzahl(),
            gruppen = self.config.seed.gruppen.len(),
            "Verzeichnis befuellt"
        );
        verzeichnis
    }

    /// Startet den Signal-Server und laeuft bis zum Shutdown-Signal
    pub async fn starten(self) -> Result<()> {
        let bind_addr: std::net::SocketAddr = self.config.bind_adresse().parse().map_err(|e| {
            ParleyError::Konfiguration(format!(
                "Ungueltige Bind-Adresse '{}': {e}",
                self.config.bind_adresse()
            ))
        })?;

        tracing::info!(
            server_name = %self.config.server.name,
            adresse = %bind_addr,
            "Server startet"
        );

        let verzeichnis = self.verzeichnis_aufbauen();
        let signaling_config = SignalingConfig {
            server_name: self.config.server.name.clone(),
            max_verbindungen: self.config.server.max_verbindungen,
            handshake_timeout_sek: self.config.server.handshake_timeout_sek,
        };
        let state = SignalingState::neu(
            signaling_config,
            Arc::new(verzeichnis.clone()),
            Arc::new(verzeichnis),
        );

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                let _ = shutdown_tx.send(true);
            }
        });

        SignalServer::neu(state, bind_addr).starten(shutdown_rx).await?;
        Ok(())
    }
}
