use std::{
    sync::atomic::{AtomicI32, Ordering},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{config::Config, error::ApiError};

const LOBBY_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct CreateLobbyResponse {
    id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LobbyHealth {
    pub status: bool,
    #[serde(default)]
    pub lobby_count: u32,
    #[serde(default)]
    pub message: String,
}

/// Creates multiplayer lobbies for opened colonies.
pub enum Lobbies {
    /// The multiplayer backend reached over its internal address.
    Remote {
        client: reqwest::Client,
        internal_address: String,
    },
    /// In-process ids, used when no multiplayer backend is configured.
    Local { next_id: AtomicI32 },
}

impl Lobbies {
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        match config.multiplayer_internal.as_ref() {
            Some(address) => Self::remote(address),
            None => {
                log::warn!(
                    "[multiplayer] No internal multiplayer address configured, using local lobby ids"
                );

                Ok(Self::local())
            }
        }
    }

    pub fn remote(internal_address: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(LOBBY_REQUEST_TIMEOUT)
            .build()?;

        Ok(Lobbies::Remote {
            client,
            internal_address: internal_address.trim_end_matches('/').to_string(),
        })
    }

    pub fn local() -> Self {
        Lobbies::Local {
            next_id: AtomicI32::new(1),
        }
    }

    pub async fn create_lobby(&self, owner_id: i32, colony_id: i32) -> Result<i32, ApiError> {
        match self {
            Lobbies::Local { next_id } => Ok(next_id.fetch_add(1, Ordering::Relaxed)),

            Lobbies::Remote {
                client,
                internal_address,
            } => {
                let url = format!("{}/create-lobby", internal_address);

                let response = client
                    .post(&url)
                    .query(&[
                        ("ownerID", owner_id.to_string()),
                        ("encoding", "binary".to_string()),
                        ("colonyID", colony_id.to_string()),
                    ])
                    .send()
                    .await
                    .map_err(|e| ApiError::Lobby(format!("Failed to reach {}: {}", url, e)))?;

                let status = response.status();

                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();

                    return Err(ApiError::Lobby(format!(
                        "Lobby creation failed with status {}: {}",
                        status, body
                    )));
                }

                let CreateLobbyResponse { id } = response
                    .json()
                    .await
                    .map_err(|e| ApiError::Lobby(format!("Invalid lobby response: {}", e)))?;

                log::info!(
                    "[multiplayer] Created lobby {} for colony {} (owner {})",
                    id,
                    colony_id,
                    owner_id
                );

                i32::try_from(id)
                    .map_err(|_| ApiError::Lobby(format!("Lobby id {} is out of range", id)))
            }
        }
    }

    pub async fn health(&self) -> LobbyHealth {
        match self {
            Lobbies::Local { next_id } => LobbyHealth {
                status: true,
                lobby_count: next_id.load(Ordering::Relaxed).saturating_sub(1).max(0) as u32,
                message: "Local lobbies".to_string(),
            },

            Lobbies::Remote {
                client,
                internal_address,
            } => {
                let result = fetch_health(client, internal_address).await;

                result.unwrap_or_else(|e| LobbyHealth {
                    status: false,
                    lobby_count: 0,
                    message: format!("Error checking connection: {}", e),
                })
            }
        }
    }
}

async fn fetch_health(
    client: &reqwest::Client,
    internal_address: &str,
) -> Result<LobbyHealth, reqwest::Error> {
    client
        .get(format!("{}/health", internal_address))
        .send()
        .await?
        .error_for_status()?
        .json::<LobbyHealth>()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn local_lobby_ids_increase() {
        let lobbies = Lobbies::local();

        assert_eq!(lobbies.create_lobby(1, 10).await.unwrap(), 1);
        assert_eq!(lobbies.create_lobby(2, 11).await.unwrap(), 2);
        assert_eq!(lobbies.health().await.lobby_count, 2);
    }

    #[actix_web::test]
    async fn unreachable_backend_is_a_lobby_error() {
        let lobbies = Lobbies::remote("http://127.0.0.1:9").unwrap();

        assert!(matches!(
            lobbies.create_lobby(1, 1).await,
            Err(ApiError::Lobby(_))
        ));
        assert!(!lobbies.health().await.status);
    }

    #[test]
    fn health_payload_tolerates_missing_fields() {
        let health: LobbyHealth = serde_json::from_str(r#"{"status": true}"#).unwrap();

        assert!(health.status);
        assert_eq!(health.lobby_count, 0);
    }
}
