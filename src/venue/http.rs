//! HTTP client for a liquidity venue's accounting API.

use alloy_primitives::U256;
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::{AccountId, AssetId, PoolId, PositionId, PositionInfo};

use super::{AssetTransfer, PositionCustody, PositionOracle, VenueError};

/// Venue client speaking the venue's JSON API.
///
/// Idempotent reads (position metadata, accumulator snapshots) retry with
/// exponential backoff on transient failures. Transfers are never retried:
/// they move value and a duplicate would double-move it.
#[derive(Debug, Clone)]
pub struct HttpVenue {
    client: Client,
    base_url: String,
}

impl HttpVenue {
    /// Create a venue client for the given API base URL.
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value, VenueError> {
        let url = format!("{}{}", self.base_url, path);
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self.client.get(&url).send().await.map_err(|e| {
                backoff::Error::transient(VenueError::NetworkError(e.to_string()))
            })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(VenueError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(VenueError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(VenueError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(VenueError::ParseError(e.to_string())))
        })
        .await
    }

    async fn post_json(
        &self,
        path: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, VenueError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| VenueError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %message, "venue rejected request");
            return Err(VenueError::TransferRejected(message));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| VenueError::ParseError(e.to_string()))
    }
}

fn json_str<'a>(value: &'a serde_json::Value, field: &str) -> Result<&'a str, VenueError> {
    value[field]
        .as_str()
        .ok_or_else(|| VenueError::ParseError(format!("missing field {}", field)))
}

fn json_i32(value: &serde_json::Value, field: &str) -> Result<i32, VenueError> {
    value[field]
        .as_i64()
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| VenueError::ParseError(format!("missing field {}", field)))
}

fn parse_u256(raw: &str) -> Result<U256, VenueError> {
    U256::from_str(raw).map_err(|e| VenueError::ParseError(format!("bad U256 {}: {}", raw, e)))
}

fn parse_u128(raw: &str) -> Result<u128, VenueError> {
    raw.parse::<u128>()
        .map_err(|e| VenueError::ParseError(format!("bad u128 {}: {}", raw, e)))
}

#[async_trait]
impl PositionOracle for HttpVenue {
    async fn resolve_position(&self, position: PositionId) -> Result<PositionInfo, VenueError> {
        debug!(%position, "resolving position");

        let value = match self
            .get_json(&format!("/v1/positions/{}", position.as_u64()))
            .await
        {
            Ok(value) => value,
            Err(VenueError::HttpError { status: 404, .. }) => {
                return Err(VenueError::UnknownPosition(position))
            }
            Err(e) => return Err(e),
        };

        Ok(PositionInfo {
            pool: PoolId::new(json_str(&value, "pool")?.to_string()),
            tick_lower: json_i32(&value, "tickLower")?,
            tick_upper: json_i32(&value, "tickUpper")?,
            liquidity: parse_u128(json_str(&value, "liquidity")?)?,
        })
    }

    async fn seconds_per_liquidity_inside_x128(
        &self,
        pool: &PoolId,
        tick_lower: i32,
        tick_upper: i32,
    ) -> Result<U256, VenueError> {
        debug!(%pool, tick_lower, tick_upper, "sampling accumulator");

        let value = self
            .get_json(&format!(
                "/v1/pools/{}/seconds-per-liquidity?tickLower={}&tickUpper={}",
                pool.as_str(),
                tick_lower,
                tick_upper
            ))
            .await?;

        parse_u256(json_str(&value, "accumulatorX128")?)
    }
}

#[async_trait]
impl AssetTransfer for HttpVenue {
    async fn pull(&self, asset: &AssetId, from: &AccountId, amount: u128) -> Result<(), VenueError> {
        debug!(%asset, %from, amount, "pulling assets into custody");
        self.post_json(
            "/v1/transfers",
            serde_json::json!({
                "direction": "pull",
                "asset": asset.as_str(),
                "account": from.as_str(),
                "amount": amount.to_string(),
            }),
        )
        .await
        .map(|_| ())
    }

    async fn push(&self, asset: &AssetId, to: &AccountId, amount: u128) -> Result<(), VenueError> {
        debug!(%asset, %to, amount, "pushing assets out of custody");
        self.post_json(
            "/v1/transfers",
            serde_json::json!({
                "direction": "push",
                "asset": asset.as_str(),
                "account": to.as_str(),
                "amount": amount.to_string(),
            }),
        )
        .await
        .map(|_| ())
    }
}

#[async_trait]
impl PositionCustody for HttpVenue {
    async fn transfer_position(
        &self,
        position: PositionId,
        to: &AccountId,
    ) -> Result<(), VenueError> {
        debug!(%position, %to, "transferring position custody");
        self.post_json(
            &format!("/v1/positions/{}/transfer", position.as_u64()),
            serde_json::json!({ "to": to.as_str() }),
        )
        .await
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u256_decimal_and_hex() {
        assert_eq!(parse_u256("1000").unwrap(), U256::from(1000u64));
        assert_eq!(parse_u256("0x10").unwrap(), U256::from(16u8));
        assert!(parse_u256("not-a-number").is_err());
    }

    #[test]
    fn test_json_field_helpers() {
        let value = serde_json::json!({"pool": "0xp", "tickLower": -60});
        assert_eq!(json_str(&value, "pool").unwrap(), "0xp");
        assert_eq!(json_i32(&value, "tickLower").unwrap(), -60);
        assert!(json_str(&value, "missing").is_err());
        assert!(json_i32(&value, "pool").is_err());
    }
}
