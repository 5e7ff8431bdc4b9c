/// Card source: the single point of entry for card catalogue lookups.
///
/// The placement engine never talks to the catalogue itself. "Add entire set"
/// flows go through a `CardSource`, held by the service as `Arc<dyn CardSource>`.
/// `HttpCardSource` reads a paged JSON card API (pokemontcg.io v2 layout).
use std::cmp::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::binder::models::CardData;

const PAGE_SIZE: usize = 250;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum CardSourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("Unknown set '{0}'")]
    SetNotFound(String),
}

#[async_trait]
pub trait CardSource: Send + Sync {
    /// Every card of a set, in collector-number order.
    async fn fetch_set(&self, set_id: &str) -> Result<Vec<CardData>, CardSourceError>;

    /// Number of cards in a set, without fetching them.
    async fn set_size(&self, set_id: &str) -> Result<usize, CardSourceError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CardPage {
    data: Vec<CardData>,
    #[serde(rename = "totalCount")]
    total_count: usize,
}

#[derive(Debug, Deserialize)]
struct SetResponse {
    data: SetInfo,
}

#[derive(Debug, Deserialize)]
struct SetInfo {
    total: usize,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP implementation
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct HttpCardSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpCardSource {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, CardSourceError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(60)).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let request = self.client.get(format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => request.header("X-Api-Key", key),
            None => request,
        }
    }

    /// GETs `path` and decodes the JSON body.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CardSourceError> {
        let mut last_error = CardSourceError::RateLimited {
            retries: MAX_RETRIES,
        };

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Card API attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.get(path).query(query).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = CardSourceError::Http(e);
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 {
                warn!("Card API rate limited the request");
                last_error = CardSourceError::RateLimited {
                    retries: MAX_RETRIES,
                };
                continue;
            }

            if status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Card API returned {}: {}", status, body);
                last_error = CardSourceError::Api {
                    status: status.as_u16(),
                    message: body,
                };
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(CardSourceError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let body = response.text().await?;
            return Ok(serde_json::from_str(&body)?);
        }

        Err(last_error)
    }
}

#[async_trait]
impl CardSource for HttpCardSource {
    async fn fetch_set(&self, set_id: &str) -> Result<Vec<CardData>, CardSourceError> {
        let mut cards = Vec::new();
        let mut page = 1usize;

        loop {
            let batch: CardPage = self
                .get_json(
                    "/cards",
                    &[
                        ("q", format!("set.id:{set_id}")),
                        ("page", page.to_string()),
                        ("pageSize", PAGE_SIZE.to_string()),
                    ],
                )
                .await?;
            let fetched = batch.data.len();
            cards.extend(batch.data);
            debug!(set_id, page, fetched, total = batch.total_count, "Fetched card page");

            if fetched == 0 || cards.len() >= batch.total_count {
                break;
            }
            page += 1;
        }

        if cards.is_empty() {
            return Err(CardSourceError::SetNotFound(set_id.to_string()));
        }
        sort_by_collector_number(&mut cards);
        Ok(cards)
    }

    async fn set_size(&self, set_id: &str) -> Result<usize, CardSourceError> {
        match self.get_json::<SetResponse>(&format!("/sets/{set_id}"), &[]).await {
            Ok(set) => Ok(set.data.total),
            Err(CardSourceError::Api { status: 404, .. }) => {
                Err(CardSourceError::SetNotFound(set_id.to_string()))
            }
            Err(e) => Err(e),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Ordering
// ────────────────────────────────────────────────────────────────────────────

/// Orders cards the way they are printed: numeric collector numbers ascending,
/// then prefixed numbers ("TG05", "SV12") after them, then cards without a number.
pub fn sort_by_collector_number(cards: &mut [CardData]) {
    cards.sort_by(|a, b| compare_numbers(a.number(), b.number()));
}

fn compare_numbers(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => number_key(a).cmp(&number_key(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// (has alphabetic prefix, prefix, numeric part, suffix)
fn number_key(number: &str) -> (bool, String, u32, String) {
    let prefix: String = number.chars().take_while(|c| !c.is_ascii_digit()).collect();
    let rest = &number[prefix.len()..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    let suffix = rest[digits.len()..].to_string();
    let numeric = digits.parse().unwrap_or(u32::MAX);
    (!prefix.is_empty(), prefix, numeric, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn numbered(number: Option<&str>) -> CardData {
        match number {
            Some(n) => CardData(json!({ "id": format!("x-{n}"), "number": n })),
            None => CardData(json!({ "id": "x-none" })),
        }
    }

    #[test]
    fn test_sort_numeric_not_lexicographic() {
        let mut cards = vec![numbered(Some("10")), numbered(Some("2")), numbered(Some("1"))];
        sort_by_collector_number(&mut cards);
        let numbers: Vec<_> = cards.iter().map(|c| c.number().unwrap()).collect();
        assert_eq!(numbers, vec!["1", "2", "10"]);
    }

    #[test]
    fn test_sort_prefixed_and_missing_numbers_last() {
        let mut cards = vec![
            numbered(None),
            numbered(Some("TG05")),
            numbered(Some("12a")),
            numbered(Some("12")),
            numbered(Some("TG01")),
        ];
        sort_by_collector_number(&mut cards);
        let numbers: Vec<_> = cards.iter().map(|c| c.number()).collect();
        assert_eq!(
            numbers,
            vec![Some("12"), Some("12a"), Some("TG01"), Some("TG05"), None]
        );
    }

    #[test]
    fn test_card_page_decodes() {
        let page: CardPage = serde_json::from_value(json!({
            "data": [{"id": "sv1-1", "rarity": "Common", "number": "1"}],
            "page": 1,
            "pageSize": 250,
            "count": 1,
            "totalCount": 1
        }))
        .unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.data[0].id(), Some("sv1-1"));
    }
}
