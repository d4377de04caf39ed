use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::extract::{Extraction, Source};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
// Bounded wait for a single request; the model call can be slow when search
// grounding is enabled, but it must not hang the session forever.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;

/// Client for the Gemini generateContent endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Build a client from the GEMINI_API_KEY environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow!("GEMINI_API_KEY environment variable must be set"))?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(GeminiClient {
            http,
            api_key,
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Extract structured product fields from raw text.
    ///
    /// Empty or whitespace-only input is rejected before any network
    /// traffic. Any failure (network, non-success status after retries,
    /// malformed envelope or payload) surfaces as an error with the record
    /// untouched; merging is the caller's step.
    pub async fn extract_product(&self, raw_text: &str) -> Result<Extraction> {
        let raw_text = raw_text.trim();
        if raw_text.is_empty() {
            bail!("Extraction input is empty");
        }

        let start = Instant::now();
        let envelope = self.post_with_retry(&request_body(raw_text)).await?;
        debug!(
            "Gemini answered in {:.1}s",
            start.elapsed().as_secs_f64()
        );
        parse_envelope(&envelope)
    }

    async fn post_with_retry(&self, body: &Value) -> Result<Value> {
        let url = format!("{}/{}:generateContent", API_BASE, self.model);

        for attempt in 0..=MAX_RETRIES {
            let response = self
                .http
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(body)
                .send()
                .await
                .context("Gemini request failed")?;

            let status = response.status();
            if status.is_success() {
                return response
                    .json::<Value>()
                    .await
                    .context("Gemini response was not valid JSON");
            }

            let transient = status.as_u16() == 429 || status.is_server_error();
            if !transient || attempt == MAX_RETRIES {
                let detail = response.text().await.unwrap_or_default();
                bail!("Gemini returned {}: {}", status, detail);
            }

            let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
            warn!(
                "Gemini returned {} (attempt {}/{}), backing off {:.1}s",
                status,
                attempt + 1,
                MAX_RETRIES,
                backoff.as_secs_f64()
            );
            tokio::time::sleep(backoff).await;
        }

        bail!("Gemini retries exhausted")
    }
}

/// The product-assistant prompt: category taxonomy, the always-wanted fields
/// (SKU, weight, size), Vietnamese translation of every label/value, and a
/// narrative description.
fn prompt(raw_text: &str) -> String {
    format!(
        "You are a product data assistant.\n\
         \n\
         User Input: \"{raw_text}\"\n\
         \n\
         Task:\n\
         1. Identify the product category (Book, Toy, Stationery, Electronics, Household, etc.).\n\
         2. Extract specific specifications relevant to that category as key-value pairs (Label and Value).\n\
            - For BOOKS: Author, Publisher, Publish Year, Pages, Format.\n\
            - For TOYS: Brand, Material, Origin, Age Range.\n\
            - For STATIONERY: Brand, Color, Unit, Type.\n\
            - For GENERAL GOODS: Brand, Origin, Expiry Date, Ingredients.\n\
         3. Always extract \"Mã Hàng\" (SKU / Barcode / ISBN) if available.\n\
         4. Always extract \"Trọng lượng\" (Weight) and \"Kích thước\" (Size) if available.\n\
         5. Translate all labels and values to Vietnamese (e.g., \"Material\" -> \"Chất liệu\", \"Plastic\" -> \"Nhựa\").\n\
         6. For 'additionalInfo', write a compelling product description in Vietnamese.\n\
         \n\
         Return data in JSON format with a list of attributes."
    )
}

/// Request body: prompt, search grounding, and the fixed response schema the
/// partial-record deserializer expects.
fn request_body(raw_text: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt(raw_text) }] }],
        "tools": [{ "google_search": {} }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "sku": {
                        "type": "STRING",
                        "description": "Product code / Barcode / ISBN"
                    },
                    "attributes": {
                        "type": "ARRAY",
                        "description": "List of product specifications for the table rows",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "label": { "type": "STRING" },
                                "value": { "type": "STRING" }
                            }
                        }
                    },
                    "additionalInfo": {
                        "type": "STRING",
                        "description": "Product description in Vietnamese"
                    }
                }
            }
        }
    })
}

/// Pull the JSON payload and grounding citations out of the response
/// envelope: `candidates[0].content.parts[*].text` holds the payload,
/// `candidates[0].groundingMetadata.groundingChunks[*].web` the sources.
fn parse_envelope(envelope: &Value) -> Result<Extraction> {
    let candidate = envelope
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| anyhow!("Gemini response has no candidates"))?;

    let text: String = candidate
        .pointer("/content/parts")
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect()
        })
        .ok_or_else(|| anyhow!("Gemini candidate has no content parts"))?;

    let mut extraction: Extraction = serde_json::from_str(text.trim())
        .context("Gemini payload did not match the expected schema")?;

    let mut sources = Vec::new();
    if let Some(chunks) = candidate
        .pointer("/groundingMetadata/groundingChunks")
        .and_then(|c| c.as_array())
    {
        for chunk in chunks {
            if let Some(uri) = chunk.pointer("/web/uri").and_then(|u| u.as_str()) {
                let title = chunk
                    .pointer("/web/title")
                    .and_then(|t| t.as_str())
                    .unwrap_or("Source");
                sources.push(Source {
                    title: title.to_string(),
                    uri: uri.to_string(),
                });
            }
        }
    }
    extraction.sources = sources;

    Ok(extraction)
}

// ── Tests ──
