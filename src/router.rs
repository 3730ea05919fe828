//! Two-tier backend routing for swap quotes
//!
//! Quote callers try the internal quoting backend first and fall back once
//! to the public upstream API. The decision is surfaced as an explicit
//! two-branch result instead of exception-driven control flow, so callers
//! and tests can observe which tier answered. There is no retry loop: one
//! fallback attempt per call, and a missing result from the fallback is
//! terminal.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

use crate::config::RouterSettings;
use crate::errors::TxEngineError;

/// Which tier produced the value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed<T> {
    Primary(T),
    Fallback(T),
}

impl<T> Routed<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Primary(value) | Self::Fallback(value) => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Run `primary`, falling back to `fallback` on any primary error
///
/// The fallback may legitimately find nothing (`Ok(None)`), which maps to
/// `RouteNotFound`; its transport errors propagate unchanged.
pub async fn route_with_fallback<T, P, F, PFut, FFut>(
    primary: Option<P>,
    fallback: F,
) -> Result<Routed<T>, TxEngineError>
where
    P: FnOnce() -> PFut,
    F: FnOnce() -> FFut,
    PFut: Future<Output = Result<T, TxEngineError>>,
    FFut: Future<Output = Result<Option<T>, TxEngineError>>,
{
    if let Some(primary) = primary {
        match primary().await {
            Ok(value) => return Ok(Routed::Primary(value)),
            Err(err) => {
                warn!(
                    category = err.category(),
                    error = %err,
                    "primary backend failed, trying public fallback"
                );
            }
        }
    }

    match fallback().await? {
        Some(value) => Ok(Routed::Fallback(value)),
        None => Err(TxEngineError::RouteNotFound),
    }
}

/// Swap quote request forwarded to either tier
#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    /// Input amount in base units
    pub amount: u64,
    pub slippage_bps: u16,
}

/// Quote returned by the backend or the public upstream
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount: String,
    pub out_amount: String,
    #[serde(default)]
    pub price_impact_pct: Option<String>,
    #[serde(default)]
    pub route_plan: Vec<serde_json::Value>,
}

/// Quote client layered on the fallback router
#[derive(Debug, Clone)]
pub struct SwapQuoteClient {
    http: reqwest::Client,
    backend_url: Option<String>,
    public_url: String,
}

impl SwapQuoteClient {
    pub fn new(settings: &RouterSettings) -> Result<Self, TxEngineError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| TxEngineError::Internal(format!("http client init failed: {}", e)))?;

        Ok(Self {
            http,
            backend_url: settings.backend_url.clone(),
            public_url: settings.public_url.clone(),
        })
    }

    /// Fetch a quote, preferring the internal backend
    pub async fn quote(&self, request: &QuoteRequest) -> Result<Routed<SwapQuote>, TxEngineError> {
        let primary = self
            .backend_url
            .as_ref()
            .map(|url| move || self.backend_quote(url.clone(), request));

        let routed = route_with_fallback(primary, || self.public_quote(request)).await?;
        debug!(
            input_mint = %request.input_mint,
            output_mint = %request.output_mint,
            fallback = routed.is_fallback(),
            "quote resolved"
        );
        Ok(routed)
    }

    async fn backend_quote(
        &self,
        url: String,
        request: &QuoteRequest,
    ) -> Result<SwapQuote, TxEngineError> {
        let payload = json!({
            "inputMint": request.input_mint.to_string(),
            "outputMint": request.output_mint.to_string(),
            "amount": request.amount,
            "slippageBps": request.slippage_bps,
        });

        let resp = self
            .http
            .post(format!("{}/quote", url.trim_end_matches('/')))
            .json(&payload)
            .send()
            .await
            .map_err(|e| TxEngineError::Rpc(format!("backend quote request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TxEngineError::Rpc(format!(
                "backend quote returned status {}",
                status
            )));
        }

        resp.json()
            .await
            .map_err(|e| TxEngineError::Rpc(format!("backend quote parse failed: {}", e)))
    }

    async fn public_quote(
        &self,
        request: &QuoteRequest,
    ) -> Result<Option<SwapQuote>, TxEngineError> {
        let resp = self
            .http
            .get(format!("{}/quote", self.public_url.trim_end_matches('/')))
            .query(&[
                ("inputMint", request.input_mint.to_string()),
                ("outputMint", request.output_mint.to_string()),
                ("amount", request.amount.to_string()),
                ("slippageBps", request.slippage_bps.to_string()),
            ])
            .send()
            .await
            .map_err(|e| TxEngineError::Rpc(format!("public quote request failed: {}", e)))?;

        let status = resp.status();
        // No route for this pair is a result, not a transport failure
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::BAD_REQUEST {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(TxEngineError::Rpc(format!(
                "public quote returned status {}",
                status
            )));
        }

        let quote = resp
            .json()
            .await
            .map_err(|e| TxEngineError::Rpc(format!("public quote parse failed: {}", e)))?;
        Ok(Some(quote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ok_primary() -> Result<u32, TxEngineError> {
        Ok(1)
    }

    async fn failing_primary() -> Result<u32, TxEngineError> {
        Err(TxEngineError::Rpc("backend down".to_string()))
    }

    async fn unreachable_fallback() -> Result<Option<u32>, TxEngineError> {
        panic!("fallback must not run")
    }

    #[tokio::test]
    async fn test_primary_success_never_hits_fallback() {
        let routed = route_with_fallback(Some(ok_primary), unreachable_fallback)
            .await
            .expect("route");
        assert_eq!(routed, Routed::Primary(1));
        assert!(!routed.is_fallback());
    }

    #[tokio::test]
    async fn test_primary_failure_falls_back_once() {
        let routed = route_with_fallback(Some(failing_primary), || async { Ok(Some(2)) })
            .await
            .expect("route");
        assert_eq!(routed, Routed::Fallback(2));
        assert_eq!(routed.into_inner(), 2);
    }

    #[tokio::test]
    async fn test_no_primary_goes_straight_to_fallback() {
        let routed = route_with_fallback(
            None::<fn() -> std::future::Ready<Result<u32, TxEngineError>>>,
            || async { Ok(Some(3)) },
        )
        .await
        .expect("route");
        assert_eq!(routed, Routed::Fallback(3));
    }

    #[tokio::test]
    async fn test_missing_fallback_result_is_route_not_found() {
        let result =
            route_with_fallback(Some(failing_primary), || async { Ok(None::<u32>) }).await;
        assert!(matches!(result, Err(TxEngineError::RouteNotFound)));
    }

    #[tokio::test]
    async fn test_fallback_error_propagates() {
        let result = route_with_fallback(Some(failing_primary), || async {
            Err::<Option<u32>, _>(TxEngineError::Rpc("upstream down".to_string()))
        })
        .await;
        assert!(matches!(result, Err(TxEngineError::Rpc(_))));
    }

    #[test]
    fn test_quote_response_parsing() {
        let raw = serde_json::json!({
            "inputMint": "So11111111111111111111111111111111111111112",
            "outputMint": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            "inAmount": "1000000000",
            "outAmount": "153220000",
            "priceImpactPct": "0.01",
            "routePlan": [{"swapInfo": {}, "percent": 100}]
        });

        let quote: SwapQuote = serde_json::from_value(raw).expect("parse");
        assert_eq!(quote.out_amount, "153220000");
        assert_eq!(quote.route_plan.len(), 1);
    }
}
