// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the external fulfillment bot.
//!
//! Provides [`FulfillmentClient`] which posts the fixed-shape dispatch
//! payload and retries transient failures with capped exponential backoff:
//! at most `max_attempts` total attempts, with a `base * 2^(n-1)` delay
//! before attempt n and no delay before the first.

use std::time::Duration;

use nesach_config::model::FulfillmentConfig;
use nesach_core::NesachError;
use tracing::{debug, warn};

use crate::payload::DispatchPayload;

/// HTTP client for fulfillment dispatch.
#[derive(Debug, Clone)]
pub struct FulfillmentClient {
    client: reqwest::Client,
    endpoint: String,
    max_attempts: u32,
    base_backoff: Duration,
}

impl FulfillmentClient {
    /// Creates a new fulfillment client from configuration.
    pub fn new(config: &FulfillmentConfig) -> Result<Self, NesachError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| NesachError::Dispatch {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            max_attempts: config.max_attempts.max(1),
            base_backoff: Duration::from_millis(config.base_backoff_ms),
        })
    }

    /// The configured maximum number of attempts per dispatch sequence.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Posts the payload, retrying failed attempts until `max_attempts` is
    /// exhausted. An attempt fails on a non-2xx status or a transport error.
    ///
    /// Returns `Ok(())` on the first successful attempt. The returned error
    /// after exhaustion carries the last failure; callers decide whether
    /// that is fatal (for dispatch it is not -- see `Dispatcher`).
    pub async fn send(&self, payload: &DispatchPayload) -> Result<(), NesachError> {
        let mut last_error = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = backoff_delay(self.base_backoff, attempt);
                warn!(attempt, delay_ms = delay.as_millis() as u64, "retrying fulfillment dispatch");
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .post(&self.endpoint)
                .json(payload)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!(attempt, error = %e, "fulfillment request failed to send");
                    last_error = Some(NesachError::Dispatch {
                        message: format!("HTTP request failed: {e}"),
                        source: Some(Box::new(e)),
                    });
                    continue;
                }
            };

            let status = response.status();
            debug!(status = %status, attempt, "fulfillment response received");

            if status.is_success() {
                return Ok(());
            }

            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, attempt, "fulfillment bot rejected dispatch");
            last_error = Some(NesachError::Dispatch {
                message: format!("fulfillment bot returned {status}: {body}"),
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| NesachError::Dispatch {
            message: "dispatch failed with no attempts made".into(),
            source: None,
        }))
    }
}

/// Delay before attempt `n` (n >= 1): `base * 2^(n-1)`.
///
/// With the default 1000ms base this yields 1s before the second attempt
/// and 2s before the third. There is no delay before the first attempt.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * 2u32.saturating_pow(attempt.saturating_sub(1))
}
