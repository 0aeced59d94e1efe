//! Bounded retry for generation calls.
//!
//! Failures are classified from the rendered error text: anything that
//! mentions 429 counts as a rate limit and honors a `Retry-After: N` hint
//! when one is present; everything else waits a short fixed interval.
//! Running out of attempts is a distinct outcome, never a success value.

use std::future::Future;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::config::RetrySettings;
use crate::gigachat::ChatError;

static RETRY_AFTER_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"Retry-After:\s*(\d+)").expect("valid Retry-After regex"));

/// Attempt budget and waits for one class of generation call.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub rate_limit_wait: Duration,
  pub transient_wait: Duration,
}

impl RetryPolicy {
  /// Budget for day material, the call learners block on.
  pub fn material(s: &RetrySettings) -> Self {
    Self {
      max_attempts: s.material_attempts,
      rate_limit_wait: s.rate_limit_wait(),
      transient_wait: s.transient_wait(),
    }
  }

  /// Budget for quiz, grading and summary calls.
  pub fn standard(s: &RetrySettings) -> Self {
    Self {
      max_attempts: s.default_attempts,
      rate_limit_wait: s.rate_limit_wait(),
      transient_wait: s.transient_wait(),
    }
  }

  /// Zero-wait policy so loop tests finish instantly.
  #[cfg(test)]
  pub fn instant(max_attempts: u32) -> Self {
    Self {
      max_attempts,
      rate_limit_wait: Duration::ZERO,
      transient_wait: Duration::ZERO,
    }
  }
}

/// Result of a retried call. Exhaustion carries the last error text and is
/// never folded into the success payload.
#[derive(Debug)]
pub enum RetryOutcome {
  Success { text: String, attempts: u32 },
  Exhausted { attempts: u32, last_error: String },
}

/// Wait to apply after a failed attempt, chosen from the error text.
/// A rate limit with an unusable Retry-After value falls back to the
/// policy's rate-limit wait.
pub fn wait_for(error_text: &str, policy: &RetryPolicy) -> Duration {
  if error_text.contains("429") {
    if let Some(secs) = RETRY_AFTER_RE
      .captures(error_text)
      .and_then(|caps| caps.get(1))
      .and_then(|m| m.as_str().parse::<u64>().ok())
    {
      return Duration::from_secs(secs);
    }
    policy.rate_limit_wait
  } else {
    policy.transient_wait
  }
}

/// Drive `call` until it succeeds or the attempt budget runs out.
/// No wait is spent after the final attempt.
pub async fn run_with_retry<F, Fut>(op_name: &str, policy: &RetryPolicy, mut call: F) -> RetryOutcome
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<String, ChatError>>,
{
  let mut last_error = String::from("no attempts were made");
  for attempt in 1..=policy.max_attempts {
    match call().await {
      Ok(text) => return RetryOutcome::Success { text, attempts: attempt },
      Err(e) => {
        let error_text = e.to_string();
        let wait = wait_for(&error_text, policy);
        warn!(
          target: "kurso_backend",
          op = op_name,
          attempt,
          max_attempts = policy.max_attempts,
          wait_secs = wait.as_secs(),
          error = %error_text,
          "Generation attempt failed"
        );
        last_error = error_text;
        if attempt < policy.max_attempts {
          tokio::time::sleep(wait).await;
        }
      }
    }
  }
  RetryOutcome::Exhausted { attempts: policy.max_attempts, last_error }
}
