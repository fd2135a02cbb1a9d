//! Utility functions for text chunking and Telegram call retries.

use anyhow::Result;
use std::time::Duration;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;
use tracing::warn;

/// Splits text into consecutive chunks of at most `max_chars` characters.
///
/// Chunks are cut on character boundaries only, so concatenating them yields the
/// input unchanged. Empty input yields no chunks.
///
/// # Examples
///
/// ```
/// use relay_chat_bot::utils::split_message;
///
/// let parts = split_message(&"a".repeat(9000), 4096);
/// let sizes: Vec<usize> = parts.iter().map(|p| p.chars().count()).collect();
/// assert_eq!(sizes, vec![4096, 4096, 808]);
/// ```
#[must_use]
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for c in text.chars() {
        if count == max_chars {
            parts.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(c);
        count += 1;
    }

    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Safely truncates a string to a maximum character length (not bytes).
///
/// This is UTF-8 safe and will not panic on multi-byte characters.
///
/// # Examples
///
/// ```
/// use relay_chat_bot::utils::truncate_str;
/// let s = "Привет, мир!";
/// assert_eq!(truncate_str(s, 6), "Привет");
/// ```
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}

/// Retry a Telegram API operation a small, fixed number of times.
///
/// Delivery failures are retried [`TELEGRAM_API_MAX_RETRIES`] times with a fixed
/// [`TELEGRAM_API_RETRY_DELAY_MS`] pause, after which the last error is returned.
///
/// [`TELEGRAM_API_MAX_RETRIES`]: crate::config::TELEGRAM_API_MAX_RETRIES
/// [`TELEGRAM_API_RETRY_DELAY_MS`]: crate::config::TELEGRAM_API_RETRY_DELAY_MS
///
/// # Examples
///
/// ```no_run
/// use relay_chat_bot::utils::retry_telegram_operation;
/// use anyhow::Result;
///
/// async fn send() -> Result<()> {
///     Ok(())
/// }
///
/// # async fn example() -> Result<()> {
/// retry_telegram_operation(|| async { send().await }).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns the error of the final attempt.
pub async fn retry_telegram_operation<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    use crate::config::{TELEGRAM_API_MAX_RETRIES, TELEGRAM_API_RETRY_DELAY_MS};

    retry_with_fixed_delay(
        operation,
        Duration::from_millis(TELEGRAM_API_RETRY_DELAY_MS),
        TELEGRAM_API_MAX_RETRIES,
    )
    .await
}

async fn retry_with_fixed_delay<F, Fut, T>(
    operation: F,
    delay: Duration,
    retries: usize,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    let strategy = FixedInterval::from_millis(millis).take(retries);

    Retry::start(strategy, operation).await.map_err(|e| {
        warn!(
            "Telegram API operation failed after {} attempts: {}",
            retries + 1,
            e
        );
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_truncate_str_unicode() {
        let s = "Привет, мир!";
        assert_eq!(truncate_str(s, 6), "Привет");
        assert_eq!(truncate_str(s, 50), "Привет, мир!");
    }

    #[test]
    fn test_split_exact_sizes() {
        let parts = split_message(&"x".repeat(9000), 4096);
        let sizes: Vec<usize> = parts.iter().map(String::len).collect();
        assert_eq!(sizes, vec![4096, 4096, 808]);
    }

    #[test]
    fn test_split_short_and_empty() {
        assert_eq!(split_message("hello", 4096), vec!["hello".to_string()]);
        assert!(split_message("", 4096).is_empty());
        assert_eq!(split_message(&"y".repeat(4096), 4096).len(), 1);
    }

    #[test]
    fn test_split_counts_characters_not_bytes() {
        let text = "ж".repeat(5000);
        let parts = split_message(&text, 4096);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].chars().count(), 4096);
        assert_eq!(parts[1].chars().count(), 904);
        assert_eq!(parts.concat(), text);
    }

    #[tokio::test]
    async fn test_fixed_retry_gives_up() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = retry_with_fixed_delay(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(anyhow::anyhow!("Telegram send error"))
            },
            Duration::ZERO,
            2,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fixed_retry_recovers() {
        let calls = AtomicUsize::new(0);
        let result = retry_with_fixed_delay(
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(anyhow::anyhow!("flaky"))
                } else {
                    Ok(7)
                }
            },
            Duration::ZERO,
            2,
        )
        .await;

        assert_eq!(result.ok(), Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
