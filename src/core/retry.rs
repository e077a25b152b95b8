use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_RETRIES: u32 = 3;
pub const MIN_DELAY_UNITS: u64 = 2;
pub const MAX_DELAY_UNITS: u64 = 7;

/// 重試次數與每次失敗後的等待時間
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub min_delay: u64,
    pub max_delay: u64,
    pub delay_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            min_delay: MIN_DELAY_UNITS,
            max_delay: MAX_DELAY_UNITS,
            delay_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32) -> Self {
        Self {
            retries,
            ..Self::default()
        }
    }

    pub fn with_delay_unit(mut self, delay_unit: Duration) -> Self {
        self.delay_unit = delay_unit;
        self
    }

    /// 第 attempt 次 (從 0 起算) 失敗後的等待時間，夾在 [min_delay, max_delay] 之間
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let units = (attempt as u64).min(self.max_delay).max(self.min_delay);
        self.delay_unit.saturating_mul(units as u32)
    }

    pub fn attempts(&self) -> u32 {
        self.retries.max(1)
    }
}

/// 重複執行 operation 直到成功，最多 `policy.retries` 次；全部失敗時回傳最後一個錯誤
pub async fn retry<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!("✅ Succeeded on attempt {}/{}", attempt + 1, attempts);
                }
                return Ok(value);
            }
            Err(e) if attempt + 1 >= attempts => {
                tracing::error!("❌ Attempt {}/{} failed, giving up: {}", attempt + 1, attempts, e);
                return Err(e);
            }
            Err(e) => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    "🔄 Attempt {}/{} failed: {} (retrying in {:?})",
                    attempt + 1,
                    attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
