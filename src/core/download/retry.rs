use std::time::Duration;
use crate::config::Config;
use crate::core::error::DownloadError;

const MAX_BACKOFF_EXPONENT: usize = 64;

/// 重试策略
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64, // 抖动因子，避免同时重试
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryStrategy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.retry_count,
            base_delay: Duration::from_secs(config.retry_delay),
            max_delay: Duration::from_secs(config.retry_max_delay),
            ..Self::default()
        }
    }

    pub fn should_retry(&self, error: &DownloadError, retry_count: usize) -> bool {
        retry_count < self.max_retries && error.is_retryable()
    }

    pub fn get_delay(&self, retry_count: usize) -> Duration {
        let exponent = retry_count.min(MAX_BACKOFF_EXPONENT) as i32;
        let delay_secs = self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);

        let jitter = delay_secs * self.jitter_factor * (rand::random::<f64>() - 0.5);
        let final_delay = delay_secs + jitter;

        // 先在浮点数上封顶再转换，超出 Duration 范围的值会 panic
        let max_secs = self.max_delay.as_secs_f64();
        if !final_delay.is_finite() || final_delay >= max_secs {
            return self.max_delay;
        }
        Duration::from_secs_f64(final_delay.max(0.0))
    }
}

/// 单个下载单元的重试上下文
#[derive(Debug)]
pub struct RetryContext {
    pub strategy: RetryStrategy,
    pub retry_count: usize,
    pub total_retry_time: Duration,
}

impl RetryContext {
    pub fn new(strategy: RetryStrategy) -> Self {
        Self {
            strategy,
            retry_count: 0,
            total_retry_time: Duration::from_secs(0),
        }
    }

    pub fn should_retry(&self, error: &DownloadError) -> bool {
        self.strategy.should_retry(error, self.retry_count)
    }

    /// 记录一次重试并返回需要等待的时间
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.strategy.get_delay(self.retry_count);
        self.retry_count += 1;
        self.total_retry_time += delay;
        delay
    }
}
