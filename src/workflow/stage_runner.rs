//! 阶段执行器 - 流程层
//!
//! 所有外部调用共用的重试包装：
//! - 每次尝试单独计时，超时按调用方给出的方式转成错误
//! - 瞬时错误按指数退避重试，服务端给出等待时间时以其为准
//! - 非瞬时错误立即失败
//! - 不向外抛错，结果一律是 `StageResult`

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, error, warn};

use crate::error::{AppError, AppResult};
use crate::models::{StageFailure, StageResult};

/// 重试策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最大尝试次数（含第一次）
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// 单次尝试的超时
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// 第 `attempt` 次失败后的等待时间（从 1 开始）
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// 阶段执行器
#[derive(Debug, Clone)]
pub struct StageRunner {
    policy: RetryPolicy,
}

impl StageRunner {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// 执行一次外部调用
    ///
    /// # 参数
    /// - `label`: 日志标签
    /// - `on_timeout`: 单次尝试超时时生成的错误
    /// - `op`: 每次尝试都会重新调用，生成新的 future
    pub async fn run<T, F, Fut, E>(&self, label: &str, on_timeout: E, mut op: F) -> StageResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
        E: Fn(Duration) -> AppError,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!("{} 第 {}/{} 次尝试", label, attempt, max_attempts);

            let outcome = match timeout(self.policy.timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(on_timeout(self.policy.timeout)),
            };

            let err = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} 第 {} 次尝试成功", label, attempt);
                    }
                    return StageResult::Success(value);
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                warn!("{} 失败（不可重试）: {}", label, err);
                return StageResult::Failure(StageFailure::from_error(&err, attempt, false));
            }

            if attempt >= max_attempts {
                error!("{} 失败，已尝试 {} 次: {}", label, attempt, err);
                return StageResult::Failure(StageFailure::from_error(&err, attempt, true));
            }

            let delay = err
                .retry_after()
                .unwrap_or_else(|| self.policy.backoff_for(attempt))
                .min(self.policy.max_backoff);
            warn!(
                "{} 失败 (尝试 {}/{}): {}，{:?} 后重试...",
                label, attempt, max_attempts, err, delay
            );
            sleep(delay).await;
        }
    }
}
