//! リクエスト単位のデッドライン
//!
//! タイムアウトが有効な場合、接続確立から読み取り完了までの全区間を
//! ひとつのデッドラインで包む。発火時は進行中の I/O Future が破棄され、
//! 呼び出し側がソケットを閉じて `Error::Timeout` を返す。タイムアウトの
//! 報告はリクエストごとに高々一度で、生のトランスポートエラーが
//! タイムアウトとして露出することはない。

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{Error, Result};

/// リクエスト単位のデッドライン
///
/// タイムアウト未設定の場合は何もしない。
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// リクエスト開始時点からのデッドラインを設定する
    pub fn start(timeout: Option<Duration>) -> Self {
        Self {
            at: timeout.map(|d| Instant::now() + d),
        }
    }

    /// デッドライン付きで Future を実行する
    ///
    /// 期限超過時は `Error::Timeout` を返す。
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.at {
            Some(at) => match tokio::time::timeout_at(at, fut).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout),
            },
            None => fut.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_after_duration() {
        let deadline = Deadline::start(Some(Duration::from_millis(100)));
        let result: Result<()> = deadline
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn completes_before_deadline() {
        let deadline = Deadline::start(Some(Duration::from_secs(10)));
        let result = deadline.run(async { Ok(42) }).await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test(start_paused = true)]
    async fn disarmed_without_timeout() {
        let deadline = Deadline::start(None);
        let result = deadline
            .run(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("done")
            })
            .await
            .unwrap();
        assert_eq!(result, "done");
    }
}
