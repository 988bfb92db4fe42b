use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::ApiError;

/// Cancellation scope of one view.
///
/// Every request and poll delay started for the view runs through its scope.
/// Dropping the scope, or calling [`ViewScope::cancel`], aborts all of them
/// with [`crate::FailureKind::Cancelled`].
#[derive(Debug, Default)]
pub struct ViewScope {
    token: CancellationToken,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for cancelling the scope from elsewhere.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn run<T, F>(&self, request: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ApiError::cancelled()),
            result = request => result,
        }
    }

    pub async fn sleep(&self, delay: Duration) -> Result<(), ApiError> {
        self.run(async {
            tokio::time::sleep(delay).await;
            Ok(())
        })
        .await
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
