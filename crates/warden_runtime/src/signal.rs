//! Cooperative cancellation signal.

use tokio_util::sync::CancellationToken;
use warden_core::Cancelled;

/// Caller-owned cancellation signal handed to a launch.
///
/// A thin handle over a [`CancellationToken`]. Clones observe the same
/// signal; `CancelSignal::none()` never fires.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    token: Option<CancellationToken>,
}

impl CancelSignal {
    /// A signal that never cancels
    #[must_use]
    pub const fn none() -> Self {
        Self { token: None }
    }

    /// Observe an existing token
    #[must_use]
    pub fn new(token: CancellationToken) -> Self {
        Self { token: Some(token) }
    }

    /// Whether cancellation has been requested
    #[must_use]
    pub fn is_cancellation_requested(&self) -> bool {
        self.token.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Whether this signal can ever fire
    #[must_use]
    pub const fn can_be_canceled(&self) -> bool {
        self.token.is_some()
    }

    /// The underlying token, if any
    #[must_use]
    pub const fn token(&self) -> Option<&CancellationToken> {
        self.token.as_ref()
    }

    /// Cooperative checkpoint for work items.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] once cancellation has been requested.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancellation_requested() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves when cancellation is requested; pending forever for `none()`
    pub async fn cancelled(&self) {
        match &self.token {
            Some(token) => token.cancelled().await,
            None => futures::future::pending::<()>().await,
        }
    }
}

impl From<CancellationToken> for CancelSignal {
    fn from(token: CancellationToken) -> Self {
        Self::new(token)
    }
}
