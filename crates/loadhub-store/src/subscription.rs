//! Subscription lifetime management.

/// Releases a store subscription when dropped.
///
/// The guard is type-erased so holders can keep guards from stores of
/// different state types in one slot. Dropping it after the owning store is
/// gone is a no-op.
#[must_use = "dropping the guard immediately cancels the subscription"]
pub struct SubscriptionGuard {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionGuard {
    /// Build a guard around a release action.
    pub(crate) fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Release the subscription now instead of at drop.
    pub fn release(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("live", &self.release.is_some())
            .finish()
    }
}
