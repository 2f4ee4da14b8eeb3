use axum::http::StatusCode;

/// Where a request is in its dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    NotStarted,
    Bound,
    Handled,
    Failed,
    Sent,
}

/// Tracks one request through `NotStarted -> Bound -> Handled -> Sent`,
/// or `NotStarted | Bound -> Failed -> Sent`.
#[derive(Debug)]
pub struct Lifecycle {
    endpoint: &'static str,
    state: LifecycleState,
}

impl Lifecycle {
    pub fn new(endpoint: &'static str) -> Self {
        Lifecycle {
            endpoint,
            state: LifecycleState::NotStarted,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    fn allowed(from: LifecycleState, to: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (from, to),
            (NotStarted, Bound)
                | (Bound, Handled)
                | (Handled, Sent)
                | (NotStarted, Failed)
                | (Bound, Failed)
                | (Failed, Sent)
        )
    }

    fn advance(&mut self, next: LifecycleState) {
        if !Self::allowed(self.state, next) {
            tracing::error!(
                endpoint = self.endpoint,
                from = ?self.state,
                to = ?next,
                "illegal request lifecycle transition"
            );
        }
        tracing::trace!(endpoint = self.endpoint, from = ?self.state, to = ?next, "lifecycle");
        self.state = next;
    }

    pub fn bound(&mut self) {
        self.advance(LifecycleState::Bound);
    }

    pub fn handled(&mut self) {
        self.advance(LifecycleState::Handled);
    }

    pub fn failed(&mut self) {
        self.advance(LifecycleState::Failed);
    }

    pub fn sent(&mut self, status: StatusCode) {
        self.advance(LifecycleState::Sent);
        tracing::debug!(endpoint = self.endpoint, status = status.as_u16(), "response sent");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_reaches_sent() {
        let mut lifecycle = Lifecycle::new("GetUser");
        lifecycle.bound();
        lifecycle.handled();
        lifecycle.sent(StatusCode::OK);
        assert_eq!(lifecycle.state(), LifecycleState::Sent);
    }

    #[test]
    fn binding_failure_path() {
        assert!(Lifecycle::allowed(LifecycleState::NotStarted, LifecycleState::Failed));
        assert!(Lifecycle::allowed(LifecycleState::Failed, LifecycleState::Sent));
        assert!(!Lifecycle::allowed(LifecycleState::Sent, LifecycleState::Bound));
        assert!(!Lifecycle::allowed(LifecycleState::Handled, LifecycleState::Failed));
    }
}
