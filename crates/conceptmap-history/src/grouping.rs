//! Operation grouping policies.
//!
//! [`ExplicitGrouping`] is the policy used by recorded commands: callers
//! bracket a logical action with start/end, and every command recorded in
//! between shares the open operation. Outside a bracket each command is its
//! own operation unless the caller names one.
//!
//! [`TimeWindowGrouping`] only serves the legacy deletion log: a deletion
//! joins the previous operation when it arrives soon enough after it.

use crate::clock::Timestamp;
use crate::command::OperationId;

#[derive(Debug, Clone, Default)]
pub struct ExplicitGrouping {
    open: Option<OperationId>,
}

impl ExplicitGrouping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a fresh operation, replacing any operation still open.
    pub fn start(&mut self) -> OperationId {
        let operation_id = OperationId::new();
        if let Some(previous) = self.open.replace(operation_id) {
            tracing::debug!(%previous, %operation_id, "operation started while another was open");
        }
        operation_id
    }

    /// Closes the open operation, returning it.
    pub fn end(&mut self) -> Option<OperationId> {
        self.open.take()
    }

    pub fn current(&self) -> Option<OperationId> {
        self.open
    }

    /// Picks the operation for a new command: the caller's choice, else the
    /// open operation, else a fresh single-command operation.
    pub fn resolve(&self, requested: Option<OperationId>) -> OperationId {
        requested.or(self.open).unwrap_or_else(OperationId::new)
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    operation_id: OperationId,
    started_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct TimeWindowGrouping {
    window_ms: u64,
    open: Option<Window>,
}

impl TimeWindowGrouping {
    pub fn new(window_ms: u64) -> Self {
        TimeWindowGrouping {
            window_ms,
            open: None,
        }
    }

    /// Picks the operation for an entry arriving at `now`.
    ///
    /// `latest` is the operation and timestamp of the newest existing entry.
    /// An unexpired open window wins; then the latest entry if it is recent
    /// enough; otherwise a new operation opens a new window at `now`.
    pub fn resolve(
        &mut self,
        now: Timestamp,
        latest: Option<(OperationId, Timestamp)>,
    ) -> OperationId {
        if let Some(window) = self.open {
            if now.millis_since(window.started_at) <= self.window_ms {
                return window.operation_id;
            }
        }

        if let Some((operation_id, at)) = latest {
            if now.millis_since(at) <= self.window_ms {
                return operation_id;
            }
        }

        let operation_id = OperationId::new();
        self.open = Some(Window {
            operation_id,
            started_at: now,
        });
        operation_id
    }

    pub fn reset(&mut self) {
        self.open = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_prefers_requested_then_open() {
        let mut grouping = ExplicitGrouping::new();
        let fresh_a = grouping.resolve(None);
        let fresh_b = grouping.resolve(None);
        assert_ne!(fresh_a, fresh_b);

        let open = grouping.start();
        assert_eq!(grouping.resolve(None), open);
        assert_eq!(grouping.resolve(None), open);

        let requested = OperationId::new();
        assert_eq!(grouping.resolve(Some(requested)), requested);

        assert_eq!(grouping.end(), Some(open));
        assert_ne!(grouping.resolve(None), open);
        assert_eq!(grouping.current(), None);
    }

    #[test]
    fn restarting_replaces_the_open_operation() {
        let mut grouping = ExplicitGrouping::new();
        let first = grouping.start();
        let second = grouping.start();
        assert_ne!(first, second);
        assert_eq!(grouping.current(), Some(second));
    }

    #[test]
    fn window_groups_entries_close_in_time() {
        let mut grouping = TimeWindowGrouping::new(1_000);
        let first = grouping.resolve(Timestamp(0), None);
        let second = grouping.resolve(Timestamp(400), Some((first, Timestamp(0))));
        assert_eq!(first, second);

        // Past the open window but within the window of the latest entry.
        let third = grouping.resolve(Timestamp(1_300), Some((second, Timestamp(400))));
        assert_eq!(third, first);
    }

    #[test]
    fn window_expires() {
        let mut grouping = TimeWindowGrouping::new(1_000);
        let first = grouping.resolve(Timestamp(0), None);
        let second = grouping.resolve(Timestamp(5_000), Some((first, Timestamp(0))));
        assert_ne!(first, second);

        // The new operation opened a new window at 5_000.
        let third = grouping.resolve(Timestamp(5_900), Some((second, Timestamp(5_000))));
        assert_eq!(third, second);
    }

    #[test]
    fn reset_forgets_the_open_window() {
        let mut grouping = TimeWindowGrouping::new(1_000);
        let first = grouping.resolve(Timestamp(0), None);
        grouping.reset();
        let second = grouping.resolve(Timestamp(10), None);
        assert_ne!(first, second);
    }
}
