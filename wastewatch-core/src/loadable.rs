//! Data that is loaded in the background and may fail without losing what was shown before.

use std::fmt::Display;

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Receipt for one load attempt; only the newest receipt may settle.
pub struct LoadTicket(u64);

#[derive(Debug, Clone, PartialEq)]
/// Latest successful value plus the state of the most recent load.
pub struct Loadable<T> {
    data: Option<T>,
    error: Option<String>,
    pending: Option<LoadTicket>,
    issued: u64,
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            pending: None,
            issued: 0,
        }
    }
}

impl<T> Loadable<T> {
    /// Nothing loaded yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a load. A later `begin` supersedes earlier tickets.
    pub fn begin(&mut self) -> LoadTicket {
        self.issued = self.issued.wrapping_add(1);
        let ticket = LoadTicket(self.issued);
        self.pending = Some(ticket);
        ticket
    }

    /// Finish the load started with `ticket`.
    ///
    /// Success replaces the data and clears the error. Failure records the message and keeps
    /// the previous data. Returns `false` when the ticket was superseded and nothing changed.
    pub fn settle<E: Display>(&mut self, ticket: LoadTicket, result: Result<T, E>) -> bool {
        if self.pending != Some(ticket) {
            return false;
        }
        self.pending = None;
        match result {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
            }
            Err(err) => {
                warn!(error = %err, keeps_data = self.data.is_some(), "load failed");
                self.error = Some(err.to_string());
            }
        }
        true
    }

    /// Last successfully loaded value.
    #[must_use]
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Message of the last failed load, cleared by the next success.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether a load is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether the loading indicator should replace the content: nothing to show yet and
    /// nothing has failed.
    #[must_use]
    pub fn is_first_load(&self) -> bool {
        self.data.is_none() && self.error.is_none()
    }

    /// Forget the error message without touching the data.
    pub fn dismiss_error(&mut self) {
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_keeps_previous_data() {
        let mut points = Loadable::new();
        let first = points.begin();
        assert!(points.is_first_load(), "nothing shown before the first load settles");
        points.settle::<&str>(first, Ok(vec![1, 2, 3]));

        let second = points.begin();
        points.settle(second, Err("Failed to fetch points (HTTP 500)"));

        assert_eq!(points.data(), Some(&vec![1, 2, 3]));
        assert_eq!(points.error(), Some("Failed to fetch points (HTTP 500)"));
        assert!(!points.is_loading(), "settled load is no longer pending");
    }

    #[test]
    fn success_clears_error() {
        let mut health = Loadable::new();
        let ticket = health.begin();
        health.settle(ticket, Err("down"));
        assert!(!health.is_first_load(), "a failed first load stops the spinner");

        let ticket = health.begin();
        health.settle::<&str>(ticket, Ok(7));
        assert_eq!(health.error(), None);
        assert_eq!(health.data(), Some(&7));
    }

    #[test]
    fn superseded_ticket_is_ignored() {
        let mut routes = Loadable::new();
        let stale = routes.begin();
        let fresh = routes.begin();

        assert!(routes.settle::<&str>(fresh, Ok("fresh")), "newest ticket applies");
        assert!(!routes.settle::<&str>(stale, Ok("stale")), "older ticket is dropped");
        assert_eq!(routes.data(), Some(&"fresh"));
    }
}
