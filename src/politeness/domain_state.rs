use std::time::{Duration, Instant};

/// Tracks the state of a domain during a crawl session
///
/// Holds what the politeness engine needs to space requests to one site and
/// to keep its robots denials quiet after the first report.
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    /// Number of requests made to this domain in the current session
    pub request_count: u32,

    /// Timestamp of the last request to this domain
    pub last_request_time: Option<Instant>,

    /// Number of URLs refused by robots rules or site overrides
    pub denied_count: u32,

    /// Whether the first denial for this domain has been reported
    pub denial_reported: bool,
}

impl DomainState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a request was made to this domain
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }

    /// Records a denial and returns true if it is the first one to report
    pub fn record_denial(&mut self) -> bool {
        self.denied_count += 1;
        !std::mem::replace(&mut self.denial_reported, true)
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, delay: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < delay {
            Some(delay - elapsed)
        } else {
            None
        }
    }
}
