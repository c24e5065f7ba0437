//! Per-button debouncer.
//!
//! A raw level change only becomes a stable edge once it has persisted for
//! the debounce interval. The edge is stamped with the time the raw level
//! *first* changed, so press and release durations measured from edge to
//! edge are not skewed by debounce latency.

use embassy_time::{Duration, Instant};

/// A confirmed level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Edge {
    /// `true` for press, `false` for release.
    pub pressed: bool,
    /// Onset of the raw level change.
    pub at: Instant,
}

/// Debounce state for one button.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Debouncer {
    stable: bool,
    candidate: Option<Edge>,
}

impl Debouncer {
    pub const fn new() -> Self {
        Self {
            stable: false,
            candidate: None,
        }
    }

    /// Current debounced level.
    pub fn stable(&self) -> bool {
        self.stable
    }

    /// Raw change that is still waiting out the debounce interval.
    pub fn pending(&self) -> Option<Edge> {
        self.candidate
    }

    /// Feed one raw sample; returns an edge once a change has settled.
    pub fn update(&mut self, raw: bool, now: Instant, window: Duration) -> Option<Edge> {
        if raw == self.stable {
            // Bounced back before settling.
            self.candidate = None;
            return None;
        }
        let candidate = match self.candidate {
            Some(c) if c.pressed == raw => c,
            _ => {
                let c = Edge {
                    pressed: raw,
                    at: now,
                };
                self.candidate = Some(c);
                c
            }
        };
        if now.saturating_duration_since(candidate.at) >= window {
            self.stable = raw;
            self.candidate = None;
            Some(candidate)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(30);

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn change_shorter_than_window_is_ignored() {
        let mut d = Debouncer::new();
        assert_eq!(d.update(true, at(0), WINDOW), None);
        assert_eq!(d.update(true, at(20), WINDOW), None);
        assert_eq!(d.update(false, at(25), WINDOW), None);
        assert_eq!(d.update(false, at(60), WINDOW), None);
        assert!(!d.stable());
        assert_eq!(d.pending(), None);
    }

    #[test]
    fn settled_change_is_stamped_with_onset() {
        let mut d = Debouncer::new();
        d.update(true, at(100), WINDOW);
        d.update(true, at(110), WINDOW);
        let edge = d.update(true, at(130), WINDOW);
        assert_eq!(
            edge,
            Some(Edge {
                pressed: true,
                at: at(100)
            })
        );
        assert!(d.stable());
    }

    #[test]
    fn zero_window_confirms_immediately() {
        let mut d = Debouncer::new();
        let edge = d.update(true, at(5), Duration::from_ticks(0));
        assert!(edge.is_some());
    }
}
