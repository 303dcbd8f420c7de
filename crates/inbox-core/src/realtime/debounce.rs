use std::time::Duration;

use tokio::time::Instant;

/// Trailing-edge debouncer with a ceiling.
///
/// Every trigger pushes the deadline out to `now + window`, but never past
/// `first_trigger + max_wait`, so a steady stream of triggers still fires at
/// least once per `max_wait`.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    max_wait: Duration,
    first_trigger: Option<Instant>,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration, max_wait: Duration) -> Self {
        Self {
            window,
            max_wait: max_wait.max(window),
            first_trigger: None,
            deadline: None,
        }
    }

    pub fn trigger(&mut self, now: Instant) {
        let first = *self.first_trigger.get_or_insert(now);
        let cap = first + self.max_wait;
        self.deadline = Some((now + self.window).min(cap));
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns true exactly once per burst, when the deadline has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.cancel();
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.first_trigger = None;
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_debouncer() -> Debouncer {
        Debouncer::new(Duration::from_millis(500), Duration::from_millis(2000))
    }

    #[test]
    fn test_burst_fires_once() {
        let mut debouncer = make_test_debouncer();
        let start = Instant::now();

        let mut fired = 0;
        for i in 0..10 {
            let now = start + Duration::from_millis(i * 10);
            debouncer.trigger(now);
            if debouncer.poll(now) {
                fired += 1;
            }
        }
        assert_eq!(fired, 0);
        assert_eq!(
            debouncer.deadline(),
            Some(start + Duration::from_millis(90 + 500))
        );

        assert!(debouncer.poll(start + Duration::from_millis(600)));
        assert!(!debouncer.poll(start + Duration::from_millis(700)));
        assert!(!debouncer.is_armed());
    }

    #[test]
    fn test_steady_stream_hits_ceiling() {
        let mut debouncer = make_test_debouncer();
        let start = Instant::now();

        for i in 0..30 {
            debouncer.trigger(start + Duration::from_millis(i * 100));
        }
        assert_eq!(
            debouncer.deadline(),
            Some(start + Duration::from_millis(2000))
        );
    }

    #[test]
    fn test_cancel_disarms() {
        let mut debouncer = make_test_debouncer();
        let start = Instant::now();
        debouncer.trigger(start);
        debouncer.cancel();
        assert!(!debouncer.poll(start + Duration::from_secs(5)));
    }
}
