use coarsetime::{Duration as CDuration, Instant as CInstant};
use log::Level;
use std::{collections::HashMap, fmt::Display, hash::Hash, sync::Mutex};

/// Collapses a repeating event into one line per interval, e.g. a readiness
/// probe that keeps finding a port closed.
#[derive(Debug)]
pub struct IntervalLogger<E> {
    pending: HashMap<E, u64>,
    interval: CDuration,
    last_flush: CInstant,
    level: Level,
}

impl<E: Hash + Eq + Display> IntervalLogger<E> {
    pub fn new(interval_ms: u64, level: Level) -> Self {
        let interval = CDuration::from_millis(interval_ms);
        Self {
            pending: HashMap::new(),
            interval,
            // the very first event is logged right away
            last_flush: CInstant::now() - interval - CDuration::from_millis(1),
            level,
        }
    }

    /// Returns how many events were written out by this call.
    pub fn report(&mut self, event: E) -> usize {
        *self.pending.entry(event).or_insert(0) += 1;
        if self.last_flush.elapsed() <= self.interval {
            return 0;
        }
        let mut written = 0;
        for (event, count) in self.pending.drain() {
            if count == 1 {
                log!(self.level, "{}", event);
            } else {
                log!(self.level, "{} [{} times]", event, count);
            }
            written += 1;
        }
        self.last_flush = CInstant::now();
        written
    }

    /// Drops the counter of an event that will not repeat, e.g. a port that opened.
    pub fn forget(&mut self, event: &E) {
        self.pending.remove(event);
    }
}

#[derive(Debug)]
pub struct IntervalLoggerSafe<E> {
    inner: Mutex<IntervalLogger<E>>,
}

impl<E: Hash + Eq + Display> IntervalLoggerSafe<E> {
    pub fn new(interval_ms: u64, level: Level) -> Self {
        Self {
            inner: Mutex::new(IntervalLogger::new(interval_ms, level)),
        }
    }

    pub fn report(&self, event: E) -> usize {
        self.inner.lock().expect("interval logger mutex").report(event)
    }

    pub fn forget(&self, event: &E) {
        self.inner.lock().expect("interval logger mutex").forget(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_event_is_written_then_suppressed() {
        let mut logger = IntervalLogger::new(60_000, Level::Info);
        assert_eq!(logger.report("waiting on 10.0.0.1:9160"), 1);
        assert_eq!(logger.report("waiting on 10.0.0.1:9160"), 0);
        assert_eq!(logger.report("waiting on 10.0.0.1:9160"), 0);
        assert_eq!(logger.pending.get("waiting on 10.0.0.1:9160"), Some(&2));
    }

    #[test]
    fn forget_drops_pending_count() {
        let mut logger = IntervalLogger::new(60_000, Level::Info);
        logger.report("a");
        logger.report("b");
        logger.forget(&"b");
        assert!(logger.pending.get("b").is_none());
    }

    #[test]
    fn zero_interval_writes_every_event() {
        let mut logger = IntervalLogger::new(0, Level::Debug);
        assert_eq!(logger.report(1), 1);
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(logger.report(1), 1);
    }
}
