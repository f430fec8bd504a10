use super::event::ResolutionEvent;
use super::record::{EventLog, EventRecord};

/// Per-kind counters over an event log, for diagnostics and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EventStats {
    pub starts: usize,
    pub ends: usize,
    pub labels: usize,
    pub context_tests: usize,
    pub context_matches: usize,
    pub rule_tests: usize,
    pub rule_results: usize,
    pub allocations: usize,
    pub components_resolved: usize,
    pub components_skipped: usize,
    pub failures: usize,
}

impl EventStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_log(log: &EventLog) -> Self {
        let mut stats = Self::new();
        for record in log.all() {
            stats.process_record(&record);
        }
        stats
    }

    pub fn process_record(&mut self, record: &EventRecord) {
        match &record.event {
            ResolutionEvent::Start { .. } => self.starts += 1,
            ResolutionEvent::End { .. } => self.ends += 1,
            ResolutionEvent::Label { .. } => self.labels += 1,
            ResolutionEvent::ContextTest { .. } => self.context_tests += 1,
            ResolutionEvent::ContextMatch { .. } => self.context_matches += 1,
            ResolutionEvent::RuleTest { .. } => self.rule_tests += 1,
            ResolutionEvent::RuleResult { .. } => self.rule_results += 1,
            ResolutionEvent::Allocation { .. } => self.allocations += 1,
            ResolutionEvent::ComponentResolved { .. } => self.components_resolved += 1,
            ResolutionEvent::ComponentSkip { .. } => self.components_skipped += 1,
            ResolutionEvent::Failure { .. } => self.failures += 1,
        }
    }
}
