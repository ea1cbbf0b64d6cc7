//! Source-Active / Join bookkeeping per (S,G)
//!
//! The tracker only records which Type 5 and Type 7 routes are visible in a
//! table. It reports entering and leaving the `Both` state and never writes
//! to a table itself.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::trace;

use super::{MvpnPrefix, SG};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrackerState {
    Absent,
    SourceOnly,
    JoinOnly,
    Both,
}

impl fmt::Display for TrackerState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use TrackerState::*;
        let word = match self {
            Absent => "Absent",
            SourceOnly => "SourceOnly",
            JoinOnly => "JoinOnly",
            Both => "Both",
        };
        write!(f, "{}", word)
    }
}

/// A Type 5 or Type 7 route appearing or disappearing in the table
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrackerEvent {
    SourceActive {
        sg: SG,
        prefix: MvpnPrefix,
        present: bool,
    },
    Join {
        sg: SG,
        prefix: MvpnPrefix,
        present: bool,
    },
}

/// Edge from the tracker to the S-PMSI generator
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SpmsiEvent {
    /// Both a source and a receiver are now known
    Originate(SG),
    /// Either the source or every receiver went away
    Withdraw(SG),
}

#[derive(Debug, Default)]
struct ReplicationState {
    sources: BTreeSet<MvpnPrefix>,
    joins: BTreeSet<MvpnPrefix>,
}

impl ReplicationState {
    fn state(&self) -> TrackerState {
        match (self.sources.is_empty(), self.joins.is_empty()) {
            (true, true) => TrackerState::Absent,
            (false, true) => TrackerState::SourceOnly,
            (true, false) => TrackerState::JoinOnly,
            (false, false) => TrackerState::Both,
        }
    }
}

#[derive(Debug, Default)]
pub struct Tracker {
    states: BTreeMap<SG, ReplicationState>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, sg: &SG) -> TrackerState {
        self.states
            .get(sg)
            .map(ReplicationState::state)
            .unwrap_or(TrackerState::Absent)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }

    /// Apply an event, returning the generator edge if `Both` was crossed
    pub fn handle(&mut self, event: TrackerEvent) -> Option<SpmsiEvent> {
        let (sg, prefix, present, is_source) = match event {
            TrackerEvent::SourceActive {
                sg,
                prefix,
                present,
            } => (sg, prefix, present, true),
            TrackerEvent::Join {
                sg,
                prefix,
                present,
            } => (sg, prefix, present, false),
        };

        let before = self.state(&sg);
        if present {
            let entry = self.states.entry(sg).or_insert_with(ReplicationState::default);
            if is_source {
                entry.sources.insert(prefix);
            } else {
                entry.joins.insert(prefix);
            }
        } else if let Some(entry) = self.states.get_mut(&sg) {
            if is_source {
                entry.sources.remove(&prefix);
            } else {
                entry.joins.remove(&prefix);
            }
        }
        let after = self.state(&sg);
        if after == TrackerState::Absent {
            self.states.remove(&sg);
        }

        if before != after {
            trace!("{} {} -> {}", sg, before, after);
        }
        match (before == TrackerState::Both, after == TrackerState::Both) {
            (false, true) => Some(SpmsiEvent::Originate(sg)),
            (true, false) => Some(SpmsiEvent::Withdraw(sg)),
            _ => None,
        }
    }
}
