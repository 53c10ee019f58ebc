//! Scheduled event types and the event partitioner (§4.4).

use crate::partition::thread_of_node;
use simnet_error::{SimError, SimResult};
use std::collections::VecDeque;

/// The four scheduled-event kinds the host may supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Remove individuals from a node.
    Exit,
    /// Inject individuals into a node.
    Enter,
    /// Move individuals between compartments within a node.
    InternalTransfer,
    /// Move individuals from one node to another.
    ExternalTransfer,
}

impl EventKind {
    fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(EventKind::Exit),
            1 => Some(EventKind::Enter),
            2 => Some(EventKind::InternalTransfer),
            3 => Some(EventKind::ExternalTransfer),
            _ => None,
        }
    }
}

/// One scheduled event exactly as the host supplies it: one-based node,
/// destination, select, and shift indices.
#[derive(Debug, Clone, Copy)]
pub struct RawScheduledEvent {
    /// Raw event kind; validated against [`EventKind`] during partitioning.
    pub event_kind: i32,
    /// Simulated time at which the event is due.
    pub time: f64,
    /// One-based source node.
    pub node: usize,
    /// One-based destination node (`EXTERNAL_TRANSFER` only, else unused).
    pub dest: usize,
    /// Literal individual count; if zero, `proportion` is used instead.
    pub n: i64,
    /// Fraction of the selected population to draw when `n == 0`.
    pub proportion: f64,
    /// One-based column of `E` naming the source compartments.
    pub select: usize,
    /// One-based column of `N`, or `<= 0` for "no shift".
    pub shift: i64,
}

/// A scheduled event with all indices normalized to zero-based, ready to be
/// applied directly against `u`/`E`/`N`.
#[derive(Debug, Clone, Copy)]
pub struct ScheduledEvent {
    /// The event kind.
    pub kind: EventKind,
    /// Simulated time at which the event is due.
    pub time: f64,
    /// Zero-based source node.
    pub node: usize,
    /// Zero-based destination node (`EXTERNAL_TRANSFER` only).
    pub dest: usize,
    /// Literal individual count; if zero, `proportion` is used instead.
    pub n: i64,
    /// Fraction of the selected population to draw when `n == 0`.
    pub proportion: f64,
    /// Zero-based column of `E`.
    pub select: usize,
    /// Zero-based column of `N`, or `-1` for "no shift".
    pub shift: i64,
}

impl ScheduledEvent {
    fn from_raw(index: usize, raw: RawScheduledEvent) -> SimResult<Self> {
        let kind = EventKind::from_raw(raw.event_kind).ok_or(SimError::UndefinedEvent {
            index,
            kind: raw.event_kind,
        })?;
        Ok(ScheduledEvent {
            kind,
            time: raw.time,
            node: raw.node.saturating_sub(1),
            dest: raw.dest.saturating_sub(1),
            n: raw.n,
            proportion: raw.proportion,
            select: raw.select.saturating_sub(1),
            shift: if raw.shift <= 0 { -1 } else { raw.shift - 1 },
        })
    }
}

/// Per-thread E1 queues (intra-node events, partitioned by node) and the
/// single global E2 queue (cross-node transfers), produced once at the
/// start of a run and then consumed in place, day by day.
#[derive(Debug, Clone)]
pub struct EventQueues {
    /// One queue of intra-node events per worker thread, each sorted by
    /// time ascending (the order the host supplied them in, assumed
    /// pre-sorted per §3).
    pub e1: Vec<VecDeque<ScheduledEvent>>,
    /// The single cross-node queue, consumed only by the master thread.
    pub e2: VecDeque<ScheduledEvent>,
}

impl EventQueues {
    /// Splits `events` into per-thread E1 queues and a global E2 queue,
    /// assigning each intra-node event to the thread that owns its node
    /// under [`thread_of_node`] (the same function the SSA stepper uses),
    /// so an E1 event and the SSA update for its node always run on the
    /// same thread.
    pub fn partition(
        events: &[RawScheduledEvent],
        nn: usize,
        nthread: usize,
    ) -> SimResult<Self> {
        let mut e1: Vec<VecDeque<ScheduledEvent>> = vec![VecDeque::new(); nthread];
        let mut e2 = VecDeque::new();
        for (index, &raw) in events.iter().enumerate() {
            let event = ScheduledEvent::from_raw(index, raw)?;
            match event.kind {
                EventKind::ExternalTransfer => e2.push_back(event),
                _ => {
                    let thread = thread_of_node(event.node, nn, nthread);
                    e1[thread].push_back(event);
                }
            }
        }
        Ok(EventQueues { e1, e2 })
    }
}
