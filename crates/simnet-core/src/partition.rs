//! Node-to-thread partitioning.
//!
//! A single pair of functions defines how nodes are assigned to worker
//! threads. Both the SSA node ranges and the event partitioner (§4.4) use
//! these functions, so an E1 event and the SSA step for the same node
//! always land on the same thread — no cross-thread write to `u` is ever
//! possible, regardless of whether `Nn` divides evenly by `Nthread`.

/// The half-open range of node indices owned by `thread`.  The last thread
/// absorbs any remainder so that every node in `[0, nn)` is covered exactly
/// once across `0..nthread`.
#[must_use]
pub fn thread_range(thread: usize, nn: usize, nthread: usize) -> std::ops::Range<usize> {
    let chunk = nn / nthread;
    let start = (thread * chunk).min(nn);
    let end = if thread + 1 == nthread {
        nn
    } else {
        (start + chunk).min(nn)
    };
    start..end
}

/// The thread that owns `node`, consistent with [`thread_range`]: for every
/// `node`, `thread_range(thread_of_node(node, nn, nthread), nn, nthread)`
/// contains `node`.
#[must_use]
pub fn thread_of_node(node: usize, nn: usize, nthread: usize) -> usize {
    let chunk = nn / nthread;
    if chunk == 0 {
        return nthread - 1;
    }
    (node / chunk).min(nthread - 1)
}

/// Splits a flat, node-major buffer (`per_node` entries per node) into one
/// mutable slice per thread, following the same boundaries as
/// [`thread_range`]. The slices are disjoint by construction, so handing
/// each one to a different worker requires no synchronization.
pub fn split_by_thread<T>(
    mut slice: &mut [T],
    nn: usize,
    nthread: usize,
    per_node: usize,
) -> Vec<&mut [T]> {
    let mut parts = Vec::with_capacity(nthread);
    for t in 0..nthread {
        let range = thread_range(t, nn, nthread);
        let len = (range.end - range.start) * per_node;
        let (head, tail) = slice.split_at_mut(len);
        parts.push(head);
        slice = tail;
    }
    parts
}
