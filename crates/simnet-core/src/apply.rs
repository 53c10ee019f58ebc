//! Event appliers: E1 (per thread, intra-node) and E2 (master, cross-node).
//! §4.6.

use crate::event::{EventKind, ScheduledEvent};
use crate::sampler::sample_select;
use simnet_error::{SimError, SimResult};
use simnet_rng::RngStream;
use simnet_sparse::{CscMatrix, ShiftMatrix};
use std::collections::VecDeque;

fn shift_offset(shift: i64, shift_matrix: &ShiftMatrix, c: usize) -> i64 {
    if shift < 0 {
        0
    } else {
        shift_matrix.get(shift as usize, c)
    }
}

/// Applies every due event (`time <= tt`) from a single thread's E1 queue
/// against that thread's own slice of `u`. `u_chunk` holds exactly the
/// nodes `[node_offset, node_offset + u_chunk.len() / nc)`; `update_chunk`
/// is the matching slice of `update_node`.
#[allow(clippy::too_many_arguments)]
pub fn apply_e1(
    u_chunk: &mut [i32],
    node_offset: usize,
    nc: usize,
    update_chunk: &mut [bool],
    queue: &mut VecDeque<ScheduledEvent>,
    tt: f64,
    e: &CscMatrix<i32>,
    shift_matrix: &ShiftMatrix,
    rng: &mut RngStream,
) -> SimResult<()> {
    while matches!(queue.front(), Some(ev) if ev.time <= tt) {
        let ev = queue.pop_front().expect("front checked above");
        debug_assert_ne!(ev.kind, EventKind::ExternalTransfer);
        let local = ev.node - node_offset;
        let u_node = &mut u_chunk[local * nc..(local + 1) * nc];

        match ev.kind {
            EventKind::Enter => {
                let first = e
                    .col(ev.select)
                    .next()
                    .map(|(row, _)| row)
                    .ok_or(SimError::SampleSelect {
                        node: ev.node,
                        select: ev.select,
                        requested: ev.n,
                        available: 0,
                    })?;
                let new_val = i64::from(u_node[first]) + ev.n;
                if new_val < 0 {
                    return Err(SimError::NegativeState {
                        node: ev.node,
                        compartment: first,
                        value: new_val,
                    });
                }
                u_node[first] = new_val as i32;
            }
            EventKind::Exit => {
                let individuals = sample_select(ev.node, u_node, e, ev.select, ev.n, ev.proportion, rng)?;
                for (c, &cnt) in individuals.iter().enumerate() {
                    if cnt == 0 {
                        continue;
                    }
                    let new_val = i64::from(u_node[c]) - cnt;
                    if new_val < 0 {
                        return Err(SimError::NegativeState {
                            node: ev.node,
                            compartment: c,
                            value: new_val,
                        });
                    }
                    u_node[c] = new_val as i32;
                }
            }
            EventKind::InternalTransfer => {
                let individuals = sample_select(ev.node, u_node, e, ev.select, ev.n, ev.proportion, rng)?;
                for (c, &cnt) in individuals.iter().enumerate() {
                    if cnt == 0 {
                        continue;
                    }
                    let dest_c = (c as i64 + shift_offset(ev.shift, shift_matrix, c)) as usize;
                    let new_src = i64::from(u_node[c]) - cnt;
                    if new_src < 0 {
                        return Err(SimError::NegativeState {
                            node: ev.node,
                            compartment: c,
                            value: new_src,
                        });
                    }
                    let new_dst = i64::from(u_node[dest_c]) + cnt;
                    if new_dst < 0 {
                        return Err(SimError::NegativeState {
                            node: ev.node,
                            compartment: dest_c,
                            value: new_dst,
                        });
                    }
                    u_node[c] = new_src as i32;
                    u_node[dest_c] = new_dst as i32;
                }
            }
            EventKind::ExternalTransfer => unreachable!("partitioned into the E2 queue"),
        }
        update_chunk[local] = true;
    }
    Ok(())
}

/// Applies every due EXTERNAL_TRANSFER event from the global E2 queue
/// against the full `u` array. Master-thread-only; callers must guarantee
/// no worker thread touches `u` concurrently.
#[allow(clippy::too_many_arguments)]
pub fn apply_e2(
    u: &mut [i32],
    nc: usize,
    update_node: &mut [bool],
    queue: &mut VecDeque<ScheduledEvent>,
    tt: f64,
    e: &CscMatrix<i32>,
    shift_matrix: &ShiftMatrix,
    rng: &mut RngStream,
) -> SimResult<()> {
    while matches!(queue.front(), Some(ev) if ev.time <= tt) {
        let ev = queue.pop_front().expect("front checked above");
        debug_assert_eq!(ev.kind, EventKind::ExternalTransfer);
        let src_node = &u[ev.node * nc..(ev.node + 1) * nc];
        let individuals = sample_select(ev.node, src_node, e, ev.select, ev.n, ev.proportion, rng)?;

        for (c, &cnt) in individuals.iter().enumerate() {
            if cnt == 0 {
                continue;
            }
            let dest_c = (c as i64 + shift_offset(ev.shift, shift_matrix, c)) as usize;
            let src_idx = ev.node * nc + c;
            let dst_idx = ev.dest * nc + dest_c;

            let new_src = i64::from(u[src_idx]) - cnt;
            if new_src < 0 {
                return Err(SimError::NegativeState {
                    node: ev.node,
                    compartment: c,
                    value: new_src,
                });
            }
            let new_dst = i64::from(u[dst_idx]) + cnt;
            if new_dst < 0 {
                return Err(SimError::NegativeState {
                    node: ev.dest,
                    compartment: dest_c,
                    value: new_dst,
                });
            }
            u[src_idx] = new_src as i32;
            u[dst_idx] = new_dst as i32;
        }
        update_node[ev.node] = true;
        update_node[ev.dest] = true;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use simnet_rng::RngFacility;

    fn select_first(nc: usize) -> CscMatrix<i32> {
        CscMatrix::new(nc, 1, vec![0], vec![0, 1], vec![1i32]).unwrap()
    }

    fn select_all(nc: usize) -> CscMatrix<i32> {
        let ir: Vec<usize> = (0..nc).collect();
        CscMatrix::new(nc, 1, ir, vec![0, nc], vec![1i32; nc]).unwrap()
    }

    fn no_shift(nc: usize) -> ShiftMatrix {
        ShiftMatrix::new(nc, 1, vec![0; nc]).unwrap()
    }

    #[test]
    fn enter_deposits_into_first_selected_compartment() {
        let mut u = [0i32, 0];
        let mut update = [false];
        let mut q = VecDeque::from([ScheduledEvent {
            kind: EventKind::Enter,
            time: 5.0,
            node: 0,
            dest: 0,
            n: 10,
            proportion: 0.0,
            select: 0,
            shift: -1,
        }]);
        let e = select_first(2);
        let shift = no_shift(2);
        let mut f = RngFacility::new(1);
        let mut rng = f.spawn_threads(1).unwrap().remove(0);

        apply_e1(&mut u, 0, 2, &mut update, &mut q, 5.0, &e, &shift, &mut rng).unwrap();

        assert_eq!(u, [10, 0]);
        assert!(update[0]);
        assert!(q.is_empty());
    }

    #[test]
    fn exit_removes_and_blocks_on_oversized_request() {
        let mut u = [5i32, 0];
        let mut update = [false];
        let mut q = VecDeque::from([ScheduledEvent {
            kind: EventKind::Exit,
            time: 1.0,
            node: 0,
            dest: 0,
            n: 100,
            proportion: 0.0,
            select: 0,
            shift: -1,
        }]);
        let e = select_all(2);
        let shift = no_shift(2);
        let mut f = RngFacility::new(1);
        let mut rng = f.spawn_threads(1).unwrap().remove(0);

        let err = apply_e1(&mut u, 0, 2, &mut update, &mut q, 1.0, &e, &shift, &mut rng).unwrap_err();
        assert!(matches!(err, SimError::SampleSelect { .. }));
    }

    #[test]
    fn events_after_tt_stay_queued() {
        let mut u = [0i32, 0];
        let mut update = [false];
        let mut q = VecDeque::from([ScheduledEvent {
            kind: EventKind::Enter,
            time: 99.0,
            node: 0,
            dest: 0,
            n: 1,
            proportion: 0.0,
            select: 0,
            shift: -1,
        }]);
        let e = select_first(2);
        let shift = no_shift(2);
        let mut f = RngFacility::new(1);
        let mut rng = f.spawn_threads(1).unwrap().remove(0);

        apply_e1(&mut u, 0, 2, &mut update, &mut q, 1.0, &e, &shift, &mut rng).unwrap();
        assert_eq!(u, [0, 0]);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn external_transfer_moves_between_nodes() {
        let mut u = [5i32, 0];
        let mut update = [false, false];
        let mut q = VecDeque::from([ScheduledEvent {
            kind: EventKind::ExternalTransfer,
            time: 3.0,
            node: 0,
            dest: 1,
            n: 3,
            proportion: 0.0,
            select: 0,
            shift: -1,
        }]);
        let e = select_all(1);
        let shift = no_shift(1);
        let mut f = RngFacility::new(1);
        let mut rng = f.spawn_threads(1).unwrap().remove(0);

        apply_e2(&mut u, 1, &mut update, &mut q, 3.0, &e, &shift, &mut rng).unwrap();

        assert_eq!(u, [2, 3]);
        assert!(update[0] && update[1]);
    }
}
