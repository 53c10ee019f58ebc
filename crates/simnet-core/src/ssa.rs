//! The per-node Gillespie Direct-Method stepper (§4.5).

use crate::model::{ModelContext, TransitionModel};
use simnet_error::{SimError, SimResult};
use simnet_rng::RngStream;
use simnet_sparse::{CscMatrix, CscPattern};

/// Picks the transition whose cumulative-rate interval contains `r` by
/// linear search, clamping to the last transition if the scan runs off the
/// end. If the chosen rate is exactly zero (floating-point drift between
/// `sum_t_rate` and the cache), walks backward to the nearest nonzero
/// rate; returns `None` if every rate up to and including the sampled
/// point is zero, signalling the caller to collapse `sum_t_rate` to zero.
fn choose_transition(rates: &[f64], r: f64) -> Option<usize> {
    let mut tr = 0usize;
    let mut cumulative = rates[0];
    while cumulative < r && tr + 1 < rates.len() {
        tr += 1;
        cumulative += rates[tr];
    }
    if rates[tr] != 0.0 {
        return Some(tr);
    }
    (0..=tr).rev().find(|&j| rates[j] != 0.0)
}

/// Advances one node's internal clock from its current `t_time` to
/// `next_day`, firing transitions by the Direct Method and keeping the
/// node's rate cache in sync via the dependency graph `g`.
#[allow(clippy::too_many_arguments)]
pub fn step_node(
    node: usize,
    u_node: &mut [i32],
    t_rate_node: &mut [f64],
    sum_t_rate: &mut f64,
    t_time: &mut f64,
    v_node: &[f64],
    ldata_node: &[f64],
    ctx: ModelContext<'_>,
    next_day: f64,
    s: &CscMatrix<i32>,
    g: &CscPattern,
    model: &dyn TransitionModel,
    rng: &mut RngStream,
) -> SimResult<()> {
    loop {
        if *sum_t_rate <= 0.0 {
            *t_time = next_day;
            return Ok(());
        }

        let tau = -rng.uniform_pos().ln() / *sum_t_rate;
        if *t_time + tau >= next_day {
            *t_time = next_day;
            return Ok(());
        }
        *t_time += tau;

        let r = rng.uniform_pos() * *sum_t_rate;
        let tr = match choose_transition(t_rate_node, r) {
            Some(tr) => tr,
            None => {
                // Accumulated drift: the cache disagrees with reality
                // everywhere behind the sampled point. Treat as a nil
                // event and let the next day boundary reset the cache.
                *sum_t_rate = 0.0;
                continue;
            }
        };

        for (row, delta) in s.col(tr) {
            let new_val = i64::from(u_node[row]) + i64::from(delta);
            if new_val < 0 {
                return Err(SimError::NegativeState {
                    node,
                    compartment: row,
                    value: new_val,
                });
            }
            u_node[row] = new_val as i32;
        }

        let mut delta_sum = 0.0;
        for &dependent in g.col(tr) {
            let old = t_rate_node[dependent];
            let new = model.propensity(dependent, u_node, v_node, ldata_node, ctx, *t_time)?;
            if !new.is_finite() || new < 0.0 {
                return Err(SimError::InvalidRate {
                    node,
                    transition: dependent,
                    rate: new,
                });
            }
            delta_sum += new - old;
            t_rate_node[dependent] = new;
        }
        *sum_t_rate += delta_sum;
    }
}
