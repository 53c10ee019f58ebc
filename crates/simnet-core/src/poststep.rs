//! The post-step driver: per-node auxiliary-state update and conditional
//! full rate refresh (§4.7).

use crate::model::{ModelContext, TransitionModel};
use simnet_error::{SimError, SimResult};

/// Invokes the model's post-step callback for one node, then refreshes
/// every one of its `Nt` cached rates if the callback asked for it or the
/// node was flagged by a scheduled event this day boundary.
#[allow(clippy::too_many_arguments)]
pub fn run_post_step(
    node: usize,
    u_node: &[i32],
    v_node: &[f64],
    v_new_node: &mut [f64],
    ldata_node: &[f64],
    ctx: ModelContext<'_>,
    time: f64,
    t_rate_node: &mut [f64],
    sum_t_rate: &mut f64,
    update_node_flag: &mut bool,
    model: &dyn TransitionModel,
) -> SimResult<()> {
    let code = model.post_step(v_new_node, u_node, v_node, ldata_node, ctx, node, time)?;
    if code < 0 {
        return Err(SimError::ModelError { node, code });
    }

    if code > 0 || *update_node_flag {
        let mut delta = 0.0;
        for (tr, rate) in t_rate_node.iter_mut().enumerate() {
            let new = model.propensity(tr, u_node, v_new_node, ldata_node, ctx, time)?;
            if !new.is_finite() || new < 0.0 {
                return Err(SimError::InvalidRate {
                    node,
                    transition: tr,
                    rate: new,
                });
            }
            delta += new - *rate;
            *rate = new;
        }
        *sum_t_rate += delta;
        *update_node_flag = false;
    }
    Ok(())
}
