//! Three-age-class SISe infectious-pressure model: susceptible/infected
//! compartments in three age groups, sharing a single per-node infectious
//! pressure that decays each day and is driven back up by a seasonally
//! varying transmission term.

use simnet_core::{ModelContext, TransitionModel};
use simnet_error::SimResult;

const S_1: usize = 0;
const I_1: usize = 1;
const S_2: usize = 2;
const I_2: usize = 3;
const S_3: usize = 4;
const I_3: usize = 5;

const UPSILON_1: usize = 0;
const UPSILON_2: usize = 1;
const UPSILON_3: usize = 2;
const GAMMA_1: usize = 3;
const GAMMA_2: usize = 4;
const GAMMA_3: usize = 5;
const ALPHA: usize = 6;
const BETA_Q1: usize = 7;
const BETA_Q2: usize = 8;
const BETA_Q3: usize = 9;
const BETA_Q4: usize = 10;
const EPSILON: usize = 11;

const T_S1_I1: usize = 0;
const T_S2_I2: usize = 1;
const T_S3_I3: usize = 2;
const T_I1_S1: usize = 3;
const T_I2_S2: usize = 4;
const T_I3_S3: usize = 5;

const DAYS_IN_YEAR: i64 = 365;
const DAYS_IN_QUARTER: i64 = 91;

/// The SISe3 model: `v[0]` is the node's infectious pressure `phi`, updated
/// once per day by [`TransitionModel::post_step`]; `ldata` carries the
/// fixed per-node rate parameters `upsilon_{1,2,3}`, `gamma_{1,2,3}`,
/// `alpha`, the four `beta_q{1..4}` seasonal terms, and `epsilon`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SISe3Model;

impl TransitionModel for SISe3Model {
    fn propensity(
        &self,
        transition: usize,
        u: &[i32],
        v: &[f64],
        ldata: &[f64],
        _ctx: ModelContext<'_>,
        _time: f64,
    ) -> SimResult<f64> {
        let phi = v[0];
        let rate = match transition {
            T_S1_I1 => ldata[UPSILON_1] * phi * f64::from(u[S_1]),
            T_S2_I2 => ldata[UPSILON_2] * phi * f64::from(u[S_2]),
            T_S3_I3 => ldata[UPSILON_3] * phi * f64::from(u[S_3]),
            T_I1_S1 => ldata[GAMMA_1] * f64::from(u[I_1]),
            T_I2_S2 => ldata[GAMMA_2] * f64::from(u[I_2]),
            T_I3_S3 => ldata[GAMMA_3] * f64::from(u[I_3]),
            _ => 0.0,
        };
        Ok(rate)
    }

    fn post_step(
        &self,
        v_new: &mut [f64],
        u: &[i32],
        v: &[f64],
        ldata: &[f64],
        _ctx: ModelContext<'_>,
        _node: usize,
        time: f64,
    ) -> SimResult<i32> {
        let s_n = f64::from(u[S_1] + u[S_2] + u[S_3]);
        let i_n = f64::from(u[I_1] + u[I_2] + u[I_3]);

        let mut phi = v[0];
        let quarter = (time as i64 % DAYS_IN_YEAR) / DAYS_IN_QUARTER;
        let beta = match quarter {
            0 => ldata[BETA_Q1],
            1 => ldata[BETA_Q2],
            2 => ldata[BETA_Q3],
            _ => ldata[BETA_Q4],
        };
        phi *= 1.0 - beta;

        if s_n + i_n > 0.0 {
            phi += ldata[ALPHA] * i_n / (i_n + s_n) + ldata[EPSILON];
        } else {
            phi += ldata[EPSILON];
        }

        v_new[0] = phi;
        Ok(i32::from(phi != v[0]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ldata() -> Vec<f64> {
        vec![
            0.01, 0.01, 0.01, // upsilon 1..3
            0.1, 0.1, 0.1, // gamma 1..3
            0.5,  // alpha
            0.1, 0.1, 0.1, 0.1, // beta_q1..4
            0.0001, // epsilon
        ]
    }

    #[test]
    fn infection_propensity_scales_with_pressure_and_susceptibles() {
        let model = SISe3Model;
        let u = [100i32, 0, 50, 0, 20, 0];
        let v = [2.0];
        let ldata = ldata();
        let ctx = ModelContext { sd: 0, gdata: &[] };

        let rate = model
            .propensity(T_S1_I1, &u, &v, &ldata, ctx, 0.0)
            .unwrap();
        assert!((rate - ldata[UPSILON_1] * v[0] * 100.0).abs() < 1e-12);
    }

    #[test]
    fn recovery_propensity_ignores_pressure() {
        let model = SISe3Model;
        let u = [0i32, 30, 0, 0, 0, 0];
        let v = [9.0];
        let ldata = ldata();
        let ctx = ModelContext { sd: 0, gdata: &[] };

        let rate = model
            .propensity(T_I1_S1, &u, &v, &ldata, ctx, 0.0)
            .unwrap();
        assert!((rate - ldata[GAMMA_1] * 30.0).abs() < 1e-12);
    }

    #[test]
    fn post_step_decays_pressure_with_no_infected() {
        let model = SISe3Model;
        let u = [100i32, 0, 50, 0, 20, 0];
        let v = [1.0];
        let mut v_new = [0.0];
        let ldata = ldata();
        let ctx = ModelContext { sd: 0, gdata: &[] };

        let code = model
            .post_step(&mut v_new, &u, &v, &ldata, ctx, 0, 0.0)
            .unwrap();

        let expected = 1.0 * (1.0 - ldata[BETA_Q1]) + ldata[EPSILON];
        assert!((v_new[0] - expected).abs() < 1e-12);
        assert_eq!(code, 1);
    }

    #[test]
    fn post_step_reports_no_change_at_fixed_point() {
        // With no susceptibles or infected and epsilon = 0, phi stays put
        // once beta_q1 = 0 too.
        let model = SISe3Model;
        let u = [0i32; 6];
        let v = [0.0];
        let mut v_new = [0.0];
        let mut ldata = ldata();
        ldata[EPSILON] = 0.0;
        ldata[BETA_Q1] = 0.0;
        let ctx = ModelContext { sd: 0, gdata: &[] };

        let code = model
            .post_step(&mut v_new, &u, &v, &ldata, ctx, 0, 0.0)
            .unwrap();

        assert_eq!(v_new[0], 0.0);
        assert_eq!(code, 0);
    }

    #[test]
    fn seasonal_beta_follows_quarter_of_year() {
        let model = SISe3Model;
        let u = [0i32; 6];
        let v = [1.0];
        let mut v_new = [0.0];
        let mut ldata = ldata();
        ldata[EPSILON] = 0.0;
        ldata[BETA_Q1] = 0.2;
        ldata[BETA_Q2] = 0.4;
        let ctx = ModelContext { sd: 0, gdata: &[] };

        model
            .post_step(&mut v_new, &u, &v, &ldata, ctx, 0, 0.0)
            .unwrap();
        assert!((v_new[0] - 0.8).abs() < 1e-12);

        let mut v_new_q2 = [0.0];
        model
            .post_step(&mut v_new_q2, &u, &v, &ldata, ctx, 0, 100.0)
            .unwrap();
        assert!((v_new_q2[0] - 0.6).abs() < 1e-12);
    }
}
