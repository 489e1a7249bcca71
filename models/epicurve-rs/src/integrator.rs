//! Explicit Runge-Kutta stepping driven by a Butcher tableau.
//!
//! A tableau is stored in the compact row layout used throughout the model:
//! for an `s`-stage method there are `s` rows. Row `i < s - 1` describes stage
//! `i + 1` as `[c, a_0, ..., a_i]`, and the last row holds the weights. Stage 0
//! is always evaluated at `t` with no coefficients, so Euler is just `[[1]]`.

use nalgebra::SVector;
use serde::Deserialize;

use crate::error::{Error, Result, ensure};

const TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct ButcherTableau {
    rows: Vec<Vec<f64>>,
}

impl ButcherTableau {
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self> {
        let invalid = |msg: String| move || Error::InvalidTableau(msg);
        ensure(!rows.is_empty(), invalid("no rows".into()))?;
        let stages = rows.len();
        for (i, row) in rows[..stages - 1].iter().enumerate() {
            ensure(
                row.len() == i + 2,
                invalid(format!("stage {} needs {} entries, got {}", i + 1, i + 2, row.len())),
            )?;
            let sum: f64 = row[1..].iter().sum();
            ensure(
                (row[0] - sum).abs() < TOLERANCE,
                invalid(format!("stage {} node {} != row sum {sum}", i + 1, row[0])),
            )?;
        }
        let weights = &rows[stages - 1];
        ensure(
            weights.len() == stages,
            invalid(format!("expected {stages} weights, got {}", weights.len())),
        )?;
        let total: f64 = weights.iter().sum();
        ensure(
            (total - 1.0).abs() < TOLERANCE,
            invalid(format!("weights sum to {total}")),
        )?;
        Ok(Self { rows })
    }

    pub fn stages(&self) -> usize {
        self.rows.len()
    }

    /// Node `c` and coefficients `a` of stage `i`.
    fn stage(&self, i: usize) -> (f64, &[f64]) {
        if i == 0 {
            return (0.0, &[]);
        }
        let row = &self.rows[i - 1];
        (row[0], &row[1..])
    }

    fn weights(&self) -> &[f64] {
        &self.rows[self.rows.len() - 1]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Euler,
    Midpoint,
    Heun,
    Ralston,
    K3,
    Ssp33,
    Ssp43,
    #[default]
    Rk4,
    Rk38,
}

impl Method {
    pub const ALL: [Method; 9] = [
        Method::Euler,
        Method::Midpoint,
        Method::Heun,
        Method::Ralston,
        Method::K3,
        Method::Ssp33,
        Method::Ssp43,
        Method::Rk4,
        Method::Rk38,
    ];

    pub fn tableau(self) -> ButcherTableau {
        let rows: Vec<Vec<f64>> = match self {
            Method::Euler => vec![vec![1.0]],
            Method::Midpoint => vec![vec![0.5, 0.5], vec![0.0, 1.0]],
            Method::Heun => vec![vec![1.0, 1.0], vec![0.5, 0.5]],
            Method::Ralston => vec![vec![2.0 / 3.0, 2.0 / 3.0], vec![0.25, 0.75]],
            Method::K3 => vec![
                vec![0.5, 0.5],
                vec![1.0, -1.0, 2.0],
                vec![1.0 / 6.0, 2.0 / 3.0, 1.0 / 6.0],
            ],
            Method::Ssp33 => vec![
                vec![1.0, 1.0],
                vec![0.5, 0.25, 0.25],
                vec![1.0 / 6.0, 1.0 / 6.0, 2.0 / 3.0],
            ],
            Method::Ssp43 => vec![
                vec![0.5, 0.5],
                vec![1.0, 0.5, 0.5],
                vec![0.5, 1.0 / 6.0, 1.0 / 6.0, 1.0 / 6.0],
                vec![1.0 / 6.0, 1.0 / 6.0, 1.0 / 6.0, 0.5],
            ],
            Method::Rk4 => vec![
                vec![0.5, 0.5],
                vec![0.5, 0.0, 0.5],
                vec![1.0, 0.0, 0.0, 1.0],
                vec![1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
            ],
            Method::Rk38 => vec![
                vec![1.0 / 3.0, 1.0 / 3.0],
                vec![2.0 / 3.0, -1.0 / 3.0, 1.0],
                vec![1.0, 1.0, -1.0, 1.0],
                vec![1.0 / 8.0, 3.0 / 8.0, 3.0 / 8.0, 1.0 / 8.0],
            ],
        };
        ButcherTableau { rows }
    }
}

/// Advances `y` from `t` by one step of size `h` under `dy/dt = f(t, y)`.
pub fn integrate<const D: usize, F>(
    tableau: &ButcherTableau,
    f: F,
    y: &SVector<f64, D>,
    t: f64,
    h: f64,
) -> SVector<f64, D>
where
    F: Fn(f64, &SVector<f64, D>) -> SVector<f64, D>,
{
    let mut k: Vec<SVector<f64, D>> = Vec::with_capacity(tableau.stages());
    for i in 0..tableau.stages() {
        let (c, a) = tableau.stage(i);
        let yi = a
            .iter()
            .zip(&k)
            .fold(*y, |acc, (aij, kj)| acc + *kj * (h * aij));
        k.push(f(t + c * h, &yi));
    }
    tableau
        .weights()
        .iter()
        .zip(&k)
        .fold(*y, |acc, (w, ki)| acc + *ki * (h * w))
}
