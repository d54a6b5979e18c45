//! Skill rating and OpenSkill-style draw prediction (spec.md §3 `Rating`,
//! §4.6 step 5).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::external::store::{Store, StoreError};
use crate::identity::Symbol;

/// A `(μ, σ)` pair, matching spec.md §3's default `(25.0, 8.333)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub mu: f64,
    pub sigma: f64,
}

impl Default for Rating {
    fn default() -> Self {
        Self {
            mu: 25.0,
            sigma: 8.333,
        }
    }
}

impl Rating {
    pub fn new(mu: f64, sigma: f64) -> Self {
        Self { mu, sigma }
    }
}

/// Looks up an account's aggregated rating for one `(group, mode)` pair
/// (spec.md §3: "Aggregated per (group, mode) on the account record").
///
/// The explicit-fallback variant of the Open Question (SPEC_FULL.md §4):
/// when `default_fallback` is `true`, a missing blob or store error
/// resolves to [`Rating::default()`] instead of propagating; callers
/// that need to distinguish "never rated" from a real lookup failure
/// pass `false` and handle the error themselves.
pub async fn get_rating_by_user_id(
    store: &dyn Store,
    user_id: Uuid,
    group_id: &str,
    mode: Symbol,
    default_fallback: bool,
) -> Result<Rating, StoreError> {
    let key = format!("{group_id}:{mode}:{user_id}");
    match store.get_blob("Ratings", &key).await {
        Ok(Some(blob)) => Ok(serde_json::from_value(blob).unwrap_or_default()),
        Ok(None) if default_fallback => Ok(Rating::default()),
        Ok(None) => Err(StoreError::NotFound),
        Err(_) if default_fallback => Ok(Rating::default()),
        Err(err) => Err(err),
    }
}

/// Plackett-Luce/Bradley-Terry-style beta parameter: the amount of
/// performance variance attributed to chance rather than skill.
/// Conventionally `sigma_default / 2` in OpenSkill-derived systems.
const BETA: f64 = 8.333 / 2.0;

/// Predicts the probability that two teams draw, given each team's
/// combined rating. Implements the two-team draw-probability formula
/// from OpenSkill's Plackett-Luce model: teams are collapsed to a
/// single combined mean/variance each, and the draw probability is the
/// density of the skill-difference distribution evaluated at zero,
/// normalised against the symmetric case.
///
/// `team_a` and `team_b` are the per-player ratings on each side.
pub fn predict_draw(team_a: &[Rating], team_b: &[Rating]) -> f64 {
    if team_a.is_empty() || team_b.is_empty() {
        return 0.0;
    }

    let (mu_a, var_a) = combine(team_a);
    let (mu_b, var_b) = combine(team_b);

    let total_players = (team_a.len() + team_b.len()) as f64;
    let draw_margin = std::f64::consts::SQRT_2 * BETA * inverse_erf(1.0 / total_players);

    let c = (var_a + var_b + 2.0 * BETA * BETA).sqrt();
    let delta_mu = mu_a - mu_b;

    normal_cdf((draw_margin - delta_mu) / c) - normal_cdf((-draw_margin - delta_mu) / c)
}

fn combine(team: &[Rating]) -> (f64, f64) {
    let mu = team.iter().map(|r| r.mu).sum();
    let var = team.iter().map(|r| r.sigma * r.sigma).sum();
    (mu, var)
}

/// Standard normal CDF via the complementary error function.
fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Abramowitz & Stegun 7.1.26 approximation of `erf`, accurate to ~1e-7.
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}

fn erfc(x: f64) -> f64 {
    1.0 - erf(x)
}

/// Newton's method inverse error function, sufficient precision for a
/// draw-margin computation that only ever takes small, well-conditioned
/// inputs (`1/n` for realistic team sizes).
fn inverse_erf(x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return f64::INFINITY;
    }

    let mut guess = 0.0f64;
    for _ in 0..50 {
        let f = erf(guess) - x;
        let derivative = (2.0 / std::f64::consts::PI.sqrt()) * (-guess * guess).exp();
        if derivative.abs() < 1e-12 {
            break;
        }
        guess -= f / derivative;
    }
    guess
}
