use crate::config::LeadScoreBands;
use crate::data::{ImplementationTimeline, PortfolioTier};

/// Custom tasks are priced as routine work.
pub const CUSTOM_TASK_MULTIPLIER: f64 = 1.0;

/// Offshore setup overhead as a share of offshore cost.
pub const SETUP_OVERHEAD: f64 = 1.2;

/// Mean of the per-task complexity multipliers; 1.0 when there are none.
pub fn complexity_factor(multipliers: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = multipliers
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), m| (sum + m, count + 1));
    if count == 0 {
        1.0
    } else {
        sum / count as f64
    }
}

pub fn savings_percentage(savings: f64, local_cost: f64) -> f64 {
    if local_cost == 0.0 {
        0.0
    } else {
        savings / local_cost * 100.0
    }
}

/// Onboarding estimate in days for one role.
pub fn implementation_days(team_size: u32, total_tasks: usize, experience_multiplier: f64) -> u32 {
    let base = 30.0 + (team_size as f64 + 1.0).ln() * 10.0 + total_tasks as f64 * 2.0;
    (base * experience_multiplier).round() as u32
}

/// Return on the offshore spend, with setup overhead folded in.
pub fn estimated_roi(total_savings: f64, total_offshore_cost: f64) -> i64 {
    let investment = total_offshore_cost * SETUP_OVERHEAD;
    if investment == 0.0 {
        return 0;
    }
    (total_savings / investment * 100.0).round() as i64
}

fn band_points(bands: &[crate::config::ScoreBand], value: f64) -> Option<u32> {
    bands.iter().find(|b| value >= b.min).map(|b| b.points)
}

/// Sales-triage score in 0..=100.
pub fn lead_score(
    bands: &LeadScoreBands,
    tier: PortfolioTier,
    team_size: u32,
    total_savings: f64,
    total_tasks: usize,
) -> u32 {
    let portfolio = bands.portfolio_points(tier);
    let team = band_points(&bands.team_size, team_size as f64).unwrap_or(0);
    let savings = band_points(&bands.savings, total_savings).unwrap_or(if total_savings > 0.0 {
        bands.any_savings
    } else {
        0
    });
    let tasks = (total_tasks as u32)
        .saturating_mul(bands.points_per_task)
        .min(bands.max_task_points);

    portfolio
        .saturating_add(team)
        .saturating_add(savings)
        .saturating_add(tasks)
        .min(100)
}

/// planning, hiring, training, full implementation
fn base_weeks(tier: PortfolioTier) -> [u32; 4] {
    match tier {
        PortfolioTier::Growing => [2, 3, 2, 8],
        PortfolioTier::Large => [3, 4, 3, 12],
        PortfolioTier::Major => [4, 6, 4, 16],
        PortfolioTier::Enterprise => [6, 8, 6, 24],
    }
}

pub fn team_size_multiplier(team_size: u32) -> f64 {
    let extra = team_size.saturating_sub(1) as f64;
    (1.0 + extra * 0.2).min(2.0)
}

pub fn implementation_timeline(tier: PortfolioTier, team_size: u32) -> ImplementationTimeline {
    let multiplier = team_size_multiplier(team_size);
    let [planning, hiring, training, full] =
        base_weeks(tier).map(|weeks| (weeks as f64 * multiplier).round() as u32);
    ImplementationTimeline {
        planning,
        hiring,
        training,
        full_implementation: full,
    }
}
