use crate::data::{ExperienceDistribution, PortfolioTier, RiskAssessment, RiskLevel};
use crate::roles::RoleDefinition;

/// Risk notes for one role, from its team shape, task load and experience mix.
pub fn role_risk_factors(
    role: &RoleDefinition,
    team_size: u32,
    total_tasks: usize,
    distribution: Option<&ExperienceDistribution>,
) -> Vec<String> {
    let mut factors = Vec::new();

    if team_size > 3 {
        factors.push(format!(
            "Coordinating a team of {team_size} adds communication overhead"
        ));
    }
    if team_size == 1 {
        factors.push("Single point of failure with one team member".to_string());
    }
    if total_tasks > 6 {
        factors.push(format!(
            "High task complexity with {total_tasks} responsibilities assigned"
        ));
    }
    if total_tasks == 0 {
        factors.push("No tasks selected, risk of underutilisation".to_string());
    }

    if let Some(dist) = distribution.filter(|d| d.members() > 0) {
        let members = dist.members() as f64;
        let entry_share = dist.entry as f64 / members;
        let experienced_share = dist.experienced as f64 / members;

        if entry_share > 0.7 {
            factors.push(
                "Mostly entry-level team will need close supervision".to_string(),
            );
        }
        if dist.entry > 0 && dist.experienced == 0 {
            factors.push("No experienced team member to mentor entry-level staff".to_string());
        }
        if experienced_share > 0.8 {
            factors.push(
                "Heavily experienced team may be more costly than the work requires".to_string(),
            );
        }
        if dist.entry > 0 && dist.experienced > 0 && dist.moderate == 0 {
            factors.push(
                "No moderate-level staff to bridge knowledge transfer between tiers".to_string(),
            );
        }
    }

    factors.extend(role.inherent_risks.iter().map(|r| r.to_string()));
    factors
}

/// Portfolio-wide inputs to the overall risk rating.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskSignals {
    pub tier: PortfolioTier,
    pub total_team_size: u32,
    pub entry_members: u32,
    pub max_complexity: f64,
    pub total_tasks: usize,
}

pub const LARGE_TEAM: u32 = 5;
pub const ENTRY_SHARE_LIMIT: f64 = 0.5;
pub const COMPLEXITY_LIMIT: f64 = 1.5;
pub const TASK_SCOPE_LIMIT: usize = 8;

pub fn assess_overall_risk(signals: &RiskSignals) -> RiskAssessment {
    let mut factors = Vec::new();
    let mut mitigation_strategies = Vec::new();
    let mut trigger = |fired: bool, factor: &str, mitigation: &str| {
        if fired {
            factors.push(factor.to_string());
            mitigation_strategies.push(mitigation.to_string());
        }
    };

    trigger(
        matches!(signals.tier, PortfolioTier::Major | PortfolioTier::Enterprise),
        "Portfolio scale requires structured change management",
        "Roll out in phases, starting with a pilot team before expanding across the portfolio",
    );
    trigger(
        signals.total_team_size > LARGE_TEAM,
        "Large offshore team requires a dedicated management structure",
        "Appoint an offshore team leader and hold weekly cross-team stand-ups",
    );
    let entry_share = if signals.total_team_size == 0 {
        0.0
    } else {
        signals.entry_members as f64 / signals.total_team_size as f64
    };
    trigger(
        entry_share > ENTRY_SHARE_LIMIT,
        "Team is weighted towards entry-level staff",
        "Pair entry-level hires with experienced staff and document standard operating procedures",
    );
    trigger(
        signals.max_complexity > COMPLEXITY_LIMIT,
        "Complex task mix increases training and quality-control needs",
        "Extend the training phase and add quality-assurance checkpoints for complex tasks",
    );
    trigger(
        signals.total_tasks > TASK_SCOPE_LIMIT,
        "Broad task scope across roles",
        "Prioritise core tasks for the first 90 days and add scope incrementally",
    );

    let level = match factors.len() {
        n if n >= 3 => RiskLevel::High,
        2 => RiskLevel::Medium,
        _ => RiskLevel::Low,
    };
    if mitigation_strategies.is_empty() {
        mitigation_strategies
            .push("Maintain regular performance reviews and clear communication channels".into());
    }

    RiskAssessment {
        level,
        factors,
        mitigation_strategies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::find_role;

    fn admin() -> &'static RoleDefinition {
        find_role("admin_assistant").unwrap()
    }

    #[test]
    fn test_single_member_without_tasks() {
        let factors = role_risk_factors(admin(), 1, 0, None);
        assert_eq!(factors.len(), 2);
        assert!(factors[0].contains("Single point of failure"));
        assert!(factors[1].contains("underutilisation"));
    }

    #[test]
    fn test_large_team_many_tasks() {
        let factors = role_risk_factors(admin(), 4, 7, None);
        assert!(factors.iter().any(|f| f.contains("team of 4")));
        assert!(factors.iter().any(|f| f.contains("7 responsibilities")));
    }

    #[test]
    fn test_entry_heavy_without_mentor() {
        let dist = ExperienceDistribution::new(4, 0, 0, 4);
        let factors = role_risk_factors(admin(), 4, 3, Some(&dist));
        assert!(factors.iter().any(|f| f.contains("close supervision")));
        assert!(factors.iter().any(|f| f.contains("mentor")));
        assert!(!factors.iter().any(|f| f.contains("bridge")));
    }

    #[test]
    fn test_missing_moderate_tier() {
        let dist = ExperienceDistribution::new(1, 0, 1, 2);
        let factors = role_risk_factors(admin(), 2, 3, Some(&dist));
        assert!(factors.iter().any(|f| f.contains("bridge")));
        assert!(!factors.iter().any(|f| f.contains("mentor")));
    }

    #[test]
    fn test_experienced_heavy() {
        let dist = ExperienceDistribution::new(0, 0, 2, 2);
        let factors = role_risk_factors(admin(), 2, 3, Some(&dist));
        assert_eq!(factors.len(), 1);
        assert!(factors[0].contains("more costly"));
    }

    #[test]
    fn test_inherent_role_risks_appended() {
        let role = find_role("property_accountant").unwrap();
        let factors = role_risk_factors(role, 2, 3, None);
        assert_eq!(factors, vec![role.inherent_risks[0].to_string()]);
    }

    #[test]
    fn test_overall_risk_low_without_triggers() {
        let assessment = assess_overall_risk(&RiskSignals {
            total_team_size: 2,
            max_complexity: 1.0,
            total_tasks: 3,
            ..RiskSignals::default()
        });
        assert_eq!(assessment.level, RiskLevel::Low);
        assert!(assessment.factors.is_empty());
        assert_eq!(assessment.mitigation_strategies.len(), 1);
    }

    #[test]
    fn test_overall_risk_one_factor_is_low() {
        let assessment = assess_overall_risk(&RiskSignals {
            tier: PortfolioTier::Enterprise,
            total_team_size: 2,
            max_complexity: 1.0,
            ..RiskSignals::default()
        });
        assert_eq!(assessment.factors.len(), 1);
        assert_eq!(assessment.level, RiskLevel::Low);
    }

    #[test]
    fn test_overall_risk_two_factors_is_medium() {
        let assessment = assess_overall_risk(&RiskSignals {
            tier: PortfolioTier::Major,
            total_team_size: 6,
            max_complexity: 1.0,
            ..RiskSignals::default()
        });
        assert_eq!(assessment.factors.len(), 2);
        assert_eq!(assessment.level, RiskLevel::Medium);
        assert_eq!(assessment.mitigation_strategies.len(), 2);
    }

    #[test]
    fn test_overall_risk_task_scope_boundary() {
        let signals = |total_tasks| RiskSignals {
            total_team_size: 2,
            max_complexity: 1.0,
            total_tasks,
            ..RiskSignals::default()
        };

        let at_limit = assess_overall_risk(&signals(TASK_SCOPE_LIMIT));
        assert!(at_limit.factors.is_empty());

        let over = assess_overall_risk(&signals(TASK_SCOPE_LIMIT + 1));
        assert_eq!(over.factors, vec!["Broad task scope across roles".to_string()]);
        assert!(over.mitigation_strategies[0].contains("first 90 days"));
        assert_eq!(over.level, RiskLevel::Low);
    }

    #[test]
    fn test_overall_risk_three_factors_is_high() {
        let assessment = assess_overall_risk(&RiskSignals {
            tier: PortfolioTier::Growing,
            total_team_size: 6,
            entry_members: 4,
            max_complexity: 2.0,
            total_tasks: 4,
        });
        assert_eq!(assessment.factors.len(), 3);
        assert_eq!(assessment.level, RiskLevel::High);
    }
}
