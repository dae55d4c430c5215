use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Entry,
    #[default]
    Moderate,
    Experienced,
}

impl ExperienceLevel {
    pub const ALL: [ExperienceLevel; 3] = [
        ExperienceLevel::Entry,
        ExperienceLevel::Moderate,
        ExperienceLevel::Experienced,
    ];

    /// Weight used when collapsing a distribution into a single level.
    pub fn weight(self) -> f64 {
        match self {
            ExperienceLevel::Entry => 1.0,
            ExperienceLevel::Moderate => 2.0,
            ExperienceLevel::Experienced => 3.0,
        }
    }

    /// Onboarding time multiplier: juniors take longer to ramp up.
    pub fn implementation_multiplier(self) -> f64 {
        match self {
            ExperienceLevel::Entry => 1.3,
            ExperienceLevel::Moderate => 1.0,
            ExperienceLevel::Experienced => 0.8,
        }
    }

    pub fn from_weight(average: f64) -> Self {
        if average <= 1.5 {
            ExperienceLevel::Entry
        } else if average <= 2.5 {
            ExperienceLevel::Moderate
        } else {
            ExperienceLevel::Experienced
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExperienceLevel::Entry => "entry",
            ExperienceLevel::Moderate => "moderate",
            ExperienceLevel::Experienced => "experienced",
        }
    }
}

/// Headcount per experience level for one role.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExperienceDistribution {
    pub entry: u32,
    pub moderate: u32,
    pub experienced: u32,
    pub total_assigned: u32,
    pub total_required: u32,
    pub is_complete: bool,
}

impl ExperienceDistribution {
    #[cfg(test)]
    pub fn new(entry: u32, moderate: u32, experienced: u32, total_required: u32) -> Self {
        let total_assigned = entry + moderate + experienced;
        Self {
            entry,
            moderate,
            experienced,
            total_assigned,
            total_required,
            is_complete: total_assigned == total_required,
        }
    }

    pub fn count(&self, level: ExperienceLevel) -> u32 {
        match level {
            ExperienceLevel::Entry => self.entry,
            ExperienceLevel::Moderate => self.moderate,
            ExperienceLevel::Experienced => self.experienced,
        }
    }

    pub fn members(&self) -> u32 {
        self.entry + self.moderate + self.experienced
    }

    /// Average of the level weights, mapped back onto a single level.
    /// An empty distribution reports `moderate`.
    pub fn weighted_level(&self) -> ExperienceLevel {
        let members = self.members();
        if members == 0 {
            return ExperienceLevel::Moderate;
        }
        let total: f64 = ExperienceLevel::ALL
            .iter()
            .map(|level| level.weight() * self.count(*level) as f64)
            .sum();
        ExperienceLevel::from_weight(total / members as f64)
    }

    pub fn implementation_multiplier(&self) -> f64 {
        let members = self.members();
        if members == 0 {
            return 1.0;
        }
        let total: f64 = ExperienceLevel::ALL
            .iter()
            .map(|level| level.implementation_multiplier() * self.count(*level) as f64)
            .sum();
        total / members as f64
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    #[default]
    Low,
    Medium,
    High,
}

impl Complexity {
    pub fn multiplier(self) -> f64 {
        match self {
            Complexity::Low => 1.0,
            Complexity::Medium => 1.5,
            Complexity::High => 2.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomTask {
    pub name: String,
    #[serde(default)]
    pub complexity: Complexity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserLocation {
    pub country: String,
    pub currency: String,
}

/// Everything the wizard collects before a calculation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FormData {
    pub selected_roles: Vec<String>,
    pub team_size: BTreeMap<String, u32>,
    pub selected_tasks: BTreeMap<String, Vec<String>>,
    pub custom_tasks: BTreeMap<String, Vec<CustomTask>>,
    pub role_experience_distribution: BTreeMap<String, ExperienceDistribution>,
    pub experience_level: Option<ExperienceLevel>,
    pub portfolio_size: Option<String>,
    pub user_location: Option<UserLocation>,
}

impl FormData {
    pub fn team_size_for(&self, role_id: &str) -> u32 {
        self.team_size.get(role_id).copied().unwrap_or(1)
    }

    /// The role's distribution, only when every required seat is assigned.
    pub fn complete_distribution(&self, role_id: &str) -> Option<&ExperienceDistribution> {
        self.role_experience_distribution
            .get(role_id)
            .filter(|d| d.is_complete)
    }

    pub fn legacy_level(&self) -> ExperienceLevel {
        self.experience_level.unwrap_or_default()
    }

    pub fn selected_tasks_for(&self, role_id: &str) -> &[String] {
        self.selected_tasks
            .get(role_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn custom_tasks_for(&self, role_id: &str) -> &[CustomTask] {
        self.custom_tasks
            .get(role_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum PortfolioTier {
    #[default]
    Growing,
    Large,
    Major,
    Enterprise,
}

impl PortfolioTier {
    pub fn as_str(self) -> &'static str {
        match self {
            PortfolioTier::Growing => "growing",
            PortfolioTier::Large => "large",
            PortfolioTier::Major => "major",
            PortfolioTier::Enterprise => "enterprise",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PortfolioIndicators {
    pub tier: PortfolioTier,
    pub description: String,
    pub property_range: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoleBreakdown {
    pub team_size: u32,
    pub experience_level: ExperienceLevel,
    pub local_cost: f64,
    pub offshore_cost: f64,
    pub savings: f64,
    pub savings_percentage: f64,
    pub selected_tasks_count: usize,
    pub custom_tasks_count: usize,
    pub task_complexity: f64,
    pub estimated_implementation_time: u32,
    pub risk_factors: Vec<String>,
}

/// Rollout phases, in weeks.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImplementationTimeline {
    pub planning: u32,
    pub hiring: u32,
    pub training: u32,
    pub full_implementation: u32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub factors: Vec<String>,
    pub mitigation_strategies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalculationResult {
    pub currency: String,
    pub total_savings: f64,
    pub total_local_cost: f64,
    pub total_offshore_cost: f64,
    pub breakdown: BTreeMap<String, RoleBreakdown>,
    pub portfolio_tier: PortfolioTier,
    pub lead_score: u32,
    pub total_team_size: u32,
    pub average_savings_percentage: f64,
    pub estimated_roi: i64,
    pub implementation_timeline: ImplementationTimeline,
    pub risk_assessment: RiskAssessment,
}

impl CalculationResult {
    /// The result for a form with nothing selected.
    pub fn zero(currency: impl Into<String>, tier: PortfolioTier) -> Self {
        Self {
            currency: currency.into(),
            total_savings: 0.0,
            total_local_cost: 0.0,
            total_offshore_cost: 0.0,
            breakdown: BTreeMap::new(),
            portfolio_tier: tier,
            lead_score: 0,
            total_team_size: 0,
            average_savings_percentage: 0.0,
            estimated_roi: 0,
            implementation_timeline: ImplementationTimeline::default(),
            risk_assessment: RiskAssessment::default(),
        }
    }
}
