use anyhow::Result;

use crate::data::CalculationResult;
use crate::roles::find_role;

/// Render a result as pretty JSON ("json") or Markdown ("md").
pub fn render(result: &CalculationResult, format: &str) -> Result<String> {
    match format {
        "md" => Ok(render_markdown(result)),
        _ => Ok(serde_json::to_string_pretty(result)?),
    }
}

/// Whole units with thousands separators, e.g. `AUD 185,000`.
pub fn format_money(amount: f64, currency: &str) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if rounded < 0 { "-" } else { "" };
    format!("{currency} {sign}{grouped}")
}

pub fn render_markdown(result: &CalculationResult) -> String {
    let money = |amount: f64| format_money(amount, &result.currency);
    let mut output = String::new();

    output.push_str("# Offshore Staffing Savings\n\n");
    output.push_str(&format!("**Annual savings:** {}\n", money(result.total_savings)));
    output.push_str(&format!(
        "**Local cost:** {} | **Offshore cost:** {}\n",
        money(result.total_local_cost),
        money(result.total_offshore_cost)
    ));
    output.push_str(&format!(
        "**Average savings:** {:.1}% | **Estimated ROI:** {}%\n",
        result.average_savings_percentage, result.estimated_roi
    ));
    output.push_str(&format!(
        "**Portfolio tier:** {} | **Team size:** {} | **Lead score:** {}/100\n\n",
        result.portfolio_tier.as_str(),
        result.total_team_size,
        result.lead_score
    ));

    if !result.breakdown.is_empty() {
        output.push_str("## Roles\n\n");
        output.push_str("| Role | Team | Level | Local | Offshore | Savings | Complexity | Days |\n");
        output.push_str("|------|------|-------|-------|----------|---------|------------|------|\n");
        for (role_id, role) in &result.breakdown {
            let title = find_role(role_id).map_or(role_id.as_str(), |r| r.title);
            output.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} ({:.1}%) | {:.2} | {} |\n",
                title,
                role.team_size,
                role.experience_level.as_str(),
                money(role.local_cost),
                money(role.offshore_cost),
                money(role.savings),
                role.savings_percentage,
                role.task_complexity,
                role.estimated_implementation_time
            ));
        }
        output.push('\n');

        for (role_id, role) in &result.breakdown {
            if role.risk_factors.is_empty() {
                continue;
            }
            let title = find_role(role_id).map_or(role_id.as_str(), |r| r.title);
            output.push_str(&format!("### {title} risks\n\n"));
            for factor in &role.risk_factors {
                output.push_str(&format!("- {factor}\n"));
            }
            output.push('\n');
        }
    }

    let timeline = &result.implementation_timeline;
    output.push_str("## Implementation timeline (weeks)\n\n");
    output.push_str(&format!("- Planning: {}\n", timeline.planning));
    output.push_str(&format!("- Hiring: {}\n", timeline.hiring));
    output.push_str(&format!("- Training: {}\n", timeline.training));
    output.push_str(&format!("- Full implementation: {}\n\n", timeline.full_implementation));

    let risk = &result.risk_assessment;
    output.push_str(&format!("## Risk assessment: {}\n\n", risk.level.as_str()));
    for factor in &risk.factors {
        output.push_str(&format!("- {factor}\n"));
    }
    if !risk.mitigation_strategies.is_empty() {
        output.push_str("\n**Mitigation:**\n\n");
        for strategy in &risk.mitigation_strategies {
            output.push_str(&format!("- {strategy}\n"));
        }
    }

    output
}
