use crate::data::{PortfolioIndicators, PortfolioTier};

/// Map the wizard's portfolio-size answer onto a business tier.
///
/// Accepts the band labels offered in the form ("500-999", "5000+") as well
/// as a bare property count. Anything unrecognised is treated as `growing`.
pub fn derive_indicators(portfolio_size: &str) -> PortfolioIndicators {
    let normalized = portfolio_size.trim().replace([',', ' '], "");
    let tier = match normalized.as_str() {
        "500-999" => PortfolioTier::Growing,
        "1000-1999" => PortfolioTier::Large,
        "2000-4999" => PortfolioTier::Major,
        "5000+" => PortfolioTier::Enterprise,
        other => leading_count(other)
            .map(tier_for_count)
            .unwrap_or_default(),
    };
    indicators_for(tier)
}

pub fn indicators_for(tier: PortfolioTier) -> PortfolioIndicators {
    let (description, property_range) = match tier {
        PortfolioTier::Growing => ("Growing portfolio building its operational base", "500-999"),
        PortfolioTier::Large => ("Large portfolio with established processes", "1000-1999"),
        PortfolioTier::Major => ("Major portfolio operating across multiple teams", "2000-4999"),
        PortfolioTier::Enterprise => ("Enterprise portfolio with complex operations", "5000+"),
    };
    PortfolioIndicators {
        tier,
        description: description.to_string(),
        property_range: property_range.to_string(),
    }
}

fn tier_for_count(count: u32) -> PortfolioTier {
    match count {
        0..=999 => PortfolioTier::Growing,
        1000..=1999 => PortfolioTier::Large,
        2000..=4999 => PortfolioTier::Major,
        _ => PortfolioTier::Enterprise,
    }
}

fn leading_count(text: &str) -> Option<u32> {
    let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
