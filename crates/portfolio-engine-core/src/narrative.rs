//! Message lookup for concentration findings.
//!
//! Copy lives in a table keyed by [`RiskKind`], so wording can change without
//! touching the evaluator or its output shape.

use serde::{Deserialize, Serialize};

use crate::diversification::{RiskFinding, RiskKind, Severity};

struct MessageTemplate {
    kind: RiskKind,
    headline: &'static str,
    recommendation: &'static str,
}

const MESSAGES: &[MessageTemplate] = &[
    MessageTemplate {
        kind: RiskKind::AssetConcentration,
        headline: "{percent}% of the portfolio is in {subject}",
        recommendation: "Consider adding exposure to other asset classes to reduce dependence on {subject}.",
    },
    MessageTemplate {
        kind: RiskKind::CategoryConcentration,
        headline: "{percent}% of the portfolio sits in the {subject} category",
        recommendation: "Spreading contributions across more fund categories would lower category risk.",
    },
    MessageTemplate {
        kind: RiskKind::SectorConcentration,
        headline: "Look-through exposure to {subject} is {percent}%",
        recommendation: "Review overlapping holdings; several funds may be betting on {subject}.",
    },
    MessageTemplate {
        kind: RiskKind::SingleFundDominance,
        headline: "{subject} makes up {percent}% of invested capital",
        recommendation: "A single fund this large ties outcomes to one manager; consider diversifying new contributions.",
    },
];

/// Human-readable rendering of one finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskNarrative {
    pub kind: RiskKind,
    pub severity: Severity,
    pub headline: String,
    pub recommendation: String,
}

/// Render a finding through the message table.
pub fn narrate(finding: &RiskFinding) -> RiskNarrative {
    let fill = |template: &str| {
        template
            .replace("{subject}", &finding.subject)
            .replace("{percent}", &finding.percent.normalize().to_string())
    };
    let (headline, recommendation) = MESSAGES
        .iter()
        .find(|m| m.kind == finding.kind)
        .map(|m| (fill(m.headline), fill(m.recommendation)))
        .unwrap_or_else(|| (format!("{} at {}%", finding.subject, finding.percent), String::new()));

    RiskNarrative {
        kind: finding.kind,
        severity: finding.severity,
        headline,
        recommendation,
    }
}

/// Render every finding in order.
pub fn narrate_all(findings: &[RiskFinding]) -> Vec<RiskNarrative> {
    findings.iter().map(narrate).collect()
}
