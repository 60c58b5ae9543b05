//! DXY Context Reader sub-analyzer (spec §4.C).
//!
//! The DXY service (component J) owns fetching and caching; this analyzer
//! is a thin, pure projection of an already-fetched `DxyContext` down to the
//! three fields the Scorer consumes.

use analysis_core::{DxyContext, DxyImpact, DxyStrength};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DxyReading {
    pub impact: DxyImpact,
    pub strength: DxyStrength,
    pub corr_rolling: Option<f64>,
}

pub fn read(context: &DxyContext) -> DxyReading {
    DxyReading {
        impact: context.impact,
        strength: context.strength,
        corr_rolling: context.corr_rolling,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn projects_the_three_scorer_fields() {
        let ctx = DxyContext {
            provider: "test".to_string(),
            symbol: "DXY".to_string(),
            current_dxy: 104.2,
            impact: DxyImpact::Bearish,
            strength: DxyStrength::Moderate,
            corr_rolling: Some(-0.7),
            corr_strength: Some(DxyStrength::Strong),
            updated_at: Utc::now(),
        };
        let reading = read(&ctx);
        assert_eq!(reading.impact, DxyImpact::Bearish);
        assert_eq!(reading.corr_rolling, Some(-0.7));
    }
}
