//! Rolling Pearson correlation between the XAU and DXY pct-return series.
//!
//! Grounded on `original_source/backend/app/market_data/correlation.py`:
//! percent returns of both series, truncated to equal length from the tail,
//! correlation over the paired returns, `None` below a 5-pair floor.

use analysis_core::DxyStrength;
use statrs::statistics::Statistics;

fn pct_returns(series: &[f64]) -> Vec<f64> {
    series
        .windows(2)
        .filter_map(|w| if w[0] == 0.0 { None } else { Some((w[1] - w[0]) / w[0]) })
        .collect()
}

/// `None` when either series has fewer than 5 points, or fewer than 5
/// paired returns remain, or either return series has zero variance.
pub fn rolling_corr(xau: &[f64], dxy: &[f64]) -> Option<f64> {
    if xau.len() < 5 || dxy.len() < 5 {
        return None;
    }

    let n = xau.len().min(dxy.len());
    let xau = &xau[xau.len() - n..];
    let dxy = &dxy[dxy.len() - n..];

    let xr = pct_returns(xau);
    let yr = pct_returns(dxy);
    let n = xr.len().min(yr.len());
    if n < 5 {
        return None;
    }
    let xr = &xr[xr.len() - n..];
    let yr = &yr[yr.len() - n..];

    let mx = xr.mean();
    let my = yr.mean();
    let cov: f64 = (0..n).map(|i| (xr[i] - mx) * (yr[i] - my)).sum();
    let vx: f64 = xr.iter().map(|v| (v - mx).powi(2)).sum();
    let vy: f64 = yr.iter().map(|v| (v - my).powi(2)).sum();

    if vx <= 0.0 || vy <= 0.0 {
        return None;
    }

    Some(cov / (vx * vy).sqrt())
}

/// `|r| >= 0.65 -> strong, >= 0.35 -> moderate, else low`; `None` input maps
/// to a `low`-strength unknown correlation rather than being dropped, so
/// callers always get a strength label to display.
pub fn corr_strength(c: Option<f64>) -> DxyStrength {
    match c {
        None => DxyStrength::Low,
        Some(v) if v.abs() >= 0.65 => DxyStrength::Strong,
        Some(v) if v.abs() >= 0.35 => DxyStrength::Moderate,
        Some(_) => DxyStrength::Low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_few_points_yields_none() {
        assert_eq!(rolling_corr(&[1.0, 2.0], &[1.0, 2.0]), None);
    }

    #[test]
    fn perfectly_inverse_series_correlate_near_minus_one() {
        let xau: Vec<f64> = vec![100.0, 101.0, 102.0, 101.0, 100.0, 99.0, 100.0];
        let dxy: Vec<f64> = vec![90.0, 89.0, 88.0, 89.0, 90.0, 91.0, 90.0];
        let c = rolling_corr(&xau, &dxy).unwrap();
        assert!(c < -0.9, "expected strong negative correlation, got {c}");
    }

    #[test]
    fn strength_thresholds_match_spec() {
        assert_eq!(corr_strength(Some(0.7)), DxyStrength::Strong);
        assert_eq!(corr_strength(Some(0.4)), DxyStrength::Moderate);
        assert_eq!(corr_strength(Some(0.1)), DxyStrength::Low);
        assert_eq!(corr_strength(None), DxyStrength::Low);
    }
}
