use crate::error::{EngineError, EngineResult};
use crate::models::{Score, SubScores};

/// Composite weights in percent: optimization, credibility, quality, compliance.
pub const WEIGHTS_PERCENT: [u32; 4] = [30, 25, 25, 20];

/// Combines four sub-scores into a `Score` whose `overall` is the weighted mean
/// rounded to the nearest integer, ties away from zero.
///
/// The sum is taken in hundredths so the rounding never sees float noise.
pub fn compose_score(raw: SubScores) -> EngineResult<Score> {
    let optimization = checked("optimization", raw.optimization)?;
    let credibility = checked("credibility", raw.credibility)?;
    let quality = checked("quality", raw.quality)?;
    let compliance = checked("compliance", raw.compliance)?;

    let weighted_hundredths = WEIGHTS_PERCENT[0] * u32::from(optimization)
        + WEIGHTS_PERCENT[1] * u32::from(credibility)
        + WEIGHTS_PERCENT[2] * u32::from(quality)
        + WEIGHTS_PERCENT[3] * u32::from(compliance);
    let overall = ((weighted_hundredths + 50) / 100) as u8;

    Ok(Score::from_parts(
        optimization,
        credibility,
        quality,
        compliance,
        overall,
    ))
}

fn checked(dimension: &'static str, value: i64) -> EngineResult<u8> {
    if (0..=100).contains(&value) {
        Ok(value as u8)
    } else {
        Err(EngineError::OutOfRangeScore { dimension, value })
    }
}

/// Rounds to one decimal place, the precision averages are reported at.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
