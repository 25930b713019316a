//! Accuracy aggregation.

pub mod claims;

pub use claims::{apply_claim_overrides, breakdown, failed_attacks, Breakdown};

use crate::errors::HarnessError;
use crate::model::{AggregateScore, DifficultyBand};
use serde::Serialize;

/// Percentage of `true` flags; 0 for an empty slice.
pub fn accuracy(flags: &[bool]) -> f64 {
    if flags.is_empty() {
        return 0.0;
    }
    let hits = flags.iter().filter(|f| **f).count();
    hits as f64 / flags.len() as f64 * 100.0
}

pub fn score(flags: &[bool]) -> AggregateScore {
    AggregateScore {
        count: flags.len(),
        accuracy_percent: accuracy(flags),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BandBreakdown {
    pub simple: AggregateScore,
    pub moderate: AggregateScore,
    pub challenging: AggregateScore,
    pub total: AggregateScore,
}

impl BandBreakdown {
    pub fn band(&self, band: DifficultyBand) -> AggregateScore {
        match band {
            DifficultyBand::Simple => self.simple,
            DifficultyBand::Moderate => self.moderate,
            DifficultyBand::Challenging => self.challenging,
        }
    }
}

/// Scores `flags` overall and per band. Without labels every band reports
/// the overall score. Unlabelled entries only count towards the total.
pub fn score_by_band(
    flags: &[bool],
    bands: Option<&[Option<DifficultyBand>]>,
) -> Result<BandBreakdown, HarnessError> {
    let total = score(flags);
    let Some(bands) = bands else {
        return Ok(BandBreakdown {
            simple: total,
            moderate: total,
            challenging: total,
            total,
        });
    };
    if bands.len() != flags.len() {
        return Err(HarnessError::LabelMismatch {
            labels: bands.len(),
            results: flags.len(),
        });
    }

    let of = |band: DifficultyBand| {
        let picked: Vec<bool> = flags
            .iter()
            .zip(bands)
            .filter(|(_, b)| **b == Some(band))
            .map(|(f, _)| *f)
            .collect();
        score(&picked)
    };
    Ok(BandBreakdown {
        simple: of(DifficultyBand::Simple),
        moderate: of(DifficultyBand::Moderate),
        challenging: of(DifficultyBand::Challenging),
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[]), 0.0);
        assert_eq!(accuracy(&[true, false, true, true]), 75.0);
        assert_eq!(accuracy(&[false]), 0.0);
    }

    #[test]
    fn test_bands() {
        use DifficultyBand::*;
        let flags = [true, false, true, true];
        let bands = [Some(Simple), Some(Simple), Some(Moderate), None];
        let b = score_by_band(&flags, Some(&bands)).unwrap();
        assert_eq!(b.simple.count, 2);
        assert_eq!(b.simple.accuracy_percent, 50.0);
        assert_eq!(b.moderate.accuracy_percent, 100.0);
        assert_eq!(b.challenging, AggregateScore { count: 0, accuracy_percent: 0.0 });
        assert_eq!(b.total.count, 4);
        assert_eq!(b.total.accuracy_percent, 75.0);
    }

    #[test]
    fn test_unlabelled_bands_mirror_total() {
        let b = score_by_band(&[true, false], None).unwrap();
        for band in DifficultyBand::ALL {
            assert_eq!(b.band(band), b.total);
        }
        assert_eq!(b.total.accuracy_percent, 50.0);
    }

    #[test]
    fn test_label_mismatch() {
        let err = score_by_band(&[true], Some(&[])).unwrap_err();
        assert!(matches!(
            err,
            HarnessError::LabelMismatch { labels: 0, results: 1 }
        ));
    }
}
