use crate::error::ConfigError;

/// Bins defined by ascending breaks: edges, centres and widths.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    edges: Vec<f64>,
    centres: Vec<f64>,
    widths: Vec<f64>,
}

impl Mesh {
    /// Builds the bins between consecutive `breaks`.
    ///
    /// Callers validate that `breaks` is strictly increasing.
    pub(crate) fn from_breaks(breaks: &[f64]) -> Self {
        let centres = breaks.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();
        let widths = breaks.windows(2).map(|w| w[1] - w[0]).collect();
        Self {
            edges: breaks.to_vec(),
            centres,
            widths,
        }
    }

    /// Bin edges, ascending; one more than the number of bins.
    #[must_use]
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Bin midpoints, ascending.
    #[must_use]
    pub fn centres(&self) -> &[f64] {
        &self.centres
    }

    /// Bin widths, in the same order as the centres.
    #[must_use]
    pub fn widths(&self) -> &[f64] {
        &self.widths
    }

    /// Number of bins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.centres.len()
    }

    /// Returns `true` if there are no bins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.centres.is_empty()
    }
}

/// Checks that trait values are finite and strictly increasing.
pub(crate) fn validate_traits(traits: &[f64]) -> Result<(), ConfigError> {
    let finite = traits.iter().all(|x| x.is_finite());
    let increasing = traits.windows(2).all(|w| w[0] < w[1]);
    if finite && increasing {
        Ok(())
    } else {
        Err(ConfigError::UnsortedTraits)
    }
}

/// Generates `points` values from `xb` to `xm` inclusive.
///
/// Log spacing is uniform in `ln x` and needs `xb > 0`.
pub(crate) fn grid(xb: f64, xm: f64, points: usize, log_spaced: bool) -> Result<Vec<f64>, ConfigError> {
    let invalid = ConfigError::InvalidDomain { xb, xm, points };
    if !xb.is_finite() || !xm.is_finite() || points == 0 || (log_spaced && xb <= 0.0) {
        return Err(invalid);
    }
    if points == 1 {
        return Ok(vec![xb]);
    }
    if xb >= xm {
        return Err(invalid);
    }

    let n = (points - 1) as f64;
    let values = if log_spaced {
        let (lb, lm) = (xb.ln(), xm.ln());
        (0..points)
            .map(|i| (lb + i as f64 * (lm - lb) / n).exp())
            .collect()
    } else {
        (0..points).map(|i| xb + i as f64 * (xm - xb) / n).collect()
    };
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn bins_from_breaks() {
        let mesh = Mesh::from_breaks(&[0.0, 1.0, 3.0]);
        assert_eq!(mesh.len(), 2);
        assert_eq!(mesh.centres(), &[0.5, 2.0]);
        assert_eq!(mesh.widths(), &[1.0, 2.0]);
        assert_eq!(mesh.edges().len(), 3);
    }

    #[test]
    fn linear_and_log_grids() {
        let linear = grid(0.0, 1.0, 5, false).unwrap();
        assert_eq!(linear, [0.0, 0.25, 0.5, 0.75, 1.0]);

        let log = grid(0.01, 100.0, 5, true).unwrap();
        for (value, expected) in log.iter().zip([0.01, 0.1, 1.0, 10.0, 100.0]) {
            assert_relative_eq!(*value, expected, max_relative = 1e-12);
        }
    }

    #[test]
    fn rejects_bad_domains() {
        assert!(grid(0.0, 1.0, 5, true).is_err());
        assert!(grid(1.0, 1.0, 3, false).is_err());
        assert!(grid(0.0, f64::INFINITY, 3, false).is_err());
        assert!(grid(0.0, 1.0, 0, false).is_err());
    }

    #[test]
    fn traits_must_increase() {
        assert!(validate_traits(&[0.0, 1.0, 2.0]).is_ok());
        assert_eq!(
            validate_traits(&[0.0, 1.0, 1.0]),
            Err(ConfigError::UnsortedTraits)
        );
        assert!(validate_traits(&[0.0, f64::NAN]).is_err());
    }
}
