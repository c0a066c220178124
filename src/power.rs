//! Power math on a single sweep

/// How an integrated power value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationMethod {
    /// `10·log10(Σ 10^(p/10))`
    Linear,
    /// Linear sum was zero, the weakest bin is reported instead
    MinFallback,
    /// Linear sum overflowed or was not a number, the plain dBm mean is reported
    MeanFallback,
}

impl IntegrationMethod {
    /// The mean fallback is a different quantity, not just a clamp
    pub fn is_degraded(&self) -> bool {
        *self == IntegrationMethod::MeanFallback
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegratedPower {
    pub dbm: f64,
    pub method: IntegrationMethod,
}

/// Peak bin and mean level of one sweep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumStats {
    pub peak_dbm: f64,
    pub peak_mhz: f64,
    pub peak_index: usize,
    pub average_dbm: f64,
}

#[inline]
pub fn dbm_to_mw(dbm: f64) -> f64 {
    10f64.powf(dbm / 10.0)
}

#[inline]
pub fn mw_to_dbm(mw: f64) -> f64 {
    10.0 * mw.log10()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Total power across all bins, summed in the linear (mW) domain.
/// Returns `None` for an empty sweep.
pub fn integrate(powers: &[f64]) -> Option<IntegratedPower> {
    if powers.is_empty() {
        return None;
    }
    let total_mw: f64 = powers.iter().copied().map(dbm_to_mw).sum();
    if !total_mw.is_finite() {
        return Some(IntegratedPower {
            dbm: mean(powers)?,
            method: IntegrationMethod::MeanFallback,
        });
    }
    if total_mw > 0.0 {
        Some(IntegratedPower {
            dbm: mw_to_dbm(total_mw),
            method: IntegrationMethod::Linear,
        })
    } else {
        Some(IntegratedPower {
            dbm: powers.iter().copied().fold(f64::INFINITY, f64::min),
            method: IntegrationMethod::MinFallback,
        })
    }
}

/// Peak (first occurrence on ties) and arithmetic mean of one sweep.
/// Returns `None` for an empty sweep or mismatched axes.
pub fn spectrum_stats(frequencies: &[f64], powers: &[f64]) -> Option<SpectrumStats> {
    if frequencies.len() != powers.len() {
        return None;
    }
    let (peak_index, peak_dbm) =
        powers
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (i, p)| match best {
                Some((_, b)) if p <= b => best,
                _ => Some((i, p)),
            })?;
    Some(SpectrumStats {
        peak_dbm,
        peak_mhz: frequencies[peak_index],
        peak_index,
        average_dbm: mean(powers)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integration_is_not_an_average() {
        let p = integrate(&[-10.0, -10.0]).unwrap();
        assert_eq!(p.method, IntegrationMethod::Linear);
        assert!((p.dbm - 10.0 * 0.2f64.log10()).abs() < 1e-9);
        assert!((p.dbm - -6.9897).abs() < 1e-3);
        assert!((p.dbm - -10.0).abs() > 1.0);
    }

    #[test]
    fn test_single_bin_is_identity() {
        let p = integrate(&[-42.5]).unwrap();
        assert!((p.dbm - -42.5).abs() < 1e-9);
    }

    #[test]
    fn test_zero_linear_sum_falls_back_to_min() {
        let p = integrate(&[f64::NEG_INFINITY, f64::NEG_INFINITY]).unwrap();
        assert_eq!(p.method, IntegrationMethod::MinFallback);
        assert_eq!(p.dbm, f64::NEG_INFINITY);
    }

    #[test]
    fn test_overflow_falls_back_to_mean() {
        let p = integrate(&[4000.0, 10.0]).unwrap();
        assert_eq!(p.method, IntegrationMethod::MeanFallback);
        assert!(p.method.is_degraded());
        assert_eq!(p.dbm, 2005.0);
    }

    #[test]
    fn test_empty_sweep() {
        assert!(integrate(&[]).is_none());
        assert!(spectrum_stats(&[], &[]).is_none());
    }

    #[test]
    fn test_mismatched_axes() {
        assert!(spectrum_stats(&[1.0, 2.0], &[-10.0]).is_none());
        assert!(spectrum_stats(&[1.0], &[-10.0, -20.0]).is_none());
    }

    #[test]
    fn test_peak_first_on_ties() {
        let stats = spectrum_stats(&[1.0, 2.0, 3.0, 4.0], &[-80.0, -20.0, -20.0, -90.0]).unwrap();
        assert_eq!(stats.peak_index, 1);
        assert_eq!(stats.peak_mhz, 2.0);
        assert_eq!(stats.peak_dbm, -20.0);
        assert_eq!(stats.average_dbm, -52.5);
    }
}
