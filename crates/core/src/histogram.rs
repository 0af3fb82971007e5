//! Fixed-bin histograms.
//!
//! A [`BinSpec`] is an ordered list of upper thresholds ending in an
//! unbounded catch-all. A value lands in the first bin whose threshold it
//! is strictly below, so a value equal to a threshold goes to the next bin
//! up.

use serde::Serialize;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bin {
    pub label: &'static str,
    /// Exclusive upper bound; `None` for the catch-all.
    pub upper: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BinSpec {
    pub unit: &'static str,
    pub bins: &'static [Bin],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BinCount {
    pub label: &'static str,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Histogram {
    pub unit: &'static str,
    pub bins: Vec<BinCount>,
    pub total: u64,
}

// ---------------------------------------------------------------------------
// Report bins
// ---------------------------------------------------------------------------

/// File sizes in megabytes.
pub const FILE_SIZE_MB: BinSpec = BinSpec {
    unit: "MB",
    bins: &[
        Bin { label: "<1Mb", upper: Some(1.0) },
        Bin { label: "1-10Mb", upper: Some(10.0) },
        Bin { label: "10-100Mb", upper: Some(100.0) },
        Bin { label: "100Mb-1Gb", upper: Some(1000.0) },
        Bin { label: ">1Gb", upper: None },
    ],
};

/// Request and migration latencies in seconds.
pub const LATENCY_SECONDS: BinSpec = BinSpec {
    unit: "s",
    bins: &[
        Bin { label: "<1s", upper: Some(1.0) },
        Bin { label: "1-10s", upper: Some(10.0) },
        Bin { label: "10s-1min", upper: Some(60.0) },
        Bin { label: "1-10min", upper: Some(600.0) },
        Bin { label: "10min-1h", upper: Some(3600.0) },
        Bin { label: "1-6h", upper: Some(21_600.0) },
        Bin { label: "6-24h", upper: Some(86_400.0) },
        Bin { label: ">1day", upper: None },
    ],
};

/// Age of garbage-collected files in seconds.
pub const GC_FILE_AGE_SECONDS: BinSpec = BinSpec {
    unit: "s",
    bins: &[
        Bin { label: "<1h", upper: Some(3600.0) },
        Bin { label: "1-6h", upper: Some(21_600.0) },
        Bin { label: "6-24h", upper: Some(86_400.0) },
        Bin { label: "1-7days", upper: Some(604_800.0) },
        Bin { label: "1-4weeks", upper: Some(2_419_200.0) },
        Bin { label: ">4weeks", upper: None },
    ],
};

/// Files recalled per tape mount.
pub const FILES_PER_MOUNT: BinSpec = BinSpec {
    unit: "files",
    bins: &[
        Bin { label: "1", upper: Some(2.0) },
        Bin { label: "2-10", upper: Some(11.0) },
        Bin { label: "11-100", upper: Some(101.0) },
        Bin { label: "101-1000", upper: Some(1001.0) },
        Bin { label: ">1000", upper: None },
    ],
};

// ---------------------------------------------------------------------------
// Binning
// ---------------------------------------------------------------------------

impl BinSpec {
    /// Thresholds must increase strictly and only the last bin may be
    /// unbounded.
    pub fn validate(&self) -> Result<(), CoreError> {
        let Some((last, bounded)) = self.bins.split_last() else {
            return Err(CoreError::Internal("histogram has no bins".into()));
        };
        if last.upper.is_some() {
            return Err(CoreError::Internal(format!(
                "histogram in {} lacks a catch-all bin",
                self.unit
            )));
        }
        let mut previous = f64::NEG_INFINITY;
        for bin in bounded {
            match bin.upper {
                Some(upper) if upper > previous => previous = upper,
                _ => {
                    return Err(CoreError::Internal(format!(
                        "histogram bin '{}' is out of order",
                        bin.label
                    )))
                }
            }
        }
        Ok(())
    }

    /// Index of the bin holding `value`. NaN falls through to the catch-all.
    pub fn index_of(&self, value: f64) -> usize {
        self.bins
            .iter()
            .position(|b| matches!(b.upper, Some(upper) if value < upper))
            .unwrap_or(self.bins.len().saturating_sub(1))
    }

    pub fn histogram(&self, values: impl IntoIterator<Item = f64>) -> Histogram {
        let mut counts = vec![0_u64; self.bins.len()];
        let mut total = 0;
        for value in values {
            if let Some(count) = counts.get_mut(self.index_of(value)) {
                *count += 1;
                total += 1;
            }
        }
        Histogram {
            unit: self.unit,
            bins: self
                .bins
                .iter()
                .zip(counts)
                .map(|(bin, count)| BinCount {
                    label: bin.label,
                    count,
                })
                .collect(),
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(h: &Histogram) -> Vec<u64> {
        h.bins.iter().map(|b| b.count).collect()
    }

    #[test]
    fn report_bins_are_well_formed() {
        for spec in [FILE_SIZE_MB, LATENCY_SECONDS, GC_FILE_AGE_SECONDS, FILES_PER_MOUNT] {
            spec.validate().unwrap();
        }
    }

    #[test]
    fn file_sizes_land_in_declared_bins() {
        let h = FILE_SIZE_MB.histogram([0.0, 0.0, 3.0, 7.0, 1000.0]);
        assert_eq!(counts(&h), vec![2, 2, 0, 0, 1]);
        assert_eq!(h.total, 5);
        assert_eq!(h.bins[0].label, "<1Mb");
    }

    #[test]
    fn threshold_values_go_to_the_upper_bin() {
        assert_eq!(FILE_SIZE_MB.index_of(0.999), 0);
        assert_eq!(FILE_SIZE_MB.index_of(1.0), 1);
        assert_eq!(FILE_SIZE_MB.index_of(10.0), 2);
        assert_eq!(LATENCY_SECONDS.index_of(86_400.0), 7);
    }

    #[test]
    fn binning_is_total() {
        for v in [f64::NEG_INFINITY, -1.0, f64::MAX, f64::INFINITY, f64::NAN] {
            assert!(FILE_SIZE_MB.index_of(v) < FILE_SIZE_MB.bins.len());
        }
        assert_eq!(FILE_SIZE_MB.index_of(f64::NAN), 4);
        assert_eq!(FILE_SIZE_MB.index_of(-1.0), 0);
    }

    #[test]
    fn empty_input_keeps_every_bin_at_zero() {
        let h = GC_FILE_AGE_SECONDS.histogram([]);
        assert_eq!(counts(&h), vec![0; 6]);
        assert_eq!(h.total, 0);
    }

    #[test]
    fn validate_rejects_unordered_or_open_specs() {
        let unordered = BinSpec {
            unit: "x",
            bins: &[
                Bin { label: "a", upper: Some(5.0) },
                Bin { label: "b", upper: Some(5.0) },
                Bin { label: "c", upper: None },
            ],
        };
        assert!(unordered.validate().is_err());

        let open = BinSpec {
            unit: "x",
            bins: &[Bin { label: "a", upper: Some(5.0) }],
        };
        assert!(open.validate().is_err());
    }
}
