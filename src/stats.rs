//! Running per-band statistics of the output image.

use rkyv::{Archive, Deserialize, Serialize};

/// Running statistics of one band.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct BandStatistics {
    total: u64,
    valid: u64,
    sum: f64,
    sum_squares: f64,
    minimum: f64,
    maximum: f64,
}

impl Default for BandStatistics {
    fn default() -> Self {
        Self {
            total: 0,
            valid: 0,
            sum: 0.0,
            sum_squares: 0.0,
            minimum: f64::INFINITY,
            maximum: f64::NEG_INFINITY,
        }
    }
}

impl BandStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one pixel; `None` is a null pixel.
    pub fn record(&mut self, value: Option<f64>) {
        self.total += 1;
        if let Some(v) = value {
            self.valid += 1;
            self.sum += v;
            self.sum_squares += v * v;
            self.minimum = self.minimum.min(v);
            self.maximum = self.maximum.max(v);
        }
    }

    /// Fold in a partial accumulated over a disjoint set of pixels.
    pub fn merge(&mut self, other: &BandStatistics) {
        self.total += other.total;
        self.valid += other.valid;
        self.sum += other.sum;
        self.sum_squares += other.sum_squares;
        self.minimum = self.minimum.min(other.minimum);
        self.maximum = self.maximum.max(other.maximum);
    }

    pub fn total_pixels(&self) -> u64 {
        self.total
    }

    pub fn valid_pixels(&self) -> u64 {
        self.valid
    }

    pub fn null_pixels(&self) -> u64 {
        self.total - self.valid
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn sum_squares(&self) -> f64 {
        self.sum_squares
    }

    pub fn average(&self) -> Option<f64> {
        (self.valid > 0).then(|| self.sum / self.valid as f64)
    }

    /// Sample variance (denominator `valid - 1`).
    pub fn variance(&self) -> Option<f64> {
        if self.valid < 2 {
            return None;
        }
        let n = self.valid as f64;
        let var = (self.sum_squares - self.sum * self.sum / n) / (n - 1.0);
        Some(var.max(0.0))
    }

    pub fn standard_deviation(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }

    pub fn minimum(&self) -> Option<f64> {
        (self.valid > 0).then_some(self.minimum)
    }

    pub fn maximum(&self) -> Option<f64> {
        (self.valid > 0).then_some(self.maximum)
    }
}

/// One [`BandStatistics`] per band.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct StatisticsAccumulator {
    bands: Vec<BandStatistics>,
}

impl StatisticsAccumulator {
    pub fn new(bands: u32) -> Self {
        Self {
            bands: vec![BandStatistics::default(); bands as usize],
        }
    }

    /// Count one pixel of `band` (1-based).
    pub fn record(&mut self, band: u32, value: Option<f64>) {
        self.bands[band as usize - 1].record(value);
    }

    pub fn merge(&mut self, other: &StatisticsAccumulator) {
        for (mine, theirs) in self.bands.iter_mut().zip(&other.bands) {
            mine.merge(theirs);
        }
    }

    pub fn band(&self, band: u32) -> Option<&BandStatistics> {
        band.checked_sub(1).and_then(|b| self.bands.get(b as usize))
    }

    pub fn bands(&self) -> &[BandStatistics] {
        &self.bands
    }
}
