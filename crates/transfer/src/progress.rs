use std::time::{Duration, Instant};

/// Byte accounting for a single transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    /// Size declared to the server when the upload was created.
    pub total_bytes: u64,
    /// Offset confirmed by the server so far.
    pub confirmed_bytes: u64,
}

impl TransferProgress {
    /// Starts accounting for a transfer of `total_bytes`.
    pub fn new(total_bytes: u64) -> Self {
        Self {
            total_bytes,
            confirmed_bytes: 0,
        }
    }

    /// Bytes still to be confirmed.
    pub fn remaining(&self) -> u64 {
        self.total_bytes.saturating_sub(self.confirmed_bytes)
    }

    /// Returns `true` once every declared byte is confirmed.
    pub fn is_complete(&self) -> bool {
        self.confirmed_bytes == self.total_bytes
    }
}

// ---------------------------------------------------------------------------
// SpeedCalculator
// ---------------------------------------------------------------------------

struct SpeedSample {
    bytes: u64,
    timestamp: Instant,
}

/// Calculates transfer speed using a sliding window of samples.
pub struct SpeedCalculator {
    samples: Vec<SpeedSample>,
    max_samples: usize,
    window_size: Duration,
}

impl Default for SpeedCalculator {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl SpeedCalculator {
    /// Creates a new calculator.
    ///
    /// - `window_size`: time window for speed calculation (default 30 s).
    /// - `max_samples`: maximum retained samples (default 100).
    pub fn new(window_size: Option<Duration>, max_samples: Option<usize>) -> Self {
        Self {
            samples: Vec::new(),
            max_samples: max_samples.unwrap_or(100),
            window_size: window_size.unwrap_or(Duration::from_secs(30)),
        }
    }

    /// Records `bytes` transferred at the current instant.
    pub fn add_sample(&mut self, bytes: u64) {
        self.add_sample_at(bytes, Instant::now());
    }

    fn add_sample_at(&mut self, bytes: u64, now: Instant) {
        self.samples.push(SpeedSample {
            bytes,
            timestamp: now,
        });

        // Prune samples outside the window.
        if let Some(cutoff) = now.checked_sub(self.window_size) {
            self.samples.retain(|sample| sample.timestamp >= cutoff);
        }

        if self.samples.len() > self.max_samples {
            let excess = self.samples.len() - self.max_samples;
            self.samples.drain(..excess);
        }
    }

    /// Average speed in bytes/second within the window.
    ///
    /// Returns 0.0 with fewer than 2 samples. The first sample only marks the
    /// start of the window; its bytes are not counted.
    pub fn bytes_per_second(&self) -> f64 {
        if self.samples.len() < 2 {
            return 0.0;
        }

        let first = &self.samples[0];
        let last = &self.samples[self.samples.len() - 1];
        let elapsed = last.timestamp.duration_since(first.timestamp);
        if elapsed.is_zero() {
            return 0.0;
        }

        let total_bytes: u64 = self.samples[1..].iter().map(|sample| sample.bytes).sum();
        total_bytes as f64 / elapsed.as_secs_f64()
    }

    /// Estimates time remaining to transfer `remaining_bytes`.
    ///
    /// Returns `None` if speed is zero.
    pub fn eta(&self, remaining_bytes: u64) -> Option<Duration> {
        let speed = self.bytes_per_second();
        if speed <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(remaining_bytes as f64 / speed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_counts_remaining() {
        let mut p = TransferProgress::new(100);
        assert_eq!(p.remaining(), 100);
        assert!(!p.is_complete());

        p.confirmed_bytes = 40;
        assert_eq!(p.remaining(), 60);

        p.confirmed_bytes = 100;
        assert!(p.is_complete());
        assert_eq!(p.remaining(), 0);
    }

    #[test]
    fn empty_transfer_is_complete() {
        let p = TransferProgress::new(0);
        assert!(p.is_complete());
        assert_eq!(p.remaining(), 0);
    }

    #[test]
    fn speed_calculator_no_samples() {
        let calc = SpeedCalculator::default();
        assert_eq!(calc.bytes_per_second(), 0.0);
        assert!(calc.eta(1000).is_none());
    }

    #[test]
    fn speed_calculator_single_sample() {
        let mut calc = SpeedCalculator::default();
        calc.add_sample(100);
        assert_eq!(calc.bytes_per_second(), 0.0);
    }

    #[test]
    fn speed_calculator_fixed_timestamps() {
        let mut calc = SpeedCalculator::new(Some(Duration::from_secs(60)), None);
        let start = Instant::now();
        calc.add_sample_at(0, start);
        calc.add_sample_at(1000, start + Duration::from_secs(1));
        calc.add_sample_at(1000, start + Duration::from_secs(2));

        assert!((calc.bytes_per_second() - 1000.0).abs() < 1e-6);
        let eta = calc.eta(5000).unwrap();
        assert_eq!(eta.as_secs(), 5);
    }

    #[test]
    fn speed_calculator_max_samples() {
        let mut calc = SpeedCalculator::new(Some(Duration::from_secs(60)), Some(5));
        for i in 0..20 {
            calc.add_sample(i * 10);
        }
        assert!(calc.samples.len() <= 5);
    }

    #[test]
    fn speed_calculator_prunes_old_samples() {
        let mut calc = SpeedCalculator::new(Some(Duration::from_secs(5)), None);
        let start = Instant::now();
        calc.add_sample_at(10, start);
        calc.add_sample_at(10, start + Duration::from_secs(10));
        assert_eq!(calc.samples.len(), 1);
    }
}
