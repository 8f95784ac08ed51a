
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::AcquisitionError;

pub const DEFAULT_THRESHOLD_DB:f64 = 3.4;
pub const DEFAULT_GUARD_SAMPLES:usize = 100;
pub const DEFAULT_SECOND_PEAK_SCALE:f64 = 0.95;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
	pub block_duration_ms:usize,
	pub doppler_bins_hz:Vec<f64>,
	pub satellites:Vec<usize>,
	pub threshold_db:f64,
	pub guard_samples:usize,
	pub second_peak_scale:f64,
	// Spacing of the two side frequencies tried around the coarse estimate before the phase-based stage
	pub medium_offset_hz:f64,
	pub fine_windows:usize,
	pub workers:Option<usize>,
}

impl Default for AcquisitionConfig {

	fn default() -> Self {
		Self {
			block_duration_ms: 10,
			doppler_bins_hz: (-100..100).map(|i| (i as f64) * 100.0).collect(),
			satellites: (1..=32).collect(),
			threshold_db: DEFAULT_THRESHOLD_DB,
			guard_samples: DEFAULT_GUARD_SAMPLES,
			second_peak_scale: DEFAULT_SECOND_PEAK_SCALE,
			medium_offset_hz: 400.0,
			fine_windows: 5,
			workers: None,
		}
	}

}

impl AcquisitionConfig {

	pub fn from_json_file<P: AsRef<Path>>(path:P) -> Result<Self, AcquisitionError> {
		let rdr = BufReader::new(File::open(path)?);
		let cfg:Self = serde_json::from_reader(rdr)?;
		cfg.validate()?;
		Ok(cfg)
	}

	/// Doppler bins from `-max_hz` (inclusive) to `max_hz` (exclusive) in steps of `step_hz`
	pub fn bins_from_range(max_hz:f64, step_hz:f64) -> Vec<f64> {
		let mut ans = vec![];
		if !(step_hz > 0.0) { return ans; }

		let mut freq = -max_hz;
		while freq < max_hz {
			ans.push(freq);
			freq += step_hz;
		}
		ans
	}

	pub fn validate(&self) -> Result<(), AcquisitionError> {
		let invalid = |msg:String| -> Result<(), AcquisitionError> { Err(AcquisitionError::InvalidArgument(msg)) };

		if self.doppler_bins_hz.is_empty()                   { return invalid("doppler bin sequence is empty".into()); }
		if self.doppler_bins_hz.iter().any(|f| !f.is_finite()) { return invalid("doppler bins must be finite".into()); }
		if self.satellites.is_empty()                        { return invalid("satellite sequence is empty".into()); }
		if self.block_duration_ms == 0                       { return invalid("block duration must be at least 1 ms".into()); }
		if !self.threshold_db.is_finite()                    { return invalid(format!("threshold must be finite, got {}", self.threshold_db)); }
		if !(self.second_peak_scale > 0.0 && self.second_peak_scale <= 1.0) {
			return invalid(format!("second peak scale must be in (0, 1], got {}", self.second_peak_scale));
		}
		if !(self.medium_offset_hz.is_finite() && self.medium_offset_hz >= 0.0) {
			return invalid(format!("medium frequency offset must be non-negative, got {}", self.medium_offset_hz));
		}
		if self.fine_windows < 2                             { return invalid(format!("need at least two fine-frequency windows, got {}", self.fine_windows)); }
		if self.workers == Some(0)                           { return invalid("worker count must be at least one".into()); }

		Ok(())
	}

}
