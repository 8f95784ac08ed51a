
use num_complex::Complex;
use thiserror::Error;

pub mod config;
pub mod gnss;
pub mod io;
pub mod report;

#[derive(Debug, Clone)]
pub struct Sample {
	pub val: Complex<f64>,
	pub idx: usize,
}

#[derive(Debug, Error)]
pub enum AcquisitionError {
	#[error("invalid argument: {0}")]
	InvalidArgument(String),
	#[error("numerically degenerate statistic: {0}")]
	NumericDegenerate(&'static str),
	#[error("unable to read samples: {0}")]
	Io(#[from] std::io::Error),
	#[error("unable to parse configuration: {0}")]
	Config(#[from] serde_json::Error),
}

/// One finite observation window of complex baseband samples.  The timestamps are in seconds
/// and are parallel to the samples; they're the time base for every carrier wipe-off.
#[derive(Debug, Clone)]
pub struct SampleBlock {
	samples: Vec<Complex<f64>>,
	timestamps: Vec<f64>,
	fs: f64,
}

impl SampleBlock {

	pub fn new(samples:Vec<Complex<f64>>, fs:f64) -> Result<Self, AcquisitionError> {
		Self::starting_at(samples, fs, 0.0)
	}

	pub fn starting_at(samples:Vec<Complex<f64>>, fs:f64, t0:f64) -> Result<Self, AcquisitionError> {
		let timestamps:Vec<f64> = (0..samples.len()).map(|idx| t0 + (idx as f64) / fs).collect();
		Self::with_timestamps(samples, timestamps, fs)
	}

	pub fn with_timestamps(samples:Vec<Complex<f64>>, timestamps:Vec<f64>, fs:f64) -> Result<Self, AcquisitionError> {
		if !(fs.is_finite() && fs > 0.0) {
			return Err(AcquisitionError::InvalidArgument(format!("sample rate must be positive, got {}", fs)));
		}
		if samples.len() != timestamps.len() {
			return Err(AcquisitionError::InvalidArgument(format!("{} samples but {} timestamps", samples.len(), timestamps.len())));
		}
		Ok(Self { samples, timestamps, fs })
	}

	pub fn len(&self) -> usize { self.samples.len() }
	pub fn is_empty(&self) -> bool { self.samples.is_empty() }
	pub fn fs(&self) -> f64 { self.fs }
	pub fn samples(&self) -> &[Complex<f64>] { &self.samples }
	pub fn timestamps(&self) -> &[f64] { &self.timestamps }

	/// Number of samples in the given number of milliseconds at this block's rate
	pub fn samples_per_ms(&self, ms:usize) -> usize { ((self.fs * (ms as f64)) / 1000.0).round() as usize }

	/// A new block holding the first `n` samples, or an error if there aren't that many
	pub fn head(&self, n:usize) -> Result<SampleBlock, AcquisitionError> {
		if n > self.len() {
			return Err(AcquisitionError::InvalidArgument(format!("requested {} samples from a block of {}", n, self.len())));
		}
		Ok(SampleBlock { samples: self.samples[..n].to_vec(), timestamps: self.timestamps[..n].to_vec(), fs: self.fs })
	}

}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn timestamps_follow_sample_rate() {
		let blk = SampleBlock::starting_at(vec![Complex{ re: 1.0, im: 0.0 }; 4], 2.0, 10.0).unwrap();
		assert_eq!(blk.timestamps(), &[10.0, 10.5, 11.0, 11.5]);
		assert_eq!(blk.head(2).unwrap().len(), 2);
		assert!(blk.head(5).is_err());
	}

	#[test]
	fn mismatched_timestamps_are_rejected() {
		let res = SampleBlock::with_timestamps(vec![Complex{ re: 1.0, im: 0.0 }; 4], vec![0.0; 3], 1.0);
		assert!(matches!(res, Err(AcquisitionError::InvalidArgument(_))));
		assert!(SampleBlock::new(vec![], 0.0).is_err());
	}

}
