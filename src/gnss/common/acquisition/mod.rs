
use num_complex::Complex;
use serde::{Serialize, Deserialize};

use crate::AcquisitionError;

pub mod correlation;
pub mod doppler_search;
pub mod fine_frequency;
pub mod orchestrator;


pub use self::orchestrator::acquire;

/// One period of a satellite's ±1 spreading code, sampled at the receiver rate
#[derive(Debug, Clone)]
pub struct SpreadingCode {
	pub prn:usize,
	samples:Vec<f64>,
	chip_rate_cps:f64,
	code_length_chips:usize,
}

impl SpreadingCode {

	pub fn new(prn:usize, samples:Vec<f64>, chip_rate_cps:f64, code_length_chips:usize) -> Result<Self, AcquisitionError> {
		if samples.is_empty() || code_length_chips == 0 {
			return Err(AcquisitionError::InvalidArgument(format!("empty spreading code for PRN {}", prn)));
		}
		if !(chip_rate_cps.is_finite() && chip_rate_cps > 0.0) {
			return Err(AcquisitionError::InvalidArgument(format!("chip rate must be positive, got {}", chip_rate_cps)));
		}
		Ok(Self { prn, samples, chip_rate_cps, code_length_chips })
	}

	/// Samples in one code period
	pub fn len(&self) -> usize { self.samples.len() }
	pub fn is_empty(&self) -> bool { self.samples.is_empty() }
	pub fn samples(&self) -> &[f64] { &self.samples }
	pub fn chip_rate_cps(&self) -> f64 { self.chip_rate_cps }
	pub fn code_length_chips(&self) -> usize { self.code_length_chips }
	pub fn period_sec(&self) -> f64 { (self.code_length_chips as f64) / self.chip_rate_cps }

	/// The code repeated without phase discontinuity out to `n` samples
	pub fn tiled(&self, n:usize) -> Vec<Complex<f64>> {
		self.samples.iter().cycle().take(n).map(|c| Complex{ re: *c, im: 0.0 }).collect()
	}

	/// Fails unless one period of this code at `fs` is the number of samples we're holding
	pub fn check_sample_rate(&self, fs:f64) -> Result<(), AcquisitionError> {
		let expected:f64 = fs * self.period_sec();
		if (expected - (self.len() as f64)).abs() > 0.5 {
			Err(AcquisitionError::InvalidArgument(format!("PRN {} code has {} samples per period but {} [samples/sec] implies {:.1}",
				self.prn, self.len(), fs, expected)))
		} else {
			Ok(())
		}
	}

	pub fn samples_to_chips(&self, samples_delay:f64, fs:f64) -> f64 {
		let n_chips = self.code_length_chips as f64;
		(n_chips - (self.chip_rate_cps / fs) * samples_delay).rem_euclid(n_chips)
	}

	pub fn chips_to_samples(&self, chips:f64, fs:f64) -> f64 {
		let n_chips = self.code_length_chips as f64;
		((n_chips - chips).rem_euclid(n_chips) * fs / self.chip_rate_cps).rem_euclid(self.len() as f64)
	}

}

pub trait CodeGenerator: Sync {
	fn spreading_code(&self, prn:usize, fs:f64) -> Result<SpreadingCode, AcquisitionError>;
}

/// Per-satellite accumulator for the Doppler search, discarded once it's turned into an [AcquisitionResult]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatelliteAcquisitionStats {
	pub prn:usize,
	pub acquired:bool,
	pub peak_to_second:Vec<f64>,
	pub best_bin:usize,
	pub doppler_hz:f64,
	pub code_phase_samples:usize,
	pub code_phase_chips:f64,
	pub max_snr_db:f64,
	pub test_statistic_db:f64,
	pub fine_doppler_hz:Option<f64>,
}

impl SatelliteAcquisitionStats {

	/// Ratio of the best peak-to-second value to the mean over the finite ones, in dB
	pub fn p2s_to_mean_db(&self) -> f64 {
		let finite:Vec<f64> = self.peak_to_second.iter().cloned().filter(|x| x.is_finite()).collect();
		if finite.is_empty() { return std::f64::NAN; }
		let mean:f64 = finite.iter().sum::<f64>() / (finite.len() as f64);
		10.0 * (self.test_statistic_db / mean).log10()
	}

	pub fn into_result(self) -> AcquisitionResult { self.into() }

}

/// Everything a tracking loop needs to start on a satellite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionResult {
	pub prn:usize,
	pub acquired:bool,
	pub doppler_hz:f64,
	pub fine_doppler_hz:Option<f64>,
	pub carrier_freq_hz:f64,
	pub code_phase_samples:usize,
	pub code_phase_chips:f64,
	pub test_statistic_db:f64,
}

impl From<SatelliteAcquisitionStats> for AcquisitionResult {

	fn from(stats:SatelliteAcquisitionStats) -> Self {
		Self {
			prn:                stats.prn,
			acquired:           stats.acquired,
			doppler_hz:         stats.doppler_hz,
			fine_doppler_hz:    stats.fine_doppler_hz,
			carrier_freq_hz:    stats.fine_doppler_hz.unwrap_or(stats.doppler_hz),
			code_phase_samples: stats.code_phase_samples,
			code_phase_chips:   stats.code_phase_chips,
			test_statistic_db:  stats.test_statistic_db,
		}
	}

}
