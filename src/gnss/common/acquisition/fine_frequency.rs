
use std::f64::consts::PI;

use log::{debug, warn};
use num_complex::Complex;
use num_traits::Zero;

use crate::{AcquisitionError, SampleBlock};
use crate::config::AcquisitionConfig;
use super::SpreadingCode;

/// Largest phase step between consecutive windows that's accepted after unwrapping
pub const PHASE_TOLERANCE_RAD:f64 = (2.3 * PI) / 5.0;

// Tried in this order; the first one that brings the difference inside the tolerance is used
const PHASE_CORRECTIONS_RAD:[f64; 6] = [0.0, -2.0*PI, 2.0*PI, -PI, -3.0*PI, PI];

/// Resolves the cycle and half-cycle ambiguity in a phase difference.  If no correction fits
/// inside the tolerance, the candidate closest to zero is returned.
pub fn unwrap_phase_diff(diff_rad:f64) -> f64 {
	let candidates = PHASE_CORRECTIONS_RAD.iter().map(|c| diff_rad + c);
	match candidates.clone().find(|x| x.abs() <= PHASE_TOLERANCE_RAD) {
		Some(x) => x,
		None => candidates.fold(diff_rad, |best, x| if x.abs() < best.abs() { x } else { best }),
	}
}

/// Single-frequency DFT using absolute sample times
pub fn narrowband_dft(samples:&[Complex<f64>], timestamps:&[f64], freq_hz:f64) -> Complex<f64> {
	samples.iter().zip(timestamps.iter()).fold(Complex::zero(), |acc, (x, t)| {
		let phase:f64 = -2.0 * PI * freq_hz * t;
		acc + *x * Complex{ re: phase.cos(), im: phase.sin() }
	})
}

/// Refines a coarse Doppler estimate in two stages: a choice among three nearby frequencies, then
/// the average rate of phase change across consecutive code periods with the code wiped off
pub struct FineFrequencyEstimator {
	pub medium_offset_hz:f64,
	pub n_windows:usize,
}

impl FineFrequencyEstimator {

	pub fn new(cfg:&AcquisitionConfig) -> Self {
		Self { medium_offset_hz: cfg.medium_offset_hz, n_windows: cfg.fine_windows }
	}

	// One code period of samples starting at `start`, multiplied by the code to leave only the carrier
	fn code_wiped_window<'a>(block:&'a SampleBlock, code:&SpreadingCode, start:usize) -> (Vec<Complex<f64>>, &'a [f64]) {
		let end:usize = start + code.len();
		let cw:Vec<Complex<f64>> = block.samples()[start..end].iter()
			.zip(code.samples().iter())
			.map(|(x, c)| *x * *c)
			.collect();
		(cw, &block.timestamps()[start..end])
	}

	/// Whichever of the coarse estimate and the coarse estimate plus or minus the medium offset has the
	/// most power over one code period starting at the code phase
	pub fn medium_estimate(&self, block:&SampleBlock, code:&SpreadingCode, code_phase_samples:usize, coarse_hz:f64) -> Result<f64, AcquisitionError> {
		if code_phase_samples + code.len() > block.len() {
			return Err(AcquisitionError::InvalidArgument(format!("block of {} samples can't hold a code period starting at {}", block.len(), code_phase_samples)));
		}

		let (cw, t) = Self::code_wiped_window(block, code, code_phase_samples);
		let mut best:(f64, f64) = (coarse_hz, narrowband_dft(&cw, t, coarse_hz).norm_sqr());
		for freq in &[coarse_hz - self.medium_offset_hz, coarse_hz + self.medium_offset_hz] {
			let power:f64 = narrowband_dft(&cw, t, *freq).norm_sqr();
			if power > best.1 { best = (*freq, power); }
		}

		debug!("Medium frequency estimate for PRN {:02}: {:9.2} [Hz] from {:9.2} [Hz]", code.prn, best.0, coarse_hz);
		Ok(best.0)
	}

	/// Fine Doppler estimate, or None when the block doesn't hold enough code periods after the code phase
	pub fn estimate(&self, block:&SampleBlock, code:&SpreadingCode, code_phase_samples:usize, coarse_hz:f64) -> Result<Option<f64>, AcquisitionError> {
		let period:usize = code.len();
		if code_phase_samples + self.n_windows * period > block.len() {
			warn!("Skipping fine frequency estimate for PRN {:02}; need {} samples after code phase {}, block has {}",
				code.prn, self.n_windows * period, code_phase_samples, block.len());
			return Ok(None);
		}

		let medium_hz:f64 = self.medium_estimate(block, code, code_phase_samples, coarse_hz)?;

		let phases:Vec<f64> = (0..self.n_windows).map(|i| {
			let (cw, t) = Self::code_wiped_window(block, code, code_phase_samples + i*period);
			narrowband_dft(&cw, t, medium_hz).arg()
		}).collect();

		let window_sec:f64 = (period as f64) / block.fs();
		let freq_offsets:Vec<f64> = phases.windows(2)
			.map(|w| unwrap_phase_diff(w[1] - w[0]) / (2.0 * PI * window_sec))
			.collect();
		let correction_hz:f64 = freq_offsets.iter().sum::<f64>() / (freq_offsets.len() as f64);

		debug!("Fine frequency offsets for PRN {:02}: {:?} [Hz], mean {:8.3} [Hz]", code.prn, freq_offsets, correction_hz);
		Ok(Some(medium_hz + correction_hz))
	}

}

#[cfg(test)]
mod tests {
	use super::*;

	const FS:f64 = 64.0e3;

	// Eight-sample code at 8 kHz chipping gives a 1 ms period at 64 kHz
	fn square_code() -> SpreadingCode {
		let samples:Vec<f64> = (0..64).map(|i| if (i / 8) % 3 == 0 { -1.0 } else { 1.0 }).collect();
		SpreadingCode::new(0, samples, 8.0e3, 8).unwrap()
	}

	fn carrier_block(code:&SpreadingCode, freq_hz:f64, code_phase:usize, n:usize) -> SampleBlock {
		let p = code.len();
		let samples:Vec<Complex<f64>> = (0..n).map(|i| {
			let phase:f64 = 2.0 * PI * freq_hz * (i as f64) / FS;
			let chip:f64 = code.samples()[(i + p - code_phase % p) % p];
			Complex{ re: phase.cos(), im: phase.sin() } * chip
		}).collect();
		SampleBlock::new(samples, FS).unwrap()
	}

	fn estimator() -> FineFrequencyEstimator {
		FineFrequencyEstimator{ medium_offset_hz: 400.0, n_windows: 5 }
	}

	#[test]
	fn unwrap_applies_corrections_in_order() {
		assert!((unwrap_phase_diff(0.1) - 0.1).abs() < 1e-12);
		assert!((unwrap_phase_diff(2.0*PI - 0.1) + 0.1).abs() < 1e-12);
		assert!((unwrap_phase_diff(-2.0*PI + 0.2) - 0.2).abs() < 1e-12);
		assert!((unwrap_phase_diff(PI + 0.1) - 0.1).abs() < 1e-12);
		assert!((unwrap_phase_diff(3.0*PI - 0.3) + 0.3).abs() < 1e-12);
		assert!((unwrap_phase_diff(-PI + 0.1) - 0.1).abs() < 1e-12);
	}

	#[test]
	fn unwrap_falls_back_to_smallest_candidate() {
		// Half way between two corrections, so nothing lands within the tolerance
		let x = unwrap_phase_diff(0.5 * PI);
		assert!((x.abs() - 0.5*PI).abs() < 1e-12);
	}

	#[test]
	fn dft_peaks_at_tone_frequency() {
		let code = square_code();
		let blk = carrier_block(&code, 1000.0, 0, 64);
		let cw:Vec<Complex<f64>> = blk.samples().iter().zip(code.samples().iter()).map(|(x, c)| *x * *c).collect();
		let on = narrowband_dft(&cw, blk.timestamps(), 1000.0).norm();
		let off = narrowband_dft(&cw, blk.timestamps(), 1400.0).norm();
		assert!((on - 64.0).abs() < 1e-9);
		assert!(off < on);
	}

	#[test]
	fn medium_estimate_moves_toward_true_frequency() {
		let code = square_code();
		let blk = carrier_block(&code, 2400.0, 10, 64*6);
		assert_eq!(estimator().medium_estimate(&blk, &code, 10, 2000.0).unwrap(), 2400.0);
		assert_eq!(estimator().medium_estimate(&blk, &code, 10, 2400.0).unwrap(), 2400.0);
	}

	#[test]
	fn fine_estimate_recovers_residual() {
		let code = square_code();
		for (truth, coarse) in &[(1530.0, 1500.0), (-2470.0, -2500.0), (1000.0, 1000.0), (3120.0, 3200.0)] {
			let blk = carrier_block(&code, *truth, 17, 64*6);
			let est = estimator().estimate(&blk, &code, 17, *coarse).unwrap().unwrap();
			assert!((est - truth).abs() < 1e-6, "truth {} coarse {} estimate {}", truth, coarse, est);
		}
	}

	#[test]
	fn short_block_skips_fine_estimate() {
		let code = square_code();
		let blk = carrier_block(&code, 1500.0, 40, 64*5);
		assert_eq!(estimator().estimate(&blk, &code, 40, 1500.0).unwrap(), None);
	}

}
