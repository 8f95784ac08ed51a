
use std::f64::consts;
use std::sync::Arc;

use rustfft::{FFT, FFTplanner};
use num_complex::Complex;
use num_traits::Zero;

use crate::{AcquisitionError, SampleBlock};
use super::SpreadingCode;

/// Circular cross-correlation of a sample block against one satellite's code.  The code's
/// transform is computed once here and shared by every Doppler bin, so the engine is immutable
/// once built and can be used from several threads at once.
pub struct CorrelationEngine {
	len_fft:usize,
	fft:Arc<dyn FFT<f64>>,
	ifft:Arc<dyn FFT<f64>>,
	local_code_freq_domain:Vec<Complex<f64>>,
}

impl CorrelationEngine {

	pub fn new(code:&SpreadingCode, len_fft:usize) -> Result<Self, AcquisitionError> {
		if len_fft < code.len() {
			return Err(AcquisitionError::InvalidArgument(format!("block of {} samples is shorter than one {}-sample code period", len_fft, code.len())));
		}

		// Forward FFT
		let mut local_code_time_domain:Vec<Complex<f64>> = code.tiled(len_fft);
		let mut fft_out:Vec<Complex<f64>> = vec![Complex::zero(); len_fft];
		let mut planner = FFTplanner::new(false);
		let fft = planner.plan_fft(len_fft);
		fft.process(&mut local_code_time_domain, &mut fft_out);

		let local_code_freq_domain:Vec<Complex<f64>> = fft_out.iter().map(|p| p.conj()).collect();

		// Inverse FFT
		let mut inv_planner = FFTplanner::new(true);
		let ifft = inv_planner.plan_fft(len_fft);

		Ok(CorrelationEngine{ len_fft, fft, ifft, local_code_freq_domain })
	}

	pub fn len(&self) -> usize { self.len_fft }

	/// Correlation power at each of the first `window` sample delays after wiping `doppler_hz` off the block
	pub fn power_profile(&self, block:&SampleBlock, doppler_hz:f64, window:usize) -> Result<Vec<f64>, AcquisitionError> {
		if block.len() != self.len_fft {
			return Err(AcquisitionError::InvalidArgument(format!("expected a block of {} samples, got {}", self.len_fft, block.len())));
		}
		if window > self.len_fft {
			return Err(AcquisitionError::InvalidArgument(format!("window of {} samples exceeds the {}-sample block", window, self.len_fft)));
		}

		// Wipe the carrier off the input signal
		let mut doppler_wiped_time_domain:Vec<Complex<f64>> = block.samples().iter()
			.zip(block.timestamps().iter())
			.map(|(s, t)| {
				let phase:f64 = -2.0 * consts::PI * doppler_hz * t;
				*s * Complex{ re: phase.cos(), im: phase.sin() }
			}).collect();

		let mut fft_out:Vec<Complex<f64>> = vec![Complex::zero(); self.len_fft];
		self.fft.process(&mut doppler_wiped_time_domain, &mut fft_out);

		// Multiplying by the conjugate in the freq domain is correlation in the time domain
		let mut correlation_freq_domain:Vec<Complex<f64>> = fft_out.iter()
			.zip(self.local_code_freq_domain.iter())
			.map(|(a, b)| *a * *b)
			.collect();

		let mut ifft_out:Vec<Complex<f64>> = vec![Complex::zero(); self.len_fft];
		self.ifft.process(&mut correlation_freq_domain, &mut ifft_out);

		// The inverse transform is unnormalized
		let scale:f64 = (self.len_fft as f64).powi(2);
		Ok(ifft_out[..window].iter().map(|c| c.norm_sqr() / scale).collect())
	}

}

#[cfg(test)]
mod tests {
	use super::*;

	fn short_code() -> SpreadingCode {
		// Length-31 m-sequence
		let mut reg:u32 = 0b11111;
		let samples:Vec<f64> = (0..31).map(|_| {
			let bit = reg & 1;
			let fb = (reg ^ (reg >> 2)) & 1;
			reg = (reg >> 1) | (fb << 4);
			if bit == 1 { -1.0 } else { 1.0 }
		}).collect();
		SpreadingCode::new(0, samples, 31.0e3, 31).unwrap()
	}

	#[test]
	fn delayed_code_peaks_at_its_delay() {
		let code = short_code();
		let engine = CorrelationEngine::new(&code, 62).unwrap();
		for k in 0..31 {
			let samples:Vec<Complex<f64>> = (0..62).map(|n| Complex{ re: code.samples()[(n + 31 - k) % 31], im: 0.0 }).collect();
			let block = SampleBlock::new(samples, 31.0e3).unwrap();
			let profile = engine.power_profile(&block, 0.0, 31).unwrap();
			assert_eq!(profile.len(), 31);

			let (peak_idx, _) = profile.iter().enumerate().fold((0, 0.0), |best, (i, p)| if *p > best.1 { (i, *p) } else { best });
			assert_eq!(peak_idx, k);
			assert!((profile[k] - 62.0*62.0).abs() < 1e-6);
		}
	}

	#[test]
	fn mismatched_lengths_are_rejected() {
		let code = short_code();
		assert!(matches!(CorrelationEngine::new(&code, 30), Err(AcquisitionError::InvalidArgument(_))));

		let engine = CorrelationEngine::new(&code, 31).unwrap();
		let block = SampleBlock::new(vec![Complex::zero(); 40], 31.0e3).unwrap();
		assert!(engine.power_profile(&block, 0.0, 31).is_err());

		let block = SampleBlock::new(vec![Complex::zero(); 31], 31.0e3).unwrap();
		assert!(engine.power_profile(&block, 0.0, 32).is_err());
	}

}
