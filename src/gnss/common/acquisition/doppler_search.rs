
use log::{debug, trace};
use rayon::prelude::*;
use serde::{Serialize, Deserialize};

use crate::{AcquisitionError, SampleBlock};
use crate::config::AcquisitionConfig;
use super::correlation::CorrelationEngine;

/// Reduction of one Doppler bin's correlation profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinStatistic {
	pub doppler_hz:f64,
	pub code_phase_samples:usize,
	pub peak_power:f64,
	pub peak_to_second_db:f64,
	pub snr_db:f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
	pub best_bin:usize,
	pub test_statistic_db:f64,
	pub acquired:bool,
}

/// Largest value and its index; the first index wins a tie
pub fn primary_peak(profile:&[f64]) -> Option<(usize, f64)> {
	let mut ans:Option<(usize, f64)> = None;
	for (idx, p) in profile.iter().enumerate() {
		match ans {
			Some((_, best)) if *p <= best => {},
			_ => ans = Some((idx, *p)),
		}
	}
	ans
}

/// Largest positive value strictly below `scale` times the primary peak, taken only from samples
/// more than `guard` samples away from the primary peak's index
pub fn second_largest(profile:&[f64], guard:usize, scale:f64) -> Option<f64> {
	let (peak_idx, peak) = primary_peak(profile)?;
	let cutoff:f64 = scale * peak;

	profile.iter().enumerate()
		.filter(|(idx, _)| (*idx as isize - peak_idx as isize).abs() as usize > guard)
		.map(|(_, p)| *p)
		.filter(|p| *p < cutoff && *p > 0.0)
		.fold(None, |acc:Option<f64>, p| match acc {
			Some(best) if best >= p => Some(best),
			_ => Some(p),
		})
}

fn ratio_db(num:f64, den:f64, what:&'static str) -> Result<f64, AcquisitionError> {
	let ans:f64 = 10.0 * (num / den).log10();
	if den > 0.0 && den.is_finite() && ans.is_finite() { Ok(ans) }
	else { Err(AcquisitionError::NumericDegenerate(what)) }
}

pub fn bin_statistic(profile:&[f64], doppler_hz:f64, guard:usize, scale:f64) -> BinStatistic {
	let (code_phase_samples, peak_power) = primary_peak(profile).unwrap_or((0, 0.0));

	let peak_to_second_db:f64 = second_largest(profile, guard, scale)
		.ok_or(AcquisitionError::NumericDegenerate("no secondary peak outside the guard band"))
		.and_then(|second| ratio_db(peak_power, second, "secondary peak power"))
		.unwrap_or_else(|e| {
			trace!("{:9.2} [Hz]: {}", doppler_hz, e);
			std::f64::NEG_INFINITY
		});

	let mean_power:f64 = profile.iter().sum::<f64>() / (profile.len().max(1) as f64);
	let snr_db:f64 = ratio_db(peak_power, mean_power, "mean correlation power")
		.unwrap_or(std::f64::NEG_INFINITY);

	BinStatistic{ doppler_hz, code_phase_samples, peak_power, peak_to_second_db, snr_db }
}

/// Runs the correlation engine at every bin and reduces each profile over the first `window`
/// samples.  The output is parallel to `bins` no matter what order the bins are evaluated in.
pub fn search(engine:&CorrelationEngine, block:&SampleBlock, bins:&[f64], window:usize, cfg:&AcquisitionConfig) -> Result<Vec<BinStatistic>, AcquisitionError> {
	if bins.is_empty() {
		return Err(AcquisitionError::InvalidArgument("doppler bin sequence is empty".into()));
	}

	bins.par_iter().map(|freq| {
		let profile = engine.power_profile(block, *freq, window)?;
		let stat = bin_statistic(&profile, *freq, cfg.guard_samples, cfg.second_peak_scale);

		// Don't report bins where correlation probably isn't happening
		if stat.peak_to_second_db > cfg.threshold_db {
			debug!("Possible acquisition: {:9.2} [Hz], peak-to-second {:8.4} [dB], code phase {:6} [samples]",
				stat.doppler_hz, stat.peak_to_second_db, stat.code_phase_samples);
		}

		Ok(stat)
	}).collect()
}

/// Picks the bin with the largest statistic, first in bin order on a tie.  The satellite is acquired
/// when that statistic meets or exceeds the threshold.
pub fn decide(stats:&[BinStatistic], threshold_db:f64) -> Result<Decision, AcquisitionError> {
	if stats.is_empty() {
		return Err(AcquisitionError::InvalidArgument("no bins to decide between".into()));
	}

	let mut best_bin:usize = 0;
	for (idx, stat) in stats.iter().enumerate() {
		if stat.peak_to_second_db > stats[best_bin].peak_to_second_db {
			best_bin = idx;
		}
	}

	let test_statistic_db:f64 = stats[best_bin].peak_to_second_db;
	Ok(Decision{ best_bin, test_statistic_db, acquired: test_statistic_db >= threshold_db })
}

#[cfg(test)]
mod tests {
	use super::*;

	fn stat(peak_to_second_db:f64) -> BinStatistic {
		BinStatistic{ doppler_hz: 0.0, code_phase_samples: 0, peak_power: 1.0, peak_to_second_db, snr_db: 0.0 }
	}

	#[test]
	fn guard_band_is_excluded_from_second_peak() {
		let mut profile = vec![0.1; 1000];
		profile[500] = 10.0;
		profile[550] = 10.0;	// equal height, inside the guard band
		profile[560] = 9.0;		// higher than anything outside, also inside the guard band
		profile[800] = 2.0;

		assert_eq!(primary_peak(&profile), Some((500, 10.0)));
		assert_eq!(second_largest(&profile, 100, 0.95), Some(2.0));
	}

	#[test]
	fn guard_distance_is_strict() {
		let mut profile = vec![0.0; 400];
		profile[100] = 10.0;
		profile[200] = 5.0;
		profile[201] = 4.0;
		assert_eq!(second_largest(&profile, 100, 0.95), Some(4.0));
	}

	#[test]
	fn near_identical_values_are_skipped() {
		let mut profile = vec![0.5; 400];
		profile[0] = 10.0;
		profile[300] = 9.6;
		profile[350] = 9.4;
		assert_eq!(second_largest(&profile, 100, 0.95), Some(9.4));
	}

	#[test]
	fn missing_second_peak_is_negative_infinity() {
		let mut profile = vec![0.0; 150];
		profile[75] = 1.0;
		let stat = bin_statistic(&profile, 250.0, 100, 0.95);
		assert_eq!(stat.code_phase_samples, 75);
		assert_eq!(stat.peak_to_second_db, std::f64::NEG_INFINITY);

		let stat = bin_statistic(&vec![0.0; 300], 250.0, 100, 0.95);
		assert_eq!(stat.peak_to_second_db, std::f64::NEG_INFINITY);
		assert_eq!(stat.snr_db, std::f64::NEG_INFINITY);
	}

	#[test]
	fn statistic_is_peak_to_second_in_db() {
		let mut profile = vec![1.0; 1000];
		profile[10] = 100.0;
		profile[600] = 10.0;
		let stat = bin_statistic(&profile, -500.0, 100, 0.95);
		assert_eq!(stat.code_phase_samples, 10);
		assert!((stat.peak_to_second_db - 10.0).abs() < 1e-12);

		let mean:f64 = (998.0 + 100.0 + 10.0) / 1000.0;
		assert!((stat.snr_db - 10.0 * (100.0 / mean).log10()).abs() < 1e-12);
	}

	#[test]
	fn threshold_is_inclusive() {
		let stats = vec![stat(1.0), stat(3.4), stat(2.0)];
		let decision = decide(&stats, 3.4).unwrap();
		assert_eq!(decision.best_bin, 1);
		assert!(decision.acquired);

		let stats = vec![stat(1.0), stat(3.4 - 1e-9)];
		assert!(!decide(&stats, 3.4).unwrap().acquired);
	}

	#[test]
	fn first_bin_wins_a_tie() {
		let stats = vec![stat(std::f64::NEG_INFINITY), stat(5.0), stat(2.0), stat(5.0)];
		assert_eq!(decide(&stats, 3.4).unwrap().best_bin, 1);
	}

	#[test]
	fn all_degenerate_bins_are_not_acquired() {
		let stats = vec![stat(std::f64::NEG_INFINITY); 3];
		let decision = decide(&stats, 3.4).unwrap();
		assert_eq!(decision.best_bin, 0);
		assert!(!decision.acquired);

		assert!(matches!(decide(&[], 3.4), Err(AcquisitionError::InvalidArgument(_))));
	}

}
