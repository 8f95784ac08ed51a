
use colored::*;
use log::info;
use rayon::prelude::*;

use crate::{AcquisitionError, SampleBlock};
use crate::config::AcquisitionConfig;
use super::{CodeGenerator, SatelliteAcquisitionStats, SpreadingCode};
use super::correlation::CorrelationEngine;
use super::doppler_search;
use super::fine_frequency::FineFrequencyEstimator;

/// Searches `block` for every satellite in the configuration.  The results are in the same order
/// as `cfg.satellites`.  Bad configuration or a block that can't support the search is reported
/// before any correlation work starts; a satellite that simply isn't there comes back with
/// `acquired == false`.
pub fn acquire<G: CodeGenerator>(block:&SampleBlock, codes:&G, cfg:&AcquisitionConfig) -> Result<Vec<SatelliteAcquisitionStats>, AcquisitionError> {
	cfg.validate()?;

	let len_search:usize = block.samples_per_ms(cfg.block_duration_ms);
	if len_search > block.len() {
		return Err(AcquisitionError::InvalidArgument(format!("{} ms search needs {} samples, block has {}",
			cfg.block_duration_ms, len_search, block.len())));
	}
	let search_block:SampleBlock = block.head(len_search)?;

	let local_codes:Vec<SpreadingCode> = cfg.satellites.iter().map(|prn| {
		let code = codes.spreading_code(*prn, block.fs())?;
		code.check_sample_rate(block.fs())?;
		if code.len() > len_search {
			return Err(AcquisitionError::InvalidArgument(format!("search block of {} samples is shorter than the {}-sample code period of PRN {}",
				len_search, code.len(), prn)));
		}
		Ok(code)
	}).collect::<Result<Vec<SpreadingCode>, AcquisitionError>>()?;

	// Zero lets rayon pick the pool size
	let pool = rayon::ThreadPoolBuilder::new()
		.num_threads(cfg.workers.unwrap_or(0))
		.build()
		.map_err(|e| AcquisitionError::InvalidArgument(format!("unable to build worker pool: {}", e)))?;

	pool.install(|| {
		local_codes.par_iter()
			.map(|code| acquire_satellite(block, &search_block, code, cfg))
			.collect()
	})
}

/// Doppler search, detection decision, and fine frequency estimate for a single satellite.  The
/// search runs over `search_block`; the fine estimate may use the rest of `block`.
pub fn acquire_satellite(block:&SampleBlock, search_block:&SampleBlock, code:&SpreadingCode, cfg:&AcquisitionConfig) -> Result<SatelliteAcquisitionStats, AcquisitionError> {
	info!("Searching for PRN {}...", format!("{:02}", code.prn).yellow());

	let engine = CorrelationEngine::new(code, search_block.len())?;
	let bins = doppler_search::search(&engine, search_block, &cfg.doppler_bins_hz, code.len(), cfg)?;
	let decision = doppler_search::decide(&bins, cfg.threshold_db)?;
	let best = bins[decision.best_bin];

	let mut stats = SatelliteAcquisitionStats {
		prn:                code.prn,
		acquired:           decision.acquired,
		peak_to_second:     bins.iter().map(|b| b.peak_to_second_db).collect(),
		best_bin:           decision.best_bin,
		doppler_hz:         best.doppler_hz,
		code_phase_samples: best.code_phase_samples,
		code_phase_chips:   code.samples_to_chips(best.code_phase_samples as f64, block.fs()),
		max_snr_db:         best.snr_db,
		test_statistic_db:  decision.test_statistic_db,
		fine_doppler_hz:    None,
	};

	if stats.acquired {
		stats.fine_doppler_hz = FineFrequencyEstimator::new(cfg).estimate(block, code, stats.code_phase_samples, stats.doppler_hz)?;
		info!("PRN {} acquired: {:9.2} [Hz], {:6} [samples], {:8.3} [chips], {} [dB]",
			format!("{:02}", stats.prn).yellow(), stats.doppler_hz, stats.code_phase_samples, stats.code_phase_chips,
			format!("{:.2}", stats.test_statistic_db).green());
	}

	Ok(stats)
}
