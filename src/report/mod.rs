
use colored::*;

use crate::gnss::common::acquisition::SatelliteAcquisitionStats;

pub const TABLE_HEADER:&str = "PRN   Max SNR [dB]   P2S [dB]   P2S/mean [dB]   Doppler [Hz]   Fine Doppler [Hz]   Code phase [chips]   Code phase [samples]";

fn fine_doppler_column(fine:Option<f64>) -> String {
	match fine {
		Some(f) => format!("{:17.2}", f),
		None    => format!("{:>17}", "-"),
	}
}

/// One row per acquired satellite, in the order given.  Satellites that weren't acquired are left out.
pub fn acquisition_table(stats:&[SatelliteAcquisitionStats]) -> String {
	let mut lines:Vec<String> = vec![TABLE_HEADER.to_string()];

	for sv in stats.iter().filter(|sv| sv.acquired) {
		let row = format!("{:02}    {:12.2}   {:8.2}   {:13.2}   {:12.2}   {}   {:18.3}   {:20}",
			sv.prn, sv.max_snr_db, sv.test_statistic_db, sv.p2s_to_mean_db(), sv.doppler_hz,
			fine_doppler_column(sv.fine_doppler_hz), sv.code_phase_chips, sv.code_phase_samples);
		lines.push(format!("{}", row.green()));
	}

	lines.join("\n")
}
