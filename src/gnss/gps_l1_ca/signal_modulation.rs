
use crate::AcquisitionError;
use crate::gnss::common::acquisition::{CodeGenerator, SpreadingCode};

use super::{CHIP_RATE_CPS, CODE_LENGTH, CODE_PERIOD_SEC};

// G2 output delay in chips for PRN 1 through 32, given in IS-GPS-200, Table 3-Ia
const G2_DELAY:[usize; 32] = [
	  5,   6,   7,   8,  17,  18, 139, 140, 141, 251, 252, 254, 255, 256, 257, 258,
	469, 470, 471, 472, 473, 474, 509, 512, 513, 514, 515, 516, 859, 860, 861, 862,
];

pub struct ShiftRegister {
	pub state: [bool; 10],
	taps: &'static [usize],
}

impl ShiftRegister {

	pub fn g1() -> Self { Self { state: [true; 10], taps: &[2, 9] } }
	pub fn g2() -> Self { Self { state: [true; 10], taps: &[1, 2, 5, 7, 8, 9] } }

	pub fn shift(&mut self) -> bool {
		let current_output:bool = self.state[9];
		let feedback:bool = self.taps.iter().fold(false, |acc, t| acc ^ self.state[*t]);

		for idx in (1..10).rev() {
			self.state[idx] = self.state[idx-1];
		}
		self.state[0] = feedback;

		current_output
	}

}

pub fn prn_bits(prn:usize) -> Result<[bool; CODE_LENGTH], AcquisitionError> {
	if prn < 1 || prn > G2_DELAY.len() {
		return Err(AcquisitionError::InvalidArgument(format!("no L1 CA code for PRN {}", prn)));
	}

	let mut g1 = ShiftRegister::g1();
	let mut g2 = ShiftRegister::g2();
	let mut g1_out = [false; CODE_LENGTH];
	let mut g2_out = [false; CODE_LENGTH];
	for idx in 0..CODE_LENGTH {
		g1_out[idx] = g1.shift();
		g2_out[idx] = g2.shift();
	}

	let delay = G2_DELAY[prn-1];
	let mut ans = [false; CODE_LENGTH];
	for idx in 0..CODE_LENGTH {
		ans[idx] = g1_out[idx] ^ g2_out[(idx + CODE_LENGTH - delay) % CODE_LENGTH];
	}
	Ok(ans)
}

/// Chips mapped to +1 for a logical zero and -1 for a logical one
pub fn prn_int(prn:usize) -> Result<Vec<i8>, AcquisitionError> {
	Ok(prn_bits(prn)?.iter().map(|b| if *b { -1 } else { 1 }).collect())
}

pub fn prn_int_sampled(prn:usize, fs:f64) -> Result<Vec<i8>, AcquisitionError> {
	if !(fs.is_finite() && fs > 0.0) {
		return Err(AcquisitionError::InvalidArgument(format!("sample rate must be positive, got {}", fs)));
	}

	let samples_per_code:usize = (fs * CODE_PERIOD_SEC).round() as usize;
	let code = prn_int(prn)?;

	// Sample i is taken at i/fs, so the first sample lands on chip zero
	Ok((0..samples_per_code).map(|i| {
		let code_value_idx:usize = (((i as f64) * CHIP_RATE_CPS) / fs) as usize;
		code[code_value_idx.min(CODE_LENGTH-1)]
	}).collect())
}

/// Produces one period of the GPS L1 C/A code at the receiver's sample rate
#[derive(Debug, Clone, Copy, Default)]
pub struct L1CaCodeGenerator;

impl CodeGenerator for L1CaCodeGenerator {

	fn spreading_code(&self, prn:usize, fs:f64) -> Result<SpreadingCode, AcquisitionError> {
		let samples:Vec<f64> = prn_int_sampled(prn, fs)?.into_iter().map(|c| c as f64).collect();
		SpreadingCode::new(prn, samples, CHIP_RATE_CPS, CODE_LENGTH)
	}

}
