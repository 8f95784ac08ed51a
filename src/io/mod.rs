
use std::io::{self, Read};
use std::str::FromStr;

use byteorder::{LittleEndian, ReadBytesExt};
use num_complex::Complex;

use crate::{AcquisitionError, Sample, SampleBlock};

/// Encoding of one interleaved I/Q pair on disk
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleFormat {
	I8,
	I16,
}

impl SampleFormat {
	pub fn bytes_per_sample(&self) -> usize {
		match self {
			SampleFormat::I8  => 2,
			SampleFormat::I16 => 4,
		}
	}
}

impl FromStr for SampleFormat {
	type Err = AcquisitionError;

	fn from_str(s:&str) -> Result<Self, Self::Err> {
		match s {
			"i8"  => Ok(SampleFormat::I8),
			"i16" => Ok(SampleFormat::I16),
			x => Err(AcquisitionError::InvalidArgument(format!("{} isn't a valid sample type", x))),
		}
	}
}

/// Complex samples decoded from interleaved I/Q.  Each sample's index counts from `first_idx`.
/// The stream ends cleanly at end of input, including when the input stops partway through a pair.
pub struct IqSource<R: Read> {
	src:R,
	format:SampleFormat,
	idx:usize,
}

impl<R: Read> IqSource<R> {

	pub fn new(src:R, format:SampleFormat, first_idx:usize) -> Self {
		Self { src, format, idx: first_idx }
	}

	fn read_pair(&mut self) -> io::Result<Complex<f64>> {
		match self.format {
			SampleFormat::I8 => {
				let re = self.src.read_i8()?;
				let im = self.src.read_i8()?;
				Ok(Complex{ re: re as f64, im: im as f64 })
			},
			SampleFormat::I16 => {
				let re = self.src.read_i16::<LittleEndian>()?;
				let im = self.src.read_i16::<LittleEndian>()?;
				Ok(Complex{ re: re as f64, im: im as f64 })
			},
		}
	}

}

impl<R: Read> Iterator for IqSource<R> {
	type Item = io::Result<Sample>;

	fn next(&mut self) -> Option<io::Result<Sample>> {
		match self.read_pair() {
			Ok(val) => {
				let ans = Sample{ val, idx: self.idx };
				self.idx += 1;
				Some(Ok(ans))
			},
			Err(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => None,
			Err(e) => Some(Err(e)),
		}
	}
}

/// Skips `skip_bytes`, then reads `duration_ms` worth of samples into a block.  Timestamps count
/// from the start of the input, skipped bytes included.  Running out of input early is an error.
pub fn read_sample_block<R: Read>(mut src:R, format:SampleFormat, fs:f64, duration_ms:usize, skip_bytes:u64) -> Result<SampleBlock, AcquisitionError> {
	if !(fs.is_finite() && fs > 0.0) {
		return Err(AcquisitionError::InvalidArgument(format!("sample rate must be positive, got {}", fs)));
	}

	let skipped:u64 = io::copy(&mut (&mut src).take(skip_bytes), &mut io::sink())?;
	if skipped < skip_bytes {
		return Err(AcquisitionError::InvalidArgument(format!("input ended after {} of {} bytes to skip", skipped, skip_bytes)));
	}

	let first_idx:usize = (skip_bytes as usize) / format.bytes_per_sample();
	let n_samples:usize = ((fs * (duration_ms as f64)) / 1000.0).round() as usize;

	let samples:Vec<Sample> = IqSource::new(src, format, first_idx)
		.take(n_samples)
		.collect::<io::Result<Vec<Sample>>>()?;

	if samples.len() < n_samples {
		return Err(AcquisitionError::InvalidArgument(format!("{} ms at {} [samples/sec] needs {} samples, input has {}",
			duration_ms, fs, n_samples, samples.len())));
	}

	let t0:f64 = (first_idx as f64) / fs;
	SampleBlock::starting_at(samples.into_iter().map(|s| s.val).collect(), fs, t0)
}
