
extern crate clap;
extern crate colored;
extern crate env_logger;
extern crate gnss_acquisition;
extern crate serde_json;

use std::fs::File;
use std::io::BufReader;

use clap::{Arg, App};
use colored::*;
use gnss_acquisition::AcquisitionError;
use gnss_acquisition::config::AcquisitionConfig;
use gnss_acquisition::gnss::common::acquisition::{self, AcquisitionResult};
use gnss_acquisition::gnss::gps_l1_ca::signal_modulation::L1CaCodeGenerator;
use gnss_acquisition::io::{self, SampleFormat};
use gnss_acquisition::report;

fn parse_arg<T: std::str::FromStr>(name:&str, val:&str) -> Result<T, AcquisitionError> {
	val.parse().map_err(|_| AcquisitionError::InvalidArgument(format!("unable to parse {:?} for {}", val, name)))
}

fn main() -> Result<(), AcquisitionError> {

	env_logger::init();

	let matches = App::new("GPS L1 CA Acquisition")
		.version("0.1.0")
		.author("John Stanford (johnwstanford@gmail.com)")
		.about("Takes IQ samples centered on 1575.42 MHz and searches one block of them for L1 CA signals")
		.arg(Arg::with_name("filename")
			.short("f").long("filename")
			.help("Input filename")
			.required(true).takes_value(true))
		.arg(Arg::with_name("input_type")
			.short("t").long("type")
			.takes_value(true)
			.possible_value("i8")
			.possible_value("i16")
			.default_value("i16"))
		.arg(Arg::with_name("sample_rate_sps")
			.short("s").long("sample_rate_sps")
			.takes_value(true).required(true))
		.arg(Arg::with_name("skip_bytes")
			.short("k").long("skip_bytes")
			.help("Bytes to skip at the start of the file")
			.takes_value(true).default_value("0"))
		.arg(Arg::with_name("config")
			.short("c").long("config")
			.help("JSON acquisition configuration")
			.takes_value(true))
		.arg(Arg::with_name("prn")
			.short("p").long("prn")
			.help("Comma-separated PRNs to search instead of the configured ones")
			.takes_value(true))
		.get_matches();

	let fname:&str = matches.value_of("filename").unwrap_or_default();
	let format:SampleFormat = matches.value_of("input_type").unwrap_or("i16").parse()?;
	let fs:f64 = parse_arg("sample_rate_sps", matches.value_of("sample_rate_sps").unwrap_or_default())?;
	let skip_bytes:u64 = parse_arg("skip_bytes", matches.value_of("skip_bytes").unwrap_or("0"))?;

	let mut cfg:AcquisitionConfig = match matches.value_of("config") {
		Some(path) => AcquisitionConfig::from_json_file(path)?,
		None => AcquisitionConfig::default(),
	};
	if let Some(prns) = matches.value_of("prn") {
		cfg.satellites = prns.split(',').map(|s| parse_arg("prn", s.trim())).collect::<Result<Vec<usize>, AcquisitionError>>()?;
	}

	eprintln!("Searching {} at {} [samples/sec] for PRNs {:?}", fname.yellow(), fs, &cfg.satellites);

	let block = io::read_sample_block(BufReader::new(File::open(fname)?), format, fs, cfg.block_duration_ms, skip_bytes)?;
	let stats = acquisition::acquire(&block, &L1CaCodeGenerator, &cfg)?;

	eprintln!("{}", report::acquisition_table(&stats));

	// Output data in JSON format
	let results:Vec<AcquisitionResult> = stats.into_iter().map(|sv| sv.into_result()).collect();
	println!("{}", serde_json::to_string_pretty(&results)?);

	Ok(())
}
