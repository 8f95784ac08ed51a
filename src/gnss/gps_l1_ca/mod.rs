
pub const CHIP_RATE_CPS:f64 = 1.023e6;
pub const CODE_LENGTH:usize = 1023;
pub const CODE_PERIOD_SEC:f64 = (CODE_LENGTH as f64) / CHIP_RATE_CPS;

pub mod signal_modulation;
