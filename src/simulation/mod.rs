mod noise;
mod signal;
mod source;

pub use noise::{add_white_noise, corrupt_burst, signal_power};
pub use signal::{InterferogramConfig, ReferenceFamily, add_burst, generate_interferogram};
pub use source::SyntheticRecordSource;
