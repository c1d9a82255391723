pub mod apodizer;
pub mod fourier;
pub mod interpolate;
pub mod math;
pub mod preprocess;
pub mod rotator;

pub use apodizer::Apodizer;
pub use fourier::FourierTransform;
pub use interpolate::LinearInterpolator;
pub use math::{LEAP_THRESHOLD, LineFit, linear_fit, std_dev, unwrap_phase_in_place};
pub use preprocess::{PulsePreprocessor, zero_filled_length};
pub use rotator::{rotate, symmetrize};
