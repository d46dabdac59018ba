pub mod entropy;
pub mod error;
pub mod sampling;

pub use entropy::{EntropySource, HardwareRng, SoftwareSource};
pub use error::SamplingError;
pub use sampling::Sampler;
