use num_bigint::BigUint;
use num_traits::Zero;
use rand_core::RngCore;
#[cfg(target_arch = "x86_64")]
use tracing::trace;

use crate::SamplingError;

/// Retry budget for a single RDRAND/RDSEED draw, per Intel's DRNG
/// software implementation guide.
const HW_RETRIES: usize = 10;

/// Capability contract of the raw entropy source: fixed-width draws that
/// are uniformly distributed over their full width, each either
/// succeeding or reporting that the hardware cannot produce bits.
pub trait EntropySource {
    fn try_next_u32(&mut self) -> Result<u32, SamplingError>;

    fn try_next_u64(&mut self) -> Result<u64, SamplingError>;

    /// Generate an unsigned integer with exactly the low `k` bits
    /// meaningful, uniformly distributed over `[0, 2^k)`.
    ///
    /// `k == 0` yields `0` without consuming any entropy.
    fn random_bits(&mut self, k: u64) -> Result<BigUint, SamplingError> {
        if k == 0 {
            return Ok(BigUint::zero());
        }
        let words = ((k - 1) / 32 + 1) as usize;
        let mut digits = Vec::with_capacity(words);
        for _ in 0..words {
            digits.push(self.try_next_u32()?);
        }
        let rem = (k % 32) as u32;
        if rem != 0 {
            // mask the most significant digit down to k bits total
            digits[words - 1] &= u32::MAX >> (32 - rem);
        }
        Ok(BigUint::new(digits))
    }
}

/// Entropy source backed by the x86_64 RDRAND instruction.
///
/// Construction probes the CPU for RDRAND support and fails with
/// [`SamplingError::HardwareUnavailable`] when the instruction is
/// missing, so a live `HardwareRng` can always attempt a draw.
#[derive(Debug)]
pub struct HardwareRng(());

impl HardwareRng {
    pub fn new() -> Result<Self, SamplingError> {
        if Self::is_supported() {
            Ok(Self(()))
        } else {
            Err(SamplingError::HardwareUnavailable(
                "this CPU does not expose the RDRAND instruction".to_string(),
            ))
        }
    }

    /// Check if the RDRAND instruction is supported by the current CPU
    #[must_use]
    pub fn is_supported() -> bool {
        #[cfg(target_arch = "x86_64")]
        {
            if let Some(information) = cupid::master() {
                return information.rdrand();
            }
        }
        false
    }

    /// Check if the RDSEED instruction is supported by the current CPU
    #[must_use]
    pub fn is_rdseed_supported() -> bool {
        #[cfg(target_arch = "x86_64")]
        {
            if let Some(information) = cupid::master() {
                return information.rdseed();
            }
        }
        false
    }

    /// Draw 64 bits straight from the RDSEED conditioner, bypassing the
    /// DRBG that feeds RDRAND.
    pub fn rdseed64(&mut self) -> Result<u64, SamplingError> {
        #[cfg(target_arch = "x86_64")]
        {
            if Self::is_rdseed_supported() {
                // SAFETY: RDSEED support checked just above
                if let Some(value) = unsafe { Self::rdseed64_step() } {
                    return Ok(value);
                }
                return Err(SamplingError::HardwareUnavailable(format!(
                    "RDSEED failed to return a value within {HW_RETRIES} retries"
                )));
            }
        }
        Err(SamplingError::HardwareUnavailable(
            "this CPU does not expose the RDSEED instruction".to_string(),
        ))
    }

    #[cfg(target_arch = "x86_64")]
    #[target_feature(enable = "rdrand")]
    unsafe fn rdrand32_step() -> Option<u32> {
        let mut value = 0_u32;
        for _ in 0..HW_RETRIES {
            if core::arch::x86_64::_rdrand32_step(&mut value) == 1 {
                return Some(value);
            }
            core::hint::spin_loop();
        }
        None
    }

    #[cfg(target_arch = "x86_64")]
    #[target_feature(enable = "rdrand")]
    unsafe fn rdrand64_step() -> Option<u64> {
        let mut value = 0_u64;
        for _ in 0..HW_RETRIES {
            if core::arch::x86_64::_rdrand64_step(&mut value) == 1 {
                return Some(value);
            }
            core::hint::spin_loop();
        }
        None
    }

    #[cfg(target_arch = "x86_64")]
    #[target_feature(enable = "rdseed")]
    unsafe fn rdseed64_step() -> Option<u64> {
        let mut value = 0_u64;
        for _ in 0..HW_RETRIES {
            if core::arch::x86_64::_rdseed64_step(&mut value) == 1 {
                return Some(value);
            }
            core::hint::spin_loop();
        }
        None
    }
}

impl EntropySource for HardwareRng {
    fn try_next_u32(&mut self) -> Result<u32, SamplingError> {
        #[cfg(target_arch = "x86_64")]
        {
            // SAFETY: RDRAND support was verified in `new`
            if let Some(value) = unsafe { Self::rdrand32_step() } {
                return Ok(value);
            }
            trace!("rdrand32 retry budget exhausted");
        }
        Err(SamplingError::HardwareUnavailable(format!(
            "RDRAND failed to return a value within {HW_RETRIES} retries"
        )))
    }

    fn try_next_u64(&mut self) -> Result<u64, SamplingError> {
        #[cfg(target_arch = "x86_64")]
        {
            // SAFETY: RDRAND support was verified in `new`
            if let Some(value) = unsafe { Self::rdrand64_step() } {
                return Ok(value);
            }
            trace!("rdrand64 retry budget exhausted");
        }
        Err(SamplingError::HardwareUnavailable(format!(
            "RDRAND failed to return a value within {HW_RETRIES} retries"
        )))
    }
}

/// Deterministic stand-in for [`HardwareRng`] over any `rand_core`
/// generator, so tests can replay a seeded draw sequence.
#[derive(Debug)]
pub struct SoftwareSource<R: RngCore>(pub R);

impl<R: RngCore> EntropySource for SoftwareSource<R> {
    fn try_next_u32(&mut self) -> Result<u32, SamplingError> {
        Ok(self.0.next_u32())
    }

    fn try_next_u64(&mut self) -> Result<u64, SamplingError> {
        Ok(self.0.next_u64())
    }
}
