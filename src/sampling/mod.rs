use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};
use tracing::trace;

use crate::{entropy::EntropySource, SamplingError};

/// Shapes the raw draws of an injected [`EntropySource`] into unbiased
/// bounded distributions: `[0, n)` integers, arbitrary ranges, byte
/// strings, sequence choice and shuffling.
///
/// Every operation is a pure function of its arguments and the bits the
/// source hands out; the sampler itself keeps no state.
#[derive(Debug)]
pub struct Sampler<S: EntropySource> {
    source: S,
}

impl<S: EntropySource> Sampler<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Recover the underlying entropy source
    pub fn into_source(self) -> S {
        self.source
    }

    /// Return a 32 bit random integer
    pub fn rand32(&mut self) -> Result<u32, SamplingError> {
        self.source.try_next_u32()
    }

    /// Return a 64 bit random integer
    pub fn rand64(&mut self) -> Result<u64, SamplingError> {
        self.source.try_next_u64()
    }

    /// Generate an unbiased integer in `[0, n)` by rejection sampling.
    ///
    /// The draw width is the bit length of `n` itself, not of `n - 1`,
    /// so the covering domain `[0, 2^k)` is at most twice as wide as `n`
    /// and each draw is accepted with probability above one half. Only
    /// out-of-range draws are retried; a failing source propagates
    /// immediately.
    pub fn randbelow(&mut self, n: &BigUint) -> Result<BigUint, SamplingError> {
        if n.is_zero() {
            return Err(SamplingError::InvalidArgument(
                "randbelow() requires a strictly positive bound".to_string(),
            ));
        }
        let k = n.bits();
        let mut r = self.source.random_bits(k)?;
        while &r >= n {
            r = self.source.random_bits(k)?;
        }
        Ok(r)
    }

    /// Choose a random item from `range(start, stop, step)`.
    ///
    /// With `stop` absent the call reads as `randrange(0, start)`. The
    /// step count is the ceiling of `(stop - start) / step`, computed
    /// with floored division so descending ranges come out right:
    /// `randrange(10, 0, -1)` covers the ten values `10, 9, ..., 1`.
    pub fn randrange(
        &mut self,
        start: &BigInt,
        stop: Option<&BigInt>,
        step: &BigInt,
    ) -> Result<BigInt, SamplingError> {
        let stop = match stop {
            Some(stop) => stop,
            None => {
                return match start.to_biguint() {
                    Some(n) if !n.is_zero() => Ok(self.randbelow(&n)?.into()),
                    _ => Err(SamplingError::EmptyRange),
                };
            }
        };

        let width = stop - start;

        if step.is_one() {
            return match width.to_biguint() {
                Some(w) if !w.is_zero() => Ok(start + BigInt::from(self.randbelow(&w)?)),
                _ => Err(SamplingError::EmptyRange),
            };
        }

        let count = match step.sign() {
            Sign::Plus => (&width + step - BigInt::one()).div_floor(step),
            Sign::Minus => (&width + step + BigInt::one()).div_floor(step),
            Sign::NoSign => return Err(SamplingError::ZeroStep),
        };

        match count.to_biguint() {
            Some(n) if !n.is_zero() => {
                trace!("randrange: start={start}, step={step}, count={n}");
                Ok(start + step * BigInt::from(self.randbelow(&n)?))
            }
            _ => Err(SamplingError::EmptyRange),
        }
    }

    /// Generate a random number in the inclusive range `[a, b]`
    pub fn randint(&mut self, a: &BigInt, b: &BigInt) -> Result<BigInt, SamplingError> {
        let stop = b + BigInt::one();
        self.randrange(a, Some(&stop), &BigInt::one())
    }

    /// Generate exactly `n` random bytes, most significant byte first.
    ///
    /// The drawn `8 n`-bit integer is re-framed to a fixed width: a draw
    /// whose natural big-endian encoding is shorter than `n` bytes is
    /// padded with leading zeroes rather than shortened.
    pub fn randbytes(&mut self, n: usize) -> Result<Vec<u8>, SamplingError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let r = self.source.random_bits(8 * n as u64)?;
        let bytes = r.to_bytes_be();
        let mut out = vec![0_u8; n];
        out[n - bytes.len()..].copy_from_slice(&bytes);
        Ok(out)
    }

    /// Choose a random element from a non-empty slice
    pub fn choice<'a, T>(&mut self, seq: &'a [T]) -> Result<&'a T, SamplingError> {
        if seq.is_empty() {
            return Err(SamplingError::EmptyCollection);
        }
        let i = self.index_below(seq.len())?;
        Ok(&seq[i])
    }

    /// Shuffle `seq` in place with a Fisher-Yates walk from the back.
    ///
    /// Each position `i` is swapped with an unbiased index in `[0, i]`,
    /// which makes all permutations equally likely. If the entropy
    /// source fails mid-loop the slice is left partially permuted: the
    /// swaps already applied stand, and the slice still holds the same
    /// elements.
    pub fn shuffle<T>(&mut self, seq: &mut [T]) -> Result<(), SamplingError> {
        for i in (1..seq.len()).rev() {
            let j = self.index_below(i + 1)?;
            seq.swap(i, j);
        }
        Ok(())
    }

    /// Draw `count` pairwise-distinct integers uniformly from `[0, below]`,
    /// rejecting values already picked.
    pub fn sample_distinct(
        &mut self,
        count: usize,
        below: u64,
    ) -> Result<Vec<u64>, SamplingError> {
        if count as u64 > below {
            return Err(SamplingError::InvalidArgument(
                "sample_distinct() needs more candidate values than picks".to_string(),
            ));
        }
        let bound = BigUint::from(below) + BigUint::one();
        let mut picked: Vec<u64> = Vec::with_capacity(count);
        while picked.len() < count {
            let v = self.randbelow(&bound)?;
            let v = v.to_u64().ok_or_else(|| {
                SamplingError::InvalidArgument("drawn value does not fit in u64".to_string())
            })?;
            if !picked.contains(&v) {
                picked.push(v);
            }
        }
        Ok(picked)
    }

    /// Return a random float on `[0, 1]` built from a single 32 bit draw
    pub fn random_f32(&mut self) -> Result<f32, SamplingError> {
        Ok((f64::from(self.rand32()?) * (1.0 / 4_294_967_295.0)) as f32)
    }

    /// Return a random float on `[0, 1)` with 53 bit resolution
    pub fn random_f64(&mut self) -> Result<f64, SamplingError> {
        let a = f64::from(self.rand32()? >> 5);
        let b = f64::from(self.rand32()? >> 6);
        Ok((a * 67_108_864.0 + b) * (1.0 / 9_007_199_254_740_992.0))
    }

    fn index_below(&mut self, n: usize) -> Result<usize, SamplingError> {
        self.randbelow(&BigUint::from(n))?.to_usize().ok_or_else(|| {
            SamplingError::InvalidArgument("drawn index does not fit in usize".to_string())
        })
    }
}
