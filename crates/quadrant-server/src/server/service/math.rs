//! Arithmetic behind the calculator service, free of any transport concern.

use crate::server::streaming::producer::{Produced, Producer};
use quadrant_core::{Error, Result};

/// `x + y` in two's-complement `i32` arithmetic.
pub const fn sum(x: i32, y: i32) -> i32 {
    x.wrapping_add(y)
}

pub fn square_root(number: i32) -> Result<f64> {
    if number < 0 {
        return Err(Error::invalid_argument(format!(
            "Received a negative number: {number}"
        )));
    }
    Ok(f64::from(number).sqrt())
}

/// Candidate divisors tried per [`Producer::step`] before yielding.
const DIVISORS_PER_STEP: u32 = 4096;

/// Prime factorization by trial division, one factor at a time.
///
/// Factors come out in non-decreasing order. Once `k * k` exceeds the
/// remaining quotient, the quotient is prime and is emitted last, so the
/// search never runs past `sqrt(n)`.
#[derive(Debug, Clone)]
pub struct PrimeFactors {
    remaining: i64,
    divisor: i64,
}

impl PrimeFactors {
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `n < 1`.
    pub fn new(n: i64) -> Result<Self> {
        if n < 1 {
            return Err(Error::invalid_argument(format!(
                "Number must be at least 1, got {n}"
            )));
        }
        Ok(Self {
            remaining: n,
            divisor: 2,
        })
    }
}

impl Producer for PrimeFactors {
    type Item = i64;

    fn step(&mut self) -> Produced<i64> {
        if self.remaining == 1 {
            return Produced::Done;
        }

        for _ in 0..DIVISORS_PER_STEP {
            let k = self.divisor;
            // k * k > remaining, without overflowing near i64::MAX
            if k > self.remaining / k {
                let last = self.remaining;
                self.remaining = 1;
                return Produced::Ready(last);
            }
            if self.remaining % k == 0 {
                self.remaining /= k;
                return Produced::Ready(k);
            }
            self.divisor += if k == 2 { 1 } else { 2 };
        }

        Produced::Pending
    }
}

impl Iterator for PrimeFactors {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        loop {
            match self.step() {
                Produced::Ready(factor) => return Some(factor),
                Produced::Pending => {}
                Produced::Done => return None,
            }
        }
    }
}

/// Running sum and count of an `Average` call.
///
/// The sum is kept in `i128`: no count a `u64` can hold makes it overflow.
#[derive(Debug, Default)]
pub struct Average {
    sum: i128,
    count: u64,
}

impl Average {
    pub fn push(&mut self, x: i32) {
        self.sum += i128::from(x);
        self.count += 1;
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if no value was pushed.
    #[allow(clippy::cast_precision_loss)]
    pub fn finish(self) -> Result<f64> {
        if self.count == 0 {
            return Err(Error::invalid_argument("no items received"));
        }
        Ok(self.sum as f64 / self.count as f64)
    }
}

/// Largest value seen so far in a `RunningMax` call.
#[derive(Debug, Default)]
pub struct RunningMax {
    max: Option<i32>,
}

impl RunningMax {
    /// Records `x` and returns it if it is a new maximum.
    pub fn observe(&mut self, x: i32) -> Option<i32> {
        match self.max {
            Some(max) if x <= max => None,
            _ => {
                self.max = Some(x);
                Some(x)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadrant_core::ErrorKind;

    fn factors(n: i64) -> Vec<i64> {
        PrimeFactors::new(n).unwrap().collect()
    }

    fn is_prime(p: i64) -> bool {
        p >= 2 && (2..).take_while(|k| k * k <= p).all(|k| p % k != 0)
    }

    #[test]
    fn sum_wraps_on_overflow() {
        assert_eq!(sum(3, 10), 13);
        assert_eq!(sum(-7, 7), 0);
        assert_eq!(sum(i32::MAX, 1), i32::MIN);
        assert_eq!(sum(i32::MIN, -1), i32::MAX);
    }

    #[test]
    fn square_root_of_non_negative_numbers() {
        assert_eq!(square_root(0), Ok(0.0));
        assert_eq!(square_root(16), Ok(4.0));
        for k in [2, 10, 12_345, i32::MAX] {
            let v = square_root(k).unwrap();
            assert!((v * v - f64::from(k)).abs() < 1e-6 * f64::from(k), "{k}");
        }
    }

    #[test]
    fn square_root_rejects_negative_numbers() {
        let err = square_root(-2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            err,
            Error::invalid_argument("Received a negative number: -2")
        );
    }

    #[test]
    fn known_factorizations() {
        assert_eq!(factors(120), vec![2, 2, 2, 3, 5]);
        assert_eq!(factors(210), vec![2, 3, 5, 7]);
        assert_eq!(factors(17), vec![17]);
        assert_eq!(factors(1), Vec::<i64>::new());
        assert_eq!(factors(1024), vec![2; 10]);
    }

    #[test]
    fn factors_multiply_back_and_are_prime() {
        for n in 2..=5_000 {
            let fs = factors(n);
            assert_eq!(fs.iter().product::<i64>(), n, "{n}");
            assert!(fs.iter().all(|&p| is_prime(p)), "{n}: {fs:?}");
            assert!(fs.windows(2).all(|w| w[0] <= w[1]), "{n}: {fs:?}");
        }
    }

    #[test]
    fn large_prime_is_found_in_bounded_steps() {
        // 2^31 - 1
        let mut producer = PrimeFactors::new(2_147_483_647).unwrap();
        let mut steps = 0;
        let out = loop {
            steps += 1;
            match producer.step() {
                Produced::Ready(p) => break p,
                Produced::Pending => {}
                Produced::Done => panic!("no factor"),
            }
        };
        assert_eq!(out, 2_147_483_647);
        assert!(steps > 1, "search should yield at least once");
        assert_eq!(producer.step(), Produced::Done);
    }

    #[test]
    fn largest_i64_factorizes() {
        assert_eq!(factors(i64::MAX), vec![7, 7, 73, 127, 337, 92_737, 649_657]);
    }

    #[test]
    fn non_positive_n_is_rejected() {
        for n in [0, -1, i64::MIN] {
            let err = PrimeFactors::new(n).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{n}");
        }
    }

    #[test]
    fn average_of_values() {
        let mut avg = Average::default();
        for x in [1, 2, 3, 4] {
            avg.push(x);
        }
        assert_eq!(avg.finish(), Ok(2.5));

        let mut avg = Average::default();
        avg.push(i32::MAX);
        avg.push(i32::MAX);
        assert_eq!(avg.finish(), Ok(f64::from(i32::MAX)));
    }

    #[test]
    fn average_sum_grows_past_i64() {
        // About where 2^32 items of i32::MAX fill an i64 sum.
        let mut avg = Average {
            sum: i128::from(i64::MAX),
            count: 1 << 32,
        };
        avg.push(i32::MAX);
        avg.push(i32::MAX);

        let expected =
            (i64::MAX as f64 + 2.0 * f64::from(i32::MAX)) / ((1_u64 << 32) + 2) as f64;
        let average = avg.finish().unwrap();
        assert!((average - expected).abs() < 1e-6, "{average} != {expected}");
        assert!(average > f64::from(i32::MAX));
    }

    #[test]
    fn average_of_nothing_is_invalid() {
        let err = Average::default().finish().unwrap_err();
        assert_eq!(err, Error::invalid_argument("no items received"));
    }

    #[test]
    fn running_max_emits_new_maxima_only() {
        let mut max = RunningMax::default();
        let out: Vec<i32> = [1, 5, 3, 6, 2, 20]
            .into_iter()
            .filter_map(|x| max.observe(x))
            .collect();
        assert_eq!(out, vec![1, 5, 6, 20]);
    }

    #[test]
    fn running_max_handles_negative_inputs_and_repeats() {
        let mut max = RunningMax::default();
        let out: Vec<i32> = [-9, -9, -12, -3, -3, -4]
            .into_iter()
            .filter_map(|x| max.observe(x))
            .collect();
        assert_eq!(out, vec![-9, -3]);
    }
}
