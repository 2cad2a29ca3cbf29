//! Number theory helpers shared by the numerology tables and the numeric query engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric classification predicates usable wherever a number is filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumberKind {
    Odd,
    Even,
    Prime,
    /// Prime whose digit sum is also prime
    AdditivePrime,
    /// Prime whose digit sum is not prime
    NonAdditivePrime,
    Composite,
    /// Composite whose digit sum is also composite
    AdditiveComposite,
    /// Composite whose digit sum is not composite
    NonAdditiveComposite,
}

impl NumberKind {
    pub const ALL: [NumberKind; 8] = [
        NumberKind::Odd,
        NumberKind::Even,
        NumberKind::Prime,
        NumberKind::AdditivePrime,
        NumberKind::NonAdditivePrime,
        NumberKind::Composite,
        NumberKind::AdditiveComposite,
        NumberKind::NonAdditiveComposite,
    ];

    /// Check whether `n` belongs to this class.
    pub fn matches(self, n: i64) -> bool {
        match self {
            NumberKind::Odd => n % 2 != 0,
            NumberKind::Even => n % 2 == 0,
            NumberKind::Prime => is_prime(n),
            NumberKind::AdditivePrime => is_additive_prime(n),
            NumberKind::NonAdditivePrime => is_prime(n) && !is_prime(digit_sum(n)),
            NumberKind::Composite => is_composite(n),
            NumberKind::AdditiveComposite => is_additive_composite(n),
            NumberKind::NonAdditiveComposite => is_composite(n) && !is_composite(digit_sum(n)),
        }
    }

    fn name(self) -> &'static str {
        match self {
            NumberKind::Odd => "odd",
            NumberKind::Even => "even",
            NumberKind::Prime => "prime",
            NumberKind::AdditivePrime => "additive-prime",
            NumberKind::NonAdditivePrime => "non-additive-prime",
            NumberKind::Composite => "composite",
            NumberKind::AdditiveComposite => "additive-composite",
            NumberKind::NonAdditiveComposite => "non-additive-composite",
        }
    }
}

impl fmt::Display for NumberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NumberKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        NumberKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| format!("unknown number kind: {}", s))
    }
}

/// Trial-division primality test. Numbers below 2 are not prime.
pub fn is_prime(n: i64) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }
    let mut i = 5i64;
    while i * i <= n {
        if n % i == 0 || n % (i + 2) == 0 {
            return false;
        }
        i += 6;
    }
    true
}

/// Composite numbers are integers above 1 that are not prime.
pub fn is_composite(n: i64) -> bool {
    n > 3 && !is_prime(n)
}

pub fn is_additive_prime(n: i64) -> bool {
    is_prime(n) && is_prime(digit_sum(n))
}

pub fn is_additive_composite(n: i64) -> bool {
    is_composite(n) && is_composite(digit_sum(n))
}

/// Sum of the decimal digits of `n` (sign ignored).
pub fn digit_sum(n: i64) -> i64 {
    let mut n = n.unsigned_abs();
    let mut sum = 0u64;
    while n > 0 {
        sum += n % 10;
        n /= 10;
    }
    sum as i64
}

/// Repeated digit sum until a single digit remains.
pub fn digital_root(n: i64) -> i64 {
    let mut n = digit_sum(n);
    while n >= 10 {
        n = digit_sum(n);
    }
    n
}

/// First `count` terms of a sequence filtered by `keep`, scanning upward from `start`.
fn first_terms(count: usize, start: i64, keep: impl Fn(i64) -> bool) -> Vec<i64> {
    let mut terms = Vec::with_capacity(count);
    let mut n = start;
    while terms.len() < count {
        if keep(n) {
            terms.push(n);
        }
        n += 1;
    }
    terms
}

pub fn primes(count: usize) -> Vec<i64> {
    first_terms(count, 2, is_prime)
}

pub fn additive_primes(count: usize) -> Vec<i64> {
    first_terms(count, 2, is_additive_prime)
}

pub fn non_additive_primes(count: usize) -> Vec<i64> {
    first_terms(count, 2, |n| is_prime(n) && !is_prime(digit_sum(n)))
}

pub fn composites(count: usize) -> Vec<i64> {
    first_terms(count, 4, is_composite)
}

pub fn additive_composites(count: usize) -> Vec<i64> {
    first_terms(count, 4, is_additive_composite)
}

pub fn non_additive_composites(count: usize) -> Vec<i64> {
    first_terms(count, 4, |n| is_composite(n) && !is_composite(digit_sum(n)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primality() {
        let small: Vec<i64> = (0..30).filter(|&n| is_prime(n)).collect();
        assert_eq!(small, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
        assert!(!is_prime(-7));
        assert!(is_prime(7919));
    }

    #[test]
    fn test_composite_excludes_units() {
        assert!(!is_composite(0));
        assert!(!is_composite(1));
        assert!(!is_composite(2));
        assert!(is_composite(4));
        assert_eq!(composites(5), vec![4, 6, 8, 9, 10]);
    }

    #[test]
    fn test_additive_classes() {
        // 29 -> 11 (prime), 19 -> 10 (not prime)
        assert!(is_additive_prime(29));
        assert!(!is_additive_prime(19));
        assert!(NumberKind::NonAdditivePrime.matches(19));
        assert_eq!(additive_primes(5), vec![2, 3, 5, 7, 11]);
    }

    #[test]
    fn test_digit_helpers() {
        assert_eq!(digit_sum(114), 6);
        assert_eq!(digit_sum(-6236), 17);
        assert_eq!(digital_root(6236), 8);
    }

    #[test]
    fn test_number_kind_parse() {
        assert_eq!("prime".parse::<NumberKind>(), Ok(NumberKind::Prime));
        assert_eq!(
            "Additive_Composite".parse::<NumberKind>(),
            Ok(NumberKind::AdditiveComposite)
        );
        assert!("square".parse::<NumberKind>().is_err());
    }
}
