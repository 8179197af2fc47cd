//! Factorization of the server's 64-bit `pq` composite.
//!
//! Small factors are found by trial division and primes are rejected with a
//! deterministic Miller-Rabin test. Everything else goes through Pollard's
//! rho with Brent's cycle detection, trying a handful of polynomial
//! constants before giving up.

use tracing::trace;

/// Odd divisors below this are found by trial division.
const TRIAL_DIVISION_LIMIT: u64 = 1 << 10;

/// Number of `x^2 + c` polynomials tried before giving up.
const MAX_POLYNOMIALS: u64 = 16;

/// Per-polynomial budget of rho steps.
const MAX_STEPS_PER_POLYNOMIAL: u64 = 1 << 24;

/// Steps between gcd evaluations.
const GCD_BATCH: u64 = 128;

/// Witnesses that make Miller-Rabin exact for every `u64`.
const MILLER_RABIN_BASES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// Split `pq` into `(p, q)` with `p <= q` and `p * q == pq`.
///
/// Returns `None` when no nontrivial divisor is found within the step budget,
/// which is what happens for primes and for values below 4.
pub fn factorize(pq: u64) -> Option<(u64, u64)> {
    let divisor = find_divisor(pq)?;
    let other = pq / divisor;
    Some((divisor.min(other), divisor.max(other)))
}

fn find_divisor(n: u64) -> Option<u64> {
    if n < 4 {
        return None;
    }
    if n % 2 == 0 {
        return Some(2);
    }

    let mut d = 3;
    while d < TRIAL_DIVISION_LIMIT && d * d <= n {
        if n % d == 0 {
            return Some(d);
        }
        d += 2;
    }
    if d * d > n || is_prime(n) {
        return None;
    }

    (1..=MAX_POLYNOMIALS).find_map(|c| {
        let found = brent(n, c);
        trace!(n, c, found = ?found, "rho attempt");
        found
    })
}

/// One run of Pollard-Brent rho with `f(x) = x^2 + c mod n`.
fn brent(n: u64, c: u64) -> Option<u64> {
    let step = |x: u64| add_mod(mul_mod(x, x, n), c, n);

    let mut y = 2;
    let mut x = y;
    let mut saved = y;
    let mut product = 1;
    let mut g = 1;
    let mut run = 1;
    let mut steps = 0;

    while g == 1 {
        x = y;
        for _ in 0..run {
            y = step(y);
        }

        let mut k = 0;
        while k < run && g == 1 {
            saved = y;
            let batch = GCD_BATCH.min(run - k);
            for _ in 0..batch {
                y = step(y);
                product = mul_mod(product, x.abs_diff(y), n);
            }
            g = gcd(product, n);
            k += batch;
        }

        steps += 2 * run;
        if g == 1 && steps > MAX_STEPS_PER_POLYNOMIAL {
            return None;
        }
        run *= 2;
    }

    if g == n {
        // The batch overshot; walk it again one step at a time.
        for _ in 0..GCD_BATCH {
            saved = step(saved);
            g = gcd(x.abs_diff(saved), n);
            if g > 1 {
                break;
            }
        }
    }

    (g != 1 && g != n).then_some(g)
}

fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    for base in MILLER_RABIN_BASES {
        if n % base == 0 {
            return n == base;
        }
    }

    let s = (n - 1).trailing_zeros();
    let d = (n - 1) >> s;
    'witness: for base in MILLER_RABIN_BASES {
        let mut x = pow_mod(base, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..s {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

const fn pow_mod(mut base: u64, mut exp: u64, m: u64) -> u64 {
    let mut acc = 1 % m;
    base %= m;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = mul_mod(acc, base, m);
        }
        base = mul_mod(base, base, m);
        exp >>= 1;
    }
    acc
}

#[allow(clippy::cast_possible_truncation)] // reduced mod a u64
const fn mul_mod(a: u64, b: u64, m: u64) -> u64 {
    ((a as u128 * b as u128) % m as u128) as u64
}

#[allow(clippy::cast_possible_truncation)]
const fn add_mod(a: u64, b: u64, m: u64) -> u64 {
    ((a as u128 + b as u128) % m as u128) as u64
}

const fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_semiprimes() {
        assert_eq!(factorize(323), Some((17, 19)));
        assert_eq!(factorize(15), Some((3, 5)));
        assert_eq!(factorize(4), Some((2, 2)));
    }

    #[test]
    fn documented_example() {
        // pq from the protocol's published key exchange walkthrough
        assert_eq!(
            factorize(0x17ED_4894_1A08_F981),
            Some((1_229_739_323, 1_402_015_859))
        );
    }

    #[test]
    fn factors_near_32_bits() {
        let p: u64 = 4_294_967_279;
        let q: u64 = 4_294_967_291;
        assert_eq!(factorize(p * q), Some((p, q)));
    }

    #[test]
    fn rho_without_trial_division() {
        let p: u64 = 1_000_003;
        let q: u64 = 2_147_483_647;
        let n = p * q;
        let d = (1..=MAX_POLYNOMIALS).find_map(|c| brent(n, c)).unwrap_or(0);
        assert!(d == p || d == q, "got divisor {d}");
    }

    #[test]
    fn ordering_is_independent_of_divisor_found() {
        for (p, q) in [(1_031u64, 65_537u64), (65_537, 2_147_483_647), (1_229_739_323, 1_402_015_859)] {
            let (a, b) = factorize(p * q).unwrap_or((0, 0));
            assert!(a <= b);
            assert_eq!(a * b, p * q);
            assert_eq!((a, b), (p, q));
        }
    }

    #[test]
    fn primes_and_tiny_values_have_no_divisor() {
        assert_eq!(factorize(0), None);
        assert_eq!(factorize(1), None);
        assert_eq!(factorize(3), None);
        assert_eq!(factorize(1_000_003), None);
        assert_eq!(factorize(2_147_483_647), None);
        assert_eq!(factorize(4_294_967_311), None);
        assert_eq!(factorize(18_446_744_073_709_551_557), None);
    }

    #[test]
    fn miller_rabin() {
        assert!(is_prime(2));
        assert!(is_prime(37));
        assert!(is_prime(1_000_000_007));
        assert!(!is_prime(1));
        assert!(!is_prime(561)); // Carmichael
        assert!(!is_prime(3_215_031_751)); // strong pseudoprime to 2, 3, 5, 7
        assert!(!is_prime(4_294_967_279 * 4_294_967_291));
    }

    #[test]
    fn helpers() {
        assert_eq!(gcd(0, 35), 35);
        assert_eq!(gcd(21, 35), 7);
        assert_eq!(mul_mod(u64::MAX, u64::MAX, 1_000_000_007), 114_944_269);
        assert_eq!(pow_mod(3, 200, 1_000_000_007), 136_318_165);
    }
}
