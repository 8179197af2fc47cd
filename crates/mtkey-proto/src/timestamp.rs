//! 32.32 fixed-point timestamps.
//!
//! Whole seconds sit in the high 32 bits, the sub-second fraction in the low
//! 32 bits scaled so that `2^32 - 1` units are one second.

/// Fraction units per second.
const FRACTION_SCALE: u64 = (1 << 32) - 1;

/// Largest whole-second count the high 32 bits can hold (2106-02-07).
const MAX_SECONDS: u64 = (1 << 32) - 1;

/// Convert milliseconds since the epoch into a fixed-point timestamp.
///
/// Times whose seconds do not fit in 32 bits saturate to `u64::MAX`, the
/// latest representable timestamp.
pub const fn encode_timestamp(millis: u64) -> u64 {
    let secs = millis / 1000;
    if secs > MAX_SECONDS {
        return u64::MAX;
    }
    let rem = millis % 1000;
    let fraction = (rem * FRACTION_SCALE + 500) / 1000;
    (secs << 32) + fraction
}

/// Convert a fixed-point timestamp back into milliseconds since the epoch.
///
/// Rounds half-up at the tenth-of-a-millisecond digit.
pub const fn decode_timestamp(ts: u64) -> u64 {
    let secs = ts >> 32;
    let fraction = ts & FRACTION_SCALE;

    let mut tenths = fraction * 10_000 / FRACTION_SCALE;
    if tenths % 10 >= 5 {
        tenths += 5;
    }
    secs * 1000 + tenths / 10
}
