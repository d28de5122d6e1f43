//! Bit clock helpers for driving a [`SyncEngine`](crate::engine::SyncEngine).
//!
//! The engine consumes exactly one line bit per call, so something has to
//! sample the demodulator at the line bit rate. Two approaches are provided:
//! an interrupt service routine hosting the engine behind
//! `critical_section::with` (`timer-isr` feature), or a busy-loop sampler
//! built on `DelayNs` (`delay-loop` feature).
//!
//! Contains:
//! - `line_bit_rate`: line bits per second for a symbol rate and decoding mode
//! - `bit_period_ns` / `const_bit_period_ns`: delay between two samples
//! - `compute_reload_value` / `const_reload_value`: timer reload for the bit clock
//! - `sample_bits` and `run_sample_loop`: blocking pin sampler (feature `delay-loop`)
//! - `global_sync_engine_feed` and `feed_sync_engine!()`: interrupt-side
//!   entry points (feature `timer-isr`)
//!
//! Common sonde line rates:
//!
//! | Sonde   | Symbol rate | Mode       | Line rate  | Bit period |
//! |---------|-------------|------------|------------|------------|
//! | RS41    | 4800 Bd     | `Raw`      | 4800 bit/s |  208333 ns |
//! | DFM     | 2500 Bd     | `BiphaseS` | 5000 bit/s |  200000 ns |
//! | iMet-4  | 1200 Bd     | `Uart8n1`  | 1200 bit/s |  833333 ns |

use libm::round;

use crate::pattern::DataMode;

#[cfg(feature = "delay-loop")]
mod delay;
#[cfg_attr(feature = "delay-loop", allow(unused_imports))]
#[cfg(feature = "delay-loop")]
pub use delay::*;

#[cfg(feature = "timer-isr")]
mod isr;
#[cfg_attr(feature = "timer-isr", allow(unused_imports))]
#[cfg(feature = "timer-isr")]
pub use isr::*;

#[cfg(feature = "timer-isr")]
mod macros;

/// 10^9 nanoseconds = 1 second
pub const NANOS_PER_SECOND: u32 = 1_000_000_000;

/// Line bits per second the engine must be fed at.
///
/// Biphase carries two half-bit line intervals per symbol; the other modes
/// carry one.
pub const fn line_bit_rate(symbol_rate: u32, mode: DataMode) -> u32 {
    match mode {
        DataMode::BiphaseS => symbol_rate.saturating_mul(2),
        DataMode::Raw | DataMode::Uart8n1 => symbol_rate,
    }
}

/// Nanoseconds between two samples at `line_rate` bits per second.
///
/// Rounds to the nearest nanosecond. A zero rate yields `u32::MAX`.
pub fn bit_period_ns(line_rate: u32) -> u32 {
    if line_rate == 0 {
        return u32::MAX;
    }
    round(f64::from(NANOS_PER_SECOND) / f64::from(line_rate)) as u32
}

/// Compile-time [`bit_period_ns`].
pub const fn const_bit_period_ns(line_rate: u32) -> u32 {
    if line_rate == 0 {
        return u32::MAX;
    }
    (NANOS_PER_SECOND + line_rate / 2) / line_rate
}

/// Computes the reload (auto-reload / compare) value of a timer ticking at
/// `f_clk / prescaler` so that it fires once per line bit.
///
/// # Arguments
/// - `f_clk`: timer input clock in Hz
/// - `prescaler`: timer prescaler (e.g., 1, 8, 64)
/// - `line_rate`: line bits per second, see [`line_bit_rate`]
///
/// # Returns
/// - Timer counts per line bit, rounded to the nearest integer
pub fn compute_reload_value(f_clk: u32, prescaler: u32, line_rate: u32) -> u32 {
    if prescaler == 0 || line_rate == 0 {
        return u32::MAX;
    }
    let counts_per_second = f64::from(f_clk) / f64::from(prescaler);
    round(counts_per_second / f64::from(line_rate)) as u32
}

/// Compile-time [`compute_reload_value`].
pub const fn const_reload_value(f_clk: u32, prescaler: u32, line_rate: u32) -> u32 {
    if prescaler == 0 || line_rate == 0 {
        return u32::MAX;
    }
    let divisor = prescaler as u64 * line_rate as u64;
    ((f_clk as u64 + divisor / 2) / divisor) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_biphase_doubles_line_rate() {
        assert_eq!(line_bit_rate(2500, DataMode::BiphaseS), 5000);
        assert_eq!(line_bit_rate(4800, DataMode::Raw), 4800);
        assert_eq!(line_bit_rate(1200, DataMode::Uart8n1), 1200);
    }

    #[test]
    fn test_bit_periods_round_to_nearest() {
        assert_eq!(bit_period_ns(4800), 208_333);
        assert_eq!(bit_period_ns(1200), 833_333);
        assert_eq!(bit_period_ns(9600), 104_167);
        assert_eq!(const_bit_period_ns(9600), 104_167);
        assert_eq!(const_bit_period_ns(5000), 200_000);
        assert_eq!(bit_period_ns(0), u32::MAX);
    }

    #[test]
    fn test_reload_values() {
        assert_eq!(compute_reload_value(48_000_000, 1, 4800), 10_000);
        assert_eq!(compute_reload_value(16_000_000, 8, 5000), 400);
        assert_eq!(const_reload_value(16_000_000, 64, 4800), 52);
        assert_eq!(compute_reload_value(16_000_000, 64, 4800), 52);
        assert_eq!(const_reload_value(1, 0, 4800), u32::MAX);
    }
}
