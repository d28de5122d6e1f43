use crate::engine::SyncEngine;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;

/// Samples `rx` into `engine` for `count` line bits, waiting `bit_period_ns`
/// after each sample.
///
/// The time counter handed to the engine is a bit counter starting at
/// `start_time`, so `rx_time` of a frame is the bit index of its sync match.
/// Returns the counter value after the last sample, to be passed as
/// `start_time` of the next call.
///
/// # Example
/// ```rust,ignore
/// let period = sondesync::timer::const_bit_period_ns(4800);
/// let mut now = 0;
/// loop {
///     now = sample_bits(&mut engine, &mut rx, &mut delay, period, now, 1024);
///     while consumer.read(&mut frame).is_ok() {
///         handle(&frame);
///     }
/// }
/// ```
///
/// # Notes
/// - The time spent in `feed_bit` adds to every period; derive
///   `bit_period_ns` from a measured loop if the line rate is high.
pub fn sample_bits<RX: InputPin, D: DelayNs>(
    engine: &mut SyncEngine<'_>,
    rx: &mut RX,
    delay: &mut D,
    bit_period_ns: u32,
    start_time: u32,
    count: u32,
) -> u32 {
    let mut now = start_time;
    for _ in 0..count {
        engine.sample(rx, now);
        now = now.wrapping_add(1);
        delay.delay_ns(bit_period_ns);
    }
    now
}

/// Runs a blocking loop that samples `rx` into `engine` forever.
///
/// This is a simple timing loop for single-purpose receivers where the
/// consumer runs on another core or context.
///
/// # Notes
/// - This loop will never return.
/// - For accurate timing prefer an interrupt-driven bit clock, see
///   [`global_sync_engine_feed`](crate::timer::global_sync_engine_feed).
pub fn run_sample_loop<RX: InputPin, D: DelayNs>(
    engine: &mut SyncEngine<'_>,
    rx: &mut RX,
    delay: &mut D,
    bit_period_ns: u32,
) -> ! {
    let mut now: u32 = 0;
    loop {
        engine.sample(rx, now);
        now = now.wrapping_add(1);
        delay.delay_ns(bit_period_ns);
    }
}
