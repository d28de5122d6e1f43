/// Declares a static global `SYNC_ENGINE` protected by a `critical_section`
/// mutex.
///
/// This macro creates a `static` singleton suitable for interrupt-based
/// receivers, where `main` installs the pattern table and the bit clock ISR
/// feeds line bits.
///
/// # Example
/// ```rust
/// sondesync::init_sync_engine!();
/// # fn main() {}
/// ```
#[macro_export]
macro_rules! init_sync_engine {
    () => {
        /// Sync engine shared between `main` and the bit clock interrupt.
        pub static SYNC_ENGINE: $crate::timer::GlobalSyncEngine =
            $crate::timer::global_sync_engine_init();
    };
}

/// Moves an opened [`SyncEngine`](crate::engine::SyncEngine) into the global
/// `SYNC_ENGINE` declared by `init_sync_engine!`.
///
/// # Example
/// ```rust,ignore
/// fn main() {
///     let (producer, consumer) = POOL.take().split();
///     setup_sync_engine!(SyncEngine::open(producer));
/// }
/// ```
#[macro_export]
macro_rules! setup_sync_engine {
    ( $engine:expr ) => {
        $crate::timer::global_sync_engine_setup(&SYNC_ENGINE, $engine)
    };
}

/// Feeds one line bit to the global `SYNC_ENGINE`, if it has been set up.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn TIM2() {
///     feed_sync_engine!(data_pin.is_high().unwrap_or(false), TIM5.cnt());
/// }
/// ```
///
/// # Notes
/// - Safe to call before `setup_sync_engine!`; the bit is dropped.
#[macro_export]
macro_rules! feed_sync_engine {
    ( $bit:expr, $now:expr ) => {
        $crate::timer::global_sync_engine_feed(&SYNC_ENGINE, $bit, $now)
    };
}

/// Samples an `InputPin` into the global `SYNC_ENGINE`.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn TIM2() {
///     sample_sync_engine!(&mut data_pin, TIM5.cnt());
/// }
/// ```
#[macro_export]
macro_rules! sample_sync_engine {
    ( $rx:expr, $now:expr ) => {
        $crate::timer::global_sync_engine_sample(&SYNC_ENGINE, $rx, $now)
    };
}
