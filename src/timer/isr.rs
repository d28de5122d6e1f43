use crate::engine::SyncEngine;
use crate::error::ConfigError;
use crate::pattern::SyncPatternSpec;
use core::cell::RefCell;
use critical_section::Mutex;
use embedded_hal::digital::InputPin;

/// A [`SyncEngine`] shared between `main` and the bit clock interrupt.
///
/// Only the producer side lives here. The pool's
/// [`Consumer`](crate::pool::Consumer) is polled outside any critical
/// section.
pub type GlobalSyncEngine = Mutex<RefCell<Option<SyncEngine<'static>>>>;

/// Used to initialize the global static [`GlobalSyncEngine`].
///
/// # Returns
/// * An empty mutable ref-cell
///
/// # Example
/// ```rust
/// use sondesync::timer::{GlobalSyncEngine, global_sync_engine_init};
///
/// static SYNC_ENGINE: GlobalSyncEngine = global_sync_engine_init();
/// ```
pub const fn global_sync_engine_init() -> GlobalSyncEngine {
    Mutex::new(RefCell::new(None))
}

/// Moves `engine` into the global slot, replacing any previous one.
///
/// # Example
/// ```rust
/// use sondesync::engine::SyncEngine;
/// use sondesync::pool::BufferPool;
/// use sondesync::timer::{GlobalSyncEngine, global_sync_engine_init, global_sync_engine_setup};
///
/// static SYNC_ENGINE: GlobalSyncEngine = global_sync_engine_init();
///
/// let pool: &'static mut BufferPool = Box::leak(Box::new(BufferPool::new()));
/// let (producer, _consumer) = pool.split();
/// global_sync_engine_setup(&SYNC_ENGINE, SyncEngine::open(producer));
/// ```
pub fn global_sync_engine_setup(global: &'static GlobalSyncEngine, engine: SyncEngine<'static>) {
    critical_section::with(|cs| {
        let _ = global.borrow(cs).replace(Some(engine));
    });
}

/// Feeds one line bit at each bit clock interrupt.
///
/// Does nothing until [`global_sync_engine_setup`] has run.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn TIM2() {
///     global_sync_engine_feed(&SYNC_ENGINE, data_pin.is_high().unwrap_or(false), TIM5.cnt());
/// }
/// ```
pub fn global_sync_engine_feed(global: &'static GlobalSyncEngine, bit: bool, now: u32) {
    critical_section::with(|cs| {
        if let Some(engine) = global.borrow(cs).borrow_mut().as_mut() {
            engine.feed_bit(bit, now);
        }
    });
}

/// Samples `rx` and feeds the level as one line bit.
pub fn global_sync_engine_sample<RX: InputPin>(
    global: &'static GlobalSyncEngine,
    rx: &mut RX,
    now: u32,
) {
    critical_section::with(|cs| {
        if let Some(engine) = global.borrow(cs).borrow_mut().as_mut() {
            engine.sample(rx, now);
        }
    });
}

/// Installs a new pattern table on the global engine.
///
/// Returns [`ConfigError::NotOpen`] if no engine has been set up. Running
/// inside a critical section keeps the bit clock interrupt out while the
/// table is swapped.
pub fn global_sync_engine_configure(
    global: &'static GlobalSyncEngine,
    patterns: &[SyncPatternSpec<'static>],
) -> Result<(), ConfigError> {
    critical_section::with(|cs| match global.borrow(cs).borrow_mut().as_mut() {
        Some(engine) => engine.configure(patterns),
        None => Err(ConfigError::NotOpen),
    })
}

/// Runs `f` on the global engine, if it has been set up.
pub fn with_sync_engine<R>(
    global: &'static GlobalSyncEngine,
    f: impl FnOnce(&mut SyncEngine<'static>) -> R,
) -> Option<R> {
    critical_section::with(|cs| global.borrow(cs).borrow_mut().as_mut().map(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SyncState;
    use crate::pattern::DataMode;
    use crate::pool::{BufferPool, Consumer, FrameRecord};

    fn open() -> (SyncEngine<'static>, Consumer<'static>) {
        let pool: &'static mut BufferPool = Box::leak(Box::new(BufferPool::new()));
        let (producer, consumer) = pool.split();
        (SyncEngine::open(producer), consumer)
    }

    const PATTERN: SyncPatternSpec<'static> =
        SyncPatternSpec::new(42, [0x9a, 0], 8, DataMode::Raw, 8);

    #[test]
    fn test_configure_before_setup_fails() {
        static ENGINE: GlobalSyncEngine = global_sync_engine_init();
        assert_eq!(
            global_sync_engine_configure(&ENGINE, &[PATTERN]),
            Err(ConfigError::NotOpen)
        );
        global_sync_engine_feed(&ENGINE, true, 0);
        assert_eq!(with_sync_engine(&ENGINE, |engine| engine.state()), None);
    }

    #[test]
    fn test_global_engine_publishes_frames() {
        static ENGINE: GlobalSyncEngine = global_sync_engine_init();
        let (engine, mut consumer) = open();
        global_sync_engine_setup(&ENGINE, engine);
        assert_eq!(global_sync_engine_configure(&ENGINE, &[PATTERN]), Ok(()));

        let line: u16 = 0x9a_c3;
        for (now, i) in (0..16).rev().enumerate() {
            global_sync_engine_feed(&ENGINE, (line >> i) & 1 != 0, now as u32);
        }

        let mut frame = FrameRecord::new();
        assert!(consumer.read(&mut frame).is_ok());
        assert_eq!(frame.opcode, 42);
        assert_eq!(frame.rx_time, 7);
        assert_eq!(frame.data[0], 0xc3);
        assert_eq!(
            with_sync_engine(&ENGINE, |engine| (engine.state(), engine.stats().frames_published)),
            Some((SyncState::Hunt, 1))
        );
    }

    #[test]
    fn test_global_configure_rejects_bad_table() {
        static ENGINE: GlobalSyncEngine = global_sync_engine_init();
        let (engine, _consumer) = open();
        global_sync_engine_setup(&ENGINE, engine);
        let bad = SyncPatternSpec::new(1, [0, 0], 8, DataMode::Raw, 0);
        assert_eq!(
            global_sync_engine_configure(&ENGINE, &[bad]),
            Err(ConfigError::EmptyFrame { index: 0, id: 1 })
        );
        assert_eq!(with_sync_engine(&ENGINE, |engine| engine.table().len()), Some(0));
    }
}
