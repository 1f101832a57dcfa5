use core::fmt::Arguments;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
}

impl Level {
    fn tag(&self) -> &'static str {
        match self {
            Level::Info => "I",
            Level::Warn => "W",
        }
    }
}

/// Sink behind `info!` and `warn!`. Goes to RTT on target, stdout in tests, nowhere otherwise.
pub fn emit(level: Level, args: Arguments) {
    #[cfg(feature = "rtt")]
    rtt_target::rprintln!("[{}] {}", level.tag(), args);

    #[cfg(all(test, not(feature = "rtt")))]
    std::println!("[{}] {}", level.tag(), args);

    #[cfg(not(any(test, feature = "rtt")))]
    let _ = (level.tag(), args);
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::log::emit($crate::log::Level::Info, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::log::emit($crate::log::Level::Warn, format_args!($($arg)*))
    };
}
