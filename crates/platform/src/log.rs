//! Logging macros shared by every crate in the workspace.
//!
//! `trace!`..`error!` forward to `defmt` or `tracing`. The `cfg` checks are
//! expanded in the crate that calls the macro, so each crate logs through
//! whichever backend its own `defmt`/`tracing` features select; with
//! neither enabled the macros only borrow their arguments so call sites
//! stay warning-free.
//!
//! Pull them in with `#[macro_use] extern crate platform;` at the crate
//! root. The calling crate needs its own optional `defmt` and `tracing`
//! dependencies behind features of the same name.

#[doc(hidden)]
#[macro_export]
macro_rules! __log_event {
    ($level:ident, $s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::$level!($s $(, $x)*);
            #[cfg(all(feature = "tracing", not(feature = "defmt")))]
            ::tracing::$level!($s $(, $x)*);
            #[cfg(not(any(feature = "defmt", feature = "tracing")))]
            let _ = ($( & $x ),*);
        }
    };
}

/// Log at trace level.
#[macro_export]
macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => { $crate::__log_event!(trace, $s $(, $x)*) };
}

/// Log at debug level.
#[macro_export]
macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => { $crate::__log_event!(debug, $s $(, $x)*) };
}

/// Log at info level.
#[macro_export]
macro_rules! info {
    ($s:literal $(, $x:expr)* $(,)?) => { $crate::__log_event!(info, $s $(, $x)*) };
}

/// Log at warn level.
#[macro_export]
macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => { $crate::__log_event!(warn, $s $(, $x)*) };
}

/// Log at error level.
#[macro_export]
macro_rules! error {
    ($s:literal $(, $x:expr)* $(,)?) => { $crate::__log_event!(error, $s $(, $x)*) };
}
