pub(crate) mod fmt;

#[cfg(any(test, feature = "tracing"))]
macro_rules! trace {
    ($($t:tt)*) => { tracing::trace!($($t)*) }
}

#[cfg(not(any(test, feature = "tracing")))]
macro_rules! trace {
    ($($t:tt)*) => {};
}

#[cfg(test)]
macro_rules! test_debug {
    ($($t:tt)*) => { tracing::debug!($($t)*) }
}

#[cfg(not(test))]
macro_rules! test_debug {
    ($($t:tt)*) => {};
}

/// Aborts the process with the given message.
///
/// `core` has no `abort`, so this panics while a guard whose destructor also
/// panics is live. A panic during unwinding always aborts.
#[cold]
#[track_caller]
pub(crate) fn abort(msg: &'static str) -> ! {
    struct Abort(&'static str);

    impl Drop for Abort {
        fn drop(&mut self) {
            panic!("{}", self.0);
        }
    }

    let _abort = Abort(msg);
    panic!("{msg}");
}
