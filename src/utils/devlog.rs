//! Benchmark lines emitted by queries under the `nexusdoc::dev6` log target.
//!
//! Each line is also offered to a per-thread capture buffer, so tests can read back what a
//! single operation reported without installing a global logger.

use std::cell::RefCell;

thread_local! {
    static CAPTURED: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// Stops capturing on this thread when dropped.
pub struct CaptureGuard;

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        CAPTURED.with(|s| *s.borrow_mut() = None);
    }
}

/// Starts capturing `dev6!` lines emitted on the current thread.
#[must_use]
pub fn enable_thread_sink() -> CaptureGuard {
    CAPTURED.with(|s| *s.borrow_mut() = Some(Vec::new()));
    CaptureGuard
}

/// Runs `f` with capture enabled and returns its result with the lines it emitted.
pub fn capture<T>(f: impl FnOnce() -> T) -> (T, Vec<String>) {
    let _guard = enable_thread_sink();
    let out = f();
    (out, drain())
}

#[doc(hidden)]
pub fn write_str(msg: &str) {
    CAPTURED.with(|s| {
        if let Some(buf) = s.borrow_mut().as_mut() {
            buf.push(msg.to_owned());
        }
    });
}

/// Takes the lines captured so far; empty when capture is off.
pub fn drain() -> Vec<String> {
    CAPTURED.with(|s| s.borrow_mut().as_mut().map(std::mem::take).unwrap_or_default())
}

/// Emits one benchmark line at trace level under [`crate::logger::DEV6_TARGET`].
#[macro_export]
macro_rules! dev6 {
    ($($arg:tt)*) => {{
        let line = format!($($arg)*);
        $crate::utils::devlog::write_str(&line);
        log::log!(target: $crate::logger::DEV6_TARGET, log::Level::Trace, "{}", line);
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_returns_lines_in_emission_order() {
        let (n, lines) = capture(|| {
            crate::dev6!("{{\"bench\":\"query\",\"op\":\"{}\"}}", "find");
            crate::dev6!("{{\"bench\":\"query\",\"op\":\"count\"}}");
            7
        });
        assert_eq!(n, 7);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"op\":\"find\""));
        assert!(lines[1].contains("\"op\":\"count\""));
        assert!(drain().is_empty());
    }

    #[test]
    fn drain_empties_the_buffer() {
        let _g = enable_thread_sink();
        crate::dev6!("one");
        assert_eq!(drain(), vec!["one".to_string()]);
        assert!(drain().is_empty());
    }

    #[test]
    fn other_threads_are_not_captured() {
        let (child, lines) = capture(|| {
            crate::dev6!("main");
            std::thread::spawn(|| {
                crate::dev6!("child");
                drain()
            })
            .join()
            .unwrap()
        });
        assert!(child.is_empty());
        assert_eq!(lines, vec!["main".to_string()]);
    }
}
