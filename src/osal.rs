use core::time::Duration;

/// Platform services the host needs from the surrounding kernel.
pub trait Kernel: Send + Sync + 'static {
    fn page_size(&self) -> usize;

    /// Busy or sleeping wait, never shorter than `duration`.
    fn delay(&self, duration: Duration);

    /// Monotonic time since an arbitrary origin.
    fn now(&self) -> Duration;
}

/// Reads until `cond` holds, waiting `interval` between reads.
///
/// Returns the satisfying value, or `Err` with the last value read once
/// `timeout` has elapsed. The condition is checked one final time after the
/// deadline so a slow wakeup never reports a false timeout.
pub(crate) fn poll_timeout<T>(
    kernel: &dyn Kernel,
    interval: Duration,
    timeout: Duration,
    mut read: impl FnMut() -> T,
    cond: impl Fn(&T) -> bool,
) -> Result<T, T> {
    let deadline = kernel.now() + timeout;
    loop {
        let val = read();
        if cond(&val) {
            return Ok(val);
        }
        if kernel.now() > deadline {
            let val = read();
            return if cond(&val) { Ok(val) } else { Err(val) };
        }
        kernel.delay(interval);
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;
    use core::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    struct TickKernel {
        now_us: AtomicU64,
    }

    impl Kernel for TickKernel {
        fn page_size(&self) -> usize {
            0x1000
        }

        fn delay(&self, duration: Duration) {
            self.now_us
                .fetch_add(duration.as_micros() as u64, Ordering::SeqCst);
        }

        fn now(&self) -> Duration {
            Duration::from_micros(self.now_us.load(Ordering::SeqCst))
        }
    }

    fn kernel() -> TickKernel {
        TickKernel {
            now_us: AtomicU64::new(0),
        }
    }

    #[test]
    fn test_poll_ready_after_reads() {
        let k = kernel();
        let reads = Cell::new(0u32);
        let res = poll_timeout(
            &k,
            Duration::from_micros(1),
            Duration::from_micros(1000),
            || {
                reads.set(reads.get() + 1);
                reads.get()
            },
            |v| *v == 5,
        );
        assert_eq!(res, Ok(5));
        assert_eq!(k.now(), Duration::from_micros(4));
    }

    #[test]
    fn test_poll_timeout_is_bounded() {
        let k = kernel();
        let res = poll_timeout(
            &k,
            Duration::from_micros(1),
            Duration::from_micros(1000),
            || 7u32,
            |_| false,
        );
        assert_eq!(res, Err(7));
        assert!(k.now() <= Duration::from_micros(1001));
        assert!(k.now() >= Duration::from_micros(1000));
    }
}
