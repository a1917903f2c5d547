//! Bounded retry with exponential backoff.
//!
//! The policy is applied explicitly around one upstream call. It knows nothing
//! about caching or pacing; the fetcher composes those separately.

use std::time::Duration;

use log::debug;

/// Blocking wait. Production code sleeps the thread; tests record the calls.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// Bounded exponential backoff.
///
/// With `max_attempts = n` there are at most `n - 1` waits: one before each
/// retry, none after the final attempt. Base 1s and 3 attempts wait 1s then
/// 2s; a fourth attempt would add 4s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Wait before the second attempt; doubles for each further attempt.
    pub base_delay: Duration,
    /// Upper bound for any single backoff wait.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(60),
        }
    }
}

/// Result of [`RetryPolicy::run`] together with how many calls were made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

impl RetryPolicy {
    /// Attempts `run` actually makes at most.
    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Backoff before `attempt` (1-based). Zero for the first attempt.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2).min(31);
        let factor = 1u32 << exponent;
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. There is no wait after the last attempt.
    pub fn run<T, E, F, P>(&self, sleeper: &dyn Sleeper, mut op: F, should_retry: P) -> Retried<T, E>
    where
        F: FnMut(u32) -> Result<T, E>,
        P: Fn(&E) -> bool,
    {
        let max_attempts = self.effective_attempts();
        let mut attempt = 1;

        loop {
            match op(attempt) {
                Ok(value) => {
                    return Retried {
                        result: Ok(value),
                        attempts: attempt,
                    };
                }
                Err(err) => {
                    if !should_retry(&err) || attempt >= max_attempts {
                        return Retried {
                            result: Err(err),
                            attempts: attempt,
                        };
                    }
                }
            }

            attempt += 1;
            let delay = self.delay_before(attempt);
            debug!("backing off {}ms before attempt {attempt}/{max_attempts}", delay.as_millis());
            sleeper.sleep(delay);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records every wait instead of sleeping.
    #[derive(Default)]
    pub(crate) struct RecordingSleeper {
        pub waits: RefCell<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.waits.borrow_mut().push(duration);
        }
    }

    fn policy(base_ms: u64, max_ms: u64) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(base_ms),
            max_delay: Duration::from_millis(max_ms),
        }
    }

    #[test]
    fn delays_double_and_cap() {
        let p = RetryPolicy {
            max_attempts: 6,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        };
        let delays: Vec<u64> = (1..=6).map(|a| p.delay_before(a).as_secs()).collect();
        assert_eq!(delays, vec![0, 1, 2, 4, 5, 5]);
    }

    #[test]
    fn huge_attempt_numbers_do_not_overflow() {
        let p = policy(1000, 60_000);
        assert_eq!(p.delay_before(200), Duration::from_secs(60));
    }

    #[test]
    fn exhausts_budget_on_retryable_errors() {
        let sleeper = RecordingSleeper::default();
        let out: Retried<(), &str> = policy(1000, 30_000).run(&sleeper, |_| Err("429"), |_| true);
        assert_eq!(out.attempts, 3);
        assert!(out.result.is_err());
        assert_eq!(
            *sleeper.waits.borrow(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[test]
    fn stops_immediately_on_non_retryable_error() {
        let sleeper = RecordingSleeper::default();
        let out: Retried<(), &str> = policy(1000, 30_000).run(&sleeper, |_| Err("boom"), |_| false);
        assert_eq!(out.attempts, 1);
        assert!(sleeper.waits.borrow().is_empty());
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let sleeper = RecordingSleeper::default();
        let out = policy(10, 100).run(
            &sleeper,
            |attempt| if attempt < 3 { Err("429") } else { Ok(attempt) },
            |_| true,
        );
        assert_eq!(out.result, Ok(3));
        assert_eq!(out.attempts, 3);
        assert_eq!(sleeper.waits.borrow().len(), 2);
    }

    #[test]
    fn zero_attempt_budget_still_calls_once() {
        let sleeper = RecordingSleeper::default();
        let p = RetryPolicy { max_attempts: 0, ..policy(10, 100) };
        let out: Retried<(), &str> = p.run(&sleeper, |_| Err("429"), |_| true);
        assert_eq!(out.attempts, 1);
        assert_eq!(p.effective_attempts(), 1);
        assert!(sleeper.waits.borrow().is_empty());
    }

    #[test]
    fn waits_one_less_than_the_attempt_budget() {
        for max_attempts in 1..=4 {
            let sleeper = RecordingSleeper::default();
            let p = RetryPolicy { max_attempts, ..policy(1_000, 60_000) };
            let out: Retried<(), &str> = p.run(&sleeper, |_| Err("429"), |_| true);
            assert_eq!(out.attempts, p.effective_attempts());
            assert_eq!(sleeper.waits.borrow().len() as u32, max_attempts - 1);
        }
        let p = RetryPolicy { max_attempts: 3, ..policy(1_000, 60_000) };
        assert_eq!(p.delay_before(2), Duration::from_secs(1));
        assert_eq!(p.delay_before(3), Duration::from_secs(2));
    }
}
