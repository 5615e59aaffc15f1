use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::config::Throttle;

/// Semaphore refilled every second, the refill task lives as long as the limiter.
#[derive(Debug)]
pub struct RateLimiter {
    permits: Arc<Semaphore>,
    refill: JoinHandle<()>,
}

impl RateLimiter {
    pub fn new(per_second: usize) -> Self {
        let permits = Arc::new(Semaphore::new(per_second));

        let permits_c = permits.clone();
        let refill = tokio::spawn(async move {
            let mut interval = time::interval(Duration::from_secs(1));
            interval.tick().await;
            loop {
                interval.tick().await;
                let available = permits_c.available_permits();
                permits_c.add_permits(per_second.saturating_sub(available));
            }
        });

        Self { permits, refill }
    }

    async fn acquire(&self) {
        match self.permits.acquire().await {
            Ok(permit) => permit.forget(),
            Err(e) => log::error!("Rate limiter closed: {e}"),
        }
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.refill.abort();
    }
}

/// Gate in front of fetcher calls.
#[derive(Debug)]
pub enum Limiter {
    Unbounded,
    Concurrent(Arc<Semaphore>),
    PerSecond(RateLimiter),
    Delay {
        delay: Duration,
        next_slot: Mutex<Instant>,
    },
}

fn max_permits(n: usize) -> usize {
    if n > Semaphore::MAX_PERMITS {
        log::warn!("Throttle of {n} exceeds {}, clamping", Semaphore::MAX_PERMITS);
    }
    n.min(Semaphore::MAX_PERMITS)
}

/// Held for the duration of a fetch.
#[derive(Debug)]
pub struct Permit {
    _permit: Option<OwnedSemaphorePermit>,
}

impl Limiter {
    pub fn new(throttle: Option<Throttle>) -> Self {
        match throttle {
            None => Self::Unbounded,
            Some(Throttle::Concurrent(n)) => {
                Self::Concurrent(Arc::new(Semaphore::new(max_permits(n.get()))))
            }
            Some(Throttle::PerSecond(n)) => Self::PerSecond(RateLimiter::new(max_permits(n.get()))),
            Some(Throttle::Delay(secs)) => {
                let delay = if secs.is_finite() && secs > 0.0 {
                    Duration::from_secs_f32(secs)
                } else {
                    log::warn!("Ignoring invalid throttle delay: {secs}");
                    Duration::ZERO
                };
                Self::Delay {
                    delay,
                    next_slot: Mutex::new(Instant::now()),
                }
            }
        }
    }

    pub async fn acquire(&self) -> Permit {
        match self {
            Self::Unbounded => Permit { _permit: None },
            Self::Concurrent(permits) => match permits.clone().acquire_owned().await {
                Ok(permit) => Permit {
                    _permit: Some(permit),
                },
                Err(e) => {
                    log::error!("Concurrency limiter closed: {e}");
                    Permit { _permit: None }
                }
            },
            Self::PerSecond(limiter) => {
                limiter.acquire().await;
                Permit { _permit: None }
            }
            Self::Delay { delay, next_slot } => {
                let slot = {
                    let mut next_slot = next_slot.lock().await;
                    let slot = (*next_slot).max(Instant::now());
                    *next_slot = slot + *delay;
                    slot
                };
                time::sleep_until(slot).await;
                Permit { _permit: None }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::*;

    #[tokio::test]
    async fn concurrent_permits_are_released() {
        let limiter = Limiter::new(Some(Throttle::Concurrent(NonZeroUsize::new(1).unwrap())));
        let Limiter::Concurrent(permits) = &limiter else {
            panic!("Expected a concurrency limiter");
        };

        let permit = limiter.acquire().await;
        assert_eq!(0, permits.available_permits());
        drop(permit);
        assert_eq!(1, permits.available_permits());
    }

    #[tokio::test]
    async fn oversized_throttles_are_clamped() {
        let huge = NonZeroUsize::new(usize::MAX).unwrap();

        let limiter = Limiter::new(Some(Throttle::Concurrent(huge)));
        let Limiter::Concurrent(permits) = &limiter else {
            panic!("Expected a concurrency limiter");
        };
        assert_eq!(Semaphore::MAX_PERMITS, permits.available_permits());
        drop(limiter.acquire().await);

        let limiter = Limiter::new(Some(Throttle::PerSecond(huge)));
        limiter.acquire().await;
    }

    #[tokio::test(start_paused = true)]
    async fn delay_spaces_out_fetches() {
        let limiter = Limiter::new(Some(Throttle::Delay(0.5)));
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;

        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn per_second_refills() {
        let limiter = Limiter::new(Some(Throttle::PerSecond(NonZeroUsize::new(2).unwrap())));
        let start = Instant::now();

        for _ in 0..4 {
            limiter.acquire().await;
        }

        assert!(start.elapsed() >= Duration::from_secs(1));
    }
}
