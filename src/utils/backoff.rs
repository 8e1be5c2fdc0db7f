use rand::Rng;
use std::time::Duration;

/// Exponential delay schedule with multiplicative jitter.
///
/// The un-jittered delay for poll `n` is `initial * multiplier^n`, capped
/// at `max_delay`. Jitter is applied after the cap, so a jittered delay can
/// land up to `jitter` above it.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// Fraction in `[0, 1)`; 0.2 means ±20%.
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(2000),
            multiplier: 1.5,
            max_delay: Duration::from_secs(8),
            jitter: 0.2,
        }
    }
}

impl BackoffPolicy {
    /// Fixed delay with no growth and no jitter.
    pub fn constant(delay: Duration) -> Self {
        Self {
            initial: delay,
            multiplier: 1.0,
            max_delay: delay,
            jitter: 0.0,
        }
    }

    pub fn base_delay(&self, attempt: u32) -> Duration {
        let mut delay = self.initial;
        for _ in 0..attempt {
            if delay >= self.max_delay {
                break;
            }
            delay = std::cmp::min(
                Duration::from_millis((delay.as_millis() as f64 * self.multiplier) as u64),
                self.max_delay,
            );
        }
        std::cmp::min(delay, self.max_delay)
    }

    pub fn delay_for<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let base = self.base_delay(attempt);
        let jitter = self.jitter.clamp(0.0, 0.99);
        if jitter == 0.0 || base.is_zero() {
            return base;
        }

        let factor = rng.gen_range((1.0 - jitter)..=(1.0 + jitter));
        Duration::from_secs_f64(base.as_secs_f64() * factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_schedule() {
        let policy = BackoffPolicy::default();
        let schedule: Vec<u128> = (0..7).map(|n| policy.base_delay(n).as_millis()).collect();
        assert_eq!(schedule, vec![2000, 3000, 4500, 6750, 8000, 8000, 8000]);
    }

    #[test]
    fn test_jitter_stays_within_twenty_percent() {
        let policy = BackoffPolicy::default();
        let mut rng = StdRng::seed_from_u64(7);

        for attempt in 0..20 {
            let base = policy.base_delay(attempt).as_secs_f64();
            let jittered = policy.delay_for(attempt, &mut rng).as_secs_f64();
            assert!(jittered >= base * 0.8 - 1e-9, "attempt {} too short", attempt);
            assert!(jittered <= base * 1.2 + 1e-9, "attempt {} too long", attempt);
        }
    }

    #[test]
    fn test_constant_policy() {
        let policy = BackoffPolicy::constant(Duration::from_millis(50));
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(policy.delay_for(0, &mut rng), Duration::from_millis(50));
        assert_eq!(policy.delay_for(30, &mut rng), Duration::from_millis(50));
    }
}
