use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Ticks charged when preemption is re-enabled.
pub const SYSTEM_TICK: u64 = 10;
/// Ticks charged per unit of simulated work.
pub const USER_TICK: u64 = 1;
/// Timer period used when only a random seed is configured.
pub const DEFAULT_TIMER_TICKS: u64 = 100;

/// Simulated time instant (monotonic)
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct SimulatedInstant {
    ticks: u64,
}

impl SimulatedInstant {
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn duration_since(&self, earlier: SimulatedInstant) -> u64 {
        self.ticks.saturating_sub(earlier.ticks)
    }
}

struct Timer {
    interval: u64,
    rng: Option<StdRng>,
    next_fire: u64,
}

impl Timer {
    fn next_delay(&mut self) -> u64 {
        match self.rng.as_mut() {
            Some(rng) => 1 + rng.gen_range(0..self.interval.saturating_mul(2)),
            None => self.interval,
        }
    }
}

/// The machine clock plus the optional preemption timer.
pub(crate) struct Clock {
    now: SimulatedInstant,
    timer: Option<Timer>,
}

impl Clock {
    pub fn new(timer_interval: Option<u64>, random_seed: Option<u64>) -> Self {
        let interval = match (timer_interval, random_seed) {
            (Some(interval), _) => Some(interval.max(1)),
            (None, Some(_)) => Some(DEFAULT_TIMER_TICKS),
            (None, None) => None,
        };

        let timer = interval.map(|interval| {
            let mut timer = Timer {
                interval,
                rng: random_seed.map(StdRng::seed_from_u64),
                next_fire: 0,
            };
            timer.next_fire = timer.next_delay();
            timer
        });

        Self {
            now: SimulatedInstant::default(),
            timer,
        }
    }

    pub fn now(&self) -> SimulatedInstant {
        self.now
    }

    /// Advances the clock, returning true when the timer expired.
    pub fn advance(&mut self, ticks: u64) -> bool {
        self.now.ticks = self.now.ticks.saturating_add(ticks);
        let now = self.now.ticks;

        match self.timer.as_mut() {
            Some(timer) if now >= timer.next_fire => {
                timer.next_fire = now.saturating_add(timer.next_delay());
                true
            }
            _ => false,
        }
    }
}
