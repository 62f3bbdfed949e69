//! An elevator shared by a population of persons, coordinated through a
//! single monitor.

mod state;

pub use state::{
    Direction, ElevatorEvent, ElevatorState, Floor, Person, Phase, TerminationPolicy,
};

use crate::RuntimeError;
use log::{info, warn};
use std::str::FromStr;
use std::sync::Arc;
use tandem_kernel::sync::Monitor;
use tandem_kernel::{thread, Kernel, KernelError};

pub const DEFAULT_FLOORS: usize = 30;
pub const DEFAULT_CAPACITY: usize = 5;
pub const DEFAULT_MOVE_TICKS: u64 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElevatorConfig {
    pub floors: usize,
    pub capacity: usize,
    /// Simulated ticks spent travelling between adjacent floors.
    pub move_ticks: u64,
    pub policy: TerminationPolicy,
}

impl Default for ElevatorConfig {
    fn default() -> Self {
        Self {
            floors: DEFAULT_FLOORS,
            capacity: DEFAULT_CAPACITY,
            move_ticks: DEFAULT_MOVE_TICKS,
            policy: TerminationPolicy::default(),
        }
    }
}

/// A trip between two floors, numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub from: usize,
    pub to: usize,
}

impl Request {
    pub const fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }
}

impl FromStr for Request {
    type Err = RuntimeError;

    /// Parses `FROM:TO`, e.g. `3:25`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RuntimeError::InvalidRequest(s.to_string());
        let (from, to) = s.split_once(':').ok_or_else(invalid)?;
        Ok(Self {
            from: from.trim().parse().map_err(|_| invalid())?,
            to: to.trim().parse().map_err(|_| invalid())?,
        })
    }
}

/// The scripted rush on the 30-floor building.
pub fn default_requests() -> Vec<Request> {
    [
        (3, 25),
        (1, 7),
        (1, 2),
        (1, 4),
        (1, 4),
        (2, 7),
        (1, 8),
        (2, 3),
        (4, 2),
        (9, 3),
        (10, 20),
        (5, 7),
        (18, 3),
        (12, 15),
        (10, 6),
        (10, 12),
        (6, 22),
        (2, 8),
        (10, 7),
        (1, 12),
        (1, 13),
        (3, 1),
        (7, 11),
        (2, 5),
        (1, 16),
        (1, 20),
    ]
    .into_iter()
    .map(|(from, to)| Request::new(from, to))
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElevatorReport {
    pub events: Vec<ElevatorEvent>,
    /// Person ids in delivery order.
    pub delivered: Vec<usize>,
    /// Persons still waiting when the elevator stopped.
    pub stranded: Vec<usize>,
    pub max_occupied: usize,
    /// Floor the elevator stopped at, numbered from 1.
    pub final_floor: Option<usize>,
    pub ticks: u64,
}

pub struct ElevatorSimulation {
    config: ElevatorConfig,
    persons: Vec<Person>,
}

impl ElevatorSimulation {
    pub fn new(config: ElevatorConfig, requests: &[Request]) -> Result<Self, RuntimeError> {
        if config.floors < 2 {
            return Err(RuntimeError::InvalidConfig(format!(
                "an elevator needs at least 2 floors, got {}",
                config.floors
            )));
        }
        if config.capacity == 0 {
            return Err(RuntimeError::InvalidConfig(
                "elevator capacity must be at least 1".to_string(),
            ));
        }

        let floors = 1..=config.floors;
        let persons = requests
            .iter()
            .enumerate()
            .map(|(id, request)| {
                if !floors.contains(&request.from) || !floors.contains(&request.to) {
                    return Err(RuntimeError::FloorOutOfRange {
                        from: request.from,
                        to: request.to,
                        floors: config.floors,
                    });
                }
                Ok(Person {
                    id,
                    origin: request.from - 1,
                    destination: request.to - 1,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { config, persons })
    }

    pub fn config(&self) -> &ElevatorConfig {
        &self.config
    }

    pub fn persons(&self) -> &[Person] {
        &self.persons
    }

    /// Forks the elevator and one thread per person, then runs the kernel.
    pub fn run(self, kernel: Kernel) -> Result<ElevatorReport, RuntimeError> {
        let state = Arc::new(Monitor::new(
            "elevator",
            ElevatorState::new(self.config.floors, self.config.capacity, self.persons.len()),
        ));

        let elevator = Arc::clone(&state);
        let config = self.config.clone();
        kernel.fork("elevator", move || run_elevator(&elevator, &config))?;

        for person in self.persons {
            let state = Arc::clone(&state);
            kernel.fork(format!("person {}", person.id), move || {
                run_person(&state, person)
            })?;
        }

        let ticks = match kernel.run() {
            Ok(summary) => summary.ticks,
            // Persons left waiting behind a finished elevator.
            Err(KernelError::Deadlock { blocked, ticks })
                if state.inspect(|s| s.phase == Phase::Done) =>
            {
                warn!("elevator stopped with {} persons waiting", blocked.len());
                ticks
            }
            Err(err) => return Err(err.into()),
        };

        Ok(state.inspect(|s| {
            let stranded = (0..s.outstanding + s.delivered.len())
                .filter(|id| !s.delivered.contains(id))
                .collect();
            ElevatorReport {
                events: s.events.clone(),
                delivered: s.delivered.clone(),
                stranded,
                max_occupied: s.max_occupied,
                final_floor: s.current.map(|floor| floor + 1),
                ticks,
            }
        }))
    }
}

fn run_elevator(state: &Monitor<ElevatorState>, config: &ElevatorConfig) {
    loop {
        {
            let mut elevator = state.lock();
            thread::delay(config.move_ticks);
            elevator.advance();
        }
        // Give the passengers a chance to notice the new floor.
        thread::yield_now();

        state.lock().turn_around();

        {
            let mut elevator = state.lock();
            elevator.phase = Phase::DoorsOpenDisembark;
            elevator.broadcast();
            elevator.wait_while(|s| s.here().is_some_and(|floor| floor.getting_off > 0));
        }

        let mut elevator = state.lock();
        elevator.phase = Phase::DoorsOpenBoard;
        elevator.broadcast();
        elevator.wait_while(|s| {
            !s.is_full() && s.here().is_some_and(|floor| floor.getting_on > 0)
        });

        if elevator.is_done(config.policy) {
            elevator.park();
            info!(
                "elevator parked at floor {} after delivering {} persons",
                elevator.top() + 1,
                elevator.delivered.len()
            );
            return;
        }
    }
}

fn run_person(state: &Monitor<ElevatorState>, person: Person) {
    state.lock().arrive(&person);

    let mut elevator = state.lock();
    elevator.wait_while(|s| !s.is_at(person.origin) || s.is_full());
    elevator.board(&person);
    elevator.broadcast();

    elevator.wait_while(|s| !s.is_at(person.destination));
    elevator.alight(&person);
    elevator.broadcast();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_parsing() {
        assert_eq!("3:25".parse::<Request>().unwrap(), Request::new(3, 25));
        assert_eq!(" 1 : 7 ".parse::<Request>().unwrap(), Request::new(1, 7));
        assert!(matches!(
            "3-25".parse::<Request>(),
            Err(RuntimeError::InvalidRequest(_))
        ));
        assert!("a:2".parse::<Request>().is_err());
    }

    #[test]
    fn test_default_requests_fit_the_default_building() {
        let requests = default_requests();
        assert_eq!(requests.len(), 26);
        assert_eq!(requests[0], Request::new(3, 25));
        let simulation = ElevatorSimulation::new(ElevatorConfig::default(), &requests).unwrap();
        assert_eq!(simulation.persons().len(), 26);
        assert_eq!(
            simulation.persons()[0],
            Person {
                id: 0,
                origin: 2,
                destination: 24
            }
        );
    }

    #[test]
    fn test_rejects_invalid_buildings() {
        let single_floor = ElevatorConfig {
            floors: 1,
            ..ElevatorConfig::default()
        };
        assert!(matches!(
            ElevatorSimulation::new(single_floor, &[]),
            Err(RuntimeError::InvalidConfig(_))
        ));

        let no_room = ElevatorConfig {
            capacity: 0,
            ..ElevatorConfig::default()
        };
        assert!(ElevatorSimulation::new(no_room, &[]).is_err());

        let config = ElevatorConfig {
            floors: 5,
            ..ElevatorConfig::default()
        };
        assert!(matches!(
            ElevatorSimulation::new(config.clone(), &[Request::new(0, 3)]),
            Err(RuntimeError::FloorOutOfRange { from: 0, .. })
        ));
        assert!(ElevatorSimulation::new(config, &[Request::new(2, 6)]).is_err());
    }
}
