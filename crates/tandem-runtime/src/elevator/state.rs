//! Shared elevator state. Every mutation happens while the elevator monitor
//! is held; floors are indexed from 0 here and printed from 1.

use log::info;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    /// The elevator stopped for good.
    Idle,
}

/// What the elevator thread is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    MovingUp,
    MovingDown,
    DoorsOpenDisembark,
    DoorsOpenBoard,
    Done,
}

/// When the elevator may stop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TerminationPolicy {
    /// Stop once empty on the top floor, even if people are still waiting.
    #[default]
    ReturnToTopEmpty,
    /// Additionally require every request to be delivered.
    DrainAllRequests,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Person {
    pub id: usize,
    pub origin: usize,
    pub destination: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Floor {
    pub getting_on: usize,
    pub getting_off: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElevatorEvent {
    Arrived { floor: usize },
    Requested { person: usize, from: usize, to: usize },
    Boarded { person: usize, floor: usize },
    Exited { person: usize, floor: usize },
}

impl fmt::Display for ElevatorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElevatorEvent::Arrived { floor } => write!(f, "Elevator arrives at floor {floor}."),
            ElevatorEvent::Requested { person, from, to } => {
                write!(f, "Person {person} wants to go to floor {to} from floor {from}.")
            }
            ElevatorEvent::Boarded { person, .. } => {
                write!(f, "Person {person} got into the elevator.")
            }
            ElevatorEvent::Exited { person, .. } => {
                write!(f, "Person {person} got out of the elevator.")
            }
        }
    }
}

#[derive(Debug)]
pub struct ElevatorState {
    pub floors: Vec<Floor>,
    /// `None` until the elevator first reaches a floor.
    pub current: Option<usize>,
    pub direction: Direction,
    pub phase: Phase,
    pub occupied: usize,
    pub capacity: usize,
    pub max_occupied: usize,
    /// Persons not yet delivered.
    pub outstanding: usize,
    pub delivered: Vec<usize>,
    pub events: Vec<ElevatorEvent>,
}

impl ElevatorState {
    pub fn new(floors: usize, capacity: usize, persons: usize) -> Self {
        Self {
            floors: vec![Floor::default(); floors],
            current: None,
            direction: Direction::Up,
            phase: Phase::MovingUp,
            occupied: 0,
            capacity,
            max_occupied: 0,
            outstanding: persons,
            delivered: Vec::with_capacity(persons),
            events: Vec::new(),
        }
    }

    pub fn top(&self) -> usize {
        self.floors.len() - 1
    }

    pub fn is_at(&self, floor: usize) -> bool {
        self.current == Some(floor)
    }

    pub fn is_full(&self) -> bool {
        self.occupied >= self.capacity
    }

    pub fn here(&self) -> Option<&Floor> {
        self.current.and_then(|floor| self.floors.get(floor))
    }

    /// Moves one floor in the current direction and returns the new floor.
    pub fn advance(&mut self) -> usize {
        self.phase = match self.direction {
            Direction::Down => Phase::MovingDown,
            _ => Phase::MovingUp,
        };
        let next = match (self.current, self.direction) {
            (None, _) => 0,
            (Some(floor), Direction::Up) => (floor + 1).min(self.top()),
            (Some(floor), Direction::Down) => floor.saturating_sub(1),
            (Some(floor), Direction::Idle) => floor,
        };
        self.current = Some(next);
        self.record(ElevatorEvent::Arrived { floor: next + 1 });
        next
    }

    /// Reverses at either end of the shaft.
    pub fn turn_around(&mut self) {
        match self.current {
            Some(floor) if floor == self.top() => self.direction = Direction::Down,
            Some(0) => self.direction = Direction::Up,
            _ => {}
        }
    }

    pub fn arrive(&mut self, person: &Person) {
        self.floors[person.origin].getting_on += 1;
        self.record(ElevatorEvent::Requested {
            person: person.id,
            from: person.origin + 1,
            to: person.destination + 1,
        });
    }

    pub fn board(&mut self, person: &Person) {
        debug_assert!(!self.is_full(), "elevator overbooked");
        self.floors[person.destination].getting_off += 1;
        self.floors[person.origin].getting_on -= 1;
        self.occupied += 1;
        self.max_occupied = self.max_occupied.max(self.occupied);
        self.record(ElevatorEvent::Boarded {
            person: person.id,
            floor: person.origin + 1,
        });
    }

    pub fn alight(&mut self, person: &Person) {
        self.occupied -= 1;
        self.floors[person.destination].getting_off -= 1;
        self.outstanding -= 1;
        self.delivered.push(person.id);
        self.record(ElevatorEvent::Exited {
            person: person.id,
            floor: person.destination + 1,
        });
    }

    /// Stops the elevator for good.
    pub fn park(&mut self) {
        self.direction = Direction::Idle;
        self.phase = Phase::Done;
    }

    pub fn is_done(&self, policy: TerminationPolicy) -> bool {
        let parked = self.occupied == 0 && self.is_at(self.top());
        match policy {
            TerminationPolicy::ReturnToTopEmpty => parked,
            TerminationPolicy::DrainAllRequests => parked && self.outstanding == 0,
        }
    }

    fn record(&mut self, event: ElevatorEvent) {
        info!("{event}");
        self.events.push(event);
    }
}
