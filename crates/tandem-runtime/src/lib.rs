//! Workloads that exercise the Tandem kernel's synchronization primitives.

pub mod counter;
pub mod elevator;
pub mod error;

pub use counter::{CounterConfig, CounterReport, CounterTest, Guard};
pub use elevator::{ElevatorConfig, ElevatorReport, ElevatorSimulation, Request, TerminationPolicy};
pub use error::RuntimeError;

use log::info;
use tandem_kernel::{Kernel, KernelConfig};

pub enum Workload {
    Counter(CounterTest),
    Elevator(ElevatorSimulation),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Counter(CounterReport),
    Elevator(ElevatorReport),
}

pub struct Runtime {
    config: KernelConfig,
}

impl Runtime {
    pub fn new(config: KernelConfig) -> Self {
        Self { config }
    }

    /// Runs `workload` on a fresh kernel.
    pub fn run(&self, workload: Workload) -> Result<Report, RuntimeError> {
        let kernel = Kernel::new(self.config.clone());
        match workload {
            Workload::Counter(test) => {
                info!(
                    "running counter test: {} threads, {} iterations, {:?} guard",
                    test.config().threads,
                    test.config().iterations,
                    test.config().guard
                );
                test.run(kernel).map(Report::Counter)
            }
            Workload::Elevator(simulation) => {
                info!(
                    "running elevator: {} floors, capacity {}, {} persons",
                    simulation.config().floors,
                    simulation.config().capacity,
                    simulation.persons().len()
                );
                simulation.run(kernel).map(Report::Elevator)
            }
        }
    }
}
