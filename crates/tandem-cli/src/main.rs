use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::warn;
use tandem_kernel::KernelConfig;
use tandem_runtime::elevator::default_requests;
use tandem_runtime::{
    CounterConfig, CounterReport, CounterTest, ElevatorConfig, ElevatorReport, ElevatorSimulation,
    Guard, Report, Request, Runtime, TerminationPolicy, Workload,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Preempt the running thread every this many ticks
    #[arg(long, global = true)]
    timer: Option<u64>,

    /// Preempt at random intervals derived from this seed
    #[arg(long = "rs", global = true)]
    random_seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a numbered thread test
    Threads {
        /// Test number
        #[arg(short = 'q', default_value_t = 1)]
        test: u32,

        /// Number of worker threads
        #[arg(long, default_value_t = 4)]
        threads: usize,

        /// Increments per worker
        #[arg(long, default_value_t = 5)]
        iterations: usize,

        /// Primitive guarding the shared counter
        #[arg(long, value_enum, default_value_t = GuardArg::Semaphore)]
        guard: GuardArg,
    },
    /// Run the elevator simulation
    Elevator {
        /// Number of floors
        #[arg(long, default_value_t = 30)]
        floors: usize,

        /// Persons the elevator can carry at once
        #[arg(long, default_value_t = 5)]
        capacity: usize,

        /// A trip as FROM:TO; repeat for several persons
        #[arg(long = "request", value_name = "FROM:TO")]
        requests: Vec<String>,

        /// Keep running until every request is delivered
        #[arg(long)]
        drain: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum GuardArg {
    None,
    Semaphore,
    Lock,
}

impl From<GuardArg> for Guard {
    fn from(arg: GuardArg) -> Self {
        match arg {
            GuardArg::None => Guard::None,
            GuardArg::Semaphore => Guard::Semaphore,
            GuardArg::Lock => Guard::Lock,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let runtime = Runtime::new(KernelConfig {
        timer_interval: cli.timer,
        random_seed: cli.random_seed,
    });

    let workload = match cli.command {
        Commands::Threads {
            test,
            threads,
            iterations,
            guard,
        } => {
            if test != 1 {
                println!("No test specified.");
                return Ok(());
            }
            Workload::Counter(CounterTest::new(CounterConfig {
                threads,
                iterations,
                guard: guard.into(),
            })?)
        }
        Commands::Elevator {
            floors,
            capacity,
            requests,
            drain,
        } => {
            let requests = if requests.is_empty() {
                default_requests()
            } else {
                requests
                    .iter()
                    .map(|request| request.parse::<Request>())
                    .collect::<Result<Vec<_>, _>>()?
            };
            let config = ElevatorConfig {
                floors,
                capacity,
                policy: if drain {
                    TerminationPolicy::DrainAllRequests
                } else {
                    TerminationPolicy::ReturnToTopEmpty
                },
                ..ElevatorConfig::default()
            };
            Workload::Elevator(ElevatorSimulation::new(config, &requests)?)
        }
    };

    match runtime.run(workload).context("simulation failed")? {
        Report::Counter(report) => print_counter(&report),
        Report::Elevator(report) => print_elevator(&report),
    }

    Ok(())
}

fn print_counter(report: &CounterReport) {
    for observation in &report.observations {
        println!(
            "*** thread {} sees value {}",
            observation.worker, observation.value
        );
    }
    for observation in &report.finals {
        println!(
            "Thread {} sees final value {}",
            observation.worker, observation.value
        );
    }
    println!(
        "Counter finished at {} of {} after {} ticks.",
        report.final_value, report.expected, report.ticks
    );
    if report.lost_updates() > 0 {
        warn!("{} updates were lost", report.lost_updates());
    }
}

fn print_elevator(report: &ElevatorReport) {
    for event in &report.events {
        println!("{event}");
    }
    println!(
        "Delivered {} persons in {} ticks, at most {} on board.",
        report.delivered.len(),
        report.ticks,
        report.max_occupied
    );
    if !report.stranded.is_empty() {
        println!("Still waiting: {:?}", report.stranded);
    }
}
