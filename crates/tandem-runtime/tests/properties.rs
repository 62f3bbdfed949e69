mod common;

use common::{init_logger, seeded};
use proptest::prelude::*;
use tandem_kernel::Kernel;
use tandem_runtime::elevator::ElevatorEvent;
use tandem_runtime::{ElevatorConfig, ElevatorSimulation, Request, TerminationPolicy};

fn crowd(floors: usize) -> impl Strategy<Value = Vec<Request>> {
    prop::collection::vec((1..=floors, 1..=floors), 1..7)
        .prop_map(|trips| trips.into_iter().map(|(from, to)| Request::new(from, to)).collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Under random preemption the elevator never carries more than its
    /// capacity and, when draining, delivers every person exactly once.
    #[test]
    fn elevator_respects_capacity(
        (floors, requests) in (2usize..6).prop_flat_map(|floors| (Just(floors), crowd(floors))),
        capacity in 1usize..4,
        seed in any::<u64>(),
    ) {
        init_logger();
        let config = ElevatorConfig {
            floors,
            capacity,
            move_ticks: 5,
            policy: TerminationPolicy::DrainAllRequests,
        };
        let report = ElevatorSimulation::new(config, &requests)
            .unwrap()
            .run(Kernel::new(seeded(6, seed)))
            .unwrap();

        prop_assert!(report.max_occupied <= capacity);
        prop_assert!(report.stranded.is_empty());
        let mut delivered = report.delivered.clone();
        delivered.sort_unstable();
        prop_assert_eq!(delivered, (0..requests.len()).collect::<Vec<_>>());

        let boarded = report
            .events
            .iter()
            .filter(|e| matches!(e, ElevatorEvent::Boarded { .. }))
            .count();
        prop_assert_eq!(boarded, requests.len());
        prop_assert_eq!(report.final_floor, Some(floors));
    }
}
