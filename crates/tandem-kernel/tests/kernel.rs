mod common;

use common::{expect_deadlock, expect_panic, init_logger, Trace};
use tandem_kernel::interrupt::{self, AtomicitySection, IntLevel};
use tandem_kernel::{thread, Kernel, KernelConfig};

fn two_workers(config: KernelConfig, rounds: usize, work: u64) -> Vec<String> {
    let kernel = Kernel::new(config);
    let trace = Trace::default();
    for name in ["a", "b"] {
        let trace = trace.clone();
        kernel
            .fork(name, move || {
                for _ in 0..rounds {
                    thread::delay(work);
                    trace.push(name);
                }
            })
            .unwrap();
    }
    kernel.run().unwrap();
    trace.entries()
}

#[test]
fn empty_kernel_halts_immediately() {
    init_logger();
    let summary = Kernel::default().run().unwrap();
    assert_eq!(summary.threads, 0);
    assert_eq!(summary.ticks, 0);
}

#[test]
fn yields_rotate_threads_in_fork_order() {
    init_logger();
    let kernel = Kernel::default();
    let trace = Trace::default();

    for name in ["a", "b", "c"] {
        let trace = trace.clone();
        kernel
            .fork(name, move || {
                for round in 0..2 {
                    trace.push(format!("{name}{round}"));
                    thread::yield_now();
                }
            })
            .unwrap();
    }

    let summary = kernel.run().unwrap();
    assert_eq!(summary.threads, 3);
    assert_eq!(trace.entries(), ["a0", "b0", "c0", "a1", "b1", "c1"]);
}

#[test]
fn threads_can_fork_threads() {
    init_logger();
    let kernel = Kernel::default();
    let trace = Trace::default();

    let parent_trace = trace.clone();
    kernel
        .fork("parent", move || {
            let child_trace = parent_trace.clone();
            let child = thread::fork("child", move || child_trace.push("child")).unwrap();
            assert_ne!(child, thread::current());
            parent_trace.push("parent before yield");
            thread::yield_now();
            parent_trace.push("parent after yield");
        })
        .unwrap();

    kernel.run().unwrap();
    assert_eq!(
        trace.entries(),
        ["parent before yield", "child", "parent after yield"]
    );
}

#[test]
fn nested_sections_restore_the_outer_level() {
    init_logger();
    let kernel = Kernel::default();
    let trace = Trace::default();

    let observed = trace.clone();
    kernel
        .fork("nesting", move || {
            observed.push(format!("{:?}", interrupt::level()));
            let outer = AtomicitySection::enter();
            assert_eq!(outer.previous(), IntLevel::On);
            {
                let inner = AtomicitySection::enter();
                assert_eq!(inner.previous(), IntLevel::Off);
                observed.push(format!("{:?}", interrupt::level()));
            }
            // Leaving the inner section must not re-enable preemption.
            observed.push(format!("{:?}", interrupt::level()));
            outer.exit();
            observed.push(format!("{:?}", interrupt::level()));
        })
        .unwrap();

    kernel.run().unwrap();
    assert_eq!(trace.entries(), ["On", "Off", "Off", "On"]);
}

#[test]
fn delay_advances_simulated_time() {
    init_logger();
    let kernel = Kernel::default();
    let trace = Trace::default();

    let observed = trace.clone();
    kernel
        .fork("worker", move || {
            let start = thread::now();
            thread::delay(50);
            observed.push(thread::now().duration_since(start).to_string());
        })
        .unwrap();

    let summary = kernel.run().unwrap();
    assert_eq!(trace.entries(), ["50"]);
    assert!(summary.ticks >= 50);
}

#[test]
fn without_timer_threads_run_to_completion() {
    init_logger();
    let trace = two_workers(KernelConfig::default(), 5, 10);
    assert_eq!(trace, ["a", "a", "a", "a", "a", "b", "b", "b", "b", "b"]);
}

#[test]
fn timer_preempts_long_running_threads() {
    init_logger();
    let config = KernelConfig {
        timer_interval: Some(10),
        random_seed: None,
    };
    let trace = two_workers(config, 5, 10);
    assert_eq!(trace.len(), 10);
    assert!(trace[..5].iter().any(|name| name == "b"), "{trace:?}");
}

#[test]
fn seeded_timer_runs_are_reproducible() {
    init_logger();
    let config = KernelConfig {
        timer_interval: Some(7),
        random_seed: Some(42),
    };
    let first = two_workers(config.clone(), 20, 3);
    let second = two_workers(config, 20, 3);
    assert_eq!(first, second);
    assert_eq!(first.iter().filter(|name| *name == "a").count(), 20);
}

#[test]
fn largest_timer_interval_is_accepted() {
    init_logger();
    let config = KernelConfig {
        timer_interval: Some(u64::MAX),
        random_seed: Some(1),
    };
    let trace = two_workers(config, 2, 5);
    assert_eq!(trace, ["a", "a", "b", "b"]);
}

#[test]
fn sleeping_forever_is_a_deadlock() {
    init_logger();
    let kernel = Kernel::default();
    kernel
        .fork("sleeper", || {
            let _section = AtomicitySection::enter();
            thread::sleep();
        })
        .unwrap();
    kernel.fork("bystander", thread::yield_now).unwrap();

    assert_eq!(expect_deadlock(kernel.run()), ["sleeper #1"]);
}

#[test]
fn sleeping_with_preemption_enabled_is_fatal() {
    init_logger();
    let kernel = Kernel::default();
    kernel.fork("careless", thread::sleep).unwrap();

    let (thread, message) = expect_panic(kernel.run());
    assert_eq!(thread, "careless #1");
    assert!(message.contains("preemption enabled"), "{message}");
}

#[test]
fn thread_panics_halt_the_kernel() {
    init_logger();
    let kernel = Kernel::default();
    kernel.fork("faulty", || panic!("boom")).unwrap();

    let (_, message) = expect_panic(kernel.run());
    assert_eq!(message, "boom");
}

#[test]
#[should_panic(expected = "outside of a kernel thread")]
fn kernel_calls_need_a_kernel_thread() {
    thread::yield_now();
}
