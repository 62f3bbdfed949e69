use tandem_kernel::KernelConfig;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn seeded(timer_interval: u64, seed: u64) -> KernelConfig {
    KernelConfig {
        timer_interval: Some(timer_interval),
        random_seed: Some(seed),
    }
}
