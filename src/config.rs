use std::time::Duration;

const INSTRUCTION_INTERVAL: Duration = Duration::from_millis(2);
const TIMER_INTERVAL: Duration = Duration::from_micros(16667);

/// Which registers `LD [I], Vx` and `LD Vx, [I]` transfer.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum BulkTransfer {
    /// Always V0 through VF, whatever x is encoded.
    AllRegisters,
    /// V0 through Vx inclusive.
    ThroughX,
}

impl Default for BulkTransfer {
    fn default() -> Self {
        BulkTransfer::AllRegisters
    }
}

/// Behaviours that differ between interpreters.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub struct Quirks {
    pub bulk_transfer: BulkTransfer,
}

/// Runtime settings of a virtual machine.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Config {
    /// Pause between two instructions while running. Zero runs unpaced.
    pub instruction_interval: Duration,
    /// Period of the delay and sound timers.
    pub timer_interval: Duration,
    pub quirks: Quirks,
    /// Seed for the random byte source, `None` seeds from entropy.
    pub rng_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            instruction_interval: INSTRUCTION_INTERVAL,
            timer_interval: TIMER_INTERVAL,
            quirks: Quirks::default(),
            rng_seed: None,
        }
    }
}

impl Config {
    pub fn with_instruction_interval(mut self, interval: Duration) -> Self {
        self.instruction_interval = interval;
        self
    }

    /// Sets the instruction pacing from a frequency in Hz. Zero runs unpaced.
    pub fn with_instruction_hz(self, hz: u32) -> Self {
        let interval = if hz == 0 {
            Duration::from_secs(0)
        } else {
            Duration::from_nanos(1_000_000_000 / hz as u64)
        };
        self.with_instruction_interval(interval)
    }

    pub fn with_timer_interval(mut self, interval: Duration) -> Self {
        self.timer_interval = interval;
        self
    }

    pub fn with_bulk_transfer(mut self, bulk_transfer: BulkTransfer) -> Self {
        self.quirks.bulk_transfer = bulk_transfer;
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}
