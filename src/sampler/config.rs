use fugit::{HertzU32, MicrosDurationU32};

/// Nominal acquisition rate.
pub const DEFAULT_SAMPLE_RATE: HertzU32 = HertzU32::from_raw(12_000);

/// Initial sample buffer capacity, in samples.
pub const DEFAULT_INITIAL_CAPACITY: usize = 32_768;

/// Default growth ceiling for the sample buffer, in samples.
///
/// Requested counts are bounded by the command protocol to `u16::MAX`,
/// so one 3/2 growth step past that can never need more than this.
pub const DEFAULT_MAX_CAPACITY: usize = 131_072;

/// # Sampler configuration builder
///
/// Collects the knobs that must be fixed before a pipeline is built: the
/// alarm rate the controller arms on `start`, and the sizing policy of
/// the sample buffer. Buffer capacity only ever changes between runs, so
/// these are construction-time decisions.
#[derive(Debug, Copy, Clone)]
pub struct Config {
    /// Rate passed to [`SampleAlarm::arm`](super::SampleAlarm::arm) on
    /// every run start. Must be nonzero.
    pub sample_rate: HertzU32,
    /// Capacity allocated up front, in samples.
    pub initial_capacity: usize,
    /// Hard ceiling the buffer will never grow past, in samples.
    pub max_capacity: usize,
}

impl Config {
    /// The defaults: 12 kHz, 32768 samples up front, ceiling at 131072.
    pub fn new() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_capacity: DEFAULT_MAX_CAPACITY,
        }
    }

    /// Sets the acquisition rate the alarm is armed with.
    pub fn sample_rate(mut self, rate: HertzU32) -> Self {
        self.sample_rate = rate;
        self
    }

    /// Sets the buffer capacity allocated up front.
    pub fn initial_capacity(mut self, samples: usize) -> Self {
        self.initial_capacity = samples;
        self
    }

    /// Sets the capacity ceiling the buffer may grow to.
    pub fn max_capacity(mut self, samples: usize) -> Self {
        self.max_capacity = samples;
        self
    }

    /// The alarm period equivalent to the configured rate, rounded down
    /// to whole microseconds. Convenience for platforms that arm timers
    /// by interval rather than frequency.
    pub fn alarm_interval(&self) -> MicrosDurationU32 {
        self.sample_rate.into_duration()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
