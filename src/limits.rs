use std::time::Duration;

pub const MIN_DURATION_SECS: u64 = 1;
pub const DEFAULT_DURATION_SECS: u64 = 10;
pub const MAX_DURATION_SECS: u64 = 300;

pub const MIN_CONCURRENCY: usize = 1;
pub const MAX_CONCURRENCY: usize = 16;

/// Bounds that every [`LoadRequest`] is forced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadLimits {
    max_duration_secs: u64,
    max_concurrency: usize,
    default_concurrency: usize,
}

impl Default for LoadLimits {
    fn default() -> Self {
        Self::new(MAX_DURATION_SECS, MAX_CONCURRENCY)
    }
}

impl LoadLimits {
    /// Upper bounds below the minimums are raised to the minimums.
    /// Concurrency defaults to the number of logical cores.
    pub fn new(max_duration_secs: u64, max_concurrency: usize) -> Self {
        Self {
            max_duration_secs: max_duration_secs.max(MIN_DURATION_SECS),
            max_concurrency: max_concurrency.max(MIN_CONCURRENCY),
            default_concurrency: num_cpus::get(),
        }
    }

    pub fn with_default_concurrency(mut self, workers: usize) -> Self {
        self.default_concurrency = workers;
        self
    }

    pub fn max_duration_secs(&self) -> u64 {
        self.max_duration_secs
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Coerce optional caller values into range. Absent values take their
    /// defaults, out-of-range values take the nearest bound.
    pub fn clamp(&self, duration_secs: Option<i64>, concurrency: Option<i64>) -> LoadRequest {
        let duration_secs = match duration_secs {
            Some(secs) => clamp_to(secs, MIN_DURATION_SECS, self.max_duration_secs),
            None => DEFAULT_DURATION_SECS.clamp(MIN_DURATION_SECS, self.max_duration_secs),
        };
        let concurrency = match concurrency {
            Some(workers) => {
                clamp_to(workers, MIN_CONCURRENCY as u64, self.max_concurrency as u64) as usize
            }
            None => self
                .default_concurrency
                .clamp(MIN_CONCURRENCY, self.max_concurrency),
        };

        LoadRequest {
            duration_secs,
            concurrency,
        }
    }

    /// Same as [`LoadLimits::clamp`] for raw query or argv strings.
    pub fn clamp_raw(&self, duration_secs: Option<&str>, concurrency: Option<&str>) -> LoadRequest {
        self.clamp(
            duration_secs.and_then(parse_lenient),
            concurrency.and_then(parse_lenient),
        )
    }
}

pub(crate) fn clamp_to(value: i64, min: u64, max: u64) -> u64 {
    if value <= 0 {
        min
    } else {
        (value as u64).clamp(min, max)
    }
}

/// Integers parse as-is, finite decimals truncate toward zero, anything else
/// is treated as missing.
pub fn parse_lenient(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }
    match raw.parse::<f64>() {
        // `as` saturates at the i64 bounds
        Ok(value) if value.is_finite() => Some(value.trunc() as i64),
        _ => None,
    }
}

/// A clamped load request. Only [`LoadLimits`] can build one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadRequest {
    duration_secs: u64,
    concurrency: usize,
}

impl LoadRequest {
    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }
}
