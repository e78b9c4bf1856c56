use std::io;

use thiserror::Error;

/// Failures of a load run. Bad parameters are never one of them: they are
/// clamped instead.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to spawn load worker {worker}: {source}")]
    Spawn {
        worker: usize,
        #[source]
        source: io::Error,
    },

    #[error("{count} load worker(s) panicked")]
    WorkerPanicked { count: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LoadError::Spawn {
            worker: 3,
            source: io::Error::new(io::ErrorKind::Other, "no threads left"),
        };
        assert_eq!(
            err.to_string(),
            "failed to spawn load worker 3: no threads left"
        );

        let err = LoadError::WorkerPanicked { count: 2 };
        assert_eq!(err.to_string(), "2 load worker(s) panicked");
    }
}
