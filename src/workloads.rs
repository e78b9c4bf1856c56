use std::hint::black_box;
use std::time::{Duration, Instant};

use rand::Rng;
use ring::digest::{digest, SHA256};

use crate::limits::{clamp_to, parse_lenient};

const HASH_SEED: &[u8] = b"cpu-chaos-lab-seed";

/// Range and default for the single size parameter of a workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeBound {
    pub min: u64,
    pub default: u64,
    pub max: u64,
}

impl SizeBound {
    /// Unparseable input takes the default, anything else is clamped.
    pub fn clamp_raw(&self, raw: Option<&str>) -> u64 {
        match raw.and_then(parse_lenient) {
            Some(value) => clamp_to(value, self.min, self.max),
            None => self.default,
        }
    }
}

pub const PI_ITERATIONS: SizeBound = SizeBound { min: 1, default: 1_000_000, max: 100_000_000 };
pub const PRIME_LIMIT: SizeBound = SizeBound { min: 2, default: 100_000, max: 1_000_000 };
pub const HASH_ROUNDS: SizeBound = SizeBound { min: 1, default: 1_000_000, max: 20_000_000 };
pub const FIBONACCI_N: SizeBound = SizeBound { min: 0, default: 35, max: 42 };
pub const MATRIX_SIZE: SizeBound = SizeBound { min: 1, default: 200, max: 500 };

#[derive(Debug, Clone, PartialEq)]
pub struct Timed<T> {
    pub value: T,
    pub elapsed: Duration,
}

pub fn timed<T>(work: impl FnOnce() -> T) -> Timed<T> {
    let started = Instant::now();
    let value = work();
    Timed {
        value,
        elapsed: started.elapsed(),
    }
}

/// Pi from the first `iterations` terms of the Leibniz series.
pub fn leibniz_pi(iterations: u64) -> f64 {
    let mut sum = 0.0f64;
    for i in 0..black_box(iterations) {
        let term = 1.0 / (2 * i + 1) as f64;
        if i % 2 == 0 {
            sum += term;
        } else {
            sum -= term;
        }
    }
    4.0 * sum
}

/// Every prime in `2..=limit`, by plain trial division.
pub fn primes_up_to(limit: u64) -> Vec<u64> {
    (2..=black_box(limit))
        .filter(|&n| (2..).take_while(|d| d * d <= n).all(|d| n % d != 0))
        .collect()
}

/// Feed a seed through SHA-256 `rounds` times, then hash once more and
/// return the lowercase hex digest.
pub fn hash_chain(rounds: u64) -> String {
    let mut data = HASH_SEED.to_vec();
    for _ in 0..black_box(rounds) {
        data = digest(&SHA256, &data).as_ref().to_vec();
    }
    digest(&SHA256, &data)
        .as_ref()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Naive doubly recursive Fibonacci.
pub fn fibonacci(n: u64) -> u64 {
    if n <= 1 {
        return n;
    }
    fibonacci(black_box(n - 1)) + fibonacci(black_box(n - 2))
}

/// Multiply two random `size`×`size` matrices with the textbook triple loop
/// and return the top-left cell of the product.
pub fn matrix_multiply(size: usize) -> f64 {
    let mut rng = rand::rng();
    let a: Vec<f64> = (0..size * size).map(|_| rng.random()).collect();
    let b: Vec<f64> = (0..size * size).map(|_| rng.random()).collect();
    let mut c = vec![0.0f64; size * size];

    for i in 0..size {
        for j in 0..size {
            let mut sum = 0.0;
            for k in 0..size {
                sum += a[i * size + k] * b[k * size + j];
            }
            c[i * size + j] = sum;
        }
    }

    black_box(&c);
    c.first().copied().unwrap_or_default()
}
