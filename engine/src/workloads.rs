//! Fixed-size CPU kernels: cost scales with one clamped query parameter.

use actix_web::{web, HttpResponse};
use cpu_burn::workloads::{
    self, SizeBound, Timed, FIBONACCI_N, HASH_ROUNDS, MATRIX_SIZE, PI_ITERATIONS, PRIME_LIMIT,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;

type QueryPairs = web::Query<Vec<(String, String)>>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WorkloadResponse {
    workload: &'static str,
    parameter: u64,
    result: Value,
    elapsed_seconds: f64,
}

fn param(query: &[(String, String)], key: &str, bound: &SizeBound) -> u64 {
    let raw = query
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str());
    bound.clamp_raw(raw)
}

/// Run `work` on the blocking pool and wrap its timed output.
async fn run<F>(workload: &'static str, parameter: u64, work: F) -> Result<HttpResponse, ApiError>
where
    F: FnOnce(u64) -> Value + Send + 'static,
{
    info!(workload, parameter, "starting workload");
    let Timed { value, elapsed } = web::block(move || workloads::timed(|| work(parameter))).await?;
    info!(workload, elapsed_secs = elapsed.as_secs_f64(), "workload completed");

    Ok(HttpResponse::Ok().json(WorkloadResponse {
        workload,
        parameter,
        result: value,
        elapsed_seconds: elapsed.as_secs_f64(),
    }))
}

async fn pi(query: QueryPairs) -> Result<HttpResponse, ApiError> {
    let iterations = param(&query, "iterations", &PI_ITERATIONS);
    run("pi", iterations, |n| json!({ "pi": workloads::leibniz_pi(n) })).await
}

async fn primes(query: QueryPairs) -> Result<HttpResponse, ApiError> {
    let limit = param(&query, "limit", &PRIME_LIMIT);
    run("primes", limit, |n| {
        let primes = workloads::primes_up_to(n);
        let tail = primes.len().saturating_sub(10);
        json!({
            "count": primes.len(),
            "largest": primes.last(),
            "first10": &primes[..primes.len().min(10)],
            "last10": &primes[tail..],
        })
    })
    .await
}

async fn hash_storm(query: QueryPairs) -> Result<HttpResponse, ApiError> {
    let rounds = param(&query, "rounds", &HASH_ROUNDS);
    run("hash-storm", rounds, |n| json!({ "finalHash": workloads::hash_chain(n) })).await
}

async fn fibonacci(query: QueryPairs) -> Result<HttpResponse, ApiError> {
    let n = param(&query, "n", &FIBONACCI_N);
    run("fibonacci", n, |n| json!({ "value": workloads::fibonacci(n) })).await
}

async fn matrix(query: QueryPairs) -> Result<HttpResponse, ApiError> {
    let size = param(&query, "size", &MATRIX_SIZE);
    run("matrix", size, |n| {
        json!({
            "size": format!("{n}x{n}"),
            "sampleValue": workloads::matrix_multiply(n as usize),
        })
    })
    .await
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/pi", web::get().to(pi))
        .route("/primes", web::get().to(primes))
        .route("/hash-storm", web::get().to(hash_storm))
        .route("/fibonacci", web::get().to(fibonacci))
        .route("/matrix", web::get().to(matrix));
}
