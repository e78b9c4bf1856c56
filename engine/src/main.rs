use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use chrono::{DateTime, Utc};
use clap::Parser;
use cpu_burn::{LoadGenerator, LoadLimits, LoadRequest, LoadResult};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

mod config;
mod error;
mod sys_info;
mod telemetry;
mod thread_manager;
mod workloads;

use config::Config;
use error::ApiError;
use thread_manager::{RunningTask, TaskRegistry};

pub struct AppState {
    generator: LoadGenerator,
    limits: LoadLimits,
    tasks: TaskRegistry,
}

impl AppState {
    pub fn new(limits: LoadLimits) -> Self {
        Self {
            generator: LoadGenerator::new(),
            limits,
            tasks: TaskRegistry::default(),
        }
    }

    fn clamp_params(&self, params: &[(String, String)]) -> LoadRequest {
        self.limits.clamp_raw(
            first_value(params, DURATION_KEYS),
            first_value(params, INTENSITY_KEYS),
        )
    }

    fn warn_if_overlapping(&self) {
        let active = self.generator.gauge().active();
        if active > 0 {
            warn!(active_workers = active, "load already running, new run is not throttled");
        }
    }
}

/// Raw query pairs. Repeated keys and aliases never reject a request: the
/// first matching pair wins.
type QueryPairs = web::Query<Vec<(String, String)>>;

const DURATION_KEYS: &[&str] = &["duration", "seconds"];
const INTENSITY_KEYS: &[&str] = &["intensity", "threads", "workers"];

fn first_value<'a>(params: &'a [(String, String)], keys: &[&str]) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| keys.contains(&key.as_str()))
        .map(|(_, value)| value.as_str())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StressResponse {
    success: bool,
    message: String,
    worker_count: usize,
    requested_duration_seconds: u64,
    actual_elapsed_seconds: f64,
    completed_at: DateTime<Utc>,
    total_iterations: u64,
}

impl From<&LoadResult> for StressResponse {
    fn from(result: &LoadResult) -> Self {
        Self {
            success: true,
            message: result.summary(),
            worker_count: result.worker_count,
            requested_duration_seconds: result.requested_duration_secs,
            actual_elapsed_seconds: result.actual_elapsed.as_secs_f64(),
            completed_at: result.completed_at,
            total_iterations: result.total_iterations,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartResponse {
    id: String,
    status: &'static str,
    worker_count: usize,
    requested_duration_seconds: u64,
    message: String,
}

async fn index(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "running",
        "endpoints": [
            "GET  /                          - this info page",
            "GET  /health                    - health check",
            "GET  /info                      - environment info",
            "GET  /api/cpu-stress?duration=10&intensity=4 - burn CPU and wait for completion",
            "GET  /cpu?seconds=10            - same as /api/cpu-stress",
            "GET  /stress?threads=4&duration=30 - same as /api/cpu-stress",
            "POST /api/cpu-stress/start?duration=10&intensity=4 - burn CPU in the background",
            "GET  /api/tasks                 - list background runs",
            "POST /api/stop/{id}             - stop one background run",
            "POST /api/stop                  - stop every background run",
            "GET  /pi?iterations=5000000     - Leibniz series",
            "GET  /primes?limit=200000       - primes by trial division",
            "GET  /hash-storm?rounds=3000000 - chained SHA-256",
            "GET  /fibonacci?n=38            - naive recursive Fibonacci (n <= 42)",
            "GET  /matrix?size=250           - random matrix product (size <= 500)",
        ],
        "limits": {
            "maxDurationSeconds": state.limits.max_duration_secs(),
            "maxConcurrency": state.limits.max_concurrency(),
        },
    }))
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "healthy", "timestamp": Utc::now() }))
}

async fn info() -> Result<HttpResponse, ApiError> {
    let report = web::block(sys_info::collect).await?;
    Ok(HttpResponse::Ok().json(report))
}

async fn cpu_stress(
    state: web::Data<AppState>,
    params: QueryPairs,
) -> Result<HttpResponse, ApiError> {
    let request = state.clamp_params(&params);
    state.warn_if_overlapping();
    info!(
        workers = request.concurrency(),
        duration_secs = request.duration_secs(),
        "starting CPU stress test"
    );

    let generator = state.generator.clone();
    let result = web::block(move || generator.run(&request)).await??;

    info!(
        workers = result.worker_count,
        elapsed_secs = result.actual_elapsed.as_secs_f64(),
        iterations = result.total_iterations,
        "CPU stress test completed"
    );
    Ok(HttpResponse::Ok().json(StressResponse::from(&result)))
}

async fn start_background(
    state: web::Data<AppState>,
    params: QueryPairs,
) -> Result<HttpResponse, ApiError> {
    let request = state.clamp_params(&params);
    state.warn_if_overlapping();

    let handle = state.generator.start(&request)?;
    let id = state.tasks.register_task(
        "cpu",
        RunningTask {
            monitor: handle.monitor(),
            worker_count: request.concurrency(),
            requested_duration_secs: request.duration_secs(),
            started_at: Utc::now(),
        },
    );
    info!(
        %id,
        workers = request.concurrency(),
        duration_secs = request.duration_secs(),
        "background CPU stress started"
    );

    let cleanup = state.clone();
    let task_id = id.clone();
    actix_web::rt::spawn(async move {
        let outcome = web::block(move || handle.join()).await;
        cleanup.tasks.remove_task(&task_id);
        match outcome {
            Ok(Ok(result)) => info!(
                id = %task_id,
                elapsed_secs = result.actual_elapsed.as_secs_f64(),
                iterations = result.total_iterations,
                stopped_early = result.stopped_early,
                "background CPU stress finished"
            ),
            Ok(Err(err)) => error!(id = %task_id, error = %err, "background CPU stress failed"),
            Err(err) => error!(id = %task_id, error = %err, "lost background CPU stress run"),
        }
    });

    Ok(HttpResponse::Accepted().json(StartResponse {
        message: format!(
            "Burning CPU on {} worker(s) for {}s. POST /api/stop/{} to stop early.",
            request.concurrency(),
            request.duration_secs(),
            id
        ),
        id,
        status: "started",
        worker_count: request.concurrency(),
        requested_duration_seconds: request.duration_secs(),
    }))
}

async fn list_tasks(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.tasks.list_tasks())
}

async fn stop_task(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    if !state.tasks.stop_task(&id) {
        return Err(ApiError::NotFound(id));
    }
    info!(%id, "stop requested");
    Ok(HttpResponse::Ok().json(json!({ "status": "stopping", "id": id })))
}

async fn stop_all(state: web::Data<AppState>) -> impl Responder {
    let stopped = state.tasks.stop_all();
    if stopped == 0 {
        return HttpResponse::Ok().json(json!({ "status": "nothing to stop", "tasksStopped": 0 }));
    }
    info!(tasks = stopped, "stop requested for every background run");
    HttpResponse::Ok().json(json!({ "status": "stopping", "tasksStopped": stopped }))
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/health", web::get().to(health))
        .route("/api/health", web::get().to(health))
        .route("/info", web::get().to(info))
        .route("/cpu", web::get().to(cpu_stress))
        .route("/stress", web::get().to(cpu_stress))
        .route("/api/cpu-stress", web::get().to(cpu_stress))
        .route("/api/cpu-stress/start", web::post().to(start_background))
        .route("/api/tasks", web::get().to(list_tasks))
        .route("/api/stop", web::post().to(stop_all))
        .route("/api/stop/{id}", web::post().to(stop_task))
        .configure(workloads::routes);
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::parse();
    telemetry::init_tracing(cfg.log_json);

    let addr = cfg.socket_addr()?;
    let limits = cfg.limits();
    let state = web::Data::new(AppState::new(limits));

    info!(
        %addr,
        max_duration_secs = limits.max_duration_secs(),
        max_concurrency = limits.max_concurrency(),
        "starting cpu-burn engine"
    );

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .app_data(state.clone())
            .configure(routes)
    })
    .bind(addr)?
    .run()
    .await?;

    info!("shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::Value;
    use std::time::Duration;

    fn state() -> web::Data<AppState> {
        web::Data::new(AppState::new(
            LoadLimits::default().with_default_concurrency(2),
        ))
    }

    #[actix_web::test]
    async fn test_health() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;
        for uri in ["/health", "/api/health"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body["status"], "healthy");
        }
    }

    #[actix_web::test]
    async fn test_index_lists_limits() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;
        let req = test::TestRequest::get().uri("/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "running");
        assert_eq!(body["limits"]["maxDurationSeconds"], 300);
        assert_eq!(body["limits"]["maxConcurrency"], 16);
    }

    #[actix_web::test]
    async fn test_info_reports_process() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;
        let req = test::TestRequest::get().uri("/info").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["processId"], std::process::id());
        assert!(body["processorCount"].as_u64().unwrap() >= 1);
    }

    #[actix_web::test]
    async fn test_invalid_params_are_clamped() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;
        let req = test::TestRequest::get()
            .uri("/api/cpu-stress?duration=-5&intensity=0")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["workerCount"], 1);
        assert_eq!(body["requestedDurationSeconds"], 1);
        assert!(body["actualElapsedSeconds"].as_f64().unwrap() >= 1.0);
        assert!(body["message"].as_str().unwrap().contains("1 worker(s)"));
        assert!(body["completedAt"].is_string());
    }

    #[actix_web::test]
    async fn test_aliases_and_defaults() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;

        let req = test::TestRequest::get().uri("/cpu?seconds=1&threads=3").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["workerCount"], 3);
        assert_eq!(body["requestedDurationSeconds"], 1);

        let req = test::TestRequest::get()
            .uri("/api/cpu-stress?duration=1&intensity=lots")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["workerCount"], 2);
    }

    #[actix_web::test]
    async fn test_repeated_and_aliased_keys_take_first_value() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;

        for uri in [
            "/api/cpu-stress?duration=1&seconds=2&intensity=1",
            "/api/cpu-stress?duration=1&duration=2&intensity=1",
            "/api/cpu-stress?seconds=1&duration=5&intensity=1&workers=3",
            "/api/cpu-stress?intensity=1&workers=3&threads=4&duration=1",
        ] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK, "{uri}");

            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["requestedDurationSeconds"], 1, "{uri}");
            assert_eq!(body["workerCount"], 1, "{uri}");
        }
    }

    #[actix_web::test]
    async fn test_stress_path_takes_threads_and_duration() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;
        let req = test::TestRequest::get()
            .uri("/stress?threads=2&duration=1")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["workerCount"], 2);
        assert_eq!(body["requestedDurationSeconds"], 1);
    }

    #[actix_web::test]
    async fn test_background_run_can_be_stopped() {
        let state = state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/cpu-stress/start?duration=60&workers=1")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let body: Value = test::read_body_json(resp).await;
        let id = body["id"].as_str().unwrap().to_string();
        assert_eq!(body["status"], "started");
        assert_eq!(body["requestedDurationSeconds"], 60);

        let req = test::TestRequest::get().uri("/api/tasks").to_request();
        let tasks: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(tasks.as_array().unwrap().len(), 1);
        assert_eq!(tasks[0]["id"], id.as_str());

        let req = test::TestRequest::post()
            .uri(&format!("/api/stop/{id}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        for _ in 0..50 {
            if state.tasks.list_tasks().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(state.tasks.list_tasks().is_empty());
        assert_eq!(state.generator.gauge().active(), 0);
    }

    #[actix_web::test]
    async fn test_stop_unknown_task() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;

        let req = test::TestRequest::post().uri("/api/stop/cpu-42").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "NotFound");

        let req = test::TestRequest::post().uri("/api/stop").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "nothing to stop");
    }
}
