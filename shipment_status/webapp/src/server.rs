use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::{Local, NaiveDate};
use serde_json::{json, Value};
use shipment_model::Predictor;
use tokio::{
    net::TcpListener,
    signal,
    task::{self, JoinError},
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{
    form::ShipmentForm,
    render::{render_error_page, render_page, Outcome},
    telemetry::PredictionTelemetry,
};

/// Shared state cloned into every request.
#[derive(Clone, Debug)]
pub struct AppState {
    predictor: Predictor,
    telemetry: PredictionTelemetry,
    today: fn() -> NaiveDate,
}

impl AppState {
    /// State reading the local calendar date for form defaults.
    #[must_use]
    pub fn new(predictor: Predictor, telemetry: PredictionTelemetry) -> Self {
        Self {
            predictor,
            telemetry,
            today: local_today,
        }
    }
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Builds the router: the form page, its submission target, and a health probe.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serves until ctrl-c or SIGTERM, letting in-flight requests finish.
pub async fn run(bind: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!(addr = %bind, "serving shipment status form");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;
    info!("server stopped");
    Ok(())
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_page(&ShipmentForm::defaults((state.today)()), None))
}

async fn predict(
    State(state): State<AppState>,
    Form(form): Form<ShipmentForm>,
) -> Result<Response, AppError> {
    let record = match form.to_record((state.today)()) {
        Ok(record) => record,
        Err(err) => {
            let page = render_page(&form, Some(&Outcome::Rejected(err.to_string())));
            if let Err(join) = log_blocking(&state.telemetry, move |log| log.rejection(&err)).await {
                warn!(error = %join, "prediction log task failed");
            }
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response());
        }
    };

    let prediction = match state.predictor.predict_record(&record) {
        Ok(prediction) => prediction,
        Err(err) => {
            let err = log_blocking(&state.telemetry, move |log| {
                log.failure(&err);
                err
            })
            .await?;
            return Err(AppError::from(err));
        }
    };
    let status = prediction.status;
    if let Err(join) = log_blocking(&state.telemetry, move |log| log.prediction(&prediction)).await {
        warn!(error = %join, "prediction log task failed");
    }

    let page = render_page(&form, Some(&Outcome::Predicted(status)));
    Ok(Html(page).into_response())
}

/// Runs a prediction-log write on the blocking pool; the log file is written
/// and flushed synchronously.
async fn log_blocking<T, F>(telemetry: &PredictionTelemetry, write: F) -> Result<T, JoinError>
where
    F: FnOnce(&PredictionTelemetry) -> T + Send + 'static,
    T: Send + 'static,
{
    let telemetry = telemetry.clone();
    task::spawn_blocking(move || write(&telemetry)).await
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let model = state.predictor.model();
    Json(json!({
        "status": "ok",
        "schema": model.schema().to_string(),
        "model": model.metadata().map(|metadata| metadata.name.as_str()),
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received");
}

/// Request failure rendered as a 500 page.
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(render_error_page(&format!("{:#}", self.0))),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
    };
    use shipment_features::{FeatureRow, FeatureSchema};
    use shipment_model::{ModelError, ModelResult, StatusModel, TreeEnsembleModel};
    use std::{path::PathBuf, sync::Arc};
    use tower::ServiceExt;

    struct FixedModel {
        schema: FeatureSchema,
        code: Option<i64>,
    }

    impl StatusModel for FixedModel {
        fn schema(&self) -> &FeatureSchema {
            &self.schema
        }

        fn predict(&self, _row: &FeatureRow) -> ModelResult<i64> {
            self.code.ok_or_else(|| ModelError::invalid("booster exploded"))
        }
    }

    fn fixed_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn state_with(model: Arc<dyn StatusModel>) -> AppState {
        let predictor = Predictor::for_shipments(model).unwrap();
        AppState {
            today: fixed_date,
            ..AppState::new(predictor, PredictionTelemetry::disabled())
        }
    }

    fn fixed(code: Option<i64>) -> AppState {
        state_with(Arc::new(FixedModel {
            schema: FeatureSchema::shipment(),
            code,
        }))
    }

    fn bundled() -> AppState {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../models/shipment_status.json");
        state_with(Arc::new(TreeEnsembleModel::load(path).unwrap()))
    }

    fn submit(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    async fn send(state: AppState, request: Request<Body>) -> (StatusCode, String) {
        let response = router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    const SCENARIO: &str = "origin=WH1&destination=NYC&carrier=FedEx\
        &shipment_date=2024-01-10&delivery_date=2024-01-15\
        &weight_kg=10.0&cost=50&distance_miles=200&transit_days=5";

    #[tokio::test]
    async fn form_page_defaults_to_today() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (status, page) = send(fixed(Some(0)), request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(page.contains(r#"name="shipment_date" type="date" value="2024-06-01""#));
        assert!(!page.contains("Predicted Shipment Status"));
    }

    #[tokio::test]
    async fn scenario_is_delivered_by_bundled_model() {
        let (status, page) = send(bundled(), submit(SCENARIO)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(page.contains("<span>\u{2705} Delivered</span>"), "{page}");
        assert!(page.contains(r#"value="FedEx""#));
    }

    #[tokio::test]
    async fn inverted_dates_still_predict() {
        let body = SCENARIO
            .replace("shipment_date=2024-01-10", "shipment_date=2024-01-20")
            .replace("delivery_date=2024-01-15", "delivery_date=2024-01-10");
        let (status, page) = send(bundled(), submit(&body)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(page.contains("Problematic</span>"));
    }

    #[tokio::test]
    async fn blank_submission_uses_defaults() {
        let (status, page) = send(fixed(Some(1)), submit("")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(page.contains("<span>\u{26a0}\u{fe0f} Problematic</span>"));
    }

    #[tokio::test]
    async fn unmapped_code_shows_unknown() {
        let (status, page) = send(fixed(Some(7)), submit(SCENARIO)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(page.contains("Unknown(7)</span>"));
    }

    #[tokio::test]
    async fn negative_number_is_rejected() {
        let body = SCENARIO.replace("weight_kg=10.0", "weight_kg=-3");
        let (status, page) = send(fixed(Some(0)), submit(&body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(page.contains("Weight (kg): must be zero or more, got -3"));
        assert!(page.contains(r#"value="-3""#));
        assert!(!page.contains("Predicted Shipment Status"));
    }

    #[tokio::test]
    async fn model_failure_is_server_error() {
        let (status, page) = send(fixed(None), submit(SCENARIO)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(page.contains("booster exploded"));
    }

    #[tokio::test]
    async fn submissions_reach_the_prediction_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictions.jsonl");
        let telemetry = PredictionTelemetry::builder("webapp")
            .log_path(&path)
            .build()
            .unwrap();
        let state = AppState {
            telemetry,
            ..fixed(Some(0))
        };

        let (status, _) = send(state.clone(), submit(SCENARIO)).await;
        assert_eq!(status, StatusCode::OK);
        let body = SCENARIO.replace("cost=50", "cost=-1");
        let (status, _) = send(state, submit(&body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["message"], "prediction.completed");
        assert_eq!(lines[0]["metadata"]["status"], "Delivered");
        assert_eq!(lines[0]["metadata"]["features"]["planned_days"], 5);
        assert_eq!(lines[1]["message"], "prediction.rejected");
        assert_eq!(lines[1]["metadata"]["field"], "Cost");
    }

    #[tokio::test]
    async fn failures_reach_the_prediction_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictions.jsonl");
        let telemetry = PredictionTelemetry::builder("webapp")
            .log_path(&path)
            .build()
            .unwrap();
        let state = AppState {
            telemetry,
            ..fixed(None)
        };
        let (status, _) = send(state, submit(SCENARIO)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("prediction.failed"));
        assert!(content.contains("booster exploded"));
    }

    #[tokio::test]
    async fn health_reports_schema_and_model() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(bundled(), request).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["schema"], "shipment_status@v1");
        assert_eq!(body["model"], "shipment_status_gbt");
    }
}
