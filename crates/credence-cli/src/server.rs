//! Page server built on axum.
//!
//! `GET /` renders the empty form; `POST /` runs one analysis and renders the
//! result. The pipeline is blocking, so it runs on tokio's blocking pool.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::extract::{Form, State};
use axum::response::Html;
use axum::routing::get;
use credence_ai::{Analysis, Analyzer, EngineCell, EngineError, analyze};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::page::{PageView, render_page};

/// Shared state for the page handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<EngineCell<dyn Analyzer>>,
}

impl AppState {
    pub fn new(engine: EngineCell<dyn Analyzer>) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ArticleForm {
    pub text: Option<String>,
}

/// Result of one submit.
#[derive(Debug)]
pub enum Outcome {
    /// The model never loaded.
    Unavailable(EngineError),
    /// Nothing was submitted.
    Empty,
    Done(Box<Analysis>),
    Failed(String),
}

/// Run the pipeline for one submitted article. Blocking.
pub fn run_analysis(engine: &EngineCell<dyn Analyzer>, text: &str) -> Outcome {
    let analyzer = match engine.get() {
        Ok(analyzer) => analyzer,
        Err(e) => return Outcome::Unavailable(e),
    };
    // Whitespace-only text is still analysed; it normalises to markers only.
    if text.is_empty() {
        return Outcome::Empty;
    }
    match analyze(analyzer.as_ref(), Some(text)) {
        Ok(analysis) => Outcome::Done(Box::new(analysis)),
        Err(e) => {
            warn!(error = %format!("{e:#}"), "analysis failed");
            Outcome::Failed(format!("{e:#}"))
        }
    }
}

/// Build the router for the analysis page.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index).post(submit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let init_error = init_error(&state);
    Html(render_page(&PageView {
        init_error: init_error.as_deref(),
        ..Default::default()
    }))
}

async fn submit(State(state): State<AppState>, Form(form): Form<ArticleForm>) -> Html<String> {
    let text = form.text.unwrap_or_default();

    let engine = Arc::clone(&state.engine);
    let input = text.clone();
    let outcome = tokio::task::spawn_blocking(move || run_analysis(&engine, &input))
        .await
        .unwrap_or_else(|e| Outcome::Failed(format!("analysis task aborted: {e}")));

    let html = match &outcome {
        Outcome::Unavailable(e) => render_page(&PageView {
            text: &text,
            init_error: Some(unavailable_message(e).as_str()),
            ..Default::default()
        }),
        Outcome::Empty => render_page(&PageView {
            text: &text,
            ..Default::default()
        }),
        Outcome::Done(analysis) => render_page(&PageView {
            text: &text,
            analysis: Some(analysis.as_ref()),
            ..Default::default()
        }),
        Outcome::Failed(message) => render_page(&PageView {
            text: &text,
            error: Some(message.as_str()),
            ..Default::default()
        }),
    };
    Html(html)
}

/// Cached initialisation error, if a load was attempted and failed.
///
/// Never triggers a load itself.
fn init_error(state: &AppState) -> Option<String> {
    if !state.engine.is_initialized() {
        return None;
    }
    state.engine.get().err().map(|e| unavailable_message(&e))
}

fn unavailable_message(e: &EngineError) -> String {
    match e {
        EngineError::Unavailable(message) => message.clone(),
    }
}

/// Serve the page on `addr` until the process is stopped.
pub async fn run(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(addr = %addr, "serving analysis page");
    axum::serve(listener, router(state))
        .await
        .context("serving HTTP")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use credence_ai::Device;
    use credence_core::{ClassProbabilities, Label, Prediction, TokenAttribution};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    struct KeywordAnalyzer {
        predictions: AtomicUsize,
    }

    impl Analyzer for KeywordAnalyzer {
        fn device(&self) -> Device {
            Device::Cpu
        }

        fn max_length(&self) -> usize {
            512
        }

        fn predict(&self, text: &str) -> anyhow::Result<Prediction> {
            self.predictions.fetch_add(1, Ordering::SeqCst);
            if text.contains("explode") {
                anyhow::bail!("unexpected logits shape: [1, 3], expected [1, 2]");
            }
            let fake = if text.contains("shocking") { 3.0 } else { -3.0 };
            Ok(Prediction::from_probabilities(ClassProbabilities::from_logits(0.0, fake)))
        }

        fn explain(&self, text: &str, _target: Label) -> anyhow::Result<Vec<TokenAttribution>> {
            let mut tokens = vec![TokenAttribution::new("[CLS]", 0.0)];
            tokens.extend(
                text.split_whitespace()
                    .map(|w| TokenAttribution::new(w, if w == "shocking" { 0.4 } else { 0.0 })),
            );
            tokens.push(TokenAttribution::new("[SEP]", 0.0));
            Ok(tokens)
        }

        fn token_count(&self, text: &str) -> anyhow::Result<usize> {
            Ok(text.split_whitespace().count() + 2)
        }
    }

    fn state_with(loads: Arc<AtomicUsize>, fail: bool) -> (AppState, Arc<KeywordAnalyzer>) {
        let analyzer = Arc::new(KeywordAnalyzer {
            predictions: AtomicUsize::new(0),
        });
        let shared = Arc::clone(&analyzer);
        let cell: EngineCell<dyn Analyzer> = EngineCell::new(move || {
            loads.fetch_add(1, Ordering::SeqCst);
            if fail {
                anyhow::bail!("model directory not found: /srv/model");
            }
            Ok(Arc::clone(&shared) as Arc<dyn Analyzer>)
        });
        (AppState::new(cell), analyzer)
    }

    async fn body_text(resp: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), 1_000_000)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn post(app: Router, form: &'static str) -> (u16, String) {
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap();
        let resp = ServiceExt::<axum::http::Request<Body>>::oneshot(app, req)
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, body_text(resp).await)
    }

    #[tokio::test]
    async fn index_renders_form() {
        let (state, _) = state_with(Arc::new(AtomicUsize::new(0)), false);
        let req = axum::http::Request::builder()
            .uri("/")
            .body(Body::empty())
            .unwrap();
        let resp = ServiceExt::<axum::http::Request<Body>>::oneshot(router(state), req)
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let html = body_text(resp).await;
        assert!(html.contains(r#"name="text""#));
        assert!(!html.contains("Model initialisation error"));
    }

    async fn get_index(app: Router) -> String {
        let req = axum::http::Request::builder()
            .uri("/")
            .body(Body::empty())
            .unwrap();
        let resp = ServiceExt::<axum::http::Request<Body>>::oneshot(app, req)
            .await
            .unwrap();
        body_text(resp).await
    }

    #[tokio::test]
    async fn index_does_not_load_the_model() {
        let loads = Arc::new(AtomicUsize::new(0));
        let (state, _) = state_with(Arc::clone(&loads), true);
        let html = get_index(router(state)).await;
        assert!(!html.contains("Model initialisation error"));
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn index_shows_cached_load_failure() {
        let loads = Arc::new(AtomicUsize::new(0));
        let (state, _) = state_with(Arc::clone(&loads), true);
        assert!(state.engine.get().is_err());
        let html = get_index(router(state)).await;
        assert!(html.contains("Model initialisation error: model directory not found"));
        assert!(html.contains(r#"class="primary" disabled>"#));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn submit_shows_fake_verdict_and_highlights() {
        let (state, _) = state_with(Arc::new(AtomicUsize::new(0)), false);
        let (status, html) = post(
            router(state),
            "text=BREAKING%3A+Scientists+confirm+%3Cb%3Eshocking%3C%2Fb%3E+discovery%21",
        )
        .await;
        assert_eq!(status, 200);
        assert!(html.contains("FABRICATED (FAKE)"), "{html}");
        assert!(html.contains("alert-error"));
        assert!(html.contains("rgba(255, 0, 0, 1.000)"));
        assert!(html.contains("Token count: 7"));
        assert!(html.contains("Device: CPU"));
    }

    #[tokio::test]
    async fn submit_real_article() {
        let (state, _) = state_with(Arc::new(AtomicUsize::new(0)), false);
        let (_, html) = post(router(state), "text=The+senate+passed+the+bill").await;
        assert!(html.contains("CREDIBLE (REAL)"));
        assert!(html.contains("alert-success"));
    }

    #[tokio::test]
    async fn empty_submission_skips_model() {
        let (state, analyzer) = state_with(Arc::new(AtomicUsize::new(0)), false);
        let (status, html) = post(router(state), "text=").await;
        assert_eq!(status, 200);
        assert!(!html.contains("Classification Result"));
        assert_eq!(analyzer.predictions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn whitespace_submission_is_analysed_as_markers_only() {
        let (state, analyzer) = state_with(Arc::new(AtomicUsize::new(0)), false);
        let (status, html) = post(router(state), "text=+%0A%09+").await;
        assert_eq!(status, 200);
        assert!(html.contains("Classification Result"), "{html}");
        assert!(html.contains(r#"<div class="highlight-text"></div>"#));
        assert!(html.contains("Token count: 2"));
        assert_eq!(analyzer.predictions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_field_is_treated_as_blank() {
        let (state, analyzer) = state_with(Arc::new(AtomicUsize::new(0)), false);
        let (status, _) = post(router(state), "").await;
        assert_eq!(status, 200);
        assert_eq!(analyzer.predictions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn init_failure_short_circuits_every_request() {
        let loads = Arc::new(AtomicUsize::new(0));
        let (state, analyzer) = state_with(Arc::clone(&loads), true);
        let app = router(state);

        for _ in 0..3 {
            let (status, html) = post(app.clone(), "text=shocking+claims").await;
            assert_eq!(status, 200);
            assert!(html.contains("Model initialisation error: model directory not found"));
            assert!(!html.contains("Classification Result"));
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(analyzer.predictions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn model_loads_once_for_many_requests() {
        let loads = Arc::new(AtomicUsize::new(0));
        let (state, analyzer) = state_with(Arc::clone(&loads), false);
        let app = router(state);

        for _ in 0..4 {
            post(app.clone(), "text=some+article+text").await;
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(analyzer.predictions.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn inference_error_is_reported() {
        let (state, _) = state_with(Arc::new(AtomicUsize::new(0)), false);
        let (status, html) = post(router(state), "text=watch+it+explode").await;
        assert_eq!(status, 200);
        assert!(html.contains("Analysis failed: unexpected logits shape"));
        assert!(!html.contains("Classification Result"));
        assert!(html.contains(">watch it explode</textarea>"));
    }

    #[test]
    fn run_analysis_outcomes() {
        let (state, _) = state_with(Arc::new(AtomicUsize::new(0)), false);
        assert!(matches!(run_analysis(&state.engine, ""), Outcome::Empty));
        assert!(matches!(run_analysis(&state.engine, "  "), Outcome::Done(_)));
        match run_analysis(&state.engine, "shocking claim") {
            Outcome::Done(a) => assert_eq!(a.prediction.label, Label::Fake),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
