use std::io;
use std::io::Write;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use comissoes::{
    dashboard_router, fetch_with_retry, log_app_bind, log_app_start, log_upstream_selected,
    ApiRequest, ApiResponse, ComissoesApi, FetchError, LoggingConfig, RetryPolicy, TokioSleeper,
    Transport, TransportError, TransportFuture,
};
use serde_json::json;
use tower::util::ServiceExt;
use tracing::dispatcher::with_default;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriter;

#[derive(Clone, Default)]
struct SharedWriter {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedWriter {
    fn output_string(&self) -> String {
        let bytes = self
            .inner
            .lock()
            .expect("writer lock should not be poisoned");
        String::from_utf8_lossy(&bytes).to_string()
    }
}

struct SharedWriterGuard {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl<'a> MakeWriter<'a> for SharedWriter {
    type Writer = SharedWriterGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedWriterGuard {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Write for SharedWriterGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut out = self
            .inner
            .lock()
            .expect("writer lock should not be poisoned");
        out.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture_logs(max_level: Level, f: impl FnOnce()) -> String {
    let writer = SharedWriter::default();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_ansi(false)
        .with_max_level(max_level)
        .with_writer(writer.clone())
        .finish();
    let dispatch = tracing::Dispatch::new(subscriber);

    with_default(&dispatch, f);
    writer.output_string()
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("single-thread runtime should build")
        .block_on(future)
}

/// Answers every request with the same status and body; `None` refuses the
/// connection.
struct FixedUpstream(Option<(u16, serde_json::Value)>);

impl Transport for FixedUpstream {
    fn send<'a>(&'a self, _request: &'a ApiRequest) -> TransportFuture<'a> {
        let outcome = match &self.0 {
            Some((status, body)) => Ok(ApiResponse::json(*status, body)),
            None => Err(TransportError::new("connection refused")),
        };
        Box::pin(async move { outcome })
    }
}

fn api(upstream: FixedUpstream) -> Arc<ComissoesApi> {
    Arc::new(ComissoesApi::new(
        Arc::new(upstream),
        Arc::new(TokioSleeper),
        RetryPolicy {
            retries: 2,
            backoff_step_ms: 0,
        },
    ))
}

#[test]
fn server_lifecycle_helpers_emit_baseline_events() {
    let logs = capture_logs(Level::INFO, || {
        let cfg = LoggingConfig::default();
        log_app_start(&cfg);
        log_upstream_selected("http://127.0.0.1:5000", 3, 15_000);
        log_app_bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080));
    });

    assert!(logs.contains("\"event\":\"app.start\""));
    assert!(logs.contains("\"event\":\"upstream.selected\""));
    assert!(logs.contains("\"event\":\"app.bind\""));
}

#[test]
fn failing_reads_log_retry_and_exhaustion() {
    let logs = capture_logs(Level::INFO, || {
        let transport = FixedUpstream(None);
        let err = block_on(fetch_with_retry(
            &transport,
            &TokioSleeper,
            &RetryPolicy {
                retries: 2,
                backoff_step_ms: 0,
            },
            &ApiRequest::get("/api/empreendimentos"),
        ))
        .expect_err("refused connections should exhaust the retries");

        assert!(matches!(err, FetchError::Transport { attempts: 2, .. }));
    });

    assert!(logs.contains("\"event\":\"http.retry\""));
    assert!(logs.contains("\"event\":\"http.retry.exhausted\""));
}

#[test]
fn dashboard_route_emits_request_event() {
    let logs = capture_logs(Level::INFO, || {
        block_on(async {
            let app = dashboard_router(api(FixedUpstream(Some((
                200,
                json!({"sucesso": true, "comissoes": []}),
            )))));

            let response = app
                .oneshot(
                    Request::builder()
                        .uri("/dashboard/direcao")
                        .body(Body::empty())
                        .expect("request should build"),
                )
                .await
                .expect("approval page request should succeed");

            assert_eq!(response.status(), StatusCode::OK);
        });
    });

    assert!(logs.contains("\"event\":\"http.dashboard.request\""));
    assert!(logs.contains("\"route\":\"direcao\""));
}

#[test]
fn unreachable_upstream_logs_section_failure() {
    let logs = capture_logs(Level::INFO, || {
        block_on(async {
            let app = dashboard_router(api(FixedUpstream(None)));

            let response = app
                .oneshot(
                    Request::builder()
                        .uri("/dashboard/configuracoes")
                        .body(Body::empty())
                        .expect("request should build"),
                )
                .await
                .expect("settings page request should succeed");

            assert_eq!(response.status(), StatusCode::OK);
        });
    });

    assert!(logs.contains("\"event\":\"section.load.failed\""));
    assert!(logs.contains("\"section\":\"usuarios\""));
}

#[test]
fn settings_writes_log_outcome_events() {
    let delete_rule = |upstream: FixedUpstream| {
        block_on(async move {
            dashboard_router(api(upstream))
                .oneshot(
                    Request::builder()
                        .method("DELETE")
                        .uri("/dashboard/regras/7")
                        .body(Body::empty())
                        .expect("request should build"),
                )
                .await
                .expect("rule deletion request should complete")
                .status()
        })
    };

    let logs = capture_logs(Level::INFO, || {
        let status = delete_rule(FixedUpstream(Some((200, json!([])))));
        assert_eq!(status, StatusCode::OK);

        let status = delete_rule(FixedUpstream(Some((403, json!({"erro": "Acesso negado"})))));
        assert_eq!(status, StatusCode::FORBIDDEN);
    });

    assert!(logs.contains("\"event\":\"settings.rule.delete\""));
    assert!(logs.contains("\"event\":\"settings.rule.delete.failed\""));
    assert!(logs.contains("\"component\":\"settings\""));
    assert!(logs.contains("\"route\":\"regras_excluir\""));
}
