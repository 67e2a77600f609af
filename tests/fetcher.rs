// HTTP-level tests for the fetcher and the full poll cycle, served by an
// in-process axum server on an ephemeral port.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{http::StatusCode, routing::get, Router};
use tokio::net::TcpListener;

use iss_recorder::{
    config::{FetcherConfig, OutputFormat},
    errors::{IssRecorderError, Stage},
    fetcher::PositionFetcher,
    normalizer,
    poller::{PollMode, Poller, RunSummary},
    sink::ConsoleSink,
};

const PATH: &str = "/iss-now.json";

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}{PATH}")
}

async fn serve_fixed(status: StatusCode, body: &'static str) -> String {
    serve(Router::new().route(PATH, get(move || async move { (status, body) }))).await
}

fn fetcher(url: String) -> PositionFetcher {
    PositionFetcher::new(&FetcherConfig {
        url,
        timeout: Duration::from_secs(5),
    })
    .expect("build fetcher")
}

/// Writer shared with the test after the sink is boxed
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn fetch_and_normalize_success() {
    let url = serve_fixed(
        StatusCode::OK,
        r#"{"timestamp":1734361116,"message":"success","iss_position":{"longitude":"10.5","latitude":"-20.25"}}"#,
    )
    .await;

    let raw = fetcher(url).fetch().await.expect("fetch");
    assert_eq!(raw.message.as_deref(), Some("success"));

    let position = normalizer::normalize(&raw).expect("normalize");
    assert_eq!(position.as_pair(), (10.5, -20.25));
    assert_eq!(position.to_wkt(), "POINT(10.5 -20.25)");
}

#[tokio::test]
async fn non_success_status_is_bad_status() {
    for status in [
        StatusCode::NOT_FOUND,
        StatusCode::INTERNAL_SERVER_ERROR,
        StatusCode::SERVICE_UNAVAILABLE,
    ] {
        // A valid body must not rescue a bad status
        let url = serve_fixed(
            status,
            r#"{"iss_position":{"longitude":"10.5","latitude":"-20.25"}}"#,
        )
        .await;

        match fetcher(url).fetch().await {
            Err(IssRecorderError::BadStatusError(code)) => assert_eq!(code, status.as_u16()),
            other => panic!("expected bad status for {status}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn malformed_json_is_decode_error() {
    for body in [
        "not json",
        "{\"iss_position\":",
        r#"{"iss_position":{"longitude":"10.5"}}"#,
        r#"{"timestamp":1,"message":"success"}"#,
    ] {
        let url = serve_fixed(StatusCode::OK, body).await;
        let err = fetcher(url).fetch().await.expect_err(body);

        assert!(matches!(err, IssRecorderError::DecodeError(_)), "{body}: {err:?}");
        assert_eq!(err.stage(), Stage::Fetch);
    }
}

#[tokio::test]
async fn unreachable_host_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = fetcher(format!("http://{addr}{PATH}"))
        .fetch()
        .await
        .expect_err("nothing listens");
    assert!(matches!(err, IssRecorderError::NetworkError(_)), "{err:?}");
}

#[tokio::test]
async fn slow_response_is_network_error() {
    let app = Router::new().route(
        PATH,
        get(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            "{}"
        }),
    );
    let url = serve(app).await;
    let fetcher = PositionFetcher::new(&FetcherConfig {
        url,
        timeout: Duration::from_millis(200),
    })
    .unwrap();

    let err = fetcher.fetch().await.expect_err("timed out");
    assert!(matches!(err, IssRecorderError::NetworkError(_)), "{err:?}");
}

#[tokio::test]
async fn poll_once_to_console() {
    let url = serve_fixed(
        StatusCode::OK,
        r#"{"iss_position":{"longitude":"-104.82310","latitude":"51.5866"}}"#,
    )
    .await;
    let buffer = SharedBuffer::default();
    let sink = ConsoleSink::new(buffer.clone(), OutputFormat::Wkt);
    let mut poller = Poller::new(fetcher(url), Box::new(sink), PollMode::Once);

    let summary = poller.run().await.expect("run");

    assert_eq!(summary, RunSummary { cycles: 1, stored: 1 });
    assert_eq!(buffer.contents(), "POINT(-104.82310 51.5866)\n");
}

#[tokio::test]
async fn poll_continuous_emits_each_cycle() {
    let url = serve_fixed(
        StatusCode::OK,
        r#"{"iss_position":{"longitude":"1.5","latitude":"2.5"}}"#,
    )
    .await;
    let buffer = SharedBuffer::default();
    let sink = ConsoleSink::new(buffer.clone(), OutputFormat::Json);
    let mut poller = Poller::new(
        fetcher(url),
        Box::new(sink),
        PollMode::Continuous {
            interval: Duration::from_millis(100),
        },
    )
    .with_max_cycles(Some(3));

    let summary = poller.run().await.expect("run");

    assert_eq!(summary, RunSummary { cycles: 3, stored: 3 });
    assert_eq!(
        buffer.contents(),
        "{\"longitude\":1.5,\"latitude\":2.5}\n".repeat(3)
    );
}

#[tokio::test]
async fn poll_continuous_stops_on_service_unavailable() {
    let url = serve_fixed(StatusCode::SERVICE_UNAVAILABLE, "down for maintenance").await;
    let buffer = SharedBuffer::default();
    let sink = ConsoleSink::new(buffer.clone(), OutputFormat::Wkt);
    let mut poller = Poller::new(
        fetcher(url),
        Box::new(sink),
        PollMode::Continuous {
            interval: Duration::from_secs(5),
        },
    );

    let err = poller.run().await.expect_err("fatal");

    assert!(matches!(err, IssRecorderError::BadStatusError(503)));
    assert!(buffer.contents().is_empty());
}
