use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use tidemark_domain::errors::FeedError;
use tidemark_domain::repositories::PriceFeed;
use tidemark_infrastructure::market_data::TiingoClient;

struct MockTiingoServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl MockTiingoServer {
    fn start(status_line: &'static str, body: String) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");
        let base_url = format!("http://{}", addr);
        let requests = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let requests_clone = requests.clone();
        let stop_clone = stop.clone();

        let handle = thread::spawn(move || {
            listener.set_nonblocking(true).expect("nonblocking");
            while !stop_clone.load(Ordering::Relaxed) {
                match listener.accept() {
                    Ok((mut stream, _)) => {
                        let _ = handle_connection(&mut stream, status_line, &body, &requests_clone);
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(10));
                    }
                    Err(_) => {
                        thread::sleep(Duration::from_millis(10));
                    }
                }
            }
        });

        Self {
            base_url,
            requests,
            stop,
            handle: Some(handle),
        }
    }

    fn seen_requests(&self) -> Vec<String> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl Drop for MockTiingoServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn handle_connection(
    stream: &mut TcpStream,
    status_line: &str,
    body: &str,
    requests: &Arc<Mutex<Vec<String>>>,
) -> Result<(), String> {
    stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .map_err(|e| e.to_string())?;
    stream
        .set_write_timeout(Some(Duration::from_secs(2)))
        .map_err(|e| e.to_string())?;

    let mut buf = Vec::new();
    let mut tmp = [0u8; 1024];
    loop {
        let n = stream.read(&mut tmp).map_err(|e| e.to_string())?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
        if buf.len() > 8192 {
            break;
        }
    }
    requests
        .lock()
        .map_err(|e| e.to_string())?
        .push(String::from_utf8_lossy(&buf).to_string());

    let payload = body.as_bytes();
    let header = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status_line,
        payload.len()
    );
    stream
        .write_all(header.as_bytes())
        .map_err(|e| e.to_string())?;
    stream.write_all(payload).map_err(|e| e.to_string())?;
    Ok(())
}

fn daily_payload() -> String {
    // Bars deliberately newest-first; the client must hand them back
    // oldest-first.
    r#"[
        {
            "date": "2024-05-04T00:00:00.000Z",
            "open": 184.0, "high": 188.0, "low": 183.0, "close": 187.0,
            "volume": 900, "adjOpen": 184.0, "adjHigh": 188.0,
            "adjLow": 183.0, "adjClose": 187.0, "adjVolume": 900,
            "divCash": 0.0, "splitFactor": 1.0
        },
        {
            "date": "2024-05-03T00:00:00.000Z",
            "open": 186.0, "high": 187.0, "low": 182.0, "close": 183.0,
            "volume": 1000, "adjOpen": 186.0, "adjHigh": 187.0,
            "adjLow": 182.0, "adjClose": 183.0, "adjVolume": 1000,
            "divCash": 0.0, "splitFactor": 1.0
        }
    ]"#
    .to_string()
}

fn window() -> (NaiveDate, NaiveDate) {
    (
        NaiveDate::from_ymd_opt(2024, 5, 1).expect("start"),
        NaiveDate::from_ymd_opt(2024, 5, 5).expect("end"),
    )
}

#[test]
fn fetches_and_sorts_daily_bars() {
    let server = MockTiingoServer::start("200 OK", daily_payload());
    let client =
        TiingoClient::with_base_url(server.base_url.clone(), "test-token".to_string())
            .expect("client");

    let (start, end) = window();
    let prices = client.daily_ohlc("AAPL", start, end).expect("fetch");
    assert_eq!(prices.len(), 2);
    assert!(prices[0].date < prices[1].date);
    assert_eq!(prices[0].close, 183.0);
    assert_eq!(prices[1].close, 187.0);
}

#[test]
fn sends_token_auth_and_date_window() {
    let server = MockTiingoServer::start("200 OK", daily_payload());
    let client =
        TiingoClient::with_base_url(server.base_url.clone(), "test-token".to_string())
            .expect("client");

    let (start, end) = window();
    client.daily_ohlc("AAPL", start, end).expect("fetch");

    let seen = server.seen_requests();
    assert_eq!(seen.len(), 1);
    let head = &seen[0];
    assert!(head.starts_with("GET /tiingo/daily/AAPL/prices?"), "{head}");
    assert!(head.contains("startDate=2024-05-01"), "{head}");
    assert!(head.contains("endDate=2024-05-05"), "{head}");
    assert!(
        head.to_lowercase().contains("authorization: token test-token"),
        "{head}"
    );
}

#[test]
fn non_success_status_is_surfaced() {
    let server = MockTiingoServer::start("403 Forbidden", "{}".to_string());
    let client =
        TiingoClient::with_base_url(server.base_url.clone(), "bad-token".to_string())
            .expect("client");

    let (start, end) = window();
    let err = client.daily_ohlc("AAPL", start, end).expect_err("must refuse");
    assert!(matches!(err, FeedError::Status { code: 403 }));
}

#[test]
fn malformed_body_is_a_decode_error() {
    let server = MockTiingoServer::start("200 OK", "not json".to_string());
    let client =
        TiingoClient::with_base_url(server.base_url.clone(), "test-token".to_string())
            .expect("client");

    let (start, end) = window();
    let err = client.daily_ohlc("AAPL", start, end).expect_err("must refuse");
    assert!(matches!(err, FeedError::Decode { .. }));
}
