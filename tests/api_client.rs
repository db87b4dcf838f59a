//! REST client integration tests
//!
//! Each test starts a minimal HTTP/1.1 responder on a local port and points
//! an `ApiClient` at it. The responder answers every request with
//! `Connection: close`, so each attempt arrives on its own connection and can
//! be counted.

use chrono::{TimeZone, Utc};
use library_circulation::client::{ApiClient, ClientConfig};
use library_circulation::types::{CirculationError, EntityKind, LoanStatus, NetworkError};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const BOOKS: &str = r#"[
    {"bookId": 1, "title": "Dune", "author": "Frank Herbert", "totalCopies": 2, "availableCopies": 1},
    {"bookId": 2, "title": "Emma", "author": "Jane Austen", "genre": null, "totalCopies": 1, "availableCopies": 1}
]"#;

/// Handler mapping `(attempt, request target)` to `(status, body)`
type Route = dyn Fn(usize, &str) -> (u16, String) + Send + Sync;

struct TestServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    targets: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    async fn start<F>(route: F) -> Self
    where
        F: Fn(usize, &str) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let targets = Arc::new(Mutex::new(Vec::new()));
        let route: Arc<Route> = Arc::new(route);

        let (server_hits, server_targets) = (hits.clone(), targets.clone());
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let attempt = server_hits.fetch_add(1, Ordering::SeqCst);
                let route = route.clone();
                let targets = server_targets.clone();
                tokio::spawn(async move {
                    respond(stream, attempt, route, targets).await;
                });
            }
        });

        Self {
            addr,
            hits,
            targets,
        }
    }

    fn client(&self) -> ApiClient {
        let mut config = ClientConfig::new(&format!("http://{}/api", self.addr));
        config.retry_delay = Duration::from_millis(10);
        config.timeout = Duration::from_secs(5);
        ApiClient::new(config).unwrap()
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn targets(&self) -> Vec<String> {
        self.targets.lock().unwrap().clone()
    }
}

async fn respond(
    mut stream: TcpStream,
    attempt: usize,
    route: Arc<Route>,
    targets: Arc<Mutex<Vec<String>>>,
) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }

    let head = String::from_utf8_lossy(&request);
    let request_line = head.lines().next().unwrap_or_default();
    let target = request_line.split_whitespace().nth(1).unwrap_or("/").to_string();
    targets.lock().unwrap().push(format!(
        "{} {}",
        request_line.split_whitespace().next().unwrap_or_default(),
        target
    ));

    let (status, body) = route(attempt, &target);
    let response = format!(
        "HTTP/1.1 {} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

#[tokio::test]
async fn test_retries_once_after_server_error() {
    let server = TestServer::start(|attempt, _| match attempt {
        0 => (500, "{\"error\":\"busy\"}".to_string()),
        _ => (200, BOOKS.to_string()),
    })
    .await;

    let books = server.client().list_books().await.unwrap();

    assert_eq!(books.len(), 2);
    assert_eq!(books[0].title, "Dune");
    assert_eq!(books[1].genre, None);
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn test_second_server_error_is_returned() {
    let server = TestServer::start(|_, _| (500, String::new())).await;

    let result = server.client().list_books().await;

    match result {
        Err(CirculationError::Network(NetworkError::Status { status, .. })) => {
            assert_eq!(status, 500)
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = TestServer::start(|_, _| (404, String::new())).await;

    let result = server.client().get_book(42).await;

    assert_eq!(result, Err(CirculationError::not_found(EntityKind::Book, 42)));
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn test_decodes_local_date_transactions() {
    let server = TestServer::start(|_, _| {
        (
            200,
            r#"[{
                "id": 7,
                "book": {"id": 3, "title": "1984"},
                "member": {"id": 2, "name": "Jane Smith"},
                "borrowDate": "2024-11-01",
                "dueDate": "2024-11-15",
                "returnDate": null,
                "status": "BORROWED"
            }]"#
            .to_string(),
        )
    })
    .await;

    let transactions = server.client().list_transactions().await.unwrap();

    assert_eq!(transactions.len(), 1);
    let tx = &transactions[0];
    assert_eq!((tx.id, tx.book_id, tx.member_id), (7, 3, 2));
    assert_eq!(tx.borrow_date, Utc.with_ymd_and_hms(2024, 11, 1, 0, 0, 0).unwrap());
    assert_eq!(tx.due_date, Utc.with_ymd_and_hms(2024, 11, 15, 0, 0, 0).unwrap());
    assert_eq!(tx.return_date, None);
    assert_eq!(tx.status, LoanStatus::Borrowed);
    assert_eq!(server.targets(), vec!["GET /api/borrowing".to_string()]);
}

#[tokio::test]
async fn test_borrow_sends_ids_as_query_parameters() {
    let server = TestServer::start(|_, _| {
        (
            200,
            r#"{"transactionId": 5, "bookId": 4, "memberId": 1, "borrowDate": "2024-11-20T10:00:00", "status": "BORROWED"}"#
                .to_string(),
        )
    })
    .await;

    let tx = server.client().borrow(4, 1).await.unwrap();

    assert_eq!(tx.id, 5);
    // Missing due date falls back to the loan period
    assert_eq!(tx.due_date, Utc.with_ymd_and_hms(2024, 12, 4, 10, 0, 0).unwrap());
    assert_eq!(
        server.targets(),
        vec!["POST /api/borrowing/borrow?bookId=4&memberId=1".to_string()]
    );
}

#[tokio::test]
async fn test_health_probe() {
    let server = TestServer::start(|_, target| match target {
        "/api/health" => (200, "{\"status\":\"UP\"}".to_string()),
        _ => (404, String::new()),
    })
    .await;

    assert!(server.client().health().await);
}

#[tokio::test]
async fn test_refused_connection_is_offline() {
    // Bind and drop to obtain a port nothing listens on
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let client = ApiClient::new(ClientConfig::new(&format!("http://{}/api", addr))).unwrap();

    assert!(!client.health().await);

    let error = client.list_members().await.unwrap_err();
    assert!(error.is_offline(), "expected offline error, got {:?}", error);
    assert!(matches!(
        error,
        CirculationError::Network(NetworkError::Unreachable { .. })
    ));
}
