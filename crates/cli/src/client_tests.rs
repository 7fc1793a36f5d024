use super::*;
use tokio::net::UnixListener;

/// Spawns a one-shot server that reads a single request, asserts nothing
/// about it, and replies with `response` verbatim, then exits.
async fn serve_once(socket_path: PathBuf, response: &'static str) {
    let listener = UnixListener::bind(&socket_path).unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = stream.read(&mut buf).await;
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
    });
}

#[tokio::test]
async fn get_parses_a_json_body() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("covend.sock");
    serve_once(
        socket_path.clone(),
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 13\r\n\r\n{\"ok\":true}\r\n",
    )
    .await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let client = DaemonClient::new(socket_path);
    let value = client.get("/health").await.unwrap();
    assert_eq!(value["ok"], serde_json::json!(true));
}

#[tokio::test]
async fn non_2xx_status_surfaces_code_and_message() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("covend.sock");
    serve_once(
        socket_path.clone(),
        "HTTP/1.1 404 Not Found\r\nContent-Length: 36\r\n\r\n{\"code\":\"not-found\",\"message\":\"no\"}",
    )
    .await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let client = DaemonClient::new(socket_path);
    let err = client.get("/tasks/missing").await.unwrap_err();
    match err {
        ClientError::Daemon { code, message } => {
            assert_eq!(code, "not-found");
            assert_eq!(message, "no");
        }
        other => panic!("expected ClientError::Daemon, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_socket_is_reported_as_not_running() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("covend.sock");
    let client = DaemonClient::new(socket_path.clone());
    let err = client.get("/health").await.unwrap_err();
    assert!(matches!(err, ClientError::NotRunning(p) if p == socket_path));
}
