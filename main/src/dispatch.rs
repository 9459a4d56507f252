use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::time::Duration;

/// One-shot HTTP command client for a discovered server.
///
/// Holds no connection state; every call builds its own request with the
/// configured timeout, so one failed call cannot affect another. Failures
/// never surface as errors, only as a falsy return value and a log line.
/// Callers needing retries must loop themselves.
pub struct CommandDispatcher {
    request_timeout: Duration,
}

impl CommandDispatcher {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }

    /// Sends a command body, returning whether the server accepted it.
    ///
    /// `true` iff the response status is 2xx. A transport error, a timeout,
    /// or a non-success status all collapse to `false`.
    pub async fn post_command(
        &self,
        host: &str,
        port: u16,
        path: &str,
        body: impl Into<String>,
        content_type: &str,
    ) -> bool {
        match self
            .post_internal(host, port, path, body.into(), content_type)
            .await
        {
            Ok(status) if status.is_success() => true,
            Ok(status) => {
                log::warn!("POST to {}:{}/{} returned {}", host, port, path, status);
                false
            }
            Err(e) => {
                log::error!("POST to {}:{}/{} failed: {}", host, port, path, e);
                false
            }
        }
    }

    /// Queries the server, returning the response body as text.
    ///
    /// Query parameters are encoded in the order given. The status code is
    /// not inspected; a transport error or timeout yields an empty string.
    pub async fn get_command(
        &self,
        host: &str,
        port: u16,
        path: &str,
        params: &[(&str, &str)],
    ) -> String {
        match self.get_internal(host, port, path, params).await {
            Ok(body) => body,
            Err(e) => {
                log::error!("GET to {}:{}/{} failed: {}", host, port, path, e);
                String::new()
            }
        }
    }

    /// Single-parameter form of [CommandDispatcher::get_command].
    pub async fn get_command_single(
        &self,
        host: &str,
        port: u16,
        path: &str,
        key: &str,
        value: &str,
    ) -> String {
        self.get_command(host, port, path, &[(key, value)]).await
    }

    async fn post_internal(
        &self,
        host: &str,
        port: u16,
        path: &str,
        body: String,
        content_type: &str,
    ) -> reqwest::Result<StatusCode> {
        let response = self
            .new_client()?
            .post(command_url(host, port, path))
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;
        Ok(response.status())
    }

    async fn get_internal(
        &self,
        host: &str,
        port: u16,
        path: &str,
        params: &[(&str, &str)],
    ) -> reqwest::Result<String> {
        let mut request = self.new_client()?.get(command_url(host, port, path));
        if !params.is_empty() {
            request = request.query(params);
        }
        request.send().await?.text().await
    }

    fn new_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()
    }
}

fn command_url(host: &str, port: u16, path: &str) -> String {
    format!("http://{}:{}/{}", host, port, path.trim_start_matches('/'))
}

#[cfg(test)]
mod test {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn dispatcher() -> CommandDispatcher {
        CommandDispatcher::new(Duration::from_secs(2))
    }

    /// Serves one canned HTTP response and hands back the raw request text.
    async fn serve_once(response: &'static str) -> (u16, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut connection, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buffer = [0; 4096];
            while !request
                .windows(4)
                .any(|window| window == b"\r\n\r\n")
            {
                let n = connection.read(&mut buffer).await.unwrap();
                request.extend_from_slice(&buffer[..n]);
            }
            connection.write_all(response.as_bytes()).await.unwrap();
            connection.shutdown().await.unwrap();
            String::from_utf8(request).unwrap()
        });
        (port, server)
    }

    /// Reserves a local port with nothing listening on it.
    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn post_created_is_success() {
        crate::test::init();

        let (port, server) =
            serve_once("HTTP/1.1 201 Created\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await;

        let accepted = dispatcher()
            .post_command("127.0.0.1", port, "light", "on", "text/plain")
            .await;

        assert!(accepted);
        let request = server.await.unwrap();
        assert!(request.starts_with("POST /light HTTP/1.1\r\n"));
        assert!(request.contains("content-type: text/plain\r\n"));
    }

    #[tokio::test]
    async fn post_server_error_is_failure() {
        crate::test::init();

        let (port, _server) = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;

        let accepted = dispatcher()
            .post_command("127.0.0.1", port, "light", "on", "text/plain")
            .await;

        assert!(!accepted);
    }

    #[tokio::test]
    async fn post_to_unreachable_host_is_failure() {
        crate::test::init();

        let accepted = dispatcher()
            .post_command("127.0.0.1", closed_port().await, "light", "on", "text/plain")
            .await;

        assert!(!accepted);
    }

    #[tokio::test]
    async fn post_times_out_without_panicking() {
        crate::test::init();

        // Accept the connection but never respond.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (connection, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(connection);
        });

        let accepted = CommandDispatcher::new(Duration::from_millis(100))
            .post_command("127.0.0.1", port, "light", "on", "text/plain")
            .await;

        assert!(!accepted);
        server.abort();
    }

    #[tokio::test]
    async fn get_returns_response_body() {
        crate::test::init();

        let (port, server) =
            serve_once("HTTP/1.1 200 OK\r\ncontent-length: 5\r\nconnection: close\r\n\r\nhello")
                .await;

        let body = dispatcher()
            .get_command("127.0.0.1", port, "status", &[])
            .await;

        assert_eq!(body, "hello");
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /status HTTP/1.1\r\n"));
    }

    #[tokio::test]
    async fn get_encodes_parameters_in_caller_order() {
        crate::test::init();

        let (port, server) =
            serve_once("HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n").await;

        dispatcher()
            .get_command(
                "127.0.0.1",
                port,
                "motor",
                &[("direction", "left"), ("speed", "50")],
            )
            .await;

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /motor?direction=left&speed=50 HTTP/1.1\r\n"));
    }

    #[tokio::test]
    async fn get_single_parameter_form() {
        crate::test::init();

        let (port, server) =
            serve_once("HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok")
                .await;

        let body = dispatcher()
            .get_command_single("127.0.0.1", port, "light", "state", "on")
            .await;

        assert_eq!(body, "ok");
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /light?state=on HTTP/1.1\r\n"));
    }

    #[tokio::test]
    async fn get_from_unreachable_host_is_empty() {
        crate::test::init();

        let body = dispatcher()
            .get_command("127.0.0.1", closed_port().await, "status", &[])
            .await;

        assert_eq!(body, "");
    }
}
