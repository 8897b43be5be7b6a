//! Test server management.
//!
//! Spawns and manages confluxd instances for integration testing.

use std::net::TcpListener;
use std::process::{Child, Command};
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::sleep;

/// Knobs a test may override in the generated config.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub grace_period_secs: u64,
    pub purge_delay_secs: u64,
    pub max_participants: usize,
    pub messages_per_second: f32,
    pub message_burst: f32,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            grace_period_secs: 30,
            purge_delay_secs: 300,
            max_participants: 50,
            messages_per_second: 1000.0,
            message_burst: 1000.0,
        }
    }
}

/// A test server instance.
pub struct TestServer {
    child: Child,
    ws_port: u16,
    http_port: u16,
    _data_dir: TempDir,
}

/// Ask the OS for a port that is free right now.
fn free_port() -> anyhow::Result<u16> {
    Ok(TcpListener::bind("127.0.0.1:0")?.local_addr()?.port())
}

impl TestServer {
    /// Spawn a test server with default options.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with(ServerOptions::default()).await
    }

    pub async fn spawn_with(options: ServerOptions) -> anyhow::Result<Self> {
        let data_dir = tempfile::tempdir()?;
        let ws_port = free_port()?;
        let http_port = free_port()?;

        let config_path = data_dir.path().join("config.toml");
        let config_content = format!(
            r#"
[server]
name = "test.conflux"

[listen]
address = "127.0.0.1:{ws_port}"

[http]
address = "127.0.0.1:{http_port}"

[rooms]
max_participants = {max}
grace_period_secs = {grace}
purge_delay_secs = {purge}

[limits]
messages_per_second = {rate}
message_burst = {burst}
"#,
            max = options.max_participants,
            grace = options.grace_period_secs,
            purge = options.purge_delay_secs,
            rate = options.messages_per_second,
            burst = options.message_burst,
        );
        std::fs::write(&config_path, config_content)?;

        let child = Command::new(env!("CARGO_BIN_EXE_confluxd"))
            .arg(&config_path)
            .env("RUST_LOG", "warn")
            .spawn()?;

        let server = Self {
            child,
            ws_port,
            http_port,
            _data_dir: data_dir,
        };
        server.wait_until_ready().await?;
        Ok(server)
    }

    /// Wait until both listeners accept connections.
    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..50 {
            let ws = tokio::net::TcpStream::connect(("127.0.0.1", self.ws_port)).await;
            let http = tokio::net::TcpStream::connect(("127.0.0.1", self.http_port)).await;
            if ws.is_ok() && http.is_ok() {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("Server failed to start within 5 seconds")
    }

    /// WebSocket URL of the real-time surface.
    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.ws_port)
    }

    /// Base URL of the admin HTTP surface.
    pub fn http_url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.http_port, path)
    }

    /// Create a new test client connected to this server.
    pub async fn connect(&self) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(&self.ws_url()).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
