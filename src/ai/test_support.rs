//! Test doubles shared by provider, self-heal and session tests.

use crate::ai::PlanProvider;
use crate::error::{Result, WrtPilotError};
use crate::plan::Plan;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// 한 번만 응답하는 HTTP 서버. (base url, 수신한 원본 요청) 반환
pub(crate) async fn serve_once(status: u16, body: &str) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();
    let body = body.to_string();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_request(&mut stream).await;
        let reason = if status < 400 { "OK" } else { "Error" };
        let response = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            reason,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        let _ = stream.shutdown().await;
        let _ = tx.send(request);
    });

    (format!("http://{}", addr), rx)
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= pos + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

/// 미리 정해둔 응답을 순서대로 돌려주는 provider
pub(crate) struct ScriptedProvider {
    name: String,
    plans: Mutex<VecDeque<Result<Plan>>>,
    fixes: Mutex<VecDeque<Result<Plan>>>,
    supports_fix: bool,
    delay: Option<Duration>,
    pub prompts: Mutex<Vec<String>>,
    pub fix_requests: Mutex<Vec<(Vec<String>, String, u32)>>,
}

impl ScriptedProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            plans: Mutex::new(VecDeque::new()),
            fixes: Mutex::new(VecDeque::new()),
            supports_fix: true,
            delay: None,
            prompts: Mutex::new(Vec::new()),
            fix_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn without_fixes(mut self) -> Self {
        self.supports_fix = false;
        self
    }

    /// generate_plan 응답 전에 대기 (진행 중인 요청 흉내)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_plan(self, plan: Result<Plan>) -> Self {
        self.plans.lock().unwrap().push_back(plan);
        self
    }

    pub fn with_fix(self, plan: Result<Plan>) -> Self {
        self.fixes.lock().unwrap().push_back(plan);
        self
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl PlanProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_plan(&self, prompt: &str) -> Result<Plan> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.plans
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(WrtPilotError::Provider("script exhausted".to_string())))
    }

    fn supports_error_fix(&self) -> bool {
        self.supports_fix
    }

    async fn generate_error_fix(
        &self,
        original: &[String],
        error_output: &str,
        attempt: u32,
    ) -> Result<Plan> {
        self.fix_requests
            .lock()
            .unwrap()
            .push((original.to_vec(), error_output.to_string(), attempt));
        self.fixes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(WrtPilotError::Provider("no fix scripted".to_string())))
    }
}
