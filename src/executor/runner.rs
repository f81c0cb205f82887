use crate::cancel::CancelToken;
use crate::error::ExecutionFailure;
use crate::executor::batch::ExecutionResult;
use crate::executor::termination::{Termination, TerminationCause, GRACE_PERIOD};
use crate::plan::PlannedCommand;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// 명령어별 기본 타임아웃
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// PATH 환경변수가 비어 있을 때 사용
const FALLBACK_PATH: &str = "/usr/sbin:/usr/bin:/sbin:/bin";

/// 실행 엔진 설정
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// 명령어별 마감 시간
    pub timeout: Duration,
    /// needs_root 명령어 앞에 붙일 권한 상승 프로그램 (예: "sudo -n")
    pub elevate_command: String,
}

impl ExecutorConfig {
    /// 초 단위 타임아웃 (0이면 기본값 30초)
    pub fn new(timeout_seconds: u64, elevate_command: impl Into<String>) -> Self {
        let timeout = if timeout_seconds == 0 {
            DEFAULT_TIMEOUT
        } else {
            Duration::from_secs(timeout_seconds)
        };
        Self {
            timeout,
            elevate_command: elevate_command.into(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::new(0, "")
    }
}

/// 셸 없이 argv를 직접 실행하는 엔진
#[derive(Debug, Clone, Default)]
pub struct ExecutionEngine {
    config: ExecutorConfig,
}

impl ExecutionEngine {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// 명령어 하나 실행
    ///
    /// 마감 시간이 지나거나 `cancel`이 트리거되면 SIGTERM을 보내고,
    /// 유예 시간 뒤에도 살아 있으면 강제 종료합니다.
    pub async fn run_one(
        &self,
        index: usize,
        cmd: &PlannedCommand,
        cancel: &CancelToken,
    ) -> ExecutionResult {
        let start = Instant::now();
        let result = ExecutionResult::new(index, &cmd.command);

        if cmd.command.is_empty() {
            return result.failed(ExecutionFailure::EmptyCommand, start.elapsed());
        }
        if cancel.is_cancelled() {
            return result.failed(ExecutionFailure::Cancelled, start.elapsed());
        }

        let argv = self.build_argv(cmd);
        tracing::debug!(index, ?argv, "spawning command");

        let mut child = match Command::new(&argv[0])
            .args(&argv[1..])
            .env_clear()
            .env("PATH", minimal_path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                return result.failed(ExecutionFailure::Spawn(e.to_string()), start.elapsed());
            }
        };

        // stdout/stderr를 도착 순서대로 하나의 버퍼로 합침
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(pump(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(pump(stderr, tx.clone()));
        }
        drop(tx);

        let mut termination = Termination::new(start + self.config.timeout, GRACE_PERIOD);
        let status = loop {
            tokio::select! {
                status = child.wait() => break status,
                step = termination.next(cancel) => termination.advance(&mut child, step),
            }
        };
        let elapsed = start.elapsed();

        // 종료 후 파이프에 남은 출력 수거 (손자 프로세스가 파이프를 잡고 있어도 유예 시간까지만)
        let output = collect_output(rx, Instant::now() + GRACE_PERIOD).await;
        let result = result.with_output(output);

        let failure = match status {
            Err(e) => Some(ExecutionFailure::Spawn(format!("wait failed: {}", e))),
            Ok(status) => match termination.cause() {
                Some(TerminationCause::Deadline) => {
                    Some(ExecutionFailure::TimedOut(self.config.timeout))
                }
                Some(TerminationCause::Cancelled) => Some(ExecutionFailure::Cancelled),
                None if status.success() => None,
                None => Some(exit_failure(status)),
            },
        };

        match failure {
            Some(failure) => {
                tracing::debug!(index, %failure, ?elapsed, "command failed");
                result.failed(failure, elapsed)
            }
            None => result.succeeded(elapsed),
        }
    }

    /// 권한 상승 접두사 + 명령어 토큰
    pub fn build_argv(&self, cmd: &PlannedCommand) -> Vec<String> {
        let mut argv = Vec::with_capacity(cmd.command.len() + 2);
        if cmd.needs_root {
            // 따옴표/이스케이프 해석 없이 공백으로만 분리
            argv.extend(self.config.elevate_command.split_whitespace().map(String::from));
        }
        argv.extend(cmd.command.iter().cloned());
        argv
    }
}

fn minimal_path() -> String {
    match std::env::var("PATH") {
        Ok(path) if !path.is_empty() => path,
        _ => FALLBACK_PATH.to_string(),
    }
}

async fn pump<R: AsyncRead + Unpin>(mut reader: R, tx: mpsc::UnboundedSender<Vec<u8>>) {
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if tx.send(chunk[..n].to_vec()).is_err() {
                    break;
                }
            }
        }
    }
}

async fn collect_output(mut rx: mpsc::UnboundedReceiver<Vec<u8>>, until: Instant) -> String {
    let mut buf = Vec::new();
    let _ = tokio::time::timeout_at(until, async {
        while let Some(chunk) = rx.recv().await {
            buf.extend_from_slice(&chunk);
        }
    })
    .await;
    String::from_utf8_lossy(&buf).into_owned()
}

fn exit_failure(status: ExitStatus) -> ExecutionFailure {
    if let Some(code) = status.code() {
        return ExecutionFailure::NonZeroExit(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ExecutionFailure::Signaled(signal);
        }
    }
    ExecutionFailure::NonZeroExit(-1)
}
