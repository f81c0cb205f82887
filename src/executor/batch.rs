use crate::cancel::CancelToken;
use crate::error::ExecutionFailure;
use crate::executor::runner::ExecutionEngine;
use crate::plan::{Plan, PlannedCommand};
use serde::{Serialize, Serializer};
use std::time::{Duration, Instant};

/// 명령어 실행 결과
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// 원래 플랜에서의 위치
    pub index: usize,
    /// 실행한 리터럴 명령어
    pub command: Vec<String>,
    /// stdout + stderr
    pub output: String,
    /// 실패 사유 (성공 시 None)
    #[serde(serialize_with = "serialize_failure", skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionFailure>,
    /// 실행 시간
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl ExecutionResult {
    pub fn new(index: usize, command: &[String]) -> Self {
        Self {
            index,
            command: command.to_vec(),
            output: String::new(),
            error: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn with_output(mut self, output: String) -> Self {
        self.output = output;
        self
    }

    pub fn succeeded(mut self, elapsed: Duration) -> Self {
        self.error = None;
        self.elapsed = elapsed;
        self
    }

    pub fn failed(mut self, failure: ExecutionFailure, elapsed: Duration) -> Self {
        self.error = Some(failure);
        self.elapsed = elapsed;
        self
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// 자가 복구 요청에 넣을 에러 맥락 (출력 + 실패 사유)
    pub fn error_context(&self) -> String {
        let output = self.output.trim();
        match (&self.error, output.is_empty()) {
            (Some(e), true) => e.to_string(),
            (Some(e), false) => format!("{}\n{}", output, e),
            (None, _) => output.to_string(),
        }
    }
}

/// 배치 실행 결과
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionBatch {
    /// 플랜 순서와 동일한 개별 결과
    pub results: Vec<ExecutionResult>,
    /// 실패한 명령어 수
    pub failed: usize,
}

impl ExecutionBatch {
    pub fn push(&mut self, result: ExecutionResult) {
        if !result.is_success() {
            self.failed += 1;
        }
        self.results.push(result);
    }

    /// 모든 명령어가 성공했는지 확인
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// 실패한 결과들
    pub fn failed_results(&self) -> Vec<&ExecutionResult> {
        self.results.iter().filter(|r| !r.is_success()).collect()
    }
}

impl ExecutionEngine {
    /// 플랜 순서대로 순차 실행 (실패해도 다음 명령어 계속 실행)
    pub async fn run(&self, plan: &Plan, cancel: &CancelToken) -> ExecutionBatch {
        self.run_selected(plan, cancel, |_, _| true).await
    }

    /// `select`가 true를 돌려준 명령어만 실행 (건너뛴 명령어는 결과 없음)
    pub async fn run_selected<F>(&self, plan: &Plan, cancel: &CancelToken, mut select: F) -> ExecutionBatch
    where
        F: FnMut(usize, &PlannedCommand) -> bool,
    {
        let started = Instant::now();
        let mut batch = ExecutionBatch::default();

        for (index, cmd) in plan.commands.iter().enumerate() {
            if !select(index, cmd) {
                tracing::debug!(index, "command skipped by caller");
                continue;
            }
            let result = self.run_one(index, cmd, cancel).await;
            batch.push(result);
        }

        tracing::info!(
            total = batch.results.len(),
            failed = batch.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch finished"
        );
        batch
    }
}

fn serialize_failure<S: Serializer>(
    failure: &Option<ExecutionFailure>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match failure {
        Some(f) => serializer.serialize_str(&f.to_string()),
        None => serializer.serialize_none(),
    }
}

fn serialize_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(elapsed.as_millis() as u64)
}
