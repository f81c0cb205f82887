use crate::ai::PlanProvider;
use crate::cancel::CancelToken;
use crate::executor::{ExecutionBatch, ExecutionEngine, ExecutionResult};
use crate::plan::Plan;
use crate::policy::PolicyEngine;
use serde::Serialize;

/// 자가 복구 결과
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HealOutcome {
    /// 수정 플랜이 검증을 통과하고 모두 성공
    Fixed {
        attempts: u32,
        plan: Plan,
        batch: ExecutionBatch,
    },
    /// 재시도 횟수 소진
    Exhausted { attempts: u32, last_error: String },
    /// provider가 오류 수정을 지원하지 않음
    Unsupported,
}

impl HealOutcome {
    pub fn is_fixed(&self) -> bool {
        matches!(self, HealOutcome::Fixed { .. })
    }
}

/// 실패한 명령어에 대한 수정 플랜을 요청하고 재실행하는 재시도 루프
///
/// 수정 플랜도 원래 플랜과 똑같이 정책 검증을 거칩니다.
pub struct SelfHealer<'a> {
    provider: &'a dyn PlanProvider,
    policy: &'a PolicyEngine,
    executor: &'a ExecutionEngine,
    max_retries: u32,
    max_commands: usize,
}

impl<'a> SelfHealer<'a> {
    pub fn new(
        provider: &'a dyn PlanProvider,
        policy: &'a PolicyEngine,
        executor: &'a ExecutionEngine,
        max_retries: u32,
    ) -> Self {
        Self {
            provider,
            policy,
            executor,
            max_retries,
            max_commands: 0,
        }
    }

    pub fn with_max_commands(mut self, max_commands: usize) -> Self {
        self.max_commands = max_commands;
        self
    }

    pub async fn heal(&self, failed: &ExecutionResult, cancel: &CancelToken) -> HealOutcome {
        if !self.provider.supports_error_fix() {
            return HealOutcome::Unsupported;
        }

        // 다음 요청에 보낼 (실패한 명령어, 그 명령어의 에러 출력) 쌍
        let mut failing_command = failed.command.clone();
        let mut error_context = failed.error_context();
        let mut attempts = 0;

        for attempt in 1..=self.max_retries {
            if cancel.is_cancelled() {
                break;
            }
            attempts = attempt;
            tracing::info!(attempt, command = ?failing_command, "requesting error fix");

            let mut plan = match self
                .provider
                .generate_error_fix(&failing_command, &error_context, attempt)
                .await
            {
                Ok(plan) => plan,
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "error fix request failed");
                    failing_command = failed.command.clone();
                    error_context = failed.error_context();
                    continue;
                }
            };

            if plan.is_empty() {
                tracing::warn!(attempt, "error fix plan has no commands");
                continue;
            }
            plan.truncate(self.max_commands);

            if let Err(e) = self.policy.validate(&plan) {
                tracing::warn!(attempt, error = %e, "error fix plan rejected");
                continue;
            }

            let batch = self.executor.run(&plan, cancel).await;
            if batch.all_succeeded() {
                return HealOutcome::Fixed {
                    attempts: attempt,
                    plan,
                    batch,
                };
            }

            // 다음 시도에는 실패한 수정 명령어와 그 출력을 전달
            if let Some(result) = batch.failed_results().first() {
                failing_command = result.command.clone();
                error_context = result.error_context();
            }
        }

        HealOutcome::Exhausted {
            attempts,
            last_error: error_context,
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::ai::test_support::ScriptedProvider;
    use crate::error::{ExecutionFailure, WrtPilotError};
    use crate::plan::PlannedCommand;
    use crate::policy::PolicyConfig;
    use std::time::Duration;

    fn policy() -> PolicyEngine {
        PolicyEngine::new(&PolicyConfig {
            allow: vec![r"^(echo|true|false|sh)(\s|$)".to_string()],
            deny: vec![r"^rm(\s|$)".to_string()],
        })
    }

    fn failed_result() -> ExecutionResult {
        let cmd = vec!["false".to_string()];
        ExecutionResult::new(0, &cmd)
            .with_output("boom".to_string())
            .failed(ExecutionFailure::NonZeroExit(1), Duration::ZERO)
    }

    fn plan(argv: &[&str]) -> Plan {
        Plan::new(vec![PlannedCommand::new(argv.iter().copied())])
    }

    #[tokio::test]
    async fn test_fixed_on_first_attempt() {
        let provider = ScriptedProvider::new("fake").with_fix(Ok(plan(&["true"])));
        let (policy, executor) = (policy(), ExecutionEngine::default());
        let healer = SelfHealer::new(&provider, &policy, &executor, 3);

        let outcome = healer.heal(&failed_result(), &CancelToken::new()).await;
        match outcome {
            HealOutcome::Fixed { attempts, batch, .. } => {
                assert_eq!(attempts, 1);
                assert!(batch.all_succeeded());
            }
            other => panic!("unexpected: {:?}", other),
        }

        let requests = provider.fix_requests.lock().unwrap();
        assert_eq!(requests[0].0, vec!["false"]);
        assert_eq!(requests[0].1, "boom\nexit status 1");
        assert_eq!(requests[0].2, 1);
    }

    #[tokio::test]
    async fn test_fix_plan_gets_no_special_trust() {
        // 거부된 수정 플랜과 provider 에러는 실패한 시도로 계산
        let provider = ScriptedProvider::new("fake")
            .with_fix(Ok(plan(&["rm", "-rf", "/tmp/x"])))
            .with_fix(Err(WrtPilotError::Provider("quota".to_string())))
            .with_fix(Ok(plan(&["echo", "fixed"])));
        let (policy, executor) = (policy(), ExecutionEngine::default());
        let healer = SelfHealer::new(&provider, &policy, &executor, 3);

        let outcome = healer.heal(&failed_result(), &CancelToken::new()).await;
        match outcome {
            HealOutcome::Fixed { attempts, batch, .. } => {
                assert_eq!(attempts, 3);
                assert_eq!(batch.results[0].output, "fixed\n");
            }
            other => panic!("unexpected: {:?}", other),
        }
        let attempts: Vec<u32> = provider.fix_requests.lock().unwrap().iter().map(|r| r.2).collect();
        assert_eq!(attempts, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_exhausted_carries_latest_failure() {
        let provider = ScriptedProvider::new("fake")
            .with_fix(Ok(plan(&["sh", "-c", "echo second failure; exit 2"])))
            .with_fix(Ok(Plan::default()));
        let (policy, executor) = (policy(), ExecutionEngine::default());
        let healer = SelfHealer::new(&provider, &policy, &executor, 2);

        let outcome = healer.heal(&failed_result(), &CancelToken::new()).await;
        match outcome {
            HealOutcome::Exhausted { attempts, last_error } => {
                assert_eq!(attempts, 2);
                assert_eq!(last_error, "second failure\nexit status 2");
            }
            other => panic!("unexpected: {:?}", other),
        }

        let requests = provider.fix_requests.lock().unwrap();
        assert_eq!(requests[0].0, vec!["false"]);
        assert_eq!(requests[0].1, "boom\nexit status 1");
        // 두 번째 요청은 실패한 수정 명령어와 그 명령어의 출력을 함께 보냄
        assert_eq!(requests[1].0, vec!["sh", "-c", "echo second failure; exit 2"]);
        assert_eq!(requests[1].1, "second failure\nexit status 2");
    }

    #[tokio::test]
    async fn test_provider_error_resets_to_original_failure() {
        let provider = ScriptedProvider::new("fake")
            .with_fix(Ok(plan(&["sh", "-c", "echo nope; exit 3"])))
            .with_fix(Err(WrtPilotError::Provider("quota".to_string())))
            .with_fix(Ok(plan(&["true"])));
        let (policy, executor) = (policy(), ExecutionEngine::default());
        let healer = SelfHealer::new(&provider, &policy, &executor, 3);

        let outcome = healer.heal(&failed_result(), &CancelToken::new()).await;
        assert!(outcome.is_fixed());

        let requests = provider.fix_requests.lock().unwrap();
        assert_eq!(requests[1].0, vec!["sh", "-c", "echo nope; exit 3"]);
        assert_eq!(requests[1].1, "nope\nexit status 3");
        assert_eq!(requests[2].0, vec!["false"]);
        assert_eq!(requests[2].1, "boom\nexit status 1");
    }

    #[tokio::test]
    async fn test_unsupported_provider() {
        let provider = ScriptedProvider::new("fake").without_fixes();
        let (policy, executor) = (policy(), ExecutionEngine::default());
        let healer = SelfHealer::new(&provider, &policy, &executor, 3);

        let outcome = healer.heal(&failed_result(), &CancelToken::new()).await;
        assert!(matches!(outcome, HealOutcome::Unsupported));
        assert!(provider.fix_requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_retries_makes_no_requests() {
        let provider = ScriptedProvider::new("fake").with_fix(Ok(plan(&["true"])));
        let (policy, executor) = (policy(), ExecutionEngine::default());
        let healer = SelfHealer::new(&provider, &policy, &executor, 0);

        let outcome = healer.heal(&failed_result(), &CancelToken::new()).await;
        assert!(matches!(outcome, HealOutcome::Exhausted { attempts: 0, .. }));
    }
}
