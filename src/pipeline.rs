use crate::ai::factory::ProviderFactory;
use crate::ai::prompt_template::PromptTemplate;
use crate::ai::self_heal::{HealOutcome, SelfHealer};
use crate::ai::PlanProvider;
use crate::audit::AuditLog;
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::error::{Result, WrtPilotError};
use crate::executor::{ExecutionBatch, ExecutionEngine};
use crate::facts;
use crate::plan::Plan;
use crate::policy::PolicyEngine;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// 플랜 생성 기본 타임아웃
pub const DEFAULT_PLAN_TIMEOUT: Duration = Duration::from_secs(60);

/// 실패한 명령어 하나에 대한 자가 복구 보고
#[derive(Debug, Serialize)]
pub struct HealReport {
    /// 원래 배치에서의 위치
    pub index: usize,
    pub command: Vec<String>,
    pub outcome: HealOutcome,
}

/// prompt → plan → validate → execute 공통 경로
///
/// 단발 실행과 대화형 세션이 같은 경로를 사용합니다.
pub struct Pipeline {
    config: Config,
    provider: Arc<dyn PlanProvider>,
    policy: PolicyEngine,
    executor: ExecutionEngine,
    audit: AuditLog,
}

impl Pipeline {
    pub fn new(config: Config, provider: Arc<dyn PlanProvider>) -> Self {
        let policy = PolicyEngine::new(&config.policy());
        let executor = ExecutionEngine::new(config.executor());
        let audit = AuditLog::new(&config.log_file);
        tracing::debug!(
            provider = provider.name(),
            allow = policy.allow_count(),
            deny = policy.deny_count(),
            "pipeline ready"
        );

        Self {
            config,
            provider,
            policy,
            executor,
            audit,
        }
    }

    /// 설정의 provider로 생성
    pub fn from_config(config: Config) -> Self {
        let provider = ProviderFactory::create(&config);
        Self::new(config, provider)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 실행 관련 설정 변경 (dry_run, auto_approve 등)
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn provider(&self) -> &dyn PlanProvider {
        self.provider.as_ref()
    }

    pub fn set_provider(&mut self, provider: Arc<dyn PlanProvider>) {
        tracing::debug!(provider = provider.name(), "provider switched");
        self.provider = provider;
    }

    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    fn plan_timeout(&self) -> Duration {
        match self.config.plan_timeout_seconds {
            0 => DEFAULT_PLAN_TIMEOUT,
            secs => Duration::from_secs(secs),
        }
    }

    /// 플랜 생성 후 명령어 수 제한, 정책 검증, 감사 기록
    ///
    /// 검증을 통과한 플랜만 반환합니다. 명령어가 없는 플랜도 유효합니다.
    pub async fn plan(&self, request: &str, cancel: &CancelToken) -> Result<Plan> {
        let facts = if self.config.facts {
            Some(facts::collect_facts().await)
        } else {
            None
        };
        let prompt =
            PromptTemplate::build_plan_prompt(request, self.config.max_commands, facts.as_deref());

        let timeout = self.plan_timeout();
        let mut plan = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WrtPilotError::Cancelled),
            result = tokio::time::timeout(timeout, self.provider.generate_plan(&prompt)) => {
                result.map_err(|_| {
                    WrtPilotError::Provider(format!(
                        "{} plan request timed out after {}s",
                        self.provider.name(),
                        timeout.as_secs()
                    ))
                })??
            }
        };

        plan.truncate(self.config.max_commands);
        self.policy.validate(&plan)?;
        self.audit.plan(request, &plan);
        Ok(plan)
    }

    /// 검증된 플랜 실행 후 결과 기록
    pub async fn execute(&self, plan: &Plan, cancel: &CancelToken) -> ExecutionBatch {
        let batch = self.executor.run(plan, cancel).await;
        self.audit.results(&batch);
        batch
    }

    /// 사용자가 고른 명령어만 실행
    pub async fn execute_selected<F>(&self, plan: &Plan, cancel: &CancelToken, select: F) -> ExecutionBatch
    where
        F: FnMut(usize, &crate::plan::PlannedCommand) -> bool,
    {
        let batch = self.executor.run_selected(plan, cancel, select).await;
        self.audit.results(&batch);
        batch
    }

    /// 배치의 실패한 명령어마다 자가 복구 시도
    pub async fn heal(&self, batch: &ExecutionBatch, cancel: &CancelToken) -> Vec<HealReport> {
        let healer = SelfHealer::new(
            self.provider.as_ref(),
            &self.policy,
            &self.executor,
            self.config.max_retries,
        )
        .with_max_commands(self.config.max_commands);

        let mut reports = Vec::new();
        for failed in batch.failed_results() {
            if cancel.is_cancelled() {
                break;
            }
            let outcome = healer.heal(failed, cancel).await;
            if let HealOutcome::Fixed { batch, .. } = &outcome {
                self.audit.results(batch);
            }
            reports.push(HealReport {
                index: failed.index,
                command: failed.command.clone(),
                outcome,
            });
        }
        reports
    }
}
