use wrtpilot::config::Config;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "wrtpilot")]
#[command(version)]
#[command(about = "AI-planned, policy-checked command runner for OpenWrt routers", long_about = None)]
pub struct Cli {
    /// 자연어 요청 (예: "show wifi clients")
    #[arg(required_unless_present = "interactive")]
    pub prompt: Vec<String>,

    /// 설정 파일 경로 (기본: /etc/wrtpilot/config.toml, ~/.config/wrtpilot/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// plan provider (gemini, openai, anthropic, gemini-cli)
    #[arg(short = 'p', long)]
    pub provider: Option<String>,

    /// 모델 이름
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// 플랜만 출력하고 실행하지 않음
    #[arg(long)]
    pub dry_run: bool,

    /// 플랜 실행 (설정의 dry_run 무시)
    #[arg(long, conflicts_with = "dry_run")]
    pub execute: bool,

    /// 확인 없이 바로 실행
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// 명령어마다 실행 여부 확인
    #[arg(long)]
    pub confirm_each: bool,

    /// 명령어별 타임아웃 (초)
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// 플랜당 최대 명령어 수
    #[arg(long, value_name = "N")]
    pub max_commands: Option<usize>,

    /// 감사 로그 경로 (빈 문자열이면 기록 안 함)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<String>,

    /// JSON으로 출력
    #[arg(long)]
    pub json: bool,

    /// 라우터 환경 정보를 프롬프트에 넣지 않음
    #[arg(long)]
    pub no_facts: bool,

    /// 실패한 명령어 자가 복구 시도
    #[arg(long)]
    pub auto_retry: bool,

    /// 자가 복구 최대 시도 횟수
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// 대화형 모드
    #[arg(short = 'i', long)]
    pub interactive: bool,

    /// 디버그 로그
    #[arg(short = 'd', long)]
    pub debug: bool,
}

impl Cli {
    pub fn prompt_text(&self) -> String {
        self.prompt.join(" ")
    }

    /// CLI 플래그를 설정에 덮어쓰기 (가장 높은 우선순위)
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(provider) = &self.provider {
            config.provider = provider.clone();
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if self.execute {
            config.dry_run = false;
        }
        if self.yes {
            config.auto_approve = true;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_seconds = timeout;
        }
        if let Some(max_commands) = self.max_commands {
            config.max_commands = max_commands;
        }
        if let Some(log_file) = &self.log_file {
            config.log_file = log_file.clone();
        }
        if self.no_facts {
            config.facts = false;
        }
        if self.auto_retry {
            config.auto_retry = true;
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
    }
}
