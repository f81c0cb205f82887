use crate::error::{Result, WrtPilotError};
use crate::executor::ExecutorConfig;
use crate::policy::PolicyConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 시스템 전역 설정 파일
const SYSTEM_CONFIG_PATH: &str = "/etc/wrtpilot/config.toml";

/// wrtpilot 설정
///
/// 우선순위: CLI 플래그 > 환경변수 > 설정 파일 > 기본값.
/// CLI 플래그는 main에서 마지막에 덮어씁니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// plan provider (gemini, openai, anthropic, gemini-cli)
    pub provider: String,
    /// 모델 이름 (비어 있으면 provider 기본값)
    pub model: String,

    pub api_key: String,
    pub openai_api_key: String,
    pub anthropic_api_key: String,

    pub gemini_endpoint: String,
    pub openai_endpoint: String,
    pub anthropic_endpoint: String,
    /// gemini-cli provider가 호출할 바이너리
    pub external_gemini_path: String,

    /// 플랜만 출력하고 실행하지 않음
    pub dry_run: bool,
    /// 확인 없이 실행
    pub auto_approve: bool,
    /// 명령어별 타임아웃 (초, 0이면 30초)
    pub timeout_seconds: u64,
    /// 플랜 생성 요청 타임아웃 (초)
    pub plan_timeout_seconds: u64,
    /// 플랜당 최대 명령어 수 (0이면 제한 없음)
    pub max_commands: usize,

    pub allowlist: Vec<String>,
    pub denylist: Vec<String>,

    /// 감사 로그 경로 (비어 있으면 기록 안 함)
    pub log_file: String,
    /// needs_root 명령어용 권한 상승 접두사
    pub elevate_command: String,

    /// 실패한 명령어에 대해 자가 복구 시도
    pub auto_retry: bool,
    pub max_retries: u32,

    /// 프롬프트에 라우터 환경 정보 포함
    pub facts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: String::new(),
            api_key: String::new(),
            openai_api_key: String::new(),
            anthropic_api_key: String::new(),
            gemini_endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            openai_endpoint: "https://api.openai.com/v1".to_string(),
            anthropic_endpoint: "https://api.anthropic.com/v1".to_string(),
            external_gemini_path: "/usr/bin/gemini".to_string(),
            dry_run: true,
            auto_approve: false,
            timeout_seconds: 30,
            plan_timeout_seconds: 60,
            max_commands: 10,
            allowlist: [
                r"^uci(\s|$)",
                r"^ubus(\s|$)",
                r"^fw4(\s|$)",
                r"^opkg(\s|$)(update|install|remove|list|info)",
                r"^logread(\s|$)",
                r"^dmesg(\s|$)",
                r"^ip(\s|$)",
                r"^ifstatus(\s|$)",
                r"^cat(\s|$)",
                r"^tail(\s|$)",
                r"^grep(\s|$)",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            denylist: [
                r"^rm\s+-rf\s+/",
                r"^mkfs(\s|$)",
                r"^dd(\s|$)",
                r"^:\(\)\s*\{\s*:\|:&\s*\};:",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            log_file: "/tmp/wrtpilot.log".to_string(),
            elevate_command: String::new(),
            auto_retry: false,
            max_retries: 2,
            facts: true,
        }
    }
}

impl Config {
    /// 설정 파일 + 환경변수에서 로드
    ///
    /// `path`가 없으면 /etc/wrtpilot/config.toml, ~/.config/wrtpilot/config.toml 순으로 찾습니다.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// 환경변수 조회 함수를 주입받는 버전 (테스트용)
    pub fn load_with_env<F>(path: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path.map(Path::to_path_buf).or_else(Self::find_config_file) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(env);
        Ok(config)
    }

    /// TOML 파일 읽기
    ///
    /// # Examples
    /// ```no_run
    /// use wrtpilot::config::Config;
    ///
    /// let config = Config::from_file(std::path::Path::new("/etc/wrtpilot/config.toml")).unwrap();
    /// println!("{}", config.provider);
    /// ```
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            WrtPilotError::Config(format!("read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| WrtPilotError::Config(format!("parse {}: {}", path.display(), e)))
    }

    fn find_config_file() -> Option<PathBuf> {
        let system = PathBuf::from(SYSTEM_CONFIG_PATH);
        if system.is_file() {
            return Some(system);
        }
        dirs::config_dir()
            .map(|dir| dir.join("wrtpilot").join("config.toml"))
            .filter(|p| p.is_file())
    }

    fn apply_env<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            env(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = get("GEMINI_API_KEY") {
            self.api_key = v;
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            self.openai_api_key = v;
        }
        if let Some(v) = get("ANTHROPIC_API_KEY") {
            self.anthropic_api_key = v;
        }
        if let Some(v) = get("GEMINI_ENDPOINT") {
            self.gemini_endpoint = v;
        }
        if let Some(v) = get("WRTPILOT_PROVIDER") {
            self.provider = v;
        }
        if let Some(v) = get("WRTPILOT_MODEL") {
            self.model = v;
        }
        if let Some(v) = get("WRTPILOT_LOG_FILE") {
            self.log_file = v;
        }
        if let Some(v) = get("WRTPILOT_ELEVATE") {
            self.elevate_command = v;
        }
    }

    pub fn policy(&self) -> PolicyConfig {
        PolicyConfig {
            allow: self.allowlist.clone(),
            deny: self.denylist.clone(),
        }
    }

    pub fn executor(&self) -> ExecutorConfig {
        ExecutorConfig::new(self.timeout_seconds, self.elevate_command.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Plan, PlannedCommand};
    use crate::policy::PolicyEngine;
    use std::collections::HashMap;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider, "gemini");
        assert!(config.dry_run);
        assert!(!config.auto_approve);
        assert_eq!(config.timeout_seconds, 30);
        assert_eq!(config.max_commands, 10);
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn test_default_policy_allows_uci_denies_rm() {
        let engine = PolicyEngine::new(&Config::default().policy());
        assert_eq!(engine.deny_count(), 4);

        let ok = Plan::new(vec![PlannedCommand::new(["uci", "show", "network"])]);
        assert!(engine.validate(&ok).is_ok());

        let bad = Plan::new(vec![PlannedCommand::new(["rm", "-rf", "/etc"])]);
        assert!(engine.validate(&bad).is_err());

        let not_listed = Plan::new(vec![PlannedCommand::new(["reboot"])]);
        assert!(engine.validate(&not_listed).is_err());
    }

    #[test]
    fn test_config_deserialization_partial() {
        let toml_str = r#"
            provider = "anthropic"
            dry_run = false
            timeout_seconds = 5
            allowlist = ['^uci(\s|$)']
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.provider, "anthropic");
        assert!(!config.dry_run);
        assert_eq!(config.timeout_seconds, 5);
        assert_eq!(config.allowlist.len(), 1);
        // 나머지는 기본값
        assert_eq!(config.max_commands, 10);
        assert_eq!(config.denylist.len(), 4);
    }

    #[test]
    fn test_file_then_env_precedence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "provider = \"openai\"\nmodel = \"from-file\"\napi_key = \"file-key\"").unwrap();

        let config = Config::load_with_env(Some(file.path()), no_env).unwrap();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "from-file");

        let env: HashMap<&str, &str> = [
            ("WRTPILOT_MODEL", "from-env"),
            ("GEMINI_API_KEY", " env-key "),
            ("WRTPILOT_ELEVATE", ""),
        ]
        .into_iter()
        .collect();
        let config = Config::load_with_env(Some(file.path()), |k| {
            env.get(k).map(|v| v.to_string())
        })
        .unwrap();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "from-env");
        assert_eq!(config.api_key, "env-key");
        // 빈 값은 무시
        assert_eq!(config.elevate_command, "");
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timeout_seconds = \"soon\"").unwrap();

        let err = Config::load_with_env(Some(file.path()), no_env).unwrap_err();
        assert!(matches!(err, WrtPilotError::Config(_)));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = Config::load_with_env(Some(Path::new("/nonexistent/wrtpilot.toml")), no_env)
            .unwrap_err();
        assert!(matches!(err, WrtPilotError::Config(_)));
    }

    #[test]
    fn test_executor_timeout_default() {
        let mut config = Config::default();
        config.timeout_seconds = 0;
        assert_eq!(config.executor().timeout, crate::executor::DEFAULT_TIMEOUT);
    }
}
