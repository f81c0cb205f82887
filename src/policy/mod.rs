use crate::error::{Result, WrtPilotError};
use crate::plan::Plan;
use regex::Regex;
use std::fmt;

/// argv[0]에 들어가면 안 되는 셸 메타문자
const SHELL_METACHARACTERS: &[char] = &['|', '&', ';', '>', '<', '`', '$'];

/// allow/deny 패턴 목록 (컴파일 전)
#[derive(Debug, Clone, Default)]
pub struct PolicyConfig {
    pub allow: Vec<String>,
    pub deny: Vec<String>,
}

/// 정책 거부 사유
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    EmptyCommand,
    /// 공백뿐인 인자 (인자 위치)
    EmptyArgument(usize),
    /// NUL 바이트 포함 인자 (인자 위치)
    NulInArgument(usize),
    ShellMetacharacter,
    Denied(String),
    NotAllowed(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::EmptyCommand => write!(f, "is empty"),
            RejectReason::EmptyArgument(j) => write!(f, "arg {} is empty", j),
            RejectReason::NulInArgument(j) => write!(f, "arg {} contains NUL", j),
            RejectReason::ShellMetacharacter => {
                write!(f, "contains shell metacharacters in argv[0]")
            }
            RejectReason::Denied(cmdline) => write!(f, "denied by policy: {}", cmdline),
            RejectReason::NotAllowed(cmdline) => write!(f, "not allowed by policy: {}", cmdline),
        }
    }
}

/// 실행 전 플랜 검증기
///
/// 패턴은 생성 시 한 번만 컴파일되고 이후 변경되지 않으므로
/// 여러 검증에서 동시에 공유해도 안전합니다.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    allow: Vec<Regex>,
    deny: Vec<Regex>,
}

impl PolicyEngine {
    pub fn new(config: &PolicyConfig) -> Self {
        Self {
            allow: compile_patterns(&config.allow, "allow"),
            deny: compile_patterns(&config.deny, "deny"),
        }
    }

    pub fn allow_count(&self) -> usize {
        self.allow.len()
    }

    pub fn deny_count(&self) -> usize {
        self.deny.len()
    }

    /// 플랜 전체 검증 (첫 번째 거부에서 중단)
    ///
    /// # Examples
    /// ```
    /// use wrtpilot::plan::{Plan, PlannedCommand};
    /// use wrtpilot::policy::{PolicyConfig, PolicyEngine};
    ///
    /// let engine = PolicyEngine::new(&PolicyConfig {
    ///     allow: vec![r"^uci(\s|$)".to_string()],
    ///     deny: vec![],
    /// });
    /// let plan = Plan::new(vec![PlannedCommand::new(["uci", "show", "network"])]);
    /// assert!(engine.validate(&plan).is_ok());
    /// ```
    pub fn validate(&self, plan: &Plan) -> Result<()> {
        for (index, cmd) in plan.commands.iter().enumerate() {
            if let Err(reason) = self.check(&cmd.command) {
                tracing::debug!(index, %reason, "command rejected");
                return Err(WrtPilotError::PolicyRejection { index, reason });
            }
        }
        tracing::debug!(commands = plan.commands.len(), "plan accepted");
        Ok(())
    }

    fn check(&self, argv: &[String]) -> std::result::Result<(), RejectReason> {
        // 1. 구조 검사
        let program = argv.first().ok_or(RejectReason::EmptyCommand)?;
        for (j, arg) in argv.iter().enumerate() {
            if arg.trim().is_empty() {
                return Err(RejectReason::EmptyArgument(j));
            }
            if arg.contains('\0') {
                return Err(RejectReason::NulInArgument(j));
            }
        }

        // 2. 프로그램 이름의 셸 메타문자 (셸은 쓰지 않지만 이중 방어)
        if program.contains(SHELL_METACHARACTERS) {
            return Err(RejectReason::ShellMetacharacter);
        }

        // 3. deny 우선
        let cmdline = argv.join(" ");
        if self.deny.iter().any(|re| re.is_match(&cmdline)) {
            return Err(RejectReason::Denied(cmdline));
        }

        // 4. allow 필수 (빈 allow 목록은 아무것도 허용하지 않음)
        if !self.allow.iter().any(|re| re.is_match(&cmdline)) {
            return Err(RejectReason::NotAllowed(cmdline));
        }

        Ok(())
    }
}

fn compile_patterns(patterns: &[String], kind: &str) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(pattern = %p, kind, error = %e, "dropping invalid policy pattern");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlannedCommand;

    fn engine(allow: &[&str], deny: &[&str]) -> PolicyEngine {
        PolicyEngine::new(&PolicyConfig {
            allow: allow.iter().map(|s| s.to_string()).collect(),
            deny: deny.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn plan(cmds: &[&[&str]]) -> Plan {
        Plan::new(cmds.iter().map(|c| PlannedCommand::new(c.iter().copied())).collect())
    }

    fn rejected_index(result: Result<()>) -> usize {
        match result {
            Err(WrtPilotError::PolicyRejection { index, .. }) => index,
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_uci_show_network_allowed() {
        let engine = engine(&[r"^uci(\s|$)"], &[]);
        assert!(engine.validate(&plan(&[&["uci", "show", "network"]])).is_ok());
    }

    #[test]
    fn test_deny_takes_precedence_over_allow() {
        let engine = engine(&[r"^rm(\s|$)", r".*"], &[r"^rm\s+-rf\s+/"]);
        let p = plan(&[&["uci", "show"], &["rm", "-rf", "/"]]);

        let err = engine.validate(&p).unwrap_err();
        match err {
            WrtPilotError::PolicyRejection { index, reason } => {
                assert_eq!(index, 1);
                assert_eq!(reason, RejectReason::Denied("rm -rf /".to_string()));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_not_allowed() {
        let engine = engine(&[r"^uci(\s|$)", r"^ubus(\s|$)"], &[]);
        let err = engine.validate(&plan(&[&["echo", "hi"]])).unwrap_err();
        assert!(err.to_string().contains("command 0 not allowed by policy: echo hi"));
    }

    #[test]
    fn test_empty_allow_list_permits_nothing() {
        let engine = engine(&[], &[]);
        assert_eq!(rejected_index(engine.validate(&plan(&[&["uci", "show"]]))), 0);
        // 빈 플랜은 검사할 명령어가 없으므로 통과
        assert!(engine.validate(&Plan::default()).is_ok());
    }

    #[test]
    fn test_structural_violations_report_index() {
        let engine = engine(&[r".*"], &[]);

        let mut p = plan(&[&["uci", "show"]]);
        p.commands.push(PlannedCommand::default());
        assert_eq!(rejected_index(engine.validate(&p)), 1);

        let p = plan(&[&["uci", "show"], &["uci"], &["uci", "  "]]);
        assert_eq!(rejected_index(engine.validate(&p)), 2);

        let p = plan(&[&["uci", "set", "a\0b"]]);
        let err = engine.validate(&p).unwrap_err();
        assert!(matches!(
            err,
            WrtPilotError::PolicyRejection { index: 0, reason: RejectReason::NulInArgument(2) }
        ));
    }

    #[test]
    fn test_shell_metacharacter_in_program_only() {
        let engine = engine(&[r".*"], &[]);

        for program in ["ls|sh", "a&b", "x;y", "a>b", "a<b", "`id`", "$HOME"] {
            let err = engine.validate(&plan(&[&[program]])).unwrap_err();
            assert!(matches!(
                err,
                WrtPilotError::PolicyRejection { reason: RejectReason::ShellMetacharacter, .. }
            ));
        }

        // 인자에는 허용 (셸을 거치지 않음)
        assert!(engine.validate(&plan(&[&["grep", "a|b", "/etc/config/network"]])).is_ok());
    }

    #[test]
    fn test_invalid_patterns_dropped() {
        let engine = engine(&[r"^uci(\s|$)", r"([unclosed"], &[r"*bad"]);
        assert_eq!(engine.allow_count(), 1);
        assert_eq!(engine.deny_count(), 0);
        assert!(engine.validate(&plan(&[&["uci", "show"]])).is_ok());
    }

    #[test]
    fn test_validation_is_idempotent() {
        let engine = engine(&[r"^uci(\s|$)"], &[r"^rm\s+-rf\s+/"]);
        let good = plan(&[&["uci", "show"]]);
        let bad = plan(&[&["uci", "show"], &["rm", "-rf", "/"]]);

        assert!(engine.validate(&good).is_ok());
        assert!(engine.validate(&good).is_ok());
        assert_eq!(rejected_index(engine.validate(&bad)), 1);
        assert_eq!(rejected_index(engine.validate(&bad)), 1);
    }

    #[test]
    fn test_rm_rf_rejected_regardless_of_allow() {
        for allow in [vec![], vec![r".*"], vec![r"^rm(\s|$)"]] {
            let engine = engine(&allow, &[r"^rm\s+-rf\s+/"]);
            assert_eq!(rejected_index(engine.validate(&plan(&[&["rm", "-rf", "/"]]))), 0);
        }
    }
}
