//! Plan model: the argv-style command list a provider proposes.
//!
//! Tokens in [`PlannedCommand::command`] are handed to the OS loader as-is.
//! Nothing here ever goes through a shell.

pub mod parser;

pub use parser::{extract_json, parse_plan};

use serde::{Deserialize, Deserializer, Serialize};

/// 실행할 명령어 하나 (argv 배열)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedCommand {
    /// 리터럴 인자 토큰 (argv[0]이 프로그램)
    #[serde(default, deserialize_with = "null_as_default")]
    pub command: Vec<String>,
    /// 사람이 읽는 설명
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// 권한 상승 필요 여부
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "is_false")]
    pub needs_root: bool,
}

impl PlannedCommand {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: argv.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn with_root(mut self) -> Self {
        self.needs_root = true;
        self
    }

    /// 정책 매칭에 쓰는 공백 연결 문자열
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

/// provider가 돌려주는 구조화된 계획
///
/// `commands`의 순서가 곧 실행 순서입니다. 명령어가 0개인 플랜도 유효합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub commands: Vec<PlannedCommand>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Plan {
    pub fn new(commands: Vec<PlannedCommand>) -> Self {
        Self {
            commands,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// max_commands 초과분 제거 (0이면 제한 없음)
    pub fn truncate(&mut self, max_commands: usize) {
        if max_commands > 0 && self.commands.len() > max_commands {
            self.commands.truncate(max_commands);
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

// 모델이 `"description": null`처럼 null을 내보내는 경우가 흔함
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 로그/화면 표시용 셸 비슷한 문자열 (실행에는 절대 사용하지 않음)
pub fn format_command(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| {
            if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '"' || c == '\'') {
                format!("{:?}", arg)
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
