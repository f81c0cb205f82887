use crate::error::{Result, WrtPilotError};
use crate::plan::Plan;

/// 에러 메시지에 포함할 원문 최대 길이
const SOURCE_PREVIEW_CHARS: usize = 200;

/// 모델 응답 텍스트에서 [`Plan`]을 추출
///
/// 1. 전체 텍스트를 그대로 JSON으로 파싱 (명령어 0개도 허용)
/// 2. 실패하면 첫 번째 균형 잡힌 `{...}` 영역만 잘라서 다시 파싱
///    (이 경우 명령어가 1개 이상이어야 함)
///
/// # Examples
/// ```
/// use wrtpilot::plan::parse_plan;
///
/// let plan = parse_plan("Sure! {\"commands\":[{\"command\":[\"uci\",\"show\"]}]} Done.").unwrap();
/// assert_eq!(plan.commands[0].command, vec!["uci", "show"]);
/// ```
pub fn parse_plan(text: &str) -> Result<Plan> {
    let trimmed = text.trim();

    let strict_err = match serde_json::from_str::<Plan>(trimmed) {
        Ok(plan) => return Ok(plan),
        Err(e) => e,
    };

    // 산문으로 감싼 JSON
    if let Some(region) = extract_json(trimmed) {
        if let Ok(plan) = serde_json::from_str::<Plan>(region) {
            if !plan.commands.is_empty() {
                return Ok(plan);
            }
        }
    }

    Err(WrtPilotError::Parse(format!(
        "{} (source: {:?})",
        strict_err,
        preview(trimmed)
    )))
}

/// 첫 번째 균형 잡힌 중괄호 영역 반환
///
/// 중괄호 깊이만 추적하며 문자열 리터럴 내부는 구분하지 않습니다.
/// 따옴표 안의 `{`, `}`는 추출 결과를 틀어지게 할 수 있습니다.
pub fn extract_json(text: &str) -> Option<&str> {
    let mut start = None;
    let mut depth = 0usize;

    for (i, ch) in text.char_indices() {
        match ch {
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|s| &text[s..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

fn preview(text: &str) -> String {
    if text.chars().count() <= SOURCE_PREVIEW_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(SOURCE_PREVIEW_CHARS).collect();
    format!("{}...", cut)
}
