use std::time::Duration;
use tokio::process::Command;
use tokio::time::Instant;

/// 프로브 하나당 제한 시간
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(1);
/// 전체 수집 제한 시간
pub const TOTAL_TIMEOUT: Duration = Duration::from_secs(3);
/// 프로브 출력 최대 바이트 수
pub const MAX_PROBE_OUTPUT: usize = 4096;

/// 읽기 전용 환경 조회 명령어
#[derive(Debug, Clone)]
pub struct FactProbe {
    pub label: &'static str,
    pub argv: &'static [&'static str],
}

/// 라우터 기본 프로브 목록
pub const ROUTER_PROBES: &[FactProbe] = &[
    FactProbe { label: "/etc/os-release", argv: &["cat", "/etc/os-release"] },
    FactProbe { label: "uname -a", argv: &["uname", "-a"] },
    FactProbe { label: "ubus system board", argv: &["ubus", "call", "system", "board", "{}"] },
    FactProbe { label: "uci show network", argv: &["uci", "-q", "show", "network"] },
    FactProbe { label: "uci show wireless", argv: &["uci", "-q", "show", "wireless"] },
    FactProbe { label: "fw4 print", argv: &["fw4", "print"] },
];

/// 현재 라우터의 환경 정보를 수집
///
/// 없는 도구, 실패, 시간 초과는 조용히 건너뜁니다.
pub async fn collect_facts() -> String {
    collect_with(ROUTER_PROBES, PROBE_TIMEOUT, TOTAL_TIMEOUT).await
}

pub async fn collect_with(probes: &[FactProbe], per_probe: Duration, total: Duration) -> String {
    let deadline = Instant::now() + total;
    let mut sections = Vec::new();

    for probe in probes {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            tracing::debug!(probe = probe.label, "facts budget exhausted");
            break;
        }

        if let Some(output) = run_probe(probe.argv, per_probe.min(remaining)).await {
            let output = output.trim();
            if !output.is_empty() {
                sections.push(format!("{}:\n{}", probe.label, truncate_bytes(output, MAX_PROBE_OUTPUT)));
            }
        }
    }

    sections.join("\n\n")
}

async fn run_probe(argv: &[&str], timeout: Duration) -> Option<String> {
    let (program, args) = argv.split_first()?;
    let run = Command::new(program)
        .args(args)
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(timeout, run).await.ok()?.ok()?;
    if !output.status.success() {
        return None;
    }

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    Some(text)
}

/// 문자 경계를 지키며 바이트 길이 제한
fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_bytes() {
        assert_eq!(truncate_bytes("hello", 10), "hello");
        assert_eq!(truncate_bytes("hello", 3), "hel");
        // 한글은 3바이트
        assert_eq!(truncate_bytes("가나", 4), "가");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_collect_skips_failures() {
        let probes = [
            FactProbe { label: "greeting", argv: &["echo", "hello"] },
            FactProbe { label: "failing", argv: &["sh", "-c", "echo nope; exit 1"] },
            FactProbe { label: "missing", argv: &["/nonexistent/probe"] },
            FactProbe { label: "blank", argv: &["true"] },
            FactProbe { label: "second", argv: &["echo", "world"] },
        ];

        let facts = collect_with(&probes, PROBE_TIMEOUT, TOTAL_TIMEOUT).await;
        assert_eq!(facts, "greeting:\nhello\n\nsecond:\nworld");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_probe_is_bounded() {
        let probes = [
            FactProbe { label: "slow", argv: &["sleep", "5"] },
            FactProbe { label: "fast", argv: &["echo", "done"] },
        ];

        let start = std::time::Instant::now();
        let facts = collect_with(&probes, Duration::from_millis(200), Duration::from_secs(2)).await;
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(facts, "fast:\ndone");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_output_capped() {
        let probes = [FactProbe { label: "big", argv: &["sh", "-c", "head -c 10000 /dev/zero | tr '\\0' a"] }];
        let facts = collect_with(&probes, PROBE_TIMEOUT, TOTAL_TIMEOUT).await;
        assert_eq!(facts.len(), "big:\n".len() + MAX_PROBE_OUTPUT);
    }
}
