/// 플랜 생성/오류 수정 프롬프트 템플릿
///
/// 모든 provider가 같은 JSON 스키마를 요구하도록 템플릿을 한 곳에서 관리합니다.
pub struct PromptTemplate;

const PLAN_SCHEMA: &str = "{\n  \"summary\": string,\n  \"commands\": [ { \"command\": [string, ...], \"description\": string, \"needs_root\": bool } ],\n  \"warnings\": [string]\n}";

impl PromptTemplate {
    /// 라우터 명령어 플래너 기본 지시문
    pub fn instruction(max_commands: usize) -> String {
        let mut template = format!(
            "You are a router command planner.\n\
             Output only strict JSON that conforms to this schema:\n\
             {}\n\
             Rules:\n\
             - Use explicit argv arrays; do not return shell pipelines or redirections.\n\
             - Prefer OpenWrt tools: uci, ubus, fw4, opkg, logread, dmesg.\n\
             - Limit commands to safe, idempotent operations when possible.\n\
             - Keep the commands minimal and directly actionable.\n",
            PLAN_SCHEMA
        );

        if max_commands > 0 {
            template.push_str(&format!(
                "\nDo not return more than {} commands.",
                max_commands
            ));
        }

        template
    }

    /// 사용자 요청 + (선택) 환경 정보를 포함한 전체 프롬프트
    ///
    /// # Examples
    /// ```
    /// use wrtpilot::ai::prompt_template::PromptTemplate;
    ///
    /// let prompt = PromptTemplate::build_plan_prompt("show wifi clients", 5, None);
    /// assert!(prompt.contains("User request: show wifi clients"));
    /// ```
    pub fn build_plan_prompt(request: &str, max_commands: usize, facts: Option<&str>) -> String {
        let mut prompt = Self::instruction(max_commands);

        if let Some(facts) = facts.filter(|f| !f.trim().is_empty()) {
            prompt.push_str("\n\nEnvironment facts (read-only):\n");
            prompt.push_str(facts);
        }

        prompt.push_str("\n\nUser request: ");
        prompt.push_str(request);
        prompt
    }

    /// 실패한 명령어 수정 요청 프롬프트 (attempt는 1부터)
    pub fn error_fix(original: &[String], error_output: &str, attempt: u32) -> String {
        format!(
            "You are a router command error fixer for OpenWrt systems.\n\n\
             The following command failed:\n\
             Command: {}\n\
             Error output: {}\n\
             Attempt: {}\n\n\
             Analyze the error and provide a corrected plan to fix the issue. Output strict JSON:\n\
             {}\n\n\
             Rules:\n\
             - Analyze the error carefully (file not found, permission denied, syntax error, etc.)\n\
             - Provide alternative commands or fixes\n\
             - Use OpenWrt tools: uci, ubus, fw4, opkg, logread, wifi, /etc/init.d/*\n\
             - For permission errors, set needs_root to true\n\
             - For file not found, check alternative paths or suggest installation\n\
             - For syntax errors, correct the command syntax\n\
             - Keep the fix minimal and directly actionable\n\
             - Use explicit argv arrays; do not return shell pipelines or redirections\n\
             - Common OpenWrt paths: /etc/config/, /var/log/, /sys/class/net/",
            original.join(" "),
            error_output.trim(),
            attempt,
            PLAN_SCHEMA
        )
    }
}
