use crate::executor::ExecutionBatch;
use crate::plan::Plan;
use chrono::Utc;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// 플랜과 실행 결과를 JSON lines로 남기는 감사 로그
///
/// 기록 실패는 경고만 남기고 파이프라인을 멈추지 않습니다.
pub struct AuditLog {
    path: Option<PathBuf>,
    lock: Mutex<()>,
}

#[derive(Serialize)]
struct Entry<'a, T: Serialize> {
    ts: String,
    event: &'a str,
    data: T,
}

#[derive(Serialize)]
struct PlanEvent<'a> {
    prompt: &'a str,
    plan: &'a Plan,
}

impl AuditLog {
    /// 빈 경로는 기록 비활성화
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self {
            path: (!path.as_os_str().is_empty()).then(|| path.to_path_buf()),
            lock: Mutex::new(()),
        }
    }

    pub fn disabled() -> Self {
        Self::new("")
    }

    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    pub fn plan(&self, prompt: &str, plan: &Plan) {
        self.write("plan", PlanEvent { prompt, plan });
    }

    pub fn results(&self, batch: &ExecutionBatch) {
        self.write("results", &batch.results);
    }

    fn write<T: Serialize>(&self, event: &str, data: T) {
        let Some(path) = &self.path else {
            return;
        };
        let entry = Entry {
            ts: Utc::now().to_rfc3339(),
            event,
            data,
        };

        if let Err(e) = self.append(path, &entry) {
            tracing::warn!(path = %path.display(), error = %e, "failed to write audit log");
        }
    }

    fn append<T: Serialize>(&self, path: &Path, entry: &T) -> std::io::Result<()> {
        let line = serde_json::to_string(entry)?;
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path)?;
        writeln!(file, "{}", line)
    }
}
