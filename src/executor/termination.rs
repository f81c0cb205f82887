use crate::cancel::CancelToken;
use std::time::Duration;
use tokio::process::Child;
use tokio::time::Instant;

/// SIGTERM 이후 SIGKILL까지 기다리는 시간
pub const GRACE_PERIOD: Duration = Duration::from_millis(500);

/// 종료 절차를 시작한 원인
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationCause {
    Deadline,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationState {
    Running,
    Signaled { cause: TerminationCause, at: Instant },
    Killed { cause: TerminationCause },
}

/// 다음 전이
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Signal(TerminationCause),
    Kill,
}

/// 실행 중인 프로세스의 단계적 종료 (running → signaled → killed)
///
/// `next`는 다음 전이 시점까지 대기만 하고, 실제 신호 전송은 `advance`가
/// 수행합니다. 두 호출 사이에 프로세스가 끝나면 아무 신호도 보내지 않습니다.
#[derive(Debug)]
pub struct Termination {
    deadline: Instant,
    grace: Duration,
    state: TerminationState,
}

impl Termination {
    pub fn new(deadline: Instant, grace: Duration) -> Self {
        Self {
            deadline,
            grace,
            state: TerminationState::Running,
        }
    }

    pub fn state(&self) -> TerminationState {
        self.state
    }

    /// 종료 절차가 시작되었다면 그 원인
    pub fn cause(&self) -> Option<TerminationCause> {
        match self.state {
            TerminationState::Running => None,
            TerminationState::Signaled { cause, .. } | TerminationState::Killed { cause } => {
                Some(cause)
            }
        }
    }

    pub async fn next(&self, cancel: &CancelToken) -> Step {
        match self.state {
            TerminationState::Running => {
                tokio::select! {
                    _ = tokio::time::sleep_until(self.deadline) => Step::Signal(TerminationCause::Deadline),
                    _ = cancel.cancelled() => Step::Signal(TerminationCause::Cancelled),
                }
            }
            TerminationState::Signaled { at, .. } => {
                tokio::time::sleep_until(at + self.grace).await;
                Step::Kill
            }
            TerminationState::Killed { .. } => futures::future::pending().await,
        }
    }

    pub fn advance(&mut self, child: &mut Child, step: Step) {
        match (self.state, step) {
            (TerminationState::Running, Step::Signal(cause)) => {
                tracing::debug!(pid = ?child.id(), ?cause, "sending SIGTERM");
                send_terminate(child);
                self.state = TerminationState::Signaled {
                    cause,
                    at: Instant::now(),
                };
            }
            (TerminationState::Signaled { cause, .. }, Step::Kill) => {
                tracing::debug!(pid = ?child.id(), "grace period elapsed, killing");
                if let Err(e) = child.start_kill() {
                    tracing::warn!(error = %e, "failed to kill child");
                }
                self.state = TerminationState::Killed { cause };
            }
            _ => {}
        }
    }
}

#[cfg(unix)]
fn send_terminate(child: &mut Child) {
    // wait()가 끝나기 전이므로 pid는 아직 회수되지 않은 상태
    if let Some(pid) = child.id() {
        let result = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if result != 0 {
            tracing::warn!(pid, error = %std::io::Error::last_os_error(), "SIGTERM failed");
        }
    }
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child) {
    let _ = child.start_kill();
}
