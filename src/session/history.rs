use std::collections::VecDeque;

/// 기본 최대 항목 수
pub const DEFAULT_CAPACITY: usize = 100;

/// 세션 프롬프트 히스토리 (가장 오래된 항목부터 제거)
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<String>,
    max_entries: usize,
}

impl History {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries.min(DEFAULT_CAPACITY)),
            max_entries: max_entries.max(1),
        }
    }

    pub fn push(&mut self, prompt: impl Into<String>) {
        if self.entries.len() == self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(prompt.into());
    }

    /// 1부터 시작하는 번호로 조회
    pub fn get(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.back().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
