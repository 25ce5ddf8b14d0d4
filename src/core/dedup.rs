use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};

pub const DEFAULT_DEDUP_CAPACITY: usize = 100;

/// 最近處理過的訊息 id，固定容量、先進先出
///
/// 只是盡力而為的防護：比視窗更舊的重複訊息會被當成新訊息再處理一次。
/// 容量可由設定檔 `[dedup].capacity` 調整。
pub struct DedupWindow {
    capacity: usize,
    inner: Mutex<WindowState>,
}

#[derive(Default)]
struct WindowState {
    order: VecDeque<String>,
    members: HashSet<String>,
}

impl DedupWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(WindowState {
                order: VecDeque::with_capacity(capacity),
                members: HashSet::with_capacity(capacity),
            }),
        }
    }

    /// 已在視窗內回傳 true（呼叫端應略過）；否則記錄並回傳 false
    ///
    /// 命中時不重新排序，淘汰順序只看第一次記錄的時間。
    pub fn seen(&self, id: &str) -> bool {
        let mut state = self.inner.lock();
        if state.members.contains(id) {
            return true;
        }

        if state.order.len() >= self.capacity {
            if let Some(oldest) = state.order.pop_front() {
                state.members.remove(&oldest);
            }
        }
        state.order.push_back(id.to_string());
        state.members.insert(id.to_string());
        false
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.lock().members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for DedupWindow {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_CAPACITY)
    }
}
