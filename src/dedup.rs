//! 事件去重 - 保证同一逻辑事件至多处理一次
//!
//! 上游投递机制会重试，同一事件可能并发或先后到达多次。去重键由
//! (table, operation, record.id) 确定性导出；守卫用文件系统的
//! `create_new`（O_EXCL）作为原子的 insert-if-absent 原语，不依赖
//! 进程内锁。去重目录只增不删，保留清理是外部职责。
//!
//! 存储故障时 fail-open：宁可重复通知，也不能在去重存储不健康时
//! 静默丢掉真实通知。

use std::collections::hash_map::DefaultHasher;
use std::fs::{self, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::event::ChangeEvent;

/// 去重判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// 首次出现，继续处理
    Fresh,
    /// 重复事件，调用方应以 skipped 成功结束
    Duplicate,
}

/// Hash content using DefaultHasher
pub fn hash_content(content: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

/// Derive the deterministic dedup key for an event
///
/// Format: `<table>.<operation>.<16-hex-hash-of-id>`, filename-safe and
/// stable across deliveries of the same logical event. Records without an
/// `id` hash their full serialized form instead, so malformed-but-parseable
/// rows still dedup consistently.
pub fn dedup_key(event: &ChangeEvent) -> String {
    let identity = event
        .record_id()
        .unwrap_or_else(|| event.record.to_string());
    format!(
        "{}.{}.{:016x}",
        sanitize(&event.table),
        event.event_type.as_str(),
        hash_content(&identity)
    )
}

/// 表名可能来自不受控的入站 JSON，落盘前收敛成文件名安全字符
fn sanitize(table: &str) -> String {
    table
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// 去重守卫 - marker 文件目录上的原子 insert-if-absent
pub struct DedupGuard {
    dedup_dir: PathBuf,
}

impl DedupGuard {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            dedup_dir: data_dir.into().join("dedup"),
        }
    }

    /// 尝试获准处理一个事件
    ///
    /// `create_new` 在 key 已存在时失败（AlreadyExists），这就是存储层的
    /// compare-and-set；任何其他 I/O 错误记 warning 后放行（fail-open）。
    pub fn admit(&self, event: &ChangeEvent) -> Admission {
        let key = dedup_key(event);

        if let Err(e) = fs::create_dir_all(&self.dedup_dir) {
            warn!(error = %e, "Dedup store unavailable, processing event anyway");
            return Admission::Fresh;
        }

        let marker = self.dedup_dir.join(&key);
        match OpenOptions::new().write(true).create_new(true).open(&marker) {
            Ok(_) => {
                debug!(key = %key, "Event admitted");
                Admission::Fresh
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(key = %key, "Duplicate event blocked");
                Admission::Duplicate
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Dedup insert failed, processing event anyway");
                Admission::Fresh
            }
        }
    }
}
