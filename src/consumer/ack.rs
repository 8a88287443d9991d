//! 显式确认句柄
//!
//! 处理器拿到 `AckHandle` 后可以立即确认，也可以连同消息一起缓存、
//! 待数据持久化后再确认。句柄只能使用一次。

use std::fmt;

/// 消息确认能力，由具体的消息客户端实现
pub trait Acknowledge: Send {
    fn acknowledge(self: Box<Self>);
}

pub struct AckHandle {
    inner: Box<dyn Acknowledge>,
    partition: i32,
    offset: i64,
}

impl AckHandle {
    pub fn new(inner: Box<dyn Acknowledge>, partition: i32, offset: i64) -> Self {
        Self {
            inner,
            partition,
            offset,
        }
    }

    /// 以闭包作为确认动作
    pub fn from_fn<F>(partition: i32, offset: i64, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::new(Box::new(FnAck(f)), partition, offset)
    }

    /// 确认动作为空
    pub fn noop() -> Self {
        Self::from_fn(-1, -1, || {})
    }

    pub fn partition(&self) -> i32 {
        self.partition
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn ack(self) {
        self.inner.acknowledge();
    }
}

impl fmt::Debug for AckHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AckHandle")
            .field("partition", &self.partition)
            .field("offset", &self.offset)
            .finish()
    }
}

struct FnAck<F>(F);

impl<F> Acknowledge for FnAck<F>
where
    F: FnOnce() + Send + 'static,
{
    fn acknowledge(self: Box<Self>) {
        (self.0)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_ack_runs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let handle = AckHandle::from_fn(3, 42, move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(handle.partition(), 3);
        assert_eq!(handle.offset(), 42);
        handle.ack();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_handle_does_not_ack() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let handle = AckHandle::from_fn(0, 0, move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        drop(handle);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
