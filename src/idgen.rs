//! 64 位全局唯一 ID 生成
//!
//! 布局（高位到低位）：1 位保留 | 39 位时间（10ms 为单位，自 2025-01-01 UTC 起）
//! | 8 位序列号 | 16 位节点号。

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use crate::errors::{Result, StatsError};

/// 节点号上限（含）
pub const MAX_NODE_ID: u16 = 1024;

const BITS_TIME: u32 = 39;
const BITS_SEQUENCE: u32 = 8;
const BITS_NODE: u32 = 16;
const TIME_UNIT_MS: i64 = 10;
const SEQUENCE_MASK: u16 = (1 << BITS_SEQUENCE) - 1;

/// ID 生成能力
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> Result<i64>;
}

struct State {
    elapsed: i64,
    sequence: u16,
}

/// sonyflake 布局的 ID 生成器
pub struct SnowflakeGenerator {
    node_id: u16,
    epoch: DateTime<Utc>,
    state: Mutex<State>,
}

impl SnowflakeGenerator {
    pub fn new(node_id: u16) -> Result<Self> {
        if node_id > MAX_NODE_ID {
            return Err(StatsError::id_generator(format!(
                "node id {} exceeds {}",
                node_id, MAX_NODE_ID
            )));
        }
        let epoch = Utc
            .with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
            .single()
            .ok_or_else(|| StatsError::id_generator("invalid epoch"))?;
        Ok(Self {
            node_id,
            epoch,
            state: Mutex::new(State {
                elapsed: 0,
                sequence: SEQUENCE_MASK,
            }),
        })
    }

    fn current_elapsed(&self) -> i64 {
        (Utc::now() - self.epoch).num_milliseconds() / TIME_UNIT_MS
    }

    /// 从 ID 中取出节点号
    pub fn node_of(id: i64) -> u16 {
        (id & ((1 << BITS_NODE) - 1)) as u16
    }
}

impl IdGenerator for SnowflakeGenerator {
    fn next_id(&self) -> Result<i64> {
        let now = self.current_elapsed();
        let mut state = self.state.lock();

        if now > state.elapsed {
            state.elapsed = now;
            state.sequence = 0;
        } else {
            // 同一时间片或时钟回拨：沿用逻辑时间，序列号耗尽则借用下一时间片
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                state.elapsed += 1;
            }
        }

        if state.elapsed >= 1 << BITS_TIME {
            return Err(StatsError::id_generator("time bits exhausted"));
        }

        Ok((state.elapsed << (BITS_SEQUENCE + BITS_NODE))
            | ((state.sequence as i64) << BITS_NODE)
            | self.node_id as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let generator = SnowflakeGenerator::new(7).unwrap();
        let mut last = 0;
        let mut seen = HashSet::new();
        for _ in 0..5000 {
            let id = generator.next_id().unwrap();
            assert!(id > last);
            assert!(seen.insert(id));
            last = id;
        }
    }

    #[test]
    fn test_node_id_embedded() {
        let generator = SnowflakeGenerator::new(MAX_NODE_ID).unwrap();
        let id = generator.next_id().unwrap();
        assert!(id > 0);
        assert_eq!(SnowflakeGenerator::node_of(id), MAX_NODE_ID);
    }

    #[test]
    fn test_rejects_out_of_range_node() {
        assert!(SnowflakeGenerator::new(MAX_NODE_ID + 1).is_err());
    }
}
