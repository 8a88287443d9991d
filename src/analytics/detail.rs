//! 明细处理器：每个事件写一行 click_events，写入结果不影响确认

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, warn};

use super::device::{self, truncate};
use super::message::ClickEventMessage;
use super::sink::ClickRecorder;
use super::{ClickRecord, SHORT_CODE_MAX_LEN};
use crate::consumer::{AckHandle, MessageHandler};

pub struct DetailHandler {
    handler_key: String,
    recorder: Arc<dyn ClickRecorder>,
}

impl DetailHandler {
    pub fn new(handler_key: impl Into<String>, recorder: Arc<dyn ClickRecorder>) -> Self {
        Self {
            handler_key: handler_key.into(),
            recorder,
        }
    }

    /// 消息转为明细行，字段按列宽截断
    pub fn to_record(mut message: ClickEventMessage) -> ClickRecord {
        message.default_click_time(Utc::now());
        let device = device::detect(&message.user_agent);
        let click_time = message.click_time_utc();

        ClickRecord {
            short_code: truncate(&message.short_code, SHORT_CODE_MAX_LEN),
            original_url: truncate(&message.original_url, 2048),
            ip: truncate(&message.ip, 45),
            user_agent: message.user_agent,
            referer: truncate(&message.referer, 512),
            country: truncate(&message.country, 2),
            region: truncate(&message.region, 100),
            city: truncate(&message.city, 100),
            device,
            click_time,
            click_by: truncate(&message.click_by, 100),
        }
    }
}

#[async_trait]
impl MessageHandler for DetailHandler {
    async fn handle(&self, topic: &str, payload: &[u8], ack: AckHandle) {
        let message = match ClickEventMessage::parse(payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    handler = %self.handler_key,
                    topic,
                    offset = ack.offset(),
                    "Failed to unmarshal click message: {}",
                    e
                );
                ack.ack();
                return;
            }
        };

        let event_id = message.envelope.event_id.clone();
        let record = Self::to_record(message);
        match self.recorder.record_click(&record).await {
            Ok(()) => debug!(
                handler = %self.handler_key,
                event_id = %event_id,
                short_code = %record.short_code,
                "Click recorded"
            ),
            Err(e) => error!(
                handler = %self.handler_key,
                event_id = %event_id,
                short_code = %record.short_code,
                "Failed to record click: {}",
                e
            ),
        }
        ack.ack();
    }
}
