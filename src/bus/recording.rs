//! Bus fake that records calls instead of talking to a broker.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::Bus;
use crate::error::{DomicileError, Result};

#[derive(Default)]
pub struct RecordingBus {
    published: Mutex<Vec<(String, String)>>,
    subscribed: Mutex<Vec<String>>,
    /// Every call in order, as "pub <topic>" / "sub <topic>".
    calls: Mutex<Vec<String>>,
    fail_subscribe: Mutex<bool>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().clone()
    }

    pub fn subscribed(&self) -> Vec<String> {
        self.subscribed.lock().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn fail_subscriptions(&self, fail: bool) {
        *self.fail_subscribe.lock() = fail;
    }
}

#[async_trait]
impl Bus for RecordingBus {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        self.calls.lock().push(format!("pub {topic}"));
        self.published.lock().push((
            topic.to_string(),
            String::from_utf8_lossy(payload).into_owned(),
        ));
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<()> {
        if *self.fail_subscribe.lock() {
            return Err(DomicileError::ShuttingDown("subscribe"));
        }
        self.calls.lock().push(format!("sub {topic}"));
        self.subscribed.lock().push(topic.to_string());
        Ok(())
    }
}
