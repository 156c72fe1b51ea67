//! Shared doubles for the end-to-end scenarios: an in-memory chat
//! transport, an in-memory sheet, and a fixed galaxy catalog.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rampart::{
    ChannelId, ChatAuthor, ChatEvent, ChatTransport, GuildId, MessageId, Result, RetryClient,
    SystemCatalog, UserId,
};
use rampart_sheets::client::{InputOption, MajorDim, SheetClient, ValueRender};
use rampart_sheets::CellUpdate;

/// Transport double capturing everything the bot says.
#[derive(Default)]
pub struct FakeTransport {
    /// (channel, text) pairs of plain sends.
    pub sent: Mutex<Vec<(ChannelId, String)>>,
    /// (channel, text) pairs of TTL sends.
    pub ttl_sent: Mutex<Vec<(ChannelId, String)>>,
    /// Deleted message ids.
    pub deleted: Mutex<Vec<MessageId>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// All text sent anywhere, in order.
    pub fn all_text(&self) -> Vec<String> {
        let mut out: Vec<String> =
            self.sent.lock().iter().map(|(_, text)| text.clone()).collect();
        out.extend(self.ttl_sent.lock().iter().map(|(_, text)| text.clone()));
        out
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn send(&self, channel: ChannelId, text: &str) -> Result<MessageId> {
        self.sent.lock().push((channel, text.to_string()));
        Ok(MessageId(0))
    }

    async fn send_ttl(&self, channel: ChannelId, text: &str, _ttl: Duration) -> Result<()> {
        self.ttl_sent.lock().push((channel, text.to_string()));
        Ok(())
    }

    async fn delete(&self, _channel: ChannelId, message: MessageId) -> Result<()> {
        self.deleted.lock().push(message);
        Ok(())
    }

    async fn broadcast(&self, text: &str) -> Result<()> {
        self.sent.lock().push((ChannelId(0), text.to_string()));
        Ok(())
    }
}

/// Sheet double: serves a fixed snapshot, records batch writes.
pub struct FakeSheet {
    pub cells: Mutex<Vec<Vec<String>>>,
    pub updates: Mutex<Vec<CellUpdate>>,
}

impl FakeSheet {
    pub fn new(cells: Vec<Vec<String>>) -> Arc<Self> {
        Arc::new(Self { cells: Mutex::new(cells), updates: Mutex::new(Vec::new()) })
    }

    pub fn empty() -> Arc<Self> {
        Self::new(Vec::new())
    }

    pub fn client(self: &Arc<Self>) -> RetryClient {
        RetryClient::new(Arc::clone(self) as Arc<dyn SheetClient>)
    }
}

#[async_trait]
impl SheetClient for FakeSheet {
    async fn title(&self) -> Result<String> {
        Ok("Test Document".into())
    }

    async fn whole_sheet(&self) -> Result<Vec<Vec<String>>> {
        Ok(self.cells.lock().clone())
    }

    async fn batch_get(
        &self,
        _ranges: &[String],
        _dim: MajorDim,
        _render: ValueRender,
    ) -> Result<Vec<Vec<Vec<String>>>> {
        Ok(vec![])
    }

    async fn batch_update(&self, updates: &[CellUpdate], _input: InputOption) -> Result<()> {
        self.updates.lock().extend(updates.iter().cloned());
        Ok(())
    }

    async fn change_worksheet(&self, _page: &str) -> Result<()> {
        Ok(())
    }
}

/// Catalog double over a fixed coverage map.
pub struct FakeCatalog {
    pub coverage: BTreeMap<String, Vec<String>>,
}

impl SystemCatalog for FakeCatalog {
    fn systems_within(&self, centre: &str, _dist_ly: f64) -> Result<Vec<String>> {
        Ok(self.coverage.get(centre).cloned().unwrap_or_default())
    }

    fn distance(&self, _from: &str, _to: &str) -> Result<f64> {
        Ok(100.0)
    }
}

/// A chat event for `author` saying `content` on the default channel.
pub fn event(author: &ChatAuthor, content: &str) -> ChatEvent {
    ChatEvent {
        guild_id: GuildId(10),
        guild_name: "Test Guild".into(),
        channel_id: ChannelId(20),
        channel_name: "ops".into(),
        message_id: MessageId(30),
        author: author.clone(),
        content: content.to_string(),
        mentions: Vec::new(),
        channel_mentions: Vec::new(),
        role_mentions: Vec::new(),
        timestamp: Utc::now(),
    }
}

/// A simple author.
pub fn author(id: u64, name: &str) -> ChatAuthor {
    ChatAuthor::new(UserId(id), name)
}
