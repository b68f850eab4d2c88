//! End-to-end tests for the fetch → parse → diff → dispatch → save cycle

use anyhow::Result;
use async_trait::async_trait;
use notice_monitor::{
    Category, ChannelKind, ChannelSender, CycleOutcome, FetchResponse, Fetcher, Item,
    JsonFileStore, MemoryStore, NotificationDispatcher, PollCycle, SendResult, Snapshot,
    StateStore,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const PAGE: &str = r#"
<html><body>
<section class="block">
  <h2>Latest announcements</h2>
  <div class="content"><ul>
    <li class="post">
      <a href="/x">Exam Postponed</a>
      <div class="date">2024-01-01</div>
      <div class="name">Admin</div>
    </li>
  </ul></div>
</section>
</body></html>
"#;

/// Serves a fixed response and counts fetches
struct StaticFetcher {
    response: FetchResponse,
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self) -> Result<FetchResponse> {
        Ok(self.response.clone())
    }
}

struct ErrorFetcher;

#[async_trait]
impl Fetcher for ErrorFetcher {
    async fn fetch(&self) -> Result<FetchResponse> {
        anyhow::bail!("connection refused")
    }
}

/// Records every batch handed to it
struct CapturingChannel {
    name: &'static str,
    kind: ChannelKind,
    calls: AtomicUsize,
    messages: Mutex<Vec<String>>,
}

impl CapturingChannel {
    fn new(name: &'static str, kind: ChannelKind) -> Arc<Self> {
        Arc::new(Self {
            name,
            kind,
            calls: AtomicUsize::new(0),
            messages: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ChannelSender for CapturingChannel {
    fn name(&self) -> &str {
        self.name
    }

    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn send_one(&self, body: &str) -> Result<()> {
        self.messages.lock().unwrap().push(body.to_string());
        Ok(())
    }

    async fn send_items(&self, messages: &[String]) -> Result<notice_monitor::SendSummary> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.messages.lock().unwrap().extend_from_slice(messages);
        Ok(notice_monitor::SendSummary {
            attempted: messages.len(),
            sent: messages.len(),
            failed: 0,
        })
    }
}

fn dispatcher_with(channels: &[Arc<CapturingChannel>]) -> NotificationDispatcher {
    let mut dispatcher = NotificationDispatcher::new();
    for channel in channels {
        dispatcher.register_channel(channel.clone());
    }
    dispatcher
}

#[tokio::test]
async fn test_new_announcement_is_dispatched_and_persisted() {
    // Given: 页面上有一条公告，之前没有状态
    let telegram = CapturingChannel::new("telegram", ChannelKind::Telegram);
    let whatsapp = CapturingChannel::new("whatsapp", ChannelKind::WhatsApp);
    let store = Arc::new(MemoryStore::new());
    let cycle = PollCycle::new(
        Arc::new(StaticFetcher {
            response: FetchResponse::ok(PAGE),
        }),
        store.clone(),
        dispatcher_with(&[telegram.clone(), whatsapp.clone()]),
    )
    .unwrap();

    // When
    let outcome = cycle.run().await;

    // Then: 每个渠道一条消息，状态等于当前快照
    match &outcome {
        CycleOutcome::Dispatched {
            new_items,
            report,
            saved,
        } => {
            assert_eq!(*new_items, 1);
            assert!(*saved);
            assert!(matches!(report.result_for("telegram"), Some(SendResult::Sent(_))));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    assert_eq!(telegram.calls.load(Ordering::SeqCst), 1);
    assert_eq!(whatsapp.calls.load(Ordering::SeqCst), 1);
    assert_eq!(telegram.messages.lock().unwrap().len(), 1);
    assert_eq!(
        whatsapp.messages.lock().unwrap()[0],
        "📢 New Latest Announcements Alert!\nExam Postponed\n🔗 /x\n🗓 2024-01-01\n👤 Admin"
    );

    let saved = store.snapshot().unwrap();
    assert_eq!(
        saved.items(Category::LatestAnnouncements),
        &[Item::new("Exam Postponed", "/x").with_byline("2024-01-01", "Admin")]
    );
    assert_eq!(saved.total_items(), 1);
}

#[tokio::test]
async fn test_second_cycle_with_same_page_sends_nothing() {
    let channel = CapturingChannel::new("whatsapp", ChannelKind::WhatsApp);
    let store = Arc::new(MemoryStore::new());
    let cycle = PollCycle::new(
        Arc::new(StaticFetcher {
            response: FetchResponse::ok(PAGE),
        }),
        store.clone(),
        dispatcher_with(&[channel.clone()]),
    )
    .unwrap();

    cycle.run().await;
    let outcome = cycle.run().await;

    assert_eq!(outcome, CycleOutcome::NoChanges);
    assert_eq!(channel.calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.save_count(), 1);
}

#[tokio::test]
async fn test_non_200_leaves_state_untouched() {
    let channel = CapturingChannel::new("whatsapp", ChannelKind::WhatsApp);
    let previous = Snapshot::from_map(
        [(Category::ExamNotifications, vec![Item::new("Old", "/o")])]
            .into_iter()
            .collect(),
    );
    let store = Arc::new(MemoryStore::with_state(previous.clone()));
    let cycle = PollCycle::new(
        Arc::new(StaticFetcher {
            response: FetchResponse::status(502),
        }),
        store.clone(),
        dispatcher_with(&[channel.clone()]),
    )
    .unwrap();

    assert_eq!(cycle.run().await, CycleOutcome::FetchFailed);
    assert_eq!(channel.calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.save_count(), 0);
    assert_eq!(store.snapshot(), Some(previous));
}

#[tokio::test]
async fn test_status_200_without_body_is_fetch_failure() {
    let store = Arc::new(MemoryStore::new());
    let cycle = PollCycle::new(
        Arc::new(StaticFetcher {
            response: FetchResponse {
                status: 200,
                body: None,
            },
        }),
        store.clone(),
        NotificationDispatcher::new(),
    )
    .unwrap();

    assert_eq!(cycle.run().await, CycleOutcome::FetchFailed);
    assert_eq!(store.save_count(), 0);
}

#[tokio::test]
async fn test_transport_error_is_not_fatal() {
    let store = Arc::new(MemoryStore::new());
    let cycle = PollCycle::new(Arc::new(ErrorFetcher), store.clone(), NotificationDispatcher::new())
        .unwrap();

    assert_eq!(cycle.run().await, CycleOutcome::FetchFailed);
    assert_eq!(cycle.run().await, CycleOutcome::FetchFailed);
    assert_eq!(store.save_count(), 0);
}

#[tokio::test]
async fn test_state_survives_restart_with_file_store() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    let channel = CapturingChannel::new("whatsapp", ChannelKind::WhatsApp);

    // 第一次运行
    {
        let store = Arc::new(JsonFileStore::new(&path));
        let cycle = PollCycle::new(
            Arc::new(StaticFetcher {
                response: FetchResponse::ok(PAGE),
            }),
            store.clone(),
            dispatcher_with(&[channel.clone()]),
        )
        .unwrap();
        assert!(matches!(cycle.run().await, CycleOutcome::Dispatched { .. }));
        store.close().await.unwrap();
    }

    // 重启后同一页面没有新增
    let store = Arc::new(JsonFileStore::new(&path));
    let cycle = PollCycle::new(
        Arc::new(StaticFetcher {
            response: FetchResponse::ok(PAGE),
        }),
        store,
        dispatcher_with(&[channel.clone()]),
    )
    .unwrap();
    assert_eq!(cycle.run().await, CycleOutcome::NoChanges);
    assert_eq!(channel.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_no_channels_still_persists_state() {
    let store = Arc::new(MemoryStore::new());
    let cycle = PollCycle::new(
        Arc::new(StaticFetcher {
            response: FetchResponse::ok(PAGE),
        }),
        store.clone(),
        NotificationDispatcher::new(),
    )
    .unwrap();

    match cycle.run().await {
        CycleOutcome::Dispatched { report, saved, .. } => {
            assert_eq!(report.invoked(), 0);
            assert!(saved);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(store.save_count(), 1);
}
