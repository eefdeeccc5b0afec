//! Scriptable in-memory provider for handler tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{MigrationProvider, MigrationResult, MigrationStatus, ProviderError};

type Reply<T> = Mutex<Option<Result<T, String>>>;

#[derive(Default)]
pub struct FakeProvider {
    status_reply: Reply<Vec<MigrationStatus>>,
    up_reply: Reply<Vec<MigrationResult>>,
    down_reply: Reply<MigrationResult>,
    up_to_reply: Reply<Vec<MigrationResult>>,
    down_to_reply: Reply<Vec<MigrationResult>>,

    status_calls: AtomicUsize,
    up_calls: AtomicUsize,
    down_calls: AtomicUsize,
    up_to_args: Mutex<Vec<i64>>,
    down_to_args: Mutex<Vec<i64>>,
}

fn set<T>(slot: &Reply<T>, reply: Result<T, String>) {
    *slot.lock().unwrap() = Some(reply);
}

fn take<T: Clone>(slot: &Reply<T>, op: &str) -> Result<T, ProviderError> {
    match slot.lock().unwrap().as_ref() {
        Some(Ok(v)) => Ok(v.clone()),
        Some(Err(msg)) => Err(ProviderError::Other(msg.clone())),
        None => Err(ProviderError::Other(format!("fake: no reply scripted for {op}"))),
    }
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_returns(&self, reply: Result<Vec<MigrationStatus>, String>) {
        set(&self.status_reply, reply);
    }

    pub fn up_returns(&self, reply: Result<Vec<MigrationResult>, String>) {
        set(&self.up_reply, reply);
    }

    pub fn down_returns(&self, reply: Result<MigrationResult, String>) {
        set(&self.down_reply, reply);
    }

    pub fn up_to_returns(&self, reply: Result<Vec<MigrationResult>, String>) {
        set(&self.up_to_reply, reply);
    }

    pub fn down_to_returns(&self, reply: Result<Vec<MigrationResult>, String>) {
        set(&self.down_to_reply, reply);
    }

    pub fn status_call_count(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn up_call_count(&self) -> usize {
        self.up_calls.load(Ordering::SeqCst)
    }

    pub fn down_call_count(&self) -> usize {
        self.down_calls.load(Ordering::SeqCst)
    }

    pub fn up_to_args(&self) -> Vec<i64> {
        self.up_to_args.lock().unwrap().clone()
    }

    pub fn down_to_args(&self) -> Vec<i64> {
        self.down_to_args.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MigrationProvider for FakeProvider {
    async fn status(&self) -> Result<Vec<MigrationStatus>, ProviderError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        take(&self.status_reply, "status")
    }

    async fn up(&self) -> Result<Vec<MigrationResult>, ProviderError> {
        self.up_calls.fetch_add(1, Ordering::SeqCst);
        take(&self.up_reply, "up")
    }

    async fn down(&self) -> Result<MigrationResult, ProviderError> {
        self.down_calls.fetch_add(1, Ordering::SeqCst);
        take(&self.down_reply, "down")
    }

    async fn up_to(&self, version: i64) -> Result<Vec<MigrationResult>, ProviderError> {
        self.up_to_args.lock().unwrap().push(version);
        take(&self.up_to_reply, "up_to")
    }

    async fn down_to(&self, version: i64) -> Result<Vec<MigrationResult>, ProviderError> {
        self.down_to_args.lock().unwrap().push(version);
        take(&self.down_to_reply, "down_to")
    }
}
