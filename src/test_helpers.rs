// Scripted stand-in for the reports API, unit tests only

use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::api::{ReportsApi, Success, classify};
use crate::error::ApiError;
use crate::models::ReportResponse;

#[derive(Debug, Clone)]
pub enum FetchReply {
    Status(u16),
    Body { id: u64, value: String },
}

#[derive(Debug, Default)]
pub struct FakeApi {
    create_replies: Mutex<VecDeque<u16>>,
    fetch_replies: Mutex<VecDeque<FetchReply>>,
    delete_replies: Mutex<VecDeque<u16>>,
    calls: Mutex<Vec<(&'static str, u64)>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_create(self, code: u16) -> Self {
        self.create_replies.lock().unwrap().push_back(code);
        self
    }

    pub fn on_fetch(self, reply: FetchReply) -> Self {
        self.fetch_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn on_delete(self, code: u16) -> Self {
        self.delete_replies.lock().unwrap().push_back(code);
        self
    }

    pub fn calls(&self) -> Vec<(&'static str, u64)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str, id: u64) {
        self.calls.lock().unwrap().push((call, id));
    }
}

fn status(code: u16) -> Result<Success, ApiError> {
    classify(StatusCode::from_u16(code).unwrap())
}

#[async_trait]
impl ReportsApi for FakeApi {
    async fn create(&self, id: u64) -> Result<Success, ApiError> {
        self.record("create", id);
        let code = self.create_replies.lock().unwrap().pop_front().unwrap_or(201);
        status(code)
    }

    async fn fetch(&self, id: u64) -> Result<Option<ReportResponse>, ApiError> {
        self.record("fetch", id);
        let reply = self
            .fetch_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(FetchReply::Status(404));
        match reply {
            FetchReply::Body { id, value } => Ok(Some(ReportResponse { id, value })),
            FetchReply::Status(code) => match status(code)? {
                Success::Ok => Err(ApiError::Decode("empty body".to_string())),
                _ => Ok(None),
            },
        }
    }

    async fn delete(&self, id: u64) -> Result<Success, ApiError> {
        self.record("delete", id);
        let code = self.delete_replies.lock().unwrap().pop_front().unwrap_or(204);
        status(code)
    }
}
