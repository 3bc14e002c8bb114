use crate::api::client::{ByteStream, MockStreamProducer, MockSuggestProducer};
use crate::types::{ChatRequest, SuggestRequest};
use anyhow::Result;
use bytes::Bytes;
use futures::stream;
use std::sync::{Arc, Mutex};

/// Scripted chat endpoint: each configured response is a list of SSE frames
/// played back for one `create_stream` call, in order.
#[derive(Clone)]
pub struct MockChatClient {
    responses: Arc<Mutex<Vec<Vec<String>>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl MockChatClient {
    pub fn new(responses: Vec<Vec<String>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn recorded_requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl MockStreamProducer for MockChatClient {
    fn create_mock_stream(&self, request: &ChatRequest) -> Result<ByteStream> {
        self.requests.lock().unwrap().push(request.clone());

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(anyhow::anyhow!("MockChatClient: no more responses configured"));
        }
        let frames = responses.remove(0);

        let byte_chunks: Vec<Result<Bytes>> = frames
            .into_iter()
            .map(|frame| {
                let framed = if frame.ends_with("\n\n") {
                    frame
                } else {
                    format!("{frame}\n\n")
                };
                Ok(Bytes::from(framed))
            })
            .collect();

        Ok(Box::pin(stream::iter(byte_chunks)))
    }
}

/// Scripted suggestion endpoint recording every request it receives.
#[derive(Clone)]
pub struct MockSuggestClient {
    responses: Arc<Mutex<Vec<Result<Vec<String>, String>>>>,
    requests: Arc<Mutex<Vec<SuggestRequest>>>,
}

impl MockSuggestClient {
    pub fn new(responses: Vec<Result<Vec<String>, String>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn recorded_requests(&self) -> Vec<SuggestRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl MockSuggestProducer for MockSuggestClient {
    fn suggest(&self, request: &SuggestRequest) -> Result<Vec<String>> {
        self.requests.lock().unwrap().push(request.clone());

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(anyhow::anyhow!("MockSuggestClient: no more responses configured"));
        }
        match responses.remove(0) {
            Ok(questions) => Ok(questions),
            Err(message) => Err(anyhow::anyhow!(message)),
        }
    }
}
