//! Shared test fixtures: status documents and a scripted transport.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::client::AvrClient;
use super::status::parse_status_xml;
use super::transport::{AvrTransport, HttpReply};
use crate::error::{AvrError, AvrResult};
use crate::state::Config;

/// Two zones (ON, OFF), stereo enabled with zone 2 as member.
pub const STATUS_TWO_ZONES: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<rx>
  <cmd>
    <zone1>ON</zone1>
    <zone2>OFF</zone2>
  </cmd>
  <cmd>
    <value>1</value>
    <zones>10</zones>
  </cmd>
</rx>"#;

/// Four zones, stereo disabled but zones 2 and 4 flagged.
pub const STATUS_FOUR_ZONES: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<rx>
  <cmd>
    <zone1>ON</zone1>
    <zone2>ON</zone2>
    <zone3>OFF</zone3>
    <zone4>ON</zone4>
  </cmd>
  <cmd>
    <value>0</value>
    <zones>101</zones>
  </cmd>
</rx>"#;

/// Power block only, as returned by firmware that ignores the second command.
pub const STATUS_MISSING_STEREO: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<rx>
  <cmd>
    <zone1>ON</zone1>
  </cmd>
</rx>"#;

/// Builds a status document from zone power texts and stereo fields.
pub fn status_xml(power: &[&str], stereo_value: &str, stereo_zones: &str) -> String {
    let zones: String = power
        .iter()
        .enumerate()
        .map(|(i, text)| format!("<zone{n}>{text}</zone{n}>", n = i + 1))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="utf-8" ?><rx><cmd>{zones}</cmd><cmd><value>{stereo_value}</value><zones>{stereo_zones}</zones></cmd></rx>"#
    )
}

/// Transport returning queued replies, recording every request.
///
/// When the queue is empty the last reply that was a 200 with a parsable body
/// is repeated; before any such reply, polls get HTTP 503. A GET status of 0
/// makes commands fail with a transport error.
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<HttpReply>>,
    last_reply: Mutex<Option<HttpReply>>,
    get_status: AtomicU16,
    delay: Option<Duration>,
    posts: Mutex<Vec<(String, String)>>,
    gets: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            last_reply: Mutex::new(None),
            get_status: AtomicU16::new(200),
            delay: None,
            posts: Mutex::new(Vec::new()),
            gets: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Every POST sleeps for `delay` before replying.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_reply(&self, status: u16, body: impl Into<String>) {
        self.replies.lock().push_back(HttpReply {
            status,
            body: body.into(),
        });
    }

    pub fn set_get_status(&self, status: u16) {
        self.get_status.store(status, Ordering::SeqCst);
    }

    pub fn post_count(&self) -> usize {
        self.posts.lock().len()
    }

    pub fn posts(&self) -> Vec<(String, String)> {
        self.posts.lock().clone()
    }

    pub fn gets(&self) -> Vec<String> {
        self.gets.lock().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AvrTransport for ScriptedTransport {
    async fn post_xml(&self, url: &str, body: &str) -> AvrResult<HttpReply> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.posts.lock().push((url.to_string(), body.to_string()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = {
            let mut last = self.last_reply.lock();
            match self.replies.lock().pop_front() {
                Some(reply) => {
                    if reply.status == 200 && parse_status_xml(&reply.body, 2).is_ok() {
                        *last = Some(reply.clone());
                    }
                    reply
                }
                None => last.clone().unwrap_or(HttpReply {
                    status: 503,
                    body: String::new(),
                }),
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(reply)
    }

    async fn get(&self, url: &str) -> AvrResult<u16> {
        self.gets.lock().push(url.to_string());
        match self.get_status.load(Ordering::SeqCst) {
            0 => Err(AvrError::Http(transport_error())),
            status => Ok(status),
        }
    }
}

/// A real `reqwest::Error`, built from a request whose URL has no host.
pub fn transport_error() -> reqwest::Error {
    match reqwest::Client::new().get("http://").build() {
        Ok(_) => panic!("request without a host should not build"),
        Err(e) => e,
    }
}

/// Client for `192.0.2.10:8080` over the given transport.
pub fn test_client(transport: Arc<ScriptedTransport>) -> Arc<AvrClient> {
    Arc::new(
        AvrClient::with_transport("192.0.2.10", 8080, transport, &Config::default())
            .unwrap(),
    )
}
