use std::net::SocketAddr;

use tiny_http::Method;

use crate::request::RequestHead;
use crate::response::ResponseWriter;
use crate::utils::{generate_hex_id, time_us, ResultV};


const MODULE: &str = "EXCHANGE";
const QID_LENGTH: u32 = 8;

/// Bookkeeping for one exchange: who asked, what for, and how long it took.
pub struct Context {
    pub qid: String,
    pub peer: Option<SocketAddr>,
    pub method: Option<Method>,
    pub url: String,
    pub start_time_us: u128,
    pub finish_time_us: u128,
}

impl Context {
    pub fn new(peer: Option<SocketAddr>) -> Context {
        Context {
            qid: generate_hex_id(QID_LENGTH),
            peer,
            method: None,
            url: String::new(),
            start_time_us: time_us(),
            finish_time_us: 0
        }
    }

    pub fn fix(&mut self) {
        self.finish_time_us = time_us();
    }

    pub fn time_ms(&self) -> f32 {
        (self.finish_time_us.saturating_sub(self.start_time_us) as f32)/1000.0
    }

    /// Remembers the request line and logs the incoming request.
    pub fn record_request(&mut self, head: &RequestHead) {
        self.method = Some(head.method.clone());
        self.url = head.url.clone();

        let headers: String = head.headers.iter().map(|h| -> String {
            h.to_string()
        }).collect::<Vec<String>>().join("\\r\\n");
        info!(
            "[{}] New Request [qid={}]: peer: {}; method: {}; url: {}; headers='{}'",
            MODULE, self.qid, self.peer_name(), head.method, self.url, headers
        );
    }

    /// Stamps completion and logs how the response went.
    pub fn record_response(&mut self, out: &ResponseWriter, result: &ResultV) {
        self.fix();
        match result {
            Ok(()) => info!(
                "[{}] Respond to [{}] {}: time: {}ms; status: {}; sent: {} bytes",
                MODULE, self.qid, self.request_line(), self.time_ms(), out.status().unwrap_or_default(), out.bytes_sent()
            ),
            Err(e) => error!(
                "[{}] Failed to respond to [{}] {}: time: {}ms; sent: {} bytes; {}",
                MODULE, self.qid, self.request_line(), self.time_ms(), out.bytes_sent(), e
            ),
        }
    }

    fn request_line(&self) -> String {
        match &self.method {
            Some(method) => format!("{} {}", method, self.url),
            None => "-".to_string(),
        }
    }

    fn peer_name(&self) -> String {
        self.peer.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string())
    }
}
