//! Bounded record of network traffic seen by a page.
//!
//! Fed from CDP `Network.requestWillBeSent` / `Network.responseReceived`
//! events. Both the standard CDP shape (`{requestId, request: {...}}`) and the
//! flattened shape (`{requestId, url, method}`) are accepted.

use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
struct CapturedRequest {
    url: String,
    method: Option<String>,
    resource_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapturedResponse {
    pub request_id: String,
    pub url: String,
    pub status: Option<u16>,
    pub mime_type: Option<String>,
    pub resource_type: Option<String>,
}

#[derive(Debug)]
pub struct NetworkMonitor {
    max_entries: usize,
    requests: VecDeque<CapturedRequest>,
    responses: VecDeque<CapturedResponse>,
}

impl NetworkMonitor {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            requests: VecDeque::new(),
            responses: VecDeque::new(),
        }
    }

    pub fn record_request(&mut self, params: &Value) {
        if str_field(params, "requestId").is_none() {
            return;
        }
        let inner = params.get("request").unwrap_or(params);
        let Some(url) = str_field(inner, "url") else {
            return;
        };
        let entry = CapturedRequest {
            url,
            method: str_field(inner, "method"),
            resource_type: str_field(params, "type"),
        };
        debug!(
            method = ?entry.method,
            kind = ?entry.resource_type,
            url = %entry.url,
            "Network request captured"
        );
        if self.requests.len() >= self.max_entries {
            self.requests.pop_front();
        }
        self.requests.push_back(entry);
    }

    pub fn record_response(&mut self, params: &Value) {
        let Some(request_id) = str_field(params, "requestId") else {
            return;
        };
        let inner = params.get("response").unwrap_or(params);
        let Some(url) = str_field(inner, "url") else {
            return;
        };
        let entry = CapturedResponse {
            request_id,
            url,
            status: inner
                .get("status")
                .and_then(|v| v.as_f64())
                .map(|s| s as u16),
            mime_type: str_field(inner, "mimeType"),
            resource_type: str_field(params, "type"),
        };
        debug!(status = ?entry.status, url = %entry.url, "Network response captured");
        if self.responses.len() >= self.max_entries {
            self.responses.pop_front();
        }
        self.responses.push_back(entry);
    }

    /// Responses in arrival order, optionally filtered by a URL substring.
    pub fn responses(&self, url_filter: Option<&str>) -> Vec<CapturedResponse> {
        match url_filter {
            Some(filter) => {
                let filter = filter.to_lowercase();
                self.responses
                    .iter()
                    .filter(|r| r.url.to_lowercase().contains(&filter))
                    .cloned()
                    .collect()
            }
            None => self.responses.iter().cloned().collect(),
        }
    }

    pub fn clear(&mut self) {
        self.requests.clear();
        self.responses.clear();
    }

    /// Number of buffered `(requests, responses)`.
    pub fn counts(&self) -> (usize, usize) {
        (self.requests.len(), self.responses.len())
    }
}

fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(|x| x.as_str()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response_event(id: &str, url: &str) -> Value {
        json!({
            "requestId": id,
            "type": "Fetch",
            "response": {"url": url, "status": 200, "mimeType": "application/json"}
        })
    }

    #[test]
    fn test_records_standard_shape() {
        let mut mon = NetworkMonitor::new(10);
        mon.record_request(&json!({
            "requestId": "1",
            "type": "XHR",
            "request": {"url": "https://rapidapi.com/graphql", "method": "POST", "postData": "{}"}
        }));
        mon.record_response(&response_event("1", "https://rapidapi.com/graphql"));

        assert_eq!(mon.counts(), (1, 1));
        assert_eq!(mon.requests[0].method.as_deref(), Some("POST"));
        assert_eq!(mon.requests[0].resource_type.as_deref(), Some("XHR"));
        let resps = mon.responses(None);
        assert_eq!(resps[0].status, Some(200));
        assert_eq!(resps[0].resource_type.as_deref(), Some("Fetch"));
    }

    #[test]
    fn test_records_flat_shape() {
        let mut mon = NetworkMonitor::new(10);
        mon.record_response(&json!({"requestId": "7", "url": "https://x/api/a", "status": 404}));
        assert_eq!(mon.responses(None)[0].status, Some(404));
    }

    #[test]
    fn test_ignores_events_without_id_or_url() {
        let mut mon = NetworkMonitor::new(10);
        mon.record_response(&json!({"response": {"url": "https://x"}}));
        mon.record_request(&json!({"requestId": "1", "request": {}}));
        assert_eq!(mon.counts(), (0, 0));
    }

    #[test]
    fn test_buffer_is_bounded_and_drops_oldest() {
        let mut mon = NetworkMonitor::new(3);
        for i in 0..5 {
            mon.record_response(&response_event(&i.to_string(), &format!("https://x/api/{}", i)));
        }
        let ids: Vec<String> = mon.responses(None).into_iter().map(|r| r.request_id).collect();
        assert_eq!(ids, vec!["2", "3", "4"]);
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let mut mon = NetworkMonitor::new(10);
        mon.record_response(&response_event("1", "https://rapidapi.com/GraphQL"));
        mon.record_response(&response_event("2", "https://rapidapi.com/static/app.js"));
        assert_eq!(mon.responses(Some("graphql")).len(), 1);
        mon.clear();
        assert_eq!(mon.counts(), (0, 0));
    }
}
