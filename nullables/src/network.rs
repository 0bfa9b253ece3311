//! Nullable network: record traffic without sending it.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// A request the node made to a peer or to the network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    pub procedure: String,
    pub data: Vec<u8>,
    /// `None` for requests addressed to "any peer".
    pub peer_id: Option<String>,
}

/// A test network that records messages instead of sending them.
pub struct NullNetwork {
    /// `(event, data)` pairs broadcast by the node.
    broadcasts: Mutex<Vec<(String, Vec<u8>)>>,
    requests: Mutex<Vec<RecordedRequest>>,
    /// Scripted answers for `request_from_network`, consumed in order.
    network_responses: Mutex<VecDeque<Result<(Vec<u8>, String), String>>>,
    /// Scripted answers for `request_from_peer`, keyed by procedure.
    peer_responses: Mutex<HashMap<String, Vec<u8>>>,
    penalties: Mutex<Vec<(String, u32)>>,
    fail_broadcasts: Mutex<bool>,
}

impl NullNetwork {
    pub fn new() -> Self {
        Self {
            broadcasts: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            network_responses: Mutex::new(VecDeque::new()),
            peer_responses: Mutex::new(HashMap::new()),
            penalties: Mutex::new(Vec::new()),
            fail_broadcasts: Mutex::new(false),
        }
    }

    /// Record a broadcast, or refuse it while broadcasts are set to fail.
    pub fn broadcast(&self, event: &str, data: Vec<u8>) -> Result<(), String> {
        if *self.fail_broadcasts.lock().unwrap() {
            return Err(format!("no peers accepted {event}"));
        }
        self.broadcasts.lock().unwrap().push((event.to_string(), data));
        Ok(())
    }

    pub fn set_fail_broadcasts(&self, fail: bool) {
        *self.fail_broadcasts.lock().unwrap() = fail;
    }

    /// Queue the next answer to a network-wide request.
    pub fn enqueue_network_response(&self, response: Result<(Vec<u8>, String), String>) {
        self.network_responses.lock().unwrap().push_back(response);
    }

    /// Answer every peer request for `procedure` with `data`.
    pub fn set_peer_response(&self, procedure: &str, data: Vec<u8>) {
        self.peer_responses
            .lock()
            .unwrap()
            .insert(procedure.to_string(), data);
    }

    pub fn request_from_network(
        &self,
        procedure: &str,
        data: Vec<u8>,
    ) -> Result<(Vec<u8>, String), String> {
        self.requests.lock().unwrap().push(RecordedRequest {
            procedure: procedure.to_string(),
            data,
            peer_id: None,
        });
        self.network_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err("no peers available".to_string()))
    }

    pub fn request_from_peer(
        &self,
        procedure: &str,
        data: Vec<u8>,
        peer_id: &str,
    ) -> Result<Vec<u8>, String> {
        self.requests.lock().unwrap().push(RecordedRequest {
            procedure: procedure.to_string(),
            data,
            peer_id: Some(peer_id.to_string()),
        });
        self.peer_responses
            .lock()
            .unwrap()
            .get(procedure)
            .cloned()
            .ok_or_else(|| format!("peer {peer_id} did not answer {procedure}"))
    }

    pub fn apply_penalty(&self, peer_id: &str, penalty: u32) {
        self.penalties
            .lock()
            .unwrap()
            .push((peer_id.to_string(), penalty));
    }

    /// All broadcasts (for assertions).
    pub fn broadcasts(&self) -> Vec<(String, Vec<u8>)> {
        self.broadcasts.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn penalties(&self) -> Vec<(String, u32)> {
        self.penalties.lock().unwrap().clone()
    }

    /// Clear all state.
    pub fn reset(&self) {
        self.broadcasts.lock().unwrap().clear();
        self.requests.lock().unwrap().clear();
        self.network_responses.lock().unwrap().clear();
        self.peer_responses.lock().unwrap().clear();
        self.penalties.lock().unwrap().clear();
        *self.fail_broadcasts.lock().unwrap() = false;
    }
}

impl Default for NullNetwork {
    fn default() -> Self {
        Self::new()
    }
}
