//! In-memory basepage used to exercise the transaction, display, TOU and
//! reconfiguration layers without a serial link.
//!
//! Uploads read from the image (unset bytes read as 0x00), downloads write
//! into it. Individual addresses can be scripted to answer NAK, CAN or
//! nothing at all, and every call is recorded so tests can assert on exactly
//! which transactions were issued.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::ScsError;
use crate::scs::transport::{ProtocolResponse, Reconnect, ScsCommand, ScsTransport};

/// One recorded transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub command: ScsCommand,
    pub address: u16,
    pub length: usize,
    /// Bytes written (downloads only)
    pub data: Vec<u8>,
    pub response: ProtocolResponse,
}

#[derive(Default)]
struct MockState {
    memory: HashMap<u16, u8>,
    scripted: HashMap<(ScsCommand, u16), VecDeque<ProtocolResponse>>,
    sticky: HashMap<(ScsCommand, u16), ProtocolResponse>,
    calls: Vec<MockCall>,
    reconnects: usize,
}

/// Cloneable handle to a simulated meter basepage.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores bytes in the image starting at `address`.
    pub fn load(&self, address: u16, data: &[u8]) {
        let mut state = self.state.lock().unwrap();
        for (offset, &byte) in data.iter().enumerate() {
            state.memory.insert(address.wrapping_add(offset as u16), byte);
        }
    }

    /// Reads bytes back out of the image.
    pub fn peek(&self, address: u16, length: usize) -> Vec<u8> {
        let state = self.state.lock().unwrap();
        (0..length)
            .map(|offset| {
                state
                    .memory
                    .get(&address.wrapping_add(offset as u16))
                    .copied()
                    .unwrap_or(0)
            })
            .collect()
    }

    /// The next `command` at `address` answers `response` instead of ACK.
    pub fn respond_once(&self, command: ScsCommand, address: u16, response: ProtocolResponse) {
        self.state
            .lock()
            .unwrap()
            .scripted
            .entry((command, address))
            .or_default()
            .push_back(response);
    }

    /// Every `command` at `address` answers `response`.
    pub fn respond_always(&self, command: ScsCommand, address: u16, response: ProtocolResponse) {
        self.state
            .lock()
            .unwrap()
            .sticky
            .insert((command, address), response);
    }

    /// Number of times the link was re-established.
    pub fn reconnects(&self) -> usize {
        self.state.lock().unwrap().reconnects
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn downloads(&self) -> Vec<MockCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.command == ScsCommand::Download)
            .collect()
    }

    /// Downloads addressed to `address`, in order.
    pub fn downloads_to(&self, address: u16) -> Vec<MockCall> {
        self.downloads()
            .into_iter()
            .filter(|c| c.address == address)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn scripted_response(state: &mut MockState, command: ScsCommand, address: u16) -> ProtocolResponse {
        if let Some(queue) = state.scripted.get_mut(&(command, address)) {
            if let Some(response) = queue.pop_front() {
                return response;
            }
        }
        state
            .sticky
            .get(&(command, address))
            .copied()
            .unwrap_or(ProtocolResponse::Ack)
    }
}

#[async_trait]
impl Reconnect for MockTransport {
    async fn reconnect(&mut self) -> Result<(), ScsError> {
        self.state.lock().unwrap().reconnects += 1;
        Ok(())
    }
}

#[async_trait]
impl ScsTransport for MockTransport {
    async fn upload(
        &mut self,
        address: u16,
        length: usize,
    ) -> Result<(Vec<u8>, ProtocolResponse), ScsError> {
        let response = {
            let mut state = self.state.lock().unwrap();
            let response = Self::scripted_response(&mut state, ScsCommand::Upload, address);
            state.calls.push(MockCall {
                command: ScsCommand::Upload,
                address,
                length,
                data: Vec::new(),
                response,
            });
            response
        };

        if response.is_ack() {
            Ok((self.peek(address, length), response))
        } else {
            Ok((Vec::new(), response))
        }
    }

    async fn download(&mut self, address: u16, data: &[u8]) -> Result<ProtocolResponse, ScsError> {
        let response = {
            let mut state = self.state.lock().unwrap();
            let response = Self::scripted_response(&mut state, ScsCommand::Download, address);
            state.calls.push(MockCall {
                command: ScsCommand::Download,
                address,
                length: data.len(),
                data: data.to_vec(),
                response,
            });
            response
        };

        if response.is_ack() {
            self.load(address, data);
        }
        Ok(response)
    }
}
