//! Mock serial port implementation for testing
//!
//! This module provides a mock serial port that can be used to test the SCS
//! framing and session handling without requiring an optical probe and meter.
//! Reads with nothing queued stay pending, so they surface as timeouts.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::constants::{SCS_ACK, SCS_CAN, SCS_NAK};
use crate::scs::frame::pack_data_packet;

/// Mock serial port that simulates bidirectional communication
#[derive(Clone, Default)]
pub struct MockSerialPort {
    /// Data written to the port (outgoing)
    pub tx_buffer: Arc<Mutex<Vec<u8>>>,
    /// Data to be read from the port (incoming)
    pub rx_buffer: Arc<Mutex<VecDeque<u8>>>,
    /// Simulated errors
    pub next_error: Arc<Mutex<Option<io::Error>>>,
}

/// A canned meter answer.
#[derive(Debug, Clone)]
pub enum MockReply {
    Ack,
    Nak,
    Can,
    /// ACK followed by a data packet
    Data(Vec<u8>),
    /// ACK followed by a data packet whose CRC is wrong
    CorruptData(Vec<u8>),
    /// ACK followed by the device-type code
    Identify(String),
}

impl MockSerialPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue data to be read from the port
    pub fn queue_rx_data(&self, data: &[u8]) {
        self.rx_buffer.lock().unwrap().extend(data);
    }

    /// Queue one meter answer
    pub fn queue_reply(&self, reply: MockReply) {
        let bytes = match reply {
            MockReply::Ack => vec![SCS_ACK],
            MockReply::Nak => vec![SCS_NAK],
            MockReply::Can => vec![SCS_CAN],
            MockReply::Data(data) => {
                let mut out = vec![SCS_ACK];
                out.extend_from_slice(&pack_data_packet(&data));
                out
            }
            MockReply::CorruptData(data) => {
                let mut out = vec![SCS_ACK];
                let mut packet = pack_data_packet(&data).to_vec();
                let last = packet.len() - 1;
                packet[last] ^= 0x5A;
                out.extend_from_slice(&packet);
                out
            }
            MockReply::Identify(code) => {
                let mut out = vec![SCS_ACK];
                out.extend_from_slice(&pack_data_packet(code.as_bytes()));
                out
            }
        };
        self.queue_rx_data(&bytes);
    }

    /// Get data that was written to the port
    pub fn get_tx_data(&self) -> Vec<u8> {
        self.tx_buffer.lock().unwrap().clone()
    }

    /// Clear all buffers
    pub fn clear(&self) {
        self.tx_buffer.lock().unwrap().clear();
        self.rx_buffer.lock().unwrap().clear();
    }

    /// Set an error to be returned on the next operation
    pub fn set_next_error(&self, error: io::Error) {
        *self.next_error.lock().unwrap() = Some(error);
    }
}

impl AsyncRead for MockSerialPort {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Poll::Ready(Err(error));
        }

        let mut rx = self.rx_buffer.lock().unwrap();
        if rx.is_empty() {
            // Silent meter: the caller's timeout decides
            return Poll::Pending;
        }
        let available = rx.len().min(buf.remaining());
        let data: Vec<u8> = rx.drain(..available).collect();
        buf.put_slice(&data);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockSerialPort {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Poll::Ready(Err(error));
        }

        self.tx_buffer.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
