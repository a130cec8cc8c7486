//! # SCS Transaction Layer
//!
//! Wraps a [`ScsTransport`] with the checked read/write calls used by the
//! display, TOU and reconfiguration code. The raw `upload`/`download` calls
//! hand back the [`ProtocolResponse`] untouched for the few flows that must
//! interpret a non-ACK answer themselves (a CAN on stop-metering). The checked
//! `read`/`write` calls turn anything but ACK into [`ScsError::Protocol`],
//! naming the field and address for diagnostics.
//!
//! Nothing here retries. Chunking to the model's transfer limits lives in
//! [`ScsProtocol::read_block`] and [`ScsProtocol::write_block`], which issue
//! one transaction per chunk.

use log::{debug, warn};

use crate::error::ScsError;
use crate::scs::transport::{ProtocolResponse, ScsCommand, ScsTransport};

/// Counters kept for the life of a session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransactionStats {
    pub uploads: u32,
    pub downloads: u32,
    pub failures: u32,
}

/// Checked access to a meter's basepage.
pub struct ScsProtocol<T> {
    transport: T,
    stats: TransactionStats,
}

impl<T: ScsTransport> ScsProtocol<T> {
    pub fn new(transport: T) -> Self {
        ScsProtocol {
            transport,
            stats: TransactionStats::default(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    pub fn stats(&self) -> TransactionStats {
        self.stats
    }

    /// One upload, response returned as-is.
    pub async fn upload(
        &mut self,
        address: u16,
        length: usize,
    ) -> Result<(Vec<u8>, ProtocolResponse), ScsError> {
        self.stats.uploads += 1;
        let (data, response) = self.transport.upload(address, length).await?;
        if !response.is_ack() {
            self.stats.failures += 1;
        }
        Ok((data, response))
    }

    /// One download, response returned as-is.
    pub async fn download(&mut self, address: u16, data: &[u8]) -> Result<ProtocolResponse, ScsError> {
        self.stats.downloads += 1;
        let response = self.transport.download(address, data).await?;
        if !response.is_ack() {
            self.stats.failures += 1;
        }
        Ok(response)
    }

    /// Reads `length` bytes, failing on anything but ACK.
    pub async fn read(&mut self, address: u16, length: usize, field: &str) -> Result<Vec<u8>, ScsError> {
        let (data, response) = self.upload(address, length).await?;
        if !response.is_ack() {
            warn!("Upload of {field} at 0x{address:04X} answered {response}");
            return Err(ScsError::protocol(ScsCommand::Upload, response, address, field));
        }
        if data.len() != length {
            return Err(ScsError::FrameParseError(format!(
                "{field}: expected {length} bytes at 0x{address:04X}, got {}",
                data.len()
            )));
        }
        Ok(data)
    }

    /// Reads a single byte.
    pub async fn read_byte(&mut self, address: u16, field: &str) -> Result<u8, ScsError> {
        let data = self.read(address, 1, field).await?;
        Ok(data[0])
    }

    /// Writes `data`, failing on anything but ACK.
    pub async fn write(&mut self, address: u16, data: &[u8], field: &str) -> Result<(), ScsError> {
        let response = self.download(address, data).await?;
        if !response.is_ack() {
            warn!("Download of {field} at 0x{address:04X} answered {response}");
            return Err(ScsError::protocol(ScsCommand::Download, response, address, field));
        }
        Ok(())
    }

    /// Reads a block larger than one transaction allows, `max_chunk` bytes at a time.
    pub async fn read_block(
        &mut self,
        address: u16,
        length: usize,
        max_chunk: usize,
        field: &str,
    ) -> Result<Vec<u8>, ScsError> {
        let max_chunk = max_chunk.max(1);
        debug!("Reading {field}: {length} bytes at 0x{address:04X} in chunks of {max_chunk}");
        let mut out = Vec::with_capacity(length);
        let mut offset = 0usize;
        while offset < length {
            let chunk = (length - offset).min(max_chunk);
            let chunk_address = offset_address(address, offset)?;
            out.extend(self.read(chunk_address, chunk, field).await?);
            offset += chunk;
        }
        Ok(out)
    }

    /// Writes a block larger than one transaction allows, `max_chunk` bytes at a time.
    pub async fn write_block(
        &mut self,
        address: u16,
        data: &[u8],
        max_chunk: usize,
        field: &str,
    ) -> Result<(), ScsError> {
        let max_chunk = max_chunk.max(1);
        debug!(
            "Writing {field}: {} bytes at 0x{address:04X} in chunks of {max_chunk}",
            data.len()
        );
        for (index, chunk) in data.chunks(max_chunk).enumerate() {
            let chunk_address = offset_address(address, index * max_chunk)?;
            self.write(chunk_address, chunk, field).await?;
        }
        Ok(())
    }
}

fn offset_address(base: u16, offset: usize) -> Result<u16, ScsError> {
    u16::try_from(usize::from(base) + offset).map_err(|_| {
        ScsError::InvalidArgument(format!(
            "block at 0x{base:04X} runs past the end of basepage"
        ))
    })
}
