// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use std::time::Duration;
use serialport::{SerialPort as SerialPortTrait, DataBits, Parity, StopBits};

// ============================================================================
// ByteChannel Trait
// ============================================================================

/// Half-duplex byte link the sender talks to the receiver over
///
/// A read that times out may either return `Ok(0)` or an error of kind
/// `TimedOut`; the sender treats both as "no data".
pub trait ByteChannel: Send {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> std::io::Result<usize>;
}

// ============================================================================
// Real Serial Port Implementation
// ============================================================================

/// Serial port backed by the serialport crate
pub struct RealSerialPort {
    port: Box<dyn SerialPortTrait>,
}

impl RealSerialPort {
    pub fn open(
        port_name: &str,
        baud_rate: u32,
        data_bits: DataBits,
        parity: Parity,
        stop_bits: StopBits,
        timeout: Duration,
    ) -> Result<Self, serialport::Error> {
        let port = serialport::new(port_name, baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .timeout(timeout)
            .open()?;

        Ok(RealSerialPort { port })
    }
}

impl ByteChannel for RealSerialPort {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.port.write_all(buf)?;
        self.port.flush()?;
        Ok(())
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> std::io::Result<usize> {
        self.port.set_timeout(timeout)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        self.port.read(buf)
    }
}

// ============================================================================
// Scripted Receiver for Testing
// ============================================================================

/// Plays back receiver bytes and checks the sender's output on drop
///
/// Every byte the sender puts on the wire must match `expected_writes`
/// exactly, and every scripted response must have been read.
#[cfg(test)]
pub struct MockSerialPort {
    // Receiver bytes in order; None = that read times out
    read_buffer: Vec<Option<u8>>,
    read_pos: usize,
    // Frames, EOTs and CANs as the receiver saw them
    write_log: Vec<u8>,
    expected_writes: Vec<u8>,
    // One entry per write_all call; true = the link drops that write
    write_failures: std::collections::VecDeque<bool>,
    // One entry per read_timeout call; true = the link fails that read
    read_failures: std::collections::VecDeque<bool>,
}

#[cfg(test)]
impl MockSerialPort {
    pub fn new(responses: Vec<Option<u8>>, expected_writes: Vec<u8>) -> Self {
        MockSerialPort {
            read_buffer: responses,
            read_pos: 0,
            write_log: Vec::new(),
            expected_writes,
            write_failures: std::collections::VecDeque::new(),
            read_failures: std::collections::VecDeque::new(),
        }
    }

    /// Script which upcoming write_all calls fail with BrokenPipe
    pub fn with_write_failures(mut self, failures: Vec<bool>) -> Self {
        self.write_failures = failures.into();
        self
    }

    /// Script which upcoming reads fail with BrokenPipe
    ///
    /// A failed read does not consume a scripted response.
    pub fn with_read_failures(mut self, failures: Vec<bool>) -> Self {
        self.read_failures = failures.into();
        self
    }
}

#[cfg(test)]
impl ByteChannel for MockSerialPort {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        if self.write_failures.pop_front().unwrap_or(false) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "Mock write failure"
            ));
        }
        self.write_log.extend_from_slice(buf);
        Ok(())
    }

    fn read_timeout(&mut self, buf: &mut [u8], _timeout: Duration) -> std::io::Result<usize> {
        if self.read_failures.pop_front().unwrap_or(false) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "Mock read failure"
            ));
        }

        // Receiver has nothing more to say
        if self.read_pos >= self.read_buffer.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Mock timeout"
            ));
        }

        // Scripted silence
        if self.read_buffer[self.read_pos].is_none() {
            self.read_pos += 1;
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Mock timeout"
            ));
        }

        let mut bytes_read = 0;
        while bytes_read < buf.len() && self.read_pos < self.read_buffer.len() {
            match self.read_buffer[self.read_pos] {
                Some(byte) => {
                    buf[bytes_read] = byte;
                    bytes_read += 1;
                    self.read_pos += 1;
                }
                None => break,  // Stop at timeout marker
            }
        }

        Ok(bytes_read)
    }
}

#[cfg(test)]
impl Drop for MockSerialPort {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }

        assert_eq!(
            self.read_pos,
            self.read_buffer.len(),
            "Sender stopped with {} receiver bytes unread (read {} of {})",
            self.read_buffer.len() - self.read_pos,
            self.read_pos,
            self.read_buffer.len()
        );

        assert_eq!(
            &self.write_log,
            &self.expected_writes,
            "Sender wire output mismatch\nExpected {} bytes:\n{:02X?}\nGot {} bytes:\n{:02X?}",
            self.expected_writes.len(),
            self.expected_writes,
            self.write_log.len(),
            self.write_log
        );
    }
}
