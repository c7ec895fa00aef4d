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

use std::marker::PhantomData;
use std::io::{ErrorKind, Read};
use std::time::Duration;
use crate::crc16::crc16;
use crate::error::{CancelReason, Result, TransferError};
use crate::protocol::*;
use crate::serial::ByteChannel;
use crate::sink::{Level, LogCrateSink, LogSink, Phase};

// ============================================================================
// Configuration
// ============================================================================

/// Sender settings fixed for the lifetime of an [`Xmodem`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenderConfig {
    /// Fill byte for the tail of a short final block
    pub padding: u8,
    /// Failed exchanges tolerated before giving up
    pub retries: u32,
    /// Timeout for each individual channel read
    pub timeout: Duration,
    /// Answer a CRC request with 1024-byte blocks
    pub one_k: bool,
}

impl Default for SenderConfig {
    fn default() -> Self {
        SenderConfig {
            padding: SUB,
            retries: 10,
            timeout: Duration::from_secs(10),
            one_k: false,
        }
    }
}

/// Summary of a completed transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReport {
    pub mode: Mode,
    /// Blocks acknowledged by the receiver
    pub blocks: usize,
    /// Blocks sent again after a NAK, garbage or timeout
    pub retransmissions: usize,
    /// Payload bytes delivered, not counting padding
    pub bytes: usize,
}

// ============================================================================
// States
// ============================================================================

pub struct Negotiate;
pub struct ReadBlock;
pub struct TransmitBlock;
pub struct AwaitBlockAck;
pub struct SendEot;
pub struct AwaitEotAck;

/// Protocol phase each state belongs to
pub trait StatePhase {
    const PHASE: Phase;
}

impl StatePhase for Negotiate { const PHASE: Phase = Phase::Handshake; }
impl StatePhase for ReadBlock { const PHASE: Phase = Phase::Transfer; }
impl StatePhase for TransmitBlock { const PHASE: Phase = Phase::Transfer; }
impl StatePhase for AwaitBlockAck { const PHASE: Phase = Phase::Transfer; }
impl StatePhase for SendEot { const PHASE: Phase = Phase::Termination; }
impl StatePhase for AwaitEotAck { const PHASE: Phase = Phase::Termination; }

// ============================================================================
// FSM Structure
// ============================================================================

/// Live state of one transfer
///
/// Created by [`Xmodem::send`] and moved from state to state until the
/// transfer completes or fails. Nothing else mutates it.
pub struct SenderFsm<'a, State> {
    state: PhantomData<State>,
    channel: &'a mut dyn ByteChannel,
    payload: &'a mut dyn Read,
    sink: &'a dyn LogSink,
    config: SenderConfig,
    mode: Mode,
    sequence: u8,
    error_count: u32,
    cancel_pending: bool,
    header: [u8; 3],
    block: Vec<u8>,
    block_len: usize,
    checksum: [u8; 2],
    report: TransferReport,
}

pub enum Step<'a> {
    Next(Box<dyn SenderState<'a> + 'a>),
    Complete(TransferReport),
}

// ============================================================================
// Trait
// ============================================================================

pub trait SenderState<'a> {
    fn step(self: Box<Self>) -> Result<Step<'a>>;
}

/// Why a single exchange with the receiver failed
enum Failure {
    /// Timeout or zero-length read
    NoData,
    /// Receiver answered with the wrong byte
    Unexpected,
    Channel(std::io::Error),
}

impl Failure {
    fn from_io(e: std::io::Error) -> Self {
        match e.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => Failure::NoData,
            _ => Failure::Channel(e),
        }
    }
}

// ============================================================================
// Helpers shared by every state
// ============================================================================

impl<'a, S: StatePhase + 'a> SenderFsm<'a, S> {
    fn transition<T: StatePhase>(self) -> Box<SenderFsm<'a, T>> {
        Box::new(SenderFsm {
            state: PhantomData,
            channel: self.channel,
            payload: self.payload,
            sink: self.sink,
            config: self.config,
            mode: self.mode,
            sequence: self.sequence,
            error_count: self.error_count,
            cancel_pending: self.cancel_pending,
            header: self.header,
            block: self.block,
            block_len: self.block_len,
            checksum: self.checksum,
            report: self.report,
        })
    }

    fn next<T: StatePhase + 'a>(self) -> Result<Step<'a>>
    where
        SenderFsm<'a, T>: SenderState<'a>,
    {
        self.log(Level::Trace, format_args!("{} -> {}", state_name::<S>(), state_name::<T>()));
        Ok(Step::Next(self.transition::<T>()))
    }

    fn stay(self) -> Result<Step<'a>>
    where
        Self: SenderState<'a>,
    {
        Ok(Step::Next(Box::new(self)))
    }

    fn log(&self, level: Level, args: std::fmt::Arguments<'_>) {
        self.sink.log(level, S::PHASE, args);
    }

    fn channel_error(&self, e: std::io::Error) -> TransferError {
        TransferError::Channel(std::io::Error::new(
            e.kind(),
            format!("{} (in state: {})", e, state_name::<S>())
        ))
    }

    /// Count a failed exchange, erroring out once past the retry ceiling
    fn fail(&mut self, failure: Failure) -> Result<()> {
        self.error_count = self.error_count.saturating_add(1);
        if self.error_count <= self.config.retries {
            return Ok(());
        }

        self.log(Level::Error, format_args!(
            "error count reached {}, aborting transfer", self.config.retries
        ));
        Err(match failure {
            Failure::Channel(e) => self.channel_error(e),
            Failure::NoData | Failure::Unexpected => {
                TransferError::Canceled(CancelReason::RetriesExceeded(S::PHASE))
            }
        })
    }

    fn read_byte(&mut self) -> std::result::Result<u8, Failure> {
        let mut buf = [0u8; 1];
        match self.channel.read_timeout(&mut buf, self.config.timeout) {
            Ok(0) => Err(Failure::NoData),
            Ok(_) => Ok(buf[0]),
            Err(e) => Err(Failure::from_io(e)),
        }
    }

    fn report_failure(&self, what: &str, failure: &Failure) {
        match failure {
            Failure::NoData => self.log(Level::Debug, format_args!("timed out waiting for {}", what)),
            Failure::Channel(e) => self.log(Level::Error, format_args!("error reading {}: {}", what, e)),
            Failure::Unexpected => {}
        }
    }
}

fn state_name<S>() -> &'static str {
    let type_name = std::any::type_name::<S>();
    type_name.split("::").last().unwrap_or(type_name)
}

// ============================================================================
// State Implementations
// ============================================================================

impl<'a> SenderState<'a> for SenderFsm<'a, Negotiate> {
    fn step(self: Box<Self>) -> Result<Step<'a>> {
        let mut fsm = *self;

        match fsm.read_byte() {
            Ok(NAK) => {
                fsm.log(Level::Trace, format_args!("standard checksum requested (NAK)"));
                fsm.log(Level::Error, format_args!("{} is not implemented", Mode::Basic));
                Err(TransferError::UnimplementedMode(Mode::Basic))
            }
            Ok(CRC) => {
                fsm.mode = if fsm.config.one_k { Mode::OneK } else { Mode::Crc16 };
                fsm.error_count = 0;
                fsm.cancel_pending = false;
                fsm.report.mode = fsm.mode;
                fsm.log(Level::Trace, format_args!("16-bit CRC requested ('C')"));
                fsm.log(Level::Info, format_args!(
                    "using {} with {} byte blocks", fsm.mode, fsm.mode.block_size()
                ));
                fsm.next::<ReadBlock>()
            }
            Ok(CAN) if fsm.cancel_pending => {
                fsm.log(Level::Error, format_args!("transmission canceled: received CAN CAN at start-sequence"));
                Err(TransferError::Canceled(CancelReason::ReceiverCanceled))
            }
            Ok(CAN) => {
                fsm.cancel_pending = true;
                fsm.log(Level::Debug, format_args!("received CAN, waiting for a second one"));
                fsm.stay()
            }
            Ok(EOT) => {
                fsm.log(Level::Error, format_args!("transmission canceled: received EOT at start-sequence"));
                Err(TransferError::Canceled(CancelReason::ReceiverEndOfTransmission))
            }
            Ok(other) => {
                fsm.cancel_pending = false;
                fsm.log(Level::Debug, format_args!(
                    "expected NAK, 'C', CAN or EOT, got 0x{:02X}", other
                ));
                fsm.fail(Failure::Unexpected)?;
                fsm.stay()
            }
            Err(failure) => {
                fsm.report_failure("start of transfer", &failure);
                fsm.fail(failure)?;
                fsm.stay()
            }
        }
    }
}

impl<'a> SenderState<'a> for SenderFsm<'a, ReadBlock> {
    fn step(self: Box<Self>) -> Result<Step<'a>> {
        let mut fsm = *self;
        let block_size = fsm.mode.block_size();

        fsm.block.resize(block_size, 0);
        let bytes_read = fill_block(&mut *fsm.payload, &mut fsm.block)
            .map_err(TransferError::Payload)?;

        if bytes_read == 0 {
            fsm.log(Level::Info, format_args!("payload exhausted after {} blocks", fsm.report.blocks));
            return fsm.next::<SendEot>();
        }

        if bytes_read < block_size {
            fsm.log(Level::Debug, format_args!(
                "short read, padding with {} bytes", block_size - bytes_read
            ));
            fsm.block[bytes_read..].fill(fsm.config.padding);
        }

        fsm.block_len = bytes_read;
        fsm.header = [fsm.mode.header(), fsm.sequence, 255 - fsm.sequence];
        fsm.checksum = crc16(&fsm.block, 0).to_be_bytes();
        fsm.next::<TransmitBlock>()
    }
}

impl<'a> SenderState<'a> for SenderFsm<'a, TransmitBlock> {
    fn step(self: Box<Self>) -> Result<Step<'a>> {
        let mut fsm = *self;
        fsm.log(Level::Info, format_args!("send: block {}", fsm.sequence));

        match write_frame(&mut *fsm.channel, &fsm.header, &fsm.block, &fsm.checksum) {
            Ok(()) => fsm.next::<AwaitBlockAck>(),
            Err((part, e)) => {
                fsm.log(Level::Error, format_args!("error writing {}: {}", part, e));
                fsm.fail(Failure::from_io(e))?;
                fsm.stay()
            }
        }
    }
}

impl<'a> SenderState<'a> for SenderFsm<'a, AwaitBlockAck> {
    fn step(self: Box<Self>) -> Result<Step<'a>> {
        let mut fsm = *self;

        match fsm.read_byte() {
            Ok(ACK) => {
                fsm.log(Level::Trace, format_args!("ACK for block {}", fsm.sequence));
                fsm.error_count = 0;
                fsm.cancel_pending = false;
                fsm.report.blocks += 1;
                fsm.report.bytes += fsm.block_len;
                fsm.sequence = fsm.sequence.wrapping_add(1);
                return fsm.next::<ReadBlock>();
            }
            Ok(CAN) if fsm.cancel_pending => {
                fsm.log(Level::Error, format_args!("transmission canceled: received CAN CAN"));
                return Err(TransferError::Canceled(CancelReason::ReceiverCanceled));
            }
            Ok(CAN) => {
                fsm.cancel_pending = true;
                fsm.log(Level::Debug, format_args!("received CAN for block {}, another one aborts", fsm.sequence));
                fsm.fail(Failure::Unexpected)?;
            }
            Ok(NAK) => {
                fsm.cancel_pending = false;
                fsm.log(Level::Error, format_args!("send error: NAK received for block {}", fsm.sequence));
                fsm.fail(Failure::Unexpected)?;
            }
            Ok(other) => {
                fsm.cancel_pending = false;
                fsm.log(Level::Error, format_args!("send error: expected ACK or NAK, got 0x{:02X}", other));
                fsm.fail(Failure::Unexpected)?;
            }
            Err(failure) => {
                fsm.report_failure("block acknowledgement", &failure);
                fsm.fail(failure)?;
            }
        }

        fsm.report.retransmissions += 1;
        fsm.next::<TransmitBlock>()
    }
}

impl<'a> SenderState<'a> for SenderFsm<'a, SendEot> {
    fn step(self: Box<Self>) -> Result<Step<'a>> {
        let mut fsm = *self;
        fsm.log(Level::Info, format_args!("sending EOT, awaiting ACK"));

        match fsm.channel.write_all(&[EOT]) {
            Ok(()) => fsm.next::<AwaitEotAck>(),
            Err(e) => {
                fsm.log(Level::Error, format_args!("error writing EOT: {}", e));
                fsm.fail(Failure::from_io(e))?;
                fsm.stay()
            }
        }
    }
}

impl<'a> SenderState<'a> for SenderFsm<'a, AwaitEotAck> {
    fn step(self: Box<Self>) -> Result<Step<'a>> {
        let mut fsm = *self;

        match fsm.read_byte() {
            Ok(ACK) => {
                fsm.log(Level::Info, format_args!("ACK received, transmission successful"));
                return Ok(Step::Complete(fsm.report));
            }
            Ok(other) => {
                fsm.log(Level::Error, format_args!("send error: expected ACK, got 0x{:02X}", other));
                fsm.fail(Failure::Unexpected)?;
            }
            Err(failure) => {
                fsm.report_failure("EOT acknowledgement", &failure);
                fsm.fail(failure)?;
            }
        }

        fsm.next::<SendEot>()
    }
}

// ============================================================================
// Constructor & Runner
// ============================================================================

impl<'a> SenderFsm<'a, Negotiate> {
    pub fn new(
        channel: &'a mut dyn ByteChannel,
        payload: &'a mut dyn Read,
        sink: &'a dyn LogSink,
        config: SenderConfig,
    ) -> Box<dyn SenderState<'a> + 'a> {
        let mode = if config.one_k { Mode::OneK } else { Mode::Crc16 };
        Box::new(SenderFsm {
            state: PhantomData::<Negotiate>,
            channel,
            payload,
            sink,
            config,
            mode,
            sequence: 1,
            error_count: 0,
            cancel_pending: false,
            header: [0; 3],
            block: Vec::with_capacity(mode.block_size()),
            block_len: 0,
            checksum: [0; 2],
            report: TransferReport {
                mode,
                blocks: 0,
                retransmissions: 0,
                bytes: 0,
            },
        })
    }
}

/// XMODEM sender bound to one byte channel
pub struct Xmodem {
    channel: Box<dyn ByteChannel>,
    sink: Box<dyn LogSink>,
    config: SenderConfig,
    last_report: Option<TransferReport>,
}

impl Xmodem {
    /// Sender that logs through the `log` crate
    pub fn new(channel: Box<dyn ByteChannel>, config: SenderConfig) -> Self {
        Self::with_sink(channel, config, Box::new(LogCrateSink))
    }

    pub fn with_sink(channel: Box<dyn ByteChannel>, config: SenderConfig, sink: Box<dyn LogSink>) -> Self {
        Xmodem {
            channel,
            sink,
            config,
            last_report: None,
        }
    }

    /// Report of the most recent successful [`send`](Self::send)
    pub fn last_report(&self) -> Option<TransferReport> {
        self.last_report
    }

    /// Run the whole protocol for `payload`: handshake, blocks, EOT
    ///
    /// Either every block and the EOT were acknowledged, or an error is
    /// returned and whatever the receiver holds must be discarded.
    pub fn send<R: Read>(&mut self, mut payload: R) -> Result<()> {
        self.last_report = None;

        let mut state = SenderFsm::new(&mut *self.channel, &mut payload, &*self.sink, self.config);
        loop {
            match state.step()? {
                Step::Next(next) => state = next,
                Step::Complete(report) => {
                    self.sink.log(Level::Info, Phase::Termination, format_args!(
                        "sent {} bytes in {} blocks ({} retransmitted)",
                        report.bytes, report.blocks, report.retransmissions
                    ));
                    self.last_report = Some(report);
                    return Ok(());
                }
            }
        }
    }

    /// Ask the receiver to cancel by sending CAN CAN
    ///
    /// Write errors are logged and otherwise ignored.
    pub fn abort(&mut self) {
        match self.channel.write_all(&[CAN, CAN]) {
            Ok(()) => self.sink.log(Level::Info, Phase::Abort, format_args!("sent CAN CAN")),
            Err(e) => self.sink.log(Level::Warn, Phase::Abort, format_args!("failed to send CAN CAN: {}", e)),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Read until `buf` is full or the payload ends
fn fill_block(payload: &mut dyn Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match payload.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn write_frame(
    channel: &mut dyn ByteChannel,
    header: &[u8],
    block: &[u8],
    checksum: &[u8],
) -> std::result::Result<(), (&'static str, std::io::Error)> {
    channel.write_all(header).map_err(|e| ("header", e))?;
    channel.write_all(block).map_err(|e| ("data", e))?;
    channel.write_all(checksum).map_err(|e| ("checksum", e))?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
