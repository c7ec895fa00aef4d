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

use thiserror::Error;

use crate::protocol::Mode;
use crate::sink::Phase;

/// Why the transfer was canceled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Receiver sent CAN CAN
    ReceiverCanceled,
    /// Receiver sent EOT while we were waiting for NAK or 'C'
    ReceiverEndOfTransmission,
    /// Error count went past the retry ceiling
    RetriesExceeded(Phase),
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancelReason::ReceiverCanceled => write!(f, "receiver sent CAN CAN"),
            CancelReason::ReceiverEndOfTransmission => write!(f, "receiver sent EOT during handshake"),
            CancelReason::RetriesExceeded(phase) => write!(f, "too many errors during {}", phase),
        }
    }
}

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("transfer canceled: {0}")]
    Canceled(CancelReason),

    #[error("channel error: {0}")]
    Channel(#[source] std::io::Error),

    #[error("{0} is not implemented")]
    UnimplementedMode(Mode),

    #[error("failed to read payload: {0}")]
    Payload(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransferError>;
