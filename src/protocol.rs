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

//! XMODEM protocol constants

/// Start of header - begins a 128-byte block
pub const SOH: u8 = 0x01;

/// Start of text - begins a 1024-byte block
pub const STX: u8 = 0x02;

/// End of transmission - sender has no more blocks
pub const EOT: u8 = 0x04;

/// Acknowledge - receiver accepted the block or the EOT
pub const ACK: u8 = 0x06;

/// Negative acknowledge - receiver rejected the block, or requests checksum mode
pub const NAK: u8 = 0x15;

/// Cancel - two in a row abort the transfer
pub const CAN: u8 = 0x18;

/// Receiver requests CRC-16 mode
pub const CRC: u8 = b'C';

/// Substitute - default padding for the final block
pub const SUB: u8 = 0x1A;

/// Framing variant negotiated with the receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// 128-byte blocks, 8-bit arithmetic checksum
    Basic,
    /// 128-byte blocks, CRC-16
    Crc16,
    /// 1024-byte blocks, CRC-16
    OneK,
}

impl Mode {
    pub fn block_size(self) -> usize {
        match self {
            Mode::OneK => 1024,
            Mode::Basic | Mode::Crc16 => 128,
        }
    }

    pub fn header(self) -> u8 {
        match self {
            Mode::OneK => STX,
            Mode::Basic | Mode::Crc16 => SOH,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Basic => write!(f, "XMODEM (checksum)"),
            Mode::Crc16 => write!(f, "XMODEM-CRC"),
            Mode::OneK => write!(f, "XMODEM-1K"),
        }
    }
}
