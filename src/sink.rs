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

//! Log sink handed to the sender at construction

use std::fmt;

pub use log::Level;

/// Protocol phase an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Handshake,
    Transfer,
    Termination,
    Abort,
}

impl Phase {
    pub fn target(self) -> &'static str {
        match self {
            Phase::Handshake => "xmodem::handshake",
            Phase::Transfer => "xmodem::transfer",
            Phase::Termination => "xmodem::termination",
            Phase::Abort => "xmodem::abort",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Handshake => write!(f, "handshake"),
            Phase::Transfer => write!(f, "block transfer"),
            Phase::Termination => write!(f, "termination"),
            Phase::Abort => write!(f, "abort"),
        }
    }
}

/// Receives leveled events from the sender
///
/// Called synchronously from the transfer loop. Implementations must not
/// block for long and cannot fail the transfer.
pub trait LogSink: Send {
    fn log(&self, level: Level, phase: Phase, args: fmt::Arguments<'_>);
}

/// Forwards events to the `log` facade, one target per phase
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCrateSink;

impl LogSink for LogCrateSink {
    fn log(&self, level: Level, phase: Phase, args: fmt::Arguments<'_>) {
        log::log!(target: phase.target(), level, "{}", args);
    }
}

/// Drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _level: Level, _phase: Phase, _args: fmt::Arguments<'_>) {}
}

// ============================================================================
// Recording Sink for Testing
// ============================================================================

#[cfg(test)]
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: std::sync::Arc<std::sync::Mutex<Vec<(Level, Phase, String)>>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn events(&self) -> Vec<(Level, Phase, String)> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, level: Level, phase: Phase) -> usize {
        self.events()
            .iter()
            .filter(|(l, p, _)| *l == level && *p == phase)
            .count()
    }
}

#[cfg(test)]
impl LogSink for RecordingSink {
    fn log(&self, level: Level, phase: Phase, args: fmt::Arguments<'_>) {
        self.events.lock().unwrap().push((level, phase, args.to_string()));
    }
}
