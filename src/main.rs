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

use clap::Parser;
use log::{error, info};
use serialport::{DataBits, Parity, StopBits};
use std::path::PathBuf;
use std::time::Duration;
use xmodem::{RealSerialPort, SenderConfig, Xmodem};

#[derive(Parser)]
#[command(name = "xmodem")]
#[command(about = "Send a file to a serial receiver using XMODEM-CRC or XMODEM-1K", long_about = None)]
struct Cli {
    /// Serial port to use (e.g., /dev/ttyUSB0 or COM1)
    port: String,

    /// Baud rate
    baud: u32,

    /// File to send
    file: PathBuf,

    /// Data bits (5, 6, 7, or 8)
    #[arg(long, default_value = "8", value_name = "BITS")]
    data_bits: u8,

    /// Parity (none, odd, or even)
    #[arg(long, default_value = "none")]
    parity: String,

    /// Stop bits (1 or 2)
    #[arg(long, default_value = "1", value_name = "BITS")]
    stop_bits: u8,

    /// Byte used to pad the final block
    #[arg(long, default_value = "26", value_name = "BYTE")]
    padding: u8,

    /// Failed exchanges tolerated before the transfer is canceled
    #[arg(long, default_value = "10")]
    retries: u32,

    /// Timeout in milliseconds for each read from the receiver
    #[arg(long, default_value = "10000", value_name = "MS")]
    timeout_ms: u64,

    /// Use 1024-byte blocks when the receiver asks for CRC
    #[arg(long)]
    one_k: bool,

    /// Enable trace output
    #[arg(long)]
    debug: bool,
}

fn parse_data_bits(bits: u8) -> Result<DataBits, String> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        _ => Err(format!("Invalid data bits: {}. Must be 5, 6, 7, or 8", bits)),
    }
}

fn parse_parity(parity: &str) -> Result<Parity, String> {
    match parity.to_lowercase().as_str() {
        "none" => Ok(Parity::None),
        "odd" => Ok(Parity::Odd),
        "even" => Ok(Parity::Even),
        _ => Err(format!("Invalid parity: {}. Must be 'none', 'odd', or 'even'", parity)),
    }
}

fn parse_stop_bits(bits: u8) -> Result<StopBits, String> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        _ => Err(format!("Invalid stop bits: {}. Must be 1 or 2", bits)),
    }
}

fn init_logger(debug: bool) {
    let default_level = if debug { "trace" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            use std::io::Write;
            let level_style = buf.default_level_style(record.level());
            writeln!(
                buf,
                "[{} {level_style}{}{level_style:#} {}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.debug);

    let settings = parse_data_bits(cli.data_bits).and_then(|data_bits| {
        Ok((data_bits, parse_parity(&cli.parity)?, parse_stop_bits(cli.stop_bits)?))
    });
    let (data_bits, parity, stop_bits) = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let payload = match std::fs::read(&cli.file) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Failed to read {}: {}", cli.file.display(), e);
            std::process::exit(1);
        }
    };

    let config = SenderConfig {
        padding: cli.padding,
        retries: cli.retries,
        timeout: Duration::from_millis(cli.timeout_ms),
        one_k: cli.one_k,
    };

    info!("Opening serial port: {}", cli.port);
    info!("Settings: {} baud, {:?}, {:?}, {:?}", cli.baud, data_bits, parity, stop_bits);

    let serial_port = match RealSerialPort::open(&cli.port, cli.baud, data_bits, parity, stop_bits, config.timeout) {
        Ok(port) => port,
        Err(e) => {
            eprintln!("Failed to open serial port: {}", e);
            std::process::exit(1);
        }
    };

    info!("Sending file: {} ({} bytes)", cli.file.display(), payload.len());
    let mut xmodem = Xmodem::new(Box::new(serial_port), config);
    if let Err(e) = xmodem.send(payload.as_slice()) {
        error!("Send failed: {}", e);
        std::process::exit(1);
    }
    info!("File sent");
}
