//! # Bluetooth RFCOMM Transport
//!
//! This module provides communication with the P21 over the Bluetooth
//! Serial Port Profile (SPP) via an RFCOMM TTY.
//!
//! ## Bluetooth Setup (Linux)
//!
//! Before using this transport, the printer must be paired and bound to an
//! RFCOMM device:
//!
//! ```bash
//! # 1. Find the printer's Bluetooth address
//! $ bluetoothctl
//! [bluetooth]# scan on
//! # Look for "P21"
//! # Note the address, e.g., 00:11:62:XX:XX:XX
//!
//! # 2. Pair with the printer
//! [bluetooth]# pair 00:11:62:XX:XX:XX
//!
//! # 3. Bind to RFCOMM device
//! $ sudo rfcomm bind 0 00:11:62:XX:XX:XX
//! # This creates /dev/rfcomm0
//! ```
//!
//! ## TTY Configuration
//!
//! The RFCOMM device is opened in raw mode so BITMAP payloads and binary
//! replies pass through unmodified:
//!
//! - **No input processing**: Disable IGNBRK, BRKINT, PARMRK, ISTRIP, etc.
//! - **No output processing**: Disable OPOST (no CR/LF translation)
//! - **8-bit characters**: CS8 (8 data bits, no parity), 115200 baud
//! - **No echo**: Disable ECHO, ECHONL
//! - **Non-canonical mode**: Disable ICANON, VMIN = VTIME = 0
//!
//! Reads are driven by `poll(2)` so `receive` honours its timeout.
//!
//! ## Chunked Writes
//!
//! Large data blocks are written in chunks to avoid overwhelming the
//! Bluetooth buffer. The default chunk size is 4096 bytes with a small
//! delay between chunks.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::thread;
use std::time::Duration;

use log::{debug, info};

use crate::error::NelkoError;
use crate::transport::Transport;

/// Default RFCOMM device path
pub const DEFAULT_DEVICE: &str = "/dev/rfcomm0";

/// Default chunk size for writes (bytes)
const CHUNK_SIZE: usize = 4096;

/// Delay between chunks (milliseconds)
const CHUNK_DELAY_MS: u64 = 2;

/// Read buffer size; replies are at most a few dozen bytes
const READ_BUF_SIZE: usize = 256;

/// # Bluetooth Printer Transport
///
/// Manages a connection to a P21 over Bluetooth RFCOMM.
///
/// ## Example
///
/// ```no_run
/// use nelko::transport::{BluetoothTransport, Transport};
/// use nelko::protocol::commands;
/// use std::time::Duration;
///
/// let mut transport = BluetoothTransport::open("/dev/rfcomm0")?;
/// transport.send(&commands::encode_query("BATTERY?")?)?;
/// let reply = transport.receive(Duration::from_secs(1))?;
///
/// # Ok::<(), nelko::error::NelkoError>(())
/// ```
pub struct BluetoothTransport {
    file: File,
    chunk_size: usize,
    chunk_delay: Duration,
}

impl BluetoothTransport {
    /// Open a Bluetooth connection to the printer.
    ///
    /// ## Parameters
    ///
    /// - `device`: Path to the RFCOMM device (e.g., "/dev/rfcomm0")
    ///
    /// ## Errors
    ///
    /// Returns an error if:
    /// - The device doesn't exist
    /// - Permission denied (may need root or dialout group)
    /// - TTY configuration fails
    pub fn open<P: AsRef<Path>>(device: P) -> Result<Self, NelkoError> {
        let path = device.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| {
                NelkoError::Transport(format!("Failed to open {}: {}", path.display(), e))
            })?;

        configure_tty_raw(file.as_raw_fd())?;
        info!("Opened {}", path.display());

        Ok(Self::from_file(file))
    }

    /// Open with default device path (/dev/rfcomm0)
    pub fn open_default() -> Result<Self, NelkoError> {
        Self::open(DEFAULT_DEVICE)
    }

    /// Wrap an already configured file descriptor.
    pub fn from_file(file: File) -> Self {
        Self {
            file,
            chunk_size: CHUNK_SIZE,
            chunk_delay: Duration::from_millis(CHUNK_DELAY_MS),
        }
    }

    /// Set the chunk size for large writes.
    ///
    /// Larger chunks are faster but may overflow the Bluetooth buffer.
    /// Default is 4096 bytes.
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size.max(1);
    }

    /// Set the delay between chunks.
    ///
    /// Default is 2ms.
    pub fn set_chunk_delay(&mut self, delay: Duration) {
        self.chunk_delay = delay;
    }

    fn write_chunked(&mut self, data: &[u8]) -> Result<(), NelkoError> {
        if data.len() <= self.chunk_size {
            self.file
                .write_all(data)
                .map_err(|e| NelkoError::Transport(format!("Write failed: {}", e)))?;
        } else {
            for chunk in data.chunks(self.chunk_size) {
                self.file
                    .write_all(chunk)
                    .map_err(|e| NelkoError::Transport(format!("Write failed: {}", e)))?;

                if !self.chunk_delay.is_zero() {
                    thread::sleep(self.chunk_delay);
                }
            }
        }

        self.file
            .flush()
            .map_err(|e| NelkoError::Transport(format!("Flush failed: {}", e)))
    }
}

impl Transport for BluetoothTransport {
    fn send(&mut self, data: &[u8]) -> Result<(), NelkoError> {
        if data.is_empty() {
            return Ok(());
        }
        debug!("-> {} bytes", data.len());
        self.write_chunked(data)
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, NelkoError> {
        if !wait_readable(self.file.as_raw_fd(), timeout)? {
            return Ok(None);
        }

        let mut buf = [0u8; READ_BUF_SIZE];
        let n = match self.file.read(&mut buf) {
            Ok(n) => n,
            Err(e)
                if e.kind() == io::ErrorKind::Interrupted
                    || e.kind() == io::ErrorKind::WouldBlock =>
            {
                return Ok(None);
            }
            Err(e) => return Err(NelkoError::Transport(format!("Read failed: {}", e))),
        };
        if n == 0 {
            return Err(NelkoError::Transport("Device closed the connection".to_string()));
        }
        debug!("<- {}", hex::encode(&buf[..n]));
        Ok(Some(buf[..n].to_vec()))
    }
}

/// Block until `fd` is readable or `timeout` passes.
fn wait_readable(fd: i32, timeout: Duration) -> Result<bool, NelkoError> {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;

    let result = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
    if result < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(NelkoError::Transport(format!("poll failed: {}", err)));
    }
    if result == 0 {
        return Ok(false);
    }
    let failed = pfd.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0;
    if pfd.revents & libc::POLLIN == 0 && failed {
        return Err(NelkoError::Transport("Connection lost".to_string()));
    }
    Ok(true)
}

/// Configure a file descriptor for raw TTY mode.
///
/// This disables all input/output processing so binary data passes through
/// unmodified.
///
/// ## What Gets Disabled
///
/// - **Input flags**: IGNBRK, BRKINT, PARMRK, ISTRIP, INLCR, IGNCR, ICRNL, IXON, IXOFF, IXANY
/// - **Output flags**: OPOST
/// - **Local flags**: ECHO, ECHONL, ICANON, ISIG, IEXTEN
/// - **Control flags**: CSIZE, PARENB (then CS8 is set)
///
/// Note: IXON/IXOFF/IXANY disable XON/XOFF software flow control. 0x11 and
/// 0x13 appear in BITMAP payloads and in the CONFIG reply.
fn configure_tty_raw(fd: i32) -> Result<(), NelkoError> {
    use std::mem::MaybeUninit;

    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(NelkoError::Transport(format!(
            "tcgetattr failed: {}",
            io::Error::last_os_error()
        )));
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);

    termios.c_oflag &= !libc::OPOST;

    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);

    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8 | libc::CREAD | libc::CLOCAL;

    // Reads return whatever is buffered; poll() does the waiting
    termios.c_cc[libc::VMIN] = 0;
    termios.c_cc[libc::VTIME] = 0;

    unsafe {
        libc::cfsetispeed(&mut termios, libc::B115200);
        libc::cfsetospeed(&mut termios, libc::B115200);
    }

    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(NelkoError::Transport(format!(
            "tcsetattr failed: {}",
            io::Error::last_os_error()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::OwnedFd;
    use std::os::unix::net::UnixStream;

    fn socket_transport() -> (BluetoothTransport, UnixStream) {
        let (ours, theirs) = UnixStream::pair().unwrap();
        let file = File::from(OwnedFd::from(ours));
        (BluetoothTransport::from_file(file), theirs)
    }

    #[test]
    fn test_default_device_path() {
        assert_eq!(DEFAULT_DEVICE, "/dev/rfcomm0");
    }

    #[test]
    fn test_send_and_receive_over_socket() {
        let (mut transport, mut peer) = socket_transport();

        transport.send(b"BATTERY?\r\n").unwrap();
        let mut buf = [0u8; 10];
        peer.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"BATTERY?\r\n");

        peer.write_all(b"BATTERY \x80\x00").unwrap();
        let reply = transport.receive(Duration::from_secs(1)).unwrap();
        assert_eq!(reply, Some(b"BATTERY \x80\x00".to_vec()));
    }

    #[test]
    fn test_receive_times_out_empty() {
        let (mut transport, _peer) = socket_transport();
        let reply = transport.receive(Duration::from_millis(20)).unwrap();
        assert_eq!(reply, None);
    }

    #[test]
    fn test_chunked_send_delivers_everything() {
        let (mut transport, mut peer) = socket_transport();
        transport.set_chunk_size(7);
        transport.set_chunk_delay(Duration::ZERO);

        let data: Vec<u8> = (0..50u8).collect();
        transport.send(&data).unwrap();

        let mut buf = vec![0u8; 50];
        peer.read_exact(&mut buf).unwrap();
        assert_eq!(buf, data);
    }

    #[test]
    fn test_peer_close_is_transport_error() {
        let (mut transport, peer) = socket_transport();
        drop(peer);
        let err = transport.receive(Duration::from_millis(100)).unwrap_err();
        assert!(err.is_transport());
    }
}
