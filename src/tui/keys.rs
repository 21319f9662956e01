//! Raw keyboard bytes to canonical key names.
//!
//! The decoder pulls bytes from a [`ByteSource`] one at a time, each read
//! bounded by a timeout. The first byte of a key waits for one poll slice;
//! the remainder of an escape sequence or UTF-8 character waits for the
//! (shorter) escape timeout. A lone `ESC` with nothing behind it inside that
//! window is the Escape key.

#![allow(missing_docs)]

use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::time::Duration;

use crate::core::config::InputConfig;

/// Canonical key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    Escape,
    Enter,
    Space,
    Tab,
    Backspace,
    CtrlC,
    Char(char),
    Unknown,
}

impl Key {
    /// Canonical display name (`"Page Up"`, `"Ctrl+C"`, `"q"`, ...).
    #[must_use]
    pub fn name(self) -> Cow<'static, str> {
        let fixed = match self {
            Self::Up => "Up",
            Self::Down => "Down",
            Self::Left => "Left",
            Self::Right => "Right",
            Self::Home => "Home",
            Self::End => "End",
            Self::PageUp => "Page Up",
            Self::PageDown => "Page Down",
            Self::Insert => "Insert",
            Self::Delete => "Delete",
            Self::Escape => "Escape",
            Self::Enter => "Enter",
            Self::Space => "Space",
            Self::Tab => "Tab",
            Self::Backspace => "Backspace",
            Self::CtrlC => "Ctrl+C",
            Self::Unknown => "Unknown",
            Self::Char(c) => return Cow::Owned(c.to_string()),
        };
        Cow::Borrowed(fixed)
    }

    /// Single-byte keys. Printable ASCII maps to itself; control bytes
    /// without a name decode to `Unknown`.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            0x03 => Self::CtrlC,
            0x09 => Self::Tab,
            b'\r' | b'\n' => Self::Enter,
            b' ' => Self::Space,
            0x7f => Self::Backspace,
            0x21..=0x7e => Self::Char(byte as char),
            _ => Self::Unknown,
        }
    }

    /// `ESC [ <code> ~` sequences.
    #[must_use]
    pub const fn from_tilde_code(code: u16) -> Self {
        match code {
            1 | 7 => Self::Home,
            2 => Self::Insert,
            3 => Self::Delete,
            4 | 8 => Self::End,
            5 => Self::PageUp,
            6 => Self::PageDown,
            _ => Self::Unknown,
        }
    }

    /// Case-sensitive character match.
    #[must_use]
    pub fn is_char(self, expected: char) -> bool {
        self == Self::Char(expected)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

// ──────────────────── byte sources ────────────────────

/// A stream of raw input bytes with bounded waits.
pub trait ByteSource {
    /// Next byte, or `Ok(None)` if nothing arrived within `timeout`.
    fn next_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn next_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        (**self).next_byte(timeout)
    }
}

/// Pre-recorded input for tests and headless runs.
///
/// A gap entry stands for a read that timed out. Once the script is
/// exhausted every read times out.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBytes {
    script: VecDeque<Option<u8>>,
    requested: Vec<Duration>,
}

impl ScriptedBytes {
    #[must_use]
    pub fn new(bytes: &[u8]) -> Self {
        let mut scripted = Self::default();
        scripted.push_bytes(bytes);
        scripted
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.script.extend(bytes.iter().copied().map(Some));
        self
    }

    /// Queue one timed-out read.
    pub fn push_gap(&mut self) -> &mut Self {
        self.script.push_back(None);
        self
    }

    #[must_use]
    pub fn then(mut self, bytes: &[u8]) -> Self {
        self.push_bytes(bytes);
        self
    }

    #[must_use]
    pub fn gap(mut self) -> Self {
        self.push_gap();
        self
    }

    pub fn is_exhausted(&self) -> bool {
        self.script.is_empty()
    }

    /// Timeouts passed to every read so far, in call order.
    pub fn requested_timeouts(&self) -> &[Duration] {
        &self.requested
    }
}

impl ByteSource for ScriptedBytes {
    fn next_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        self.requested.push(timeout);
        Ok(self.script.pop_front().flatten())
    }
}

/// Source with no keyboard attached: every read waits out its timeout.
///
/// Headless replays use it so the event loop still ticks at the poll rate.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl ByteSource for NoInput {
    fn next_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        std::thread::sleep(timeout);
        Ok(None)
    }
}

/// Unbuffered stdin reader. Expects the terminal to already be in raw mode
/// (see [`crate::tui::terminal_guard::RawModeGuard`]).
///
/// Reads go straight to the file descriptor so that `poll` sees every
/// pending byte; a buffered reader would hide the tail of an escape sequence.
#[cfg(unix)]
pub struct StdinBytes {
    stdin: io::Stdin,
}

#[cfg(unix)]
impl StdinBytes {
    #[must_use]
    pub fn new() -> Self {
        Self { stdin: io::stdin() }
    }
}

#[cfg(unix)]
impl Default for StdinBytes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
impl ByteSource for StdinBytes {
    fn next_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        use nix::errno::Errno;
        use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
        use std::os::fd::{AsFd, AsRawFd};

        let millis = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);
        let mut fds = [PollFd::new(self.stdin.as_fd(), PollFlags::POLLIN)];
        match poll(&mut fds, PollTimeout::from(millis)) {
            Ok(0) | Err(Errno::EINTR) => return Ok(None),
            Ok(_) => {}
            Err(errno) => return Err(io::Error::from(errno)),
        }

        let mut buf = [0_u8; 1];
        match nix::unistd::read(self.stdin.as_raw_fd(), &mut buf) {
            Ok(0) => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed")),
            Ok(_) => Ok(Some(buf[0])),
            Err(Errno::EINTR | Errno::EAGAIN) => Ok(None),
            Err(errno) => Err(io::Error::from(errno)),
        }
    }
}

// ──────────────────── decoder ────────────────────

/// Escape-sequence state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDecoder {
    escape_timeout: Duration,
    poll_slice: Duration,
}

impl Default for KeyDecoder {
    fn default() -> Self {
        Self::from_config(&InputConfig::default())
    }
}

impl KeyDecoder {
    #[must_use]
    pub const fn new(escape_timeout: Duration, poll_slice: Duration) -> Self {
        Self {
            escape_timeout,
            poll_slice,
        }
    }

    #[must_use]
    pub const fn from_config(input: &InputConfig) -> Self {
        Self::new(
            Duration::from_millis(input.escape_timeout_ms),
            Duration::from_millis(input.poll_slice_ms),
        )
    }

    #[must_use]
    pub const fn poll_slice(&self) -> Duration {
        self.poll_slice
    }

    /// Wait at most one poll slice for a key.
    ///
    /// Returns `Ok(None)` when the slice passes without input so the caller
    /// can check for interrupts before waiting again.
    pub fn next_key<S: ByteSource + ?Sized>(&self, source: &mut S) -> io::Result<Option<Key>> {
        let Some(first) = source.next_byte(self.poll_slice)? else {
            return Ok(None);
        };
        self.decode_from(first, source).map(Some)
    }

    /// Decode a key whose first byte has already been read.
    pub fn decode_from<S: ByteSource + ?Sized>(&self, first: u8, source: &mut S) -> io::Result<Key> {
        match first {
            0x1b => self.decode_escape(source),
            0xc2..=0xf4 => self.decode_utf8(first, source),
            byte => Ok(Key::from_byte(byte)),
        }
    }

    fn decode_escape<S: ByteSource + ?Sized>(&self, source: &mut S) -> io::Result<Key> {
        match source.next_byte(self.escape_timeout)? {
            None => Ok(Key::Escape),
            Some(b'[') => self.decode_csi(source),
            Some(_) => Ok(Key::Unknown),
        }
    }

    fn decode_csi<S: ByteSource + ?Sized>(&self, source: &mut S) -> io::Result<Key> {
        let Some(byte) = source.next_byte(self.escape_timeout)? else {
            return Ok(Key::Unknown);
        };
        match byte {
            b'A' => Ok(Key::Up),
            b'B' => Ok(Key::Down),
            b'C' => Ok(Key::Right),
            b'D' => Ok(Key::Left),
            b'H' => Ok(Key::Home),
            b'F' => Ok(Key::End),
            b'0'..=b'9' => self.decode_csi_param(byte, source),
            _ => Ok(Key::Unknown),
        }
    }

    /// `ESC [ <digit> ~`: one digit, then the tilde. Anything else is
    /// `Unknown` and the offending byte is consumed.
    fn decode_csi_param<S: ByteSource + ?Sized>(
        &self,
        digit: u8,
        source: &mut S,
    ) -> io::Result<Key> {
        match source.next_byte(self.escape_timeout)? {
            Some(b'~') => Ok(Key::from_tilde_code(u16::from(digit - b'0'))),
            _ => Ok(Key::Unknown),
        }
    }

    fn decode_utf8<S: ByteSource + ?Sized>(&self, lead: u8, source: &mut S) -> io::Result<Key> {
        let width = match lead {
            0xc2..=0xdf => 2,
            0xe0..=0xef => 3,
            _ => 4,
        };
        let mut buf = [lead, 0, 0, 0];
        for slot in buf.iter_mut().take(width).skip(1) {
            match source.next_byte(self.escape_timeout)? {
                Some(cont @ 0x80..=0xbf) => *slot = cont,
                _ => return Ok(Key::Unknown),
            }
        }
        Ok(std::str::from_utf8(&buf[..width])
            .ok()
            .and_then(|s| s.chars().next())
            .map_or(Key::Unknown, Key::Char))
    }
}

// ──────────────────── tests ────────────────────
