use std::fmt;
use std::io::Write;
use tracing::{trace, warn};

use super::colors::Color;

/// Line terminator the panel firmware expects: LF then CR, not the usual CR LF.
const LINE_END: &[u8] = b"\x0a\x0d";

/// Errors from the display protocol layer.
#[derive(Debug)]
pub enum DisplayError {
    /// Text contained a character outside the 7-bit ASCII range.
    Encoding(char),
    /// The transport rejected a write or flush.
    Io(std::io::Error),
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::Encoding(c) => {
                write!(f, "character {:?} is not representable in 7-bit ASCII", c)
            }
            DisplayError::Io(e) => write!(f, "transport error: {}", e),
        }
    }
}

impl std::error::Error for DisplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DisplayError::Io(e) => Some(e),
            DisplayError::Encoding(_) => None,
        }
    }
}

impl From<std::io::Error> for DisplayError {
    fn from(e: std::io::Error) -> Self {
        DisplayError::Io(e)
    }
}

/// Buffered escape-sequence writer for the serial panel.
///
/// All primitives append to an internal frame buffer; nothing reaches the
/// transport until `flush`, which sends the whole frame in a single write.
/// Generic over `io::Write` so the serial port and test sinks share the code.
pub struct DisplayWriter<W: Write> {
    buf: Vec<u8>,
    transport: W,
}

impl<W: Write> DisplayWriter<W> {
    pub fn new(transport: W) -> Self {
        Self {
            buf: Vec::with_capacity(1024),
            transport,
        }
    }

    /// Append text encoded as 7-bit ASCII.
    ///
    /// Non-ASCII input is a programming error at the call site, so the whole
    /// call fails and nothing is appended.
    pub fn write_str(&mut self, text: &str) -> Result<(), DisplayError> {
        if let Some(c) = text.chars().find(|c| !c.is_ascii()) {
            return Err(DisplayError::Encoding(c));
        }
        self.buf.extend_from_slice(text.as_bytes());
        Ok(())
    }

    /// `write_str` followed by the panel's `\n\r` line terminator.
    pub fn write_line(&mut self, text: &str) -> Result<(), DisplayError> {
        self.write_str(text)?;
        self.buf.extend_from_slice(LINE_END);
        Ok(())
    }

    /// Clear and reset the display: `ESC c`.
    pub fn clear_screen(&mut self) {
        self.buf.extend_from_slice(b"\x1bc");
    }

    /// Move the draw cursor to the home position: `ESC [ H`.
    pub fn cursor_home(&mut self) {
        self.buf.extend_from_slice(b"\x1b[H");
    }

    /// Select a raw color code: `ESC [ <code> m` with the code as ASCII digits.
    ///
    /// Valid codes are 30-39 (foreground) and 40-49 (background).
    pub fn set_color(&mut self, code: u8) {
        self.buf.extend_from_slice(b"\x1b[");
        Self::push_digits(&mut self.buf, code);
        self.buf.push(b'm');
    }

    /// Select a foreground color from a single-digit base code.
    ///
    /// Codes >= 10 are ignored with a warning and rendering continues with
    /// whatever color was previously active. Returns whether the code was
    /// applied.
    pub fn set_fg(&mut self, color: impl Into<u8>) -> bool {
        let code = color.into();
        if code >= 10 {
            warn!(code, "ignoring out-of-range foreground color");
            return false;
        }
        self.set_color(30 + code);
        true
    }

    /// Select a background color from a single-digit base code.
    ///
    /// Same ignore-and-continue policy as `set_fg`.
    pub fn set_bg(&mut self, color: impl Into<u8>) -> bool {
        let code = color.into();
        if code >= 10 {
            warn!(code, "ignoring out-of-range background color");
            return false;
        }
        self.set_color(40 + code);
        true
    }

    /// White on black, the panel's neutral state.
    pub fn reset_colors(&mut self) {
        self.set_fg(Color::White);
        self.set_bg(Color::Black);
    }

    /// Send the whole frame to the transport in one write, clear the frame
    /// buffer, then synchronize the transport.
    ///
    /// The buffer is always empty on return; flushing an empty buffer issues
    /// no transport writes.
    pub fn flush(&mut self) -> Result<(), DisplayError> {
        trace!(bytes = self.buf.len(), "flushing frame");
        self.transport.write_all(&self.buf)?;
        self.buf.clear();
        self.transport.flush()?;
        Ok(())
    }

    /// The unflushed frame bytes accumulated so far.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    // Manual digit writer, avoids a format! round trip per escape sequence.
    // Color codes never exceed two digits.
    fn push_digits(buf: &mut Vec<u8>, n: u8) {
        if n >= 100 {
            buf.push(b'0' + n / 100);
        }
        if n >= 10 {
            buf.push(b'0' + (n / 10) % 10);
        }
        buf.push(b'0' + n % 10);
    }
}
