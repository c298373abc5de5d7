//! Line records flowing from a producer into split files.

use std::borrow::Cow;
use std::fmt;

/// One input line, without its line terminator.
///
/// Content is kept as raw bytes; the stage never interprets it.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct LineRecord {
    data: Vec<u8>,
}

impl LineRecord {
    /// Create a record from raw line bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Create a record from a line read with its terminator still attached.
    ///
    /// Strips one trailing `\n` and a `\r` directly before it.
    pub fn from_terminated(mut data: Vec<u8>) -> Self {
        if data.last() == Some(&b'\n') {
            data.pop();
            if data.last() == Some(&b'\r') {
                data.pop();
            }
        }
        Self { data }
    }

    /// The line bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The line as text, replacing invalid UTF-8.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl From<&str> for LineRecord {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes().to_vec())
    }
}

impl From<String> for LineRecord {
    fn from(s: String) -> Self {
        Self::new(s.into_bytes())
    }
}

impl From<Vec<u8>> for LineRecord {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl fmt::Debug for LineRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LineRecord({:?})", self.to_string_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_terminated_strips_lf() {
        let r = LineRecord::from_terminated(b"hello\n".to_vec());
        assert_eq!(r.as_bytes(), b"hello");
    }

    #[test]
    fn test_from_terminated_strips_crlf() {
        let r = LineRecord::from_terminated(b"hello\r\n".to_vec());
        assert_eq!(r.as_bytes(), b"hello");
    }

    #[test]
    fn test_from_terminated_keeps_unterminated_line() {
        let r = LineRecord::from_terminated(b"last".to_vec());
        assert_eq!(r.as_bytes(), b"last");
    }

    #[test]
    fn test_lone_cr_is_content() {
        // Only a CR directly before LF belongs to the terminator
        let r = LineRecord::from_terminated(b"a\rb\r".to_vec());
        assert_eq!(r.as_bytes(), b"a\rb\r");
    }

    #[test]
    fn test_empty_line_is_a_record() {
        let r = LineRecord::from_terminated(b"\n".to_vec());
        assert!(r.is_empty());
        assert_eq!(r.len(), 0);
    }

    #[test]
    fn test_lossy_text() {
        let r = LineRecord::new(vec![b'o', b'k', 0xff]);
        assert_eq!(r.to_string_lossy(), "ok\u{fffd}");
    }
}
