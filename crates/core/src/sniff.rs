//! Content-type sniffing
//!
//! A sniffer sees the object name and the first [`SNIFF_LEN`] bytes of its
//! body and returns a best-guess MIME type. Returning `None` is always
//! acceptable: the object is then stored without a content type and the
//! backend default applies.

use std::path::Path;

/// Number of leading bytes handed to a sniffer
pub const SNIFF_LEN: usize = 512;

/// Content-type detection
pub trait ContentSniffer: Send + Sync {
    /// Guess a MIME type from a file name and the leading bytes of the body
    fn sniff(&self, name: &str, head: &[u8]) -> Option<String>;
}

impl<F> ContentSniffer for F
where
    F: Fn(&str, &[u8]) -> Option<String> + Send + Sync,
{
    fn sniff(&self, name: &str, head: &[u8]) -> Option<String> {
        self(name, head)
    }
}

/// Sniffer that resolves by file extension through `mime_guess`
#[derive(Debug, Clone, Copy, Default)]
pub struct MimeSniffer;

impl ContentSniffer for MimeSniffer {
    fn sniff(&self, name: &str, _head: &[u8]) -> Option<String> {
        mime_guess::from_path(Path::new(name))
            .first()
            .map(|m| m.essence_str().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_sniffer_known_extensions() {
        assert_eq!(MimeSniffer.sniff("file1.jpg", b"").as_deref(), Some("image/jpeg"));
        assert_eq!(MimeSniffer.sniff("file2.txt", b"").as_deref(), Some("text/plain"));
        assert_eq!(
            MimeSniffer.sniff("dir/index.html", b"").as_deref(),
            Some("text/html")
        );
    }

    #[test]
    fn test_mime_sniffer_unknown() {
        assert_eq!(MimeSniffer.sniff("Makefile", b"all:"), None);
        assert_eq!(MimeSniffer.sniff("blob.zzzunknown", b""), None);
    }

    #[test]
    fn test_closure_sniffer() {
        let sniffer = |_: &str, head: &[u8]| {
            head.starts_with(b"\x89PNG").then(|| "image/png".to_string())
        };
        assert_eq!(sniffer.sniff("x", b"\x89PNG\r\n").as_deref(), Some("image/png"));
        assert_eq!(sniffer.sniff("x", b"text"), None);
    }
}
