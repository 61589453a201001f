//! Content-type detection from byte signatures.

/// Detects a MIME type from the leading bytes of a file.
///
/// Implementations are pure functions of their input: the same bytes always
/// produce the same answer. An empty string means the signature was not
/// recognised.
pub trait ContentSniffer: std::fmt::Debug + Send + Sync {
    fn sniff(&self, bytes: &[u8]) -> String;
}

/// Signature-based sniffer backed by the `infer` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct InferSniffer;

impl ContentSniffer for InferSniffer {
    fn sniff(&self, bytes: &[u8]) -> String {
        infer::get(bytes)
            .map(|kind| kind.mime_type().to_owned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_png_signature() {
        let png_header = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(InferSniffer.sniff(&png_header), "image/png");
    }

    #[test]
    fn test_sniff_pdf_signature() {
        assert_eq!(InferSniffer.sniff(b"%PDF-1.7\n"), "application/pdf");
    }

    #[test]
    fn test_sniff_ignores_plain_text() {
        assert_eq!(InferSniffer.sniff(b"Hello, World!"), "");
    }

    #[test]
    fn test_sniff_empty_input() {
        assert_eq!(InferSniffer.sniff(&[]), "");
    }
}
