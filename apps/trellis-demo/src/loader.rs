use encoding_rs::Encoding;
use encoding_rs::UTF_8;
use std::path::Path;
use tr_core::TrellisError;
use tr_core::TrellisResult;
use tracing::debug;
use tracing::warn;

const CHARSET_SNIFF_BYTES: usize = 1024;

pub fn load_markup(path: &Path) -> TrellisResult<String> {
    let bytes = std::fs::read(path).map_err(|error| {
        TrellisError::new("demo.read_failed", format!("failed to read {}: {error}", path.display()))
    })?;
    debug!(path = %path.display(), bytes = bytes.len(), "read markup");
    Ok(decode_markup(&bytes))
}

/// Decodes markup honoring a byte order mark, then a `charset=` declaration
/// near the top of the document, then UTF-8.
pub fn decode_markup(bytes: &[u8]) -> String {
    let encoding = match Encoding::for_bom(bytes) {
        Some((encoding, _)) => encoding,
        None => sniff_charset(bytes)
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8),
    };

    let (decoded, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        warn!(encoding = encoding.name(), "markup contained malformed sequences");
    }
    decoded.into_owned()
}

fn sniff_charset(bytes: &[u8]) -> Option<String> {
    let prefix_len = bytes.len().min(CHARSET_SNIFF_BYTES);
    let prefix = String::from_utf8_lossy(&bytes[..prefix_len]);
    let lower = prefix.to_ascii_lowercase();
    let mut search_start = 0_usize;

    while let Some(relative) = lower[search_start..].find("charset=") {
        let label_start = search_start + relative + "charset=".len();
        if let Some(label) = charset_label(&prefix[label_start..]) {
            return Some(label);
        }
        search_start = label_start;
    }

    None
}

fn charset_label(input: &str) -> Option<String> {
    let trimmed = input.trim_start();
    let first = trimmed.chars().next()?;

    let label = if first == '"' || first == '\'' {
        let rest = &trimmed[first.len_utf8()..];
        &rest[..rest.find(first)?]
    } else {
        let end = trimmed
            .find(|ch: char| ch.is_whitespace() || matches!(ch, '"' | '\'' | ';' | '>' | '/'))
            .unwrap_or(trimmed.len());
        &trimmed[..end]
    };

    let label = label.trim();
    if label.is_empty() { None } else { Some(label.to_owned()) }
}

#[cfg(test)]
mod tests {
    use super::decode_markup;
    use super::load_markup;
    use super::sniff_charset;
    use std::path::Path;

    #[test]
    fn defaults_to_utf8() {
        assert_eq!(decode_markup("<p>café</p>".as_bytes()), "<p>café</p>");
    }

    #[test]
    fn honors_meta_charset() {
        let bytes = b"<meta charset=\"windows-1252\"><p>caf\xE9</p>";
        assert_eq!(decode_markup(bytes), "<meta charset=\"windows-1252\"><p>café</p>");
    }

    #[test]
    fn byte_order_mark_wins_over_declaration() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "<meta charset=latin1><p>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_markup(&bytes), "<meta charset=latin1><p>");
    }

    #[test]
    fn sniffs_quoted_and_bare_labels() {
        assert_eq!(sniff_charset(b"<meta charset='Shift_JIS'>").as_deref(), Some("Shift_JIS"));
        assert_eq!(
            sniff_charset(b"<meta http-equiv=content-type content=\"text/html; charset=koi8-r\">").as_deref(),
            Some("koi8-r")
        );
        assert_eq!(sniff_charset(b"<meta charset=>"), None);
        assert_eq!(sniff_charset(b"<p>no declaration</p>"), None);
    }

    #[test]
    fn ignores_declarations_past_the_sniff_window() {
        let mut bytes = vec![b' '; 2048];
        bytes.extend_from_slice(b"<meta charset=windows-1252>");
        assert_eq!(sniff_charset(&bytes), None);
    }

    #[test]
    fn missing_file_is_a_demo_error() {
        let Err(error) = load_markup(Path::new("/nonexistent/trellis/menu.html")) else {
            panic!("the file does not exist");
        };
        assert_eq!(error.code, "demo.read_failed");
    }
}
