//! Subtitle extraction from downloaded archives

use std::io::{Cursor, Read};

use tracing::debug;
use zip::ZipArchive;

use crate::{GatewayError, Result};

/// Return the contents of the first entry, in archive order, whose name
/// ends with `extension` (compared case-insensitively).
///
/// Directories are skipped. No entry matching is a
/// [`GatewayError::SubtitleNotFound`], never an empty success.
pub fn extract_subtitle(archive: &[u8], extension: &str) -> Result<Vec<u8>> {
    let mut zip = ZipArchive::new(Cursor::new(archive))
        .map_err(|e| GatewayError::Archive(format!("failed to open archive: {e}")))?;
    let wanted = extension.to_ascii_lowercase();

    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| GatewayError::Archive(format!("failed to read entry {index}: {e}")))?;
        if entry.is_dir() || !entry.name().to_ascii_lowercase().ends_with(&wanted) {
            continue;
        }

        debug!(entry = entry.name(), size = entry.size(), "extracting subtitle");
        let mut contents = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
        entry
            .read_to_end(&mut contents)
            .map_err(|e| GatewayError::Archive(format!("failed to decompress '{}': {e}", entry.name())))?;
        return Ok(contents);
    }

    Err(GatewayError::SubtitleNotFound {
        extension: extension.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    use super::*;

    fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn extension_match_ignores_case() {
        let zip = archive(&[("readme.txt", b"hi"), ("MOVIE.SRT", b"1")]);
        assert_eq!(extract_subtitle(&zip, ".srt").unwrap(), b"1");
    }

    #[test]
    fn garbage_is_an_archive_error() {
        let err = extract_subtitle(b"definitely not a zip", ".srt").unwrap_err();
        assert!(matches!(err, GatewayError::Archive(_)));
    }

    #[test]
    fn empty_archive_has_no_subtitle() {
        let err = extract_subtitle(&archive(&[]), ".srt").unwrap_err();
        assert_eq!(
            err,
            GatewayError::SubtitleNotFound {
                extension: ".srt".into()
            }
        );
    }
}
