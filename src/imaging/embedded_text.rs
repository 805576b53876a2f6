//! Caption text embedded in JPEG files.
//!
//! Two places are checked, in a single walk over the JPEG marker segments
//! that stops at the start of scan data:
//! - APP13 (`0xFFED`): Photoshop 8BIM resource 0x0404 holding IPTC-IIM
//!   records; we keep Caption-Abstract (record 2, dataset 120).
//! - COM (`0xFFFE`): the plain JPEG comment segment.
//!
//! Files are recognised by their SOI marker, not their extension, because
//! album basenames may carry no extension at all.

use std::path::Path;

/// Caption candidates found in one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedText {
    pub iptc_caption: Option<String>,
    pub comment: Option<String>,
}

/// Read caption candidates from a file. Any read or parse failure yields
/// an empty result.
pub fn read_embedded_text(path: &Path) -> EmbeddedText {
    match std::fs::read(path) {
        Ok(bytes) => scan_jpeg(&bytes),
        Err(_) => EmbeddedText::default(),
    }
}

const PHOTOSHOP_HEADER: &[u8] = b"Photoshop 3.0\0";
const BIM_MARKER: &[u8] = b"8BIM";
const IPTC_RESOURCE_ID: u16 = 0x0404;
const IPTC_CAPTION_DATASET: u8 = 120;

/// Walk JPEG marker segments collecting the IPTC caption and COM text.
fn scan_jpeg(data: &[u8]) -> EmbeddedText {
    let mut found = EmbeddedText::default();
    if !data.starts_with(&[0xFF, 0xD8]) {
        return found;
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            break;
        }
        let marker = data[pos + 1];
        match marker {
            // Fill byte
            0xFF => {
                pos += 1;
                continue;
            }
            // Start of scan / end of image: no more metadata
            0xDA | 0xD9 => break,
            // Standalone markers carry no length
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            _ => {}
        }

        if pos + 4 > data.len() {
            break;
        }
        let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if seg_len < 2 {
            break;
        }
        let seg_end = (pos + 2 + seg_len).min(data.len());
        let segment = &data[pos + 4..seg_end];

        match marker {
            0xED if found.iptc_caption.is_none() => {
                found.iptc_caption = iptc_block_from_8bim(segment).and_then(iptc_caption);
            }
            0xFE if found.comment.is_none() => {
                found.comment = non_empty_text(segment);
            }
            _ => {}
        }

        pos += 2 + seg_len;
    }
    found
}

fn non_empty_text(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_end_matches('\0').trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Caption-Abstract from raw IPTC-IIM bytes.
///
/// Each dataset is `0x1C`, record, dataset, big-endian u16 length, data.
fn iptc_caption(data: &[u8]) -> Option<String> {
    let mut pos = 0;
    while pos + 5 <= data.len() {
        if data[pos] != 0x1C {
            pos += 1;
            continue;
        }
        let record = data[pos + 1];
        let dataset = data[pos + 2];
        let length = u16::from_be_bytes([data[pos + 3], data[pos + 4]]) as usize;
        pos += 5;
        if pos + length > data.len() {
            return None;
        }
        if record == 2 && dataset == IPTC_CAPTION_DATASET {
            if let Some(text) = non_empty_text(&data[pos..pos + length]) {
                return Some(text);
            }
        }
        pos += length;
    }
    None
}

/// Locate the IPTC resource inside a Photoshop 8BIM block sequence.
fn iptc_block_from_8bim(segment: &[u8]) -> Option<&[u8]> {
    let data = segment.strip_prefix(PHOTOSHOP_HEADER).unwrap_or(segment);

    let mut pos = 0;
    while pos + 12 <= data.len() {
        if &data[pos..pos + 4] != BIM_MARKER {
            pos += 1;
            continue;
        }
        pos += 4;
        let resource_id = u16::from_be_bytes([data[pos], data[pos + 1]]);
        pos += 2;

        // Pascal name, padded to an even total length
        let name_len = usize::from(*data.get(pos)?);
        pos += 1 + name_len + ((1 + name_len) % 2);

        let len_bytes = data.get(pos..pos + 4)?;
        let res_len =
            u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;
        pos += 4;
        let body = data.get(pos..pos + res_len)?;
        if resource_id == IPTC_RESOURCE_ID {
            return Some(body);
        }
        pos += res_len + (res_len % 2);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(marker: u8, body: &[u8]) -> Vec<u8> {
        let mut out = vec![0xFF, marker];
        out.extend_from_slice(&((body.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    fn iptc_app13(caption: &str) -> Vec<u8> {
        let mut iim = vec![0x1C, 0x02, 0x78];
        iim.extend_from_slice(&(caption.len() as u16).to_be_bytes());
        iim.extend_from_slice(caption.as_bytes());

        let mut body = PHOTOSHOP_HEADER.to_vec();
        body.extend_from_slice(BIM_MARKER);
        body.extend_from_slice(&IPTC_RESOURCE_ID.to_be_bytes());
        body.extend_from_slice(&[0, 0]); // empty pascal name, padded
        body.extend_from_slice(&(iim.len() as u32).to_be_bytes());
        body.extend_from_slice(&iim);
        if iim.len() % 2 == 1 {
            body.push(0);
        }
        segment(0xED, &body)
    }

    fn jpeg_with(segments: &[Vec<u8>]) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];
        for s in segments {
            data.extend_from_slice(s);
        }
        data.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02, 0xFF, 0xD9]);
        data
    }

    #[test]
    fn reads_iptc_caption() {
        let data = jpeg_with(&[iptc_app13("Harbour at dusk")]);
        assert_eq!(
            scan_jpeg(&data).iptc_caption.as_deref(),
            Some("Harbour at dusk")
        );
    }

    #[test]
    fn reads_comment_segment() {
        let data = jpeg_with(&[segment(0xFE, b"Grandma's garden\0")]);
        let text = scan_jpeg(&data);
        assert_eq!(text.comment.as_deref(), Some("Grandma's garden"));
        assert_eq!(text.iptc_caption, None);
    }

    #[test]
    fn reads_both_sources() {
        let data = jpeg_with(&[
            segment(0xE0, b"JFIF\0\x01\x01"),
            segment(0xFE, b"comment"),
            iptc_app13("caption"),
        ]);
        let text = scan_jpeg(&data);
        assert_eq!(text.comment.as_deref(), Some("comment"));
        assert_eq!(text.iptc_caption.as_deref(), Some("caption"));
    }

    #[test]
    fn whitespace_comment_is_ignored() {
        let data = jpeg_with(&[segment(0xFE, b"   \n")]);
        assert_eq!(scan_jpeg(&data).comment, None);
    }

    #[test]
    fn stops_at_start_of_scan() {
        let mut data = jpeg_with(&[]);
        // A COM segment after SOS is image data, not metadata
        data.extend_from_slice(&segment(0xFE, b"late"));
        assert_eq!(scan_jpeg(&data), EmbeddedText::default());
    }

    #[test]
    fn non_jpeg_is_empty() {
        assert_eq!(scan_jpeg(b"\x89PNG\r\n\x1a\n"), EmbeddedText::default());
        assert_eq!(scan_jpeg(&[]), EmbeddedText::default());
    }

    #[test]
    fn truncated_segment_does_not_panic() {
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xED, 0x40, 0x00];
        data.extend_from_slice(PHOTOSHOP_HEADER);
        assert_eq!(scan_jpeg(&data).iptc_caption, None);
    }

    #[test]
    fn iptc_skips_other_datasets() {
        // ObjectName (2:05) only
        let data = [0x1C, 0x02, 0x05, 0x00, 0x03, b'f', b'o', b'o'];
        assert_eq!(iptc_caption(&data), None);
    }

    #[test]
    fn missing_file_is_empty() {
        assert_eq!(
            read_embedded_text(Path::new("/nonexistent/image.jpg")),
            EmbeddedText::default()
        );
    }
}
