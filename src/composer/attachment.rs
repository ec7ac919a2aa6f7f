//! Image attachment decoding
//!
//! Reading and base64-encoding a picked file happens off the UI thread.
//! Each request gets a generation number; only results matching the
//! current generation are applied, so a later pick supersedes an
//! earlier in-flight decode without any ordering guarantee.

use crate::{ParleyError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::{Path, PathBuf};
use tracing::debug;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

/// Media-type gate applied before any file I/O happens.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Encode image bytes as a `data:<mime>;base64,...` URL.
///
/// The bytes must be a recognizable image; extension spoofing fails
/// here rather than producing a broken preview.
pub fn encode_image_data_url(bytes: &[u8]) -> Result<String> {
    let format = image::guess_format(bytes).map_err(|_| {
        ParleyError::InvalidAttachment("file content is not a recognized image".into())
    })?;
    Ok(format!(
        "data:{};base64,{}",
        format.to_mime_type(),
        BASE64.encode(bytes)
    ))
}

enum DecodeEvent {
    Done { generation: u64, data_url: String },
    Failed { generation: u64, error: ParleyError },
}

/// Off-thread decoder with last-write-wins semantics.
pub struct AttachmentLoader {
    event_tx: Sender<DecodeEvent>,
    event_rx: Receiver<DecodeEvent>,
    generation: u64,
}

impl Default for AttachmentLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl AttachmentLoader {
    pub fn new() -> Self {
        let (event_tx, event_rx) = unbounded();
        Self {
            event_tx,
            event_rx,
            generation: 0,
        }
    }

    /// Start decoding `path`. Non-image selections fail immediately
    /// with `InvalidAttachment`; everything else resolves through
    /// `poll()`.
    pub fn load(&mut self, path: PathBuf) -> Result<()> {
        if !is_image_file(&path) {
            return Err(ParleyError::InvalidAttachment(format!(
                "not an image file: {}",
                path.display()
            )));
        }

        self.generation += 1;
        let generation = self.generation;
        let tx = self.event_tx.clone();

        std::thread::spawn(move || {
            let result = std::fs::read(&path)
                .map_err(ParleyError::from)
                .and_then(|bytes| encode_image_data_url(&bytes));

            let event = match result {
                Ok(data_url) => DecodeEvent::Done {
                    generation,
                    data_url,
                },
                Err(error) => DecodeEvent::Failed { generation, error },
            };
            let _ = tx.send(event);
        });

        Ok(())
    }

    /// Invalidate in-flight decodes; their results will be dropped.
    pub fn invalidate(&mut self) {
        self.generation += 1;
    }

    /// Latest completed decode for the current generation, if any.
    pub fn poll(&mut self) -> Option<Result<String>> {
        let mut latest = None;

        while let Ok(event) = self.event_rx.try_recv() {
            match event {
                DecodeEvent::Done {
                    generation,
                    data_url,
                } if generation == self.generation => {
                    latest = Some(Ok(data_url));
                }
                DecodeEvent::Failed { generation, error } if generation == self.generation => {
                    latest = Some(Err(error));
                }
                _ => {
                    debug!("Dropped superseded attachment decode");
                }
            }
        }

        latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn poll_until(loader: &mut AttachmentLoader) -> Result<String> {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if let Some(outcome) = loader.poll() {
                return outcome;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("Decode never completed");
    }

    #[test]
    fn test_extension_gate() {
        assert!(is_image_file(Path::new("photo.PNG")));
        assert!(is_image_file(Path::new("photo.jpeg")));
        assert!(!is_image_file(Path::new("notes.txt")));
        assert!(!is_image_file(Path::new("no_extension")));
    }

    #[test]
    fn test_non_image_rejected_synchronously() {
        let mut loader = AttachmentLoader::new();
        let err = loader.load(PathBuf::from("document.pdf")).unwrap_err();
        assert!(matches!(err, ParleyError::InvalidAttachment(_)));
    }

    #[test]
    fn test_decode_produces_data_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        std::fs::write(&path, png_bytes()).unwrap();

        let mut loader = AttachmentLoader::new();
        loader.load(path).unwrap();

        let data_url = poll_until(&mut loader).unwrap();
        assert!(data_url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_spoofed_extension_fails_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.png");
        std::fs::write(&path, b"definitely not an image").unwrap();

        let mut loader = AttachmentLoader::new();
        loader.load(path).unwrap();

        let err = poll_until(&mut loader).unwrap_err();
        assert!(matches!(err, ParleyError::InvalidAttachment(_)));
    }

    #[test]
    fn test_later_load_supersedes_earlier() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.png");
        let second = dir.path().join("second.png");
        std::fs::write(&first, png_bytes()).unwrap();

        let mut second_bytes = png_bytes();
        second_bytes.extend_from_slice(b"\x00");
        std::fs::write(&second, &second_bytes).unwrap();

        let mut loader = AttachmentLoader::new();
        loader.load(first).unwrap();
        loader.load(second.clone()).unwrap();

        let expected = encode_image_data_url(&std::fs::read(&second).unwrap()).unwrap();
        let data_url = poll_until(&mut loader).unwrap();
        assert_eq!(data_url, expected);
    }

    #[test]
    fn test_invalidate_drops_inflight_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.png");
        std::fs::write(&path, png_bytes()).unwrap();

        let mut loader = AttachmentLoader::new();
        loader.load(path).unwrap();
        loader.invalidate();

        // Give the decode thread time to finish, then confirm nothing applies
        std::thread::sleep(Duration::from_millis(100));
        assert!(loader.poll().is_none());
    }

    #[test]
    fn test_encode_rejects_garbage() {
        assert!(encode_image_data_url(b"plain text").is_err());
    }
}
