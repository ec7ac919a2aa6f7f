//! Message composition state
//!
//! The composer owns the draft: the text being typed (or dictated over)
//! and an optional image attachment. Submission itself is asynchronous;
//! the draft is only cleared once the store confirms the send, so a
//! failed send leaves everything in place for a retry.

pub mod attachment;

pub use attachment::{encode_image_data_url, is_image_file, AttachmentLoader};

use crate::chat::OutgoingMessage;
use crate::{ParleyError, Result};
use std::path::{Path, PathBuf};

/// Draft text plus pending image attachment.
#[derive(Default)]
pub struct Composer {
    text: String,
    image: Option<String>,
    loader: AttachmentLoader,
    selected_file: Option<PathBuf>,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Mutable access for the text edit widget
    pub fn text_mut(&mut self) -> &mut String {
        &mut self.text
    }

    /// Replace the draft text; no validation
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Pending image attachment as a data URL
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    /// The file backing the pending attachment, while one is selected
    pub fn selected_file(&self) -> Option<&Path> {
        self.selected_file.as_deref()
    }

    /// Select `path` as the attachment. Non-image files fail with
    /// `InvalidAttachment`; otherwise the decode completes via `poll()`.
    pub fn attach_image(&mut self, path: PathBuf) -> Result<()> {
        self.loader.load(path.clone())?;
        self.selected_file = Some(path);
        Ok(())
    }

    /// Drop the pending image and reset the file selection, so picking
    /// the same file again re-triggers the change notification.
    pub fn remove_image(&mut self) {
        self.image = None;
        self.selected_file = None;
        self.loader.invalidate();
    }

    /// Whether there is anything worth submitting
    pub fn has_content(&self) -> bool {
        !self.text.trim().is_empty() || self.image.is_some()
    }

    /// Build the submission payload.
    ///
    /// Returns None when the text is empty or whitespace-only and no
    /// image is pending; submit is a no-op in that case and the sender
    /// must not be invoked.
    pub fn payload(&self) -> Option<OutgoingMessage> {
        if !self.has_content() {
            return None;
        }
        Some(OutgoingMessage {
            text: self.text.trim().to_string(),
            image: self.image.clone(),
        })
    }

    /// Reset the draft after a confirmed send.
    pub fn clear(&mut self) {
        self.text.clear();
        self.image = None;
        self.selected_file = None;
        self.loader.invalidate();
    }

    /// Apply any finished attachment decode. Returns the error when the
    /// selection turned out not to be a usable image.
    pub fn poll(&mut self) -> Option<ParleyError> {
        match self.loader.poll() {
            Some(Ok(data_url)) => {
                self.image = Some(data_url);
                None
            }
            Some(Err(error)) => {
                self.selected_file = None;
                Some(error)
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    fn png_file(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        let img = image::RgbaImage::from_pixel(1, 1, image::Rgba([0, 128, 255, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn poll_until_image(composer: &mut Composer) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            composer.poll();
            if composer.image().is_some() {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("Attachment never decoded");
    }

    #[test]
    fn test_empty_draft_has_no_payload() {
        let composer = Composer::new();
        assert!(composer.payload().is_none());
    }

    #[test]
    fn test_whitespace_only_draft_has_no_payload() {
        let mut composer = Composer::new();
        composer.set_text("   \t  ");
        assert!(composer.payload().is_none());
    }

    #[test]
    fn test_payload_trims_text() {
        let mut composer = Composer::new();
        composer.set_text("  hello  ");
        let payload = composer.payload().unwrap();
        assert_eq!(payload.text, "hello");
        assert!(payload.image.is_none());
    }

    #[test]
    fn test_image_only_payload() {
        let dir = tempfile::tempdir().unwrap();
        let mut composer = Composer::new();
        composer.attach_image(png_file(&dir, "pic.png")).unwrap();
        poll_until_image(&mut composer);

        let payload = composer.payload().unwrap();
        assert_eq!(payload.text, "");
        assert!(payload.image.unwrap().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_invalid_attachment_rejected() {
        let mut composer = Composer::new();
        let err = composer.attach_image(PathBuf::from("notes.txt")).unwrap_err();
        assert!(matches!(err, ParleyError::InvalidAttachment(_)));
        assert!(composer.selected_file().is_none());
    }

    #[test]
    fn test_remove_image_resets_selection() {
        let dir = tempfile::tempdir().unwrap();
        let path = png_file(&dir, "pic.png");
        let mut composer = Composer::new();
        composer.attach_image(path.clone()).unwrap();
        poll_until_image(&mut composer);

        composer.remove_image();
        assert!(composer.image().is_none());
        assert!(composer.selected_file().is_none());

        // Re-selecting the same file goes through the full flow again
        composer.attach_image(path).unwrap();
        poll_until_image(&mut composer);
        assert!(composer.image().is_some());
    }

    #[test]
    fn test_clear_resets_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut composer = Composer::new();
        composer.set_text("draft");
        composer.attach_image(png_file(&dir, "pic.png")).unwrap();
        poll_until_image(&mut composer);

        composer.clear();
        assert!(composer.text().is_empty());
        assert!(composer.image().is_none());
        assert!(composer.selected_file().is_none());
        assert!(composer.payload().is_none());
    }

    #[test]
    fn test_decode_failure_surfaces_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.png");
        std::fs::write(&path, b"not an image").unwrap();

        let mut composer = Composer::new();
        composer.attach_image(path).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut error = None;
        while Instant::now() < deadline && error.is_none() {
            error = composer.poll();
            std::thread::sleep(Duration::from_millis(5));
        }

        assert!(matches!(error, Some(ParleyError::InvalidAttachment(_))));
        assert!(composer.image().is_none());
    }
}
