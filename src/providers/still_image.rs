use crate::core::capture::{CameraStream, FrameSource};
use crate::core::error::{ConverterError, Result};
use async_trait::async_trait;
use image::DynamicImage;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Frame source backed by an image file, for hosts without a live camera.
pub struct StillImageSource {
    path: PathBuf,
}

impl StillImageSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

struct StillImageStream {
    frame: Option<DynamicImage>,
}

impl CameraStream for StillImageStream {
    fn snapshot(&mut self) -> Result<DynamicImage> {
        self.frame
            .clone()
            .ok_or_else(|| ConverterError::CameraUnavailable("stream already released".into()))
    }

    fn release(&mut self) {
        self.frame = None;
    }

    fn is_live(&self) -> bool {
        self.frame.is_some()
    }
}

#[async_trait]
impl FrameSource for StillImageSource {
    async fn open(&self) -> Result<Box<dyn CameraStream>> {
        debug!(path = %self.path.display(), "Opening still image");
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => ConverterError::CameraPermissionDenied,
            _ => ConverterError::CameraUnavailable(format!("{}: {e}", self.path.display())),
        })?;

        let frame = image::load_from_memory(&bytes).map_err(|e| {
            ConverterError::CameraUnavailable(format!("{}: {e}", self.path.display()))
        })?;
        Ok(Box::new(StillImageStream { frame: Some(frame) }))
    }
}

/// Frame source for commands that never scan.
pub struct NoCamera;

#[async_trait]
impl FrameSource for NoCamera {
    async fn open(&self) -> Result<Box<dyn CameraStream>> {
        Err(ConverterError::CameraUnavailable("no image given to scan".into()))
    }
}
