//! Camera frame to price: snapshot, downscale, OCR, extract.
//!
//! Camera and OCR are host capabilities injected through [`FrameSource`] and
//! [`OcrCapability`]. A [`ScannerSession`] owns the open camera stream and
//! releases it on every exit path, including drop.

use super::error::{ConverterError, Result};
use super::extract::{OCR_WHITELIST, ScoringWeights, extract_price};
use async_trait::async_trait;
use image::DynamicImage;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Longest side of the image handed to OCR.
pub const DEFAULT_MAX_DIMENSION: u32 = 800;

/// An open camera stream.
pub trait CameraStream: Send {
    /// Grabs the current frame.
    fn snapshot(&mut self) -> Result<DynamicImage>;

    /// Stops all tracks and detaches the source. Safe to call repeatedly.
    fn release(&mut self);

    fn is_live(&self) -> bool;
}

/// Opens camera streams, preferring an environment-facing camera.
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn open(&self) -> Result<Box<dyn CameraStream>>;
}

/// Image-to-text recognition.
#[async_trait]
pub trait OcrCapability: Send + Sync {
    /// Loads the engine if needed. Cheap once ready.
    async fn ensure_ready(&self) -> Result<()>;

    /// Recognizes text, restricted to the characters in `whitelist`.
    async fn recognize(&self, image: &DynamicImage, whitelist: &str) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub max_dimension: u32,
    pub whitelist: String,
    pub weights: ScoringWeights,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            whitelist: OCR_WHITELIST.to_string(),
            weights: ScoringWeights::default(),
        }
    }
}

/// Target size so the longer side is at most `max_dimension`.
///
/// Aspect ratio is kept, each side is at least 1 and images are never
/// enlarged. Zero-sized frames fall back to 640x480.
pub fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let (w, h) = if width == 0 || height == 0 {
        (640, 480)
    } else {
        (width, height)
    };
    let longest = w.max(h);
    if longest <= max_dimension {
        return (w, h);
    }
    let scaled =
        |side: u32| ((u64::from(side) * u64::from(max_dimension) / u64::from(longest)) as u32).max(1);
    (scaled(w), scaled(h))
}

pub fn downscale(frame: &DynamicImage, max_dimension: u32) -> DynamicImage {
    let (w, h) = scaled_dimensions(frame.width(), frame.height(), max_dimension);
    if (w, h) == (frame.width(), frame.height()) {
        return frame.clone();
    }
    debug!(
        from = ?(frame.width(), frame.height()),
        to = ?(w, h),
        "Downscaling frame for OCR"
    );
    frame.resize_exact(w, h, FilterType::Triangle)
}

/// An open scanner. The camera stream is released on close or drop.
pub struct ScannerSession {
    stream: Box<dyn CameraStream>,
}

impl ScannerSession {
    pub async fn open(frames: &dyn FrameSource) -> Result<Self> {
        let stream = frames.open().await?;
        info!("Scanner opened");
        Ok(Self { stream })
    }

    pub fn is_live(&self) -> bool {
        self.stream.is_live()
    }

    /// Captures one frame and returns the best price found in it.
    #[instrument(name = "ScannerCapture", skip_all)]
    pub async fn capture(
        &mut self,
        ocr: &dyn OcrCapability,
        config: &CaptureConfig,
    ) -> Result<f64> {
        ocr.ensure_ready().await?;
        let frame = downscale(&self.stream.snapshot()?, config.max_dimension);

        let text = ocr.recognize(&frame, &config.whitelist).await?;
        debug!(text = %text, "OCR output");

        let price = extract_price(&text, &config.weights)
            .ok_or(ConverterError::NoPriceCandidateFound)?;
        info!(price, "Captured price");
        Ok(price)
    }

    pub fn close(mut self) {
        self.stream.release();
    }
}

impl Drop for ScannerSession {
    fn drop(&mut self) {
        if self.stream.is_live() {
            debug!("Releasing camera stream");
            self.stream.release();
        }
    }
}

/// One-shot scan: open the camera, capture, release.
pub async fn scan_price(
    frames: &dyn FrameSource,
    ocr: &dyn OcrCapability,
    config: &CaptureConfig,
) -> Result<f64> {
    let mut session = ScannerSession::open(frames).await?;
    let result = session.capture(ocr, config).await;
    session.close();
    result
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::RgbImage;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    pub(crate) struct FakeStream {
        live: Arc<AtomicBool>,
        size: (u32, u32),
    }

    impl CameraStream for FakeStream {
        fn snapshot(&mut self) -> Result<DynamicImage> {
            if !self.live.load(Ordering::SeqCst) {
                return Err(ConverterError::CameraUnavailable("stream released".into()));
            }
            Ok(DynamicImage::ImageRgb8(RgbImage::new(self.size.0, self.size.1)))
        }

        fn release(&mut self) {
            self.live.store(false, Ordering::SeqCst);
        }

        fn is_live(&self) -> bool {
            self.live.load(Ordering::SeqCst)
        }
    }

    /// Hands out streams sharing one liveness flag.
    pub(crate) struct FakeCamera {
        pub live: Arc<AtomicBool>,
        pub opened: AtomicUsize,
        pub size: (u32, u32),
        pub deny: bool,
    }

    impl FakeCamera {
        pub fn new() -> Self {
            Self {
                live: Arc::new(AtomicBool::new(false)),
                opened: AtomicUsize::new(0),
                size: (1920, 1080),
                deny: false,
            }
        }
    }

    #[async_trait]
    impl FrameSource for FakeCamera {
        async fn open(&self) -> Result<Box<dyn CameraStream>> {
            if self.deny {
                return Err(ConverterError::CameraPermissionDenied);
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            self.live.store(true, Ordering::SeqCst);
            Ok(Box::new(FakeStream {
                live: Arc::clone(&self.live),
                size: self.size,
            }))
        }
    }

    /// Returns a canned OCR result and records the frame size it saw.
    pub(crate) struct FakeOcr {
        pub result: std::result::Result<String, String>,
        pub seen: Mutex<Option<(u32, u32, String)>>,
    }

    impl FakeOcr {
        pub fn text(text: &str) -> Self {
            Self {
                result: Ok(text.to_string()),
                seen: Mutex::new(None),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                result: Err(message.to_string()),
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl OcrCapability for FakeOcr {
        async fn ensure_ready(&self) -> Result<()> {
            Ok(())
        }

        async fn recognize(&self, image: &DynamicImage, whitelist: &str) -> Result<String> {
            *self.seen.lock().unwrap() =
                Some((image.width(), image.height(), whitelist.to_string()));
            self.result.clone().map_err(ConverterError::OcrFailure)
        }
    }

    #[test]
    fn test_scaled_dimensions() {
        assert_eq!(scaled_dimensions(1920, 1080, 800), (800, 450));
        assert_eq!(scaled_dimensions(1080, 1920, 800), (450, 800));
        assert_eq!(scaled_dimensions(640, 480, 800), (640, 480));
        assert_eq!(scaled_dimensions(0, 0, 800), (640, 480));
        assert_eq!(scaled_dimensions(10_000, 1, 800), (800, 1));
    }

    #[tokio::test]
    async fn test_scan_price_downscales_and_extracts() {
        let camera = FakeCamera::new();
        let ocr = FakeOcr::text("TOTAL $ 12,99");

        let price = scan_price(&camera, &ocr, &CaptureConfig::default())
            .await
            .unwrap();

        assert_eq!(price, 12.99);
        let seen = ocr.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen, (800, 450, OCR_WHITELIST.to_string()));
        assert!(!camera.live.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_ocr_failure_releases_stream() {
        let camera = FakeCamera::new();
        let ocr = FakeOcr::failing("engine crashed");

        let err = scan_price(&camera, &ocr, &CaptureConfig::default())
            .await
            .unwrap_err();

        assert_eq!(err, ConverterError::OcrFailure("engine crashed".into()));
        assert_eq!(camera.opened.load(Ordering::SeqCst), 1);
        assert!(!camera.live.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_no_candidate_releases_stream() {
        let camera = FakeCamera::new();
        let ocr = FakeOcr::text("...");

        let err = scan_price(&camera, &ocr, &CaptureConfig::default())
            .await
            .unwrap_err();

        assert_eq!(err, ConverterError::NoPriceCandidateFound);
        assert!(!camera.live.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_permission_denied_is_reported() {
        let camera = FakeCamera {
            deny: true,
            ..FakeCamera::new()
        };
        let ocr = FakeOcr::text("1.00");

        let err = scan_price(&camera, &ocr, &CaptureConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err, ConverterError::CameraPermissionDenied);
    }

    #[tokio::test]
    async fn test_dropped_session_releases_stream() {
        let camera = FakeCamera::new();
        {
            let session = ScannerSession::open(&camera).await.unwrap();
            assert!(session.is_live());
        }
        assert!(!camera.live.load(Ordering::SeqCst));
    }
}
