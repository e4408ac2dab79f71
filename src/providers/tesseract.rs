use crate::core::capture::OcrCapability;
use crate::core::error::{ConverterError, Result};
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

pub const DEFAULT_COMMAND: &str = "tesseract";
pub const DEFAULT_LANGUAGE: &str = "eng";

/// OCR through the `tesseract` command-line tool.
///
/// The engine is probed lazily on first use. Frames are piped in as PNG and
/// the recognized text is read from stdout.
pub struct TesseractOcr {
    command: String,
    language: String,
    ready: OnceCell<String>,
}

impl TesseractOcr {
    pub fn new(command: &str, language: &str) -> Self {
        Self {
            command: command.to_string(),
            language: language.to_string(),
            ready: OnceCell::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.initialized()
    }

    fn recognition_args(&self, whitelist: &str) -> Vec<String> {
        vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.language.clone(),
            "-c".to_string(),
            format!("tessedit_char_whitelist={whitelist}"),
        ]
    }

    fn spawn_error(&self, err: std::io::Error) -> ConverterError {
        ConverterError::OcrFailure(format!("cannot run `{}`: {err}", self.command))
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND, DEFAULT_LANGUAGE)
    }
}

#[async_trait]
impl OcrCapability for TesseractOcr {
    async fn ensure_ready(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| async {
                let output = Command::new(&self.command)
                    .arg("--version")
                    .output()
                    .await
                    .map_err(|e| self.spawn_error(e))?;
                if !output.status.success() {
                    return Err(ConverterError::OcrFailure(format!(
                        "`{} --version` exited with {}",
                        self.command, output.status
                    )));
                }
                let version = String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .to_string();
                info!(version = %version, "OCR engine ready");
                Ok::<_, ConverterError>(version)
            })
            .await
            .map(|_| ())
    }

    #[instrument(name = "TesseractRecognize", skip_all, fields(w = image.width(), h = image.height()))]
    async fn recognize(&self, image: &DynamicImage, whitelist: &str) -> Result<String> {
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| ConverterError::OcrFailure(format!("cannot encode frame: {e}")))?;

        let mut child = Command::new(&self.command)
            .args(self.recognition_args(whitelist))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ConverterError::OcrFailure("stdin not captured".into()))?;
        stdin
            .write_all(&png)
            .await
            .map_err(|e| ConverterError::OcrFailure(format!("cannot send frame: {e}")))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ConverterError::OcrFailure(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConverterError::OcrFailure(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(bytes = text.len(), "OCR finished");
        Ok(text)
    }
}
