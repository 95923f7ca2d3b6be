//! OCR fallback for image-only portfolio grids.
//!
//! Logos are often the only place a company name appears. When text
//! heuristics come up short, each downloaded image is normalized to a
//! grayscale PNG and handed to an [`OcrEngine`].

use std::io::Cursor;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, imageops::FilterType};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use portfolioscout_shared::ExtractConfig;

/// Logos narrower than this are upscaled before recognition.
const MIN_OCR_WIDTH: u32 = 300;

/// Errors from a single OCR attempt. Never fatal to extraction.
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("image could not be decoded: {0}")]
    Decode(String),

    #[error("OCR engine unavailable: {0}")]
    Unavailable(String),

    #[error("OCR failed: {0}")]
    Failed(String),

    #[error("OCR timed out after {0}s")]
    Timeout(u64),
}

/// Turns image bytes into recognized text.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError>;

    fn name(&self) -> &str;
}

/// Runs the `tesseract` binary over stdin/stdout.
pub struct TesseractOcr {
    command: String,
    language: String,
    timeout: Duration,
}

impl TesseractOcr {
    pub fn new(command: impl Into<String>, language: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ExtractConfig) -> Self {
        Self::new(
            config.tesseract_cmd.clone(),
            config.ocr_language.clone(),
            Duration::from_secs(config.ocr_timeout_secs),
        )
    }

    async fn run(&self, png: Vec<u8>) -> Result<String, OcrError> {
        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout", "-l", &self.language])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    OcrError::Unavailable(format!("{} not found", self.command))
                } else {
                    OcrError::Failed(e.to_string())
                }
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&png)
                .await
                .map_err(|e| OcrError::Failed(format!("writing image: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| OcrError::Failed(e.to_string()))?;
        if !output.status.success() {
            return Err(OcrError::Failed(format!("{} exited with {}", self.command, output.status)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        let bytes = image.to_vec();
        let attempt = async move {
            let png = tokio::task::spawn_blocking(move || prepare_image(&bytes))
                .await
                .map_err(|e| OcrError::Failed(format!("image preparation panicked: {e}")))??;
            self.run(png).await
        };

        // the budget covers decoding as well as the child process
        let secs = self.timeout.as_secs();
        tokio::time::timeout(self.timeout, attempt)
            .await
            .map_err(|_| OcrError::Timeout(secs))?
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

/// Decode any supported format, convert to grayscale, upscale small logos,
/// and re-encode as PNG.
pub fn prepare_image(bytes: &[u8]) -> Result<Vec<u8>, OcrError> {
    let img = image::load_from_memory(bytes).map_err(|e| OcrError::Decode(e.to_string()))?;
    let mut gray = DynamicImage::ImageLuma8(img.to_luma8());

    if gray.width() > 0 && gray.width() < MIN_OCR_WIDTH {
        let scale = MIN_OCR_WIDTH.div_ceil(gray.width()).min(4);
        gray = gray.resize(gray.width() * scale, gray.height() * scale, FilterType::Lanczos3);
    }

    let mut buf = Vec::new();
    gray.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| OcrError::Decode(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn png_fixture(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn prepare_image_outputs_grayscale_png() {
        let png = prepare_image(&png_fixture(600, 100)).unwrap();
        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap();
        assert_eq!(decoded.color(), image::ColorType::L8);
        assert_eq!(decoded.width(), 600);
    }

    #[test]
    fn prepare_image_upscales_small_logos() {
        let png = prepare_image(&png_fixture(80, 20)).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), 320);
    }

    #[test]
    fn prepare_image_rejects_garbage() {
        assert!(matches!(prepare_image(b"not an image"), Err(OcrError::Decode(_))));
    }

    #[tokio::test]
    async fn missing_binary_is_unavailable() {
        let ocr = TesseractOcr::new("portfolioscout-no-such-binary", "eng", Duration::from_secs(2));
        let err = ocr.recognize(&png_fixture(400, 100)).await.unwrap_err();
        assert!(matches!(err, OcrError::Unavailable(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_engine_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let script = std::env::temp_dir().join(format!("portfolioscout-slow-ocr-{}.sh", std::process::id()));
        std::fs::write(&script, "#!/bin/sh\nsleep 5\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let ocr = TesseractOcr::new(script.to_string_lossy(), "eng", Duration::from_millis(300));
        let started = std::time::Instant::now();
        let err = ocr.recognize(&png_fixture(400, 100)).await.unwrap_err();
        let _ = std::fs::remove_file(&script);

        assert!(matches!(err, OcrError::Timeout(_)), "got {err:?}");
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn garbage_bytes_fail_before_spawning() {
        let ocr = TesseractOcr::new("portfolioscout-no-such-binary", "eng", Duration::from_secs(2));
        let err = ocr.recognize(b"not an image").await.unwrap_err();
        assert!(matches!(err, OcrError::Decode(_)));
    }
}
