//! # Image Processing Module
//!
//! Converte un singolo file HEIC in JPEG.
//!
//! ## Pipeline di conversione
//!
//! 1. **Scratch dir**: `TempDir` dedicata, rimossa su ogni percorso di uscita
//! 2. **Decode**: delegato al `HeifDecoder` (tool esterni) → PNG intermedio
//! 3. **Normalizzazione**: il frame decodificato viene portato a RGB a 3 canali
//! 4. **Encode**: JPEG a qualità fissa con il crate `image`, su thread bloccante
//! 5. **Sostituzione atomica**: file temporaneo nella directory di destinazione,
//!    poi `persist` sopra la destinazione (riesecuzioni deterministiche)
//! 6. **Post-check**: la destinazione deve esistere
//!
//! ```text
//! photo.heic --[heif-convert]--> decoded.png --[to_rgb8 + JpegEncoder]--> photo.jpg
//! ```

use image::codecs::jpeg::JpegEncoder;
use image::ColorType;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::decoder::{intermediate_path, HeifDecoder};
use crate::error::ConvertError;

/// Converts one HEIC file into a JPEG
#[derive(Clone)]
pub struct ImageProcessor {
    decoder: Arc<dyn HeifDecoder>,
    jpeg_quality: u8,
}

impl ImageProcessor {
    pub fn new(decoder: Arc<dyn HeifDecoder>, jpeg_quality: u8) -> Self {
        Self { decoder, jpeg_quality }
    }

    pub fn decoder(&self) -> &Arc<dyn HeifDecoder> {
        &self.decoder
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    /// Convert `source` into a JPEG at `destination`.
    ///
    /// The destination's parent directory must already exist. Returns the
    /// pixel dimensions of the encoded image.
    pub async fn convert(&self, source: &Path, destination: &Path) -> Result<(u32, u32), ConvertError> {
        let scratch = tempfile::Builder::new().prefix("heic-convert-").tempdir()?;
        let intermediate = intermediate_path(scratch.path());

        debug!("Decoding {} with {}", source.display(), self.decoder.name());
        self.decoder.decode_to_png(source, &intermediate).await?;

        if !intermediate.exists() {
            return Err(ConvertError::Codec(format!(
                "Decoder produced no image for {}",
                source.display()
            )));
        }

        let quality = self.jpeg_quality;
        let target: PathBuf = destination.to_path_buf();
        let dimensions = tokio::task::spawn_blocking(move || encode_jpeg(&intermediate, &target, quality))
            .await
            .map_err(|e| ConvertError::Codec(format!("JPEG encoder task failed: {}", e)))??;

        if !destination.exists() {
            return Err(ConvertError::Codec(format!(
                "Output file was not created: {}",
                destination.display()
            )));
        }

        Ok(dimensions)
    }
}

/// Decode `intermediate`, normalize it to RGB8 and write a JPEG over `destination`
fn encode_jpeg(intermediate: &Path, destination: &Path, quality: u8) -> Result<(u32, u32), ConvertError> {
    let decoded = image::io::Reader::open(intermediate)?
        .with_guessed_format()?
        .decode()?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    drop(decoded);

    let parent = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staged = tempfile::NamedTempFile::new_in(parent)?;
    {
        let mut writer = BufWriter::new(staged.as_file_mut());
        let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality);
        encoder.encode(rgb.as_raw(), width, height, ColorType::Rgb8)?;
        writer.flush()?;
    }
    staged
        .persist(destination)
        .map_err(|e| ConvertError::Io(e.error))?;

    debug!("Encoded {}x{} JPEG (quality {}) at {}", width, height, quality, destination.display());
    Ok((width, height))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use image::{ImageFormat, Rgba, RgbaImage};

    /// Decoder that copies the source bytes, for sources that already hold a PNG
    pub struct CopyDecoder;

    #[async_trait]
    impl HeifDecoder for CopyDecoder {
        fn name(&self) -> &str {
            "copy"
        }

        async fn decode_to_png(&self, source: &Path, intermediate: &Path) -> Result<(), ConvertError> {
            tokio::fs::copy(source, intermediate).await?;
            Ok(())
        }
    }

    /// Write a small RGBA PNG under a `.heic` name
    pub fn write_fake_heic(path: &Path) {
        let mut img = RgbaImage::new(8, 6);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgba([(x * 30) as u8, (y * 40) as u8, 128, 200]);
        }
        img.save_with_format(path, ImageFormat::Png).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{write_fake_heic, CopyDecoder};
    use super::*;
    use tempfile::TempDir;

    fn processor() -> ImageProcessor {
        ImageProcessor::new(Arc::new(CopyDecoder), 95)
    }

    #[tokio::test]
    async fn test_convert_produces_rgb_jpeg() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("photo.heic");
        let destination = dir.path().join("photo.jpg");
        write_fake_heic(&source);

        let (w, h) = processor().convert(&source, &destination).await.unwrap();
        assert_eq!((w, h), (8, 6));

        let reopened = image::open(&destination).unwrap();
        assert_eq!(reopened.color(), ColorType::Rgb8);
        assert_eq!((reopened.width(), reopened.height()), (8, 6));
    }

    #[tokio::test]
    async fn test_zero_byte_source_is_codec_error() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("empty.heic");
        std::fs::write(&source, b"").unwrap();

        let err = processor()
            .convert(&source, &dir.path().join("empty.jpg"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Codec);
        assert!(!dir.path().join("empty.jpg").exists());
    }

    #[tokio::test]
    async fn test_overwrites_existing_destination() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("photo.heic");
        let destination = dir.path().join("photo.jpg");
        write_fake_heic(&source);
        std::fs::write(&destination, b"stale").unwrap();

        processor().convert(&source, &destination).await.unwrap();
        let first = std::fs::read(&destination).unwrap();
        processor().convert(&source, &destination).await.unwrap();
        let second = std::fs::read(&destination).unwrap();

        assert_ne!(first, b"stale".to_vec());
        assert_eq!(first, second);
    }
}
