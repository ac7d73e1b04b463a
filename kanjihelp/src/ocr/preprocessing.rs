use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, GenericImageView, GrayImage, ImageReader, Luma};

use crate::capture::{downscale_to_fit, encode_png};
use crate::config::OcrConfig;
use crate::error::{KanjiError, Result};

/// Decode an uploaded image given either as a `data:` URL or as bare base64.
pub fn decode_upload(data: &str) -> Result<Vec<u8>> {
    let payload = match data.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, encoded)| encoded)
            .ok_or_else(|| KanjiError::Validation("Malformed data URL".to_string()))?,
        None => data,
    };

    let payload = payload.trim();
    if payload.is_empty() {
        return Err(KanjiError::Validation("Image cannot be empty".to_string()));
    }

    STANDARD
        .decode(payload)
        .map_err(|e| KanjiError::Validation(format!("Image is not valid base64: {e}")))
}

/// Prepare an uploaded image for recognition.
///
/// 1. Rejects images below the minimum dimension
/// 2. Downscales images above the maximum dimension
/// 3. Converts to grayscale, dropping any alpha channel
/// 4. Stretches the histogram to the full range
///
/// Returns PNG bytes.
pub fn preprocess_image(bytes: &[u8], config: &OcrConfig) -> Result<Vec<u8>> {
    let reader = ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| KanjiError::Processing(format!("Failed to read image: {e}")))?;

    let img = reader
        .decode()
        .map_err(|e| KanjiError::Processing(format!("Failed to decode image: {e}")))?;

    let (width, height) = img.dimensions();
    if width < config.min_image_dimension || height < config.min_image_dimension {
        return Err(KanjiError::Processing(format!(
            "Image too small: {}x{}, minimum {}x{}",
            width, height, config.min_image_dimension, config.min_image_dimension
        )));
    }

    let img = downscale_to_fit(img, config.max_image_dimension);
    let gray = stretch_contrast(img.to_luma8());

    encode_png(&DynamicImage::ImageLuma8(gray))
}

/// Map the darkest pixel to 0 and the lightest to 255. Flat images are
/// returned unchanged.
fn stretch_contrast(gray: GrayImage) -> GrayImage {
    let (min_val, max_val) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), Luma([v])| (lo.min(*v), hi.max(*v)));

    if max_val <= min_val {
        return gray;
    }

    let range = (max_val - min_val) as f32;
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let Luma([v]) = *gray.get_pixel(x, y);
        Luma([((v - min_val) as f32 / range * 255.0).round() as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;

    fn create_test_config() -> OcrConfig {
        OcrConfig {
            min_image_dimension: 50,
            ..OcrConfig::default()
        }
    }

    fn create_test_png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::new_rgba8(width, height);
        let mut output = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
            .unwrap();
        output
    }

    #[test]
    fn test_preprocess_valid_image() {
        let processed = preprocess_image(&create_test_png(100, 200), &create_test_config()).unwrap();
        let decoded = image::load_from_memory(&processed).unwrap();

        assert_eq!(decoded.dimensions(), (100, 200));
        assert!(matches!(decoded, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_reject_tiny_image() {
        let result = preprocess_image(&create_test_png(10, 80), &create_test_config());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("too small"), "{err}");
        assert!(err.contains("10x80"), "{err}");
    }

    #[test]
    fn test_min_dimension_exactly_at_limit() {
        assert!(preprocess_image(&create_test_png(50, 50), &create_test_config()).is_ok());
    }

    #[test]
    fn test_large_image_is_downscaled() {
        let config = OcrConfig {
            max_image_dimension: 500,
            ..create_test_config()
        };
        let processed = preprocess_image(&create_test_png(2000, 1000), &config).unwrap();
        let decoded = image::load_from_memory(&processed).unwrap();
        assert_eq!(decoded.dimensions(), (500, 250));
    }

    #[test]
    fn test_invalid_image_data() {
        let result = preprocess_image(&[0u8, 1, 2, 3, 4, 5], &create_test_config());
        assert!(matches!(result, Err(KanjiError::Processing(_))));
    }

    #[test]
    fn test_stretch_contrast() {
        let mut gray = GrayImage::new(10, 1);
        for (x, _y, pixel) in gray.enumerate_pixels_mut() {
            *pixel = Luma([50 + x as u8 * 10]);
        }

        let stretched = stretch_contrast(gray);
        assert_eq!(stretched.get_pixel(0, 0), &Luma([0]));
        assert_eq!(stretched.get_pixel(9, 0), &Luma([255]));
    }

    #[test]
    fn test_stretch_contrast_flat() {
        let gray = GrayImage::from_pixel(10, 10, Luma([100]));
        let stretched = stretch_contrast(gray);
        assert!(stretched.pixels().all(|p| p.0[0] == 100));
    }

    #[test]
    fn test_decode_upload_data_url_and_bare_base64() {
        let png = create_test_png(4, 4);
        let encoded = STANDARD.encode(&png);

        assert_eq!(decode_upload(&encoded).unwrap(), png);
        assert_eq!(
            decode_upload(&format!("data:image/png;base64,{encoded}")).unwrap(),
            png
        );
    }

    #[test]
    fn test_decode_upload_rejects_bad_input() {
        assert!(matches!(decode_upload(""), Err(KanjiError::Validation(_))));
        assert!(matches!(
            decode_upload("data:image/png;base64"),
            Err(KanjiError::Validation(_))
        ));
        assert!(matches!(
            decode_upload("not base64!"),
            Err(KanjiError::Validation(_))
        ));
    }
}
