//! Consistency check between the served image and its declared size.

use thiserror::Error;

/// Accepted deviation of the served image size, as a ratio.
///
/// `0.2` accepts ratios in `[0.8, 1.2]`.
pub const DEFAULT_IMAGE_SIZE_TOLERANCE: f64 = 0.2;

/// The image server returned an image whose size differs from the declared one.
#[derive(Error, Debug, Clone, PartialEq)]
#[error(
    "Image {url} is {actual_width}x{actual_height} but {expected_width}x{expected_height} was expected"
)]
pub struct ImageSizeMismatch {
    pub actual_width: u32,
    pub actual_height: u32,
    pub expected_width: u32,
    pub expected_height: u32,
    pub url: String,
}

/// Compare an image's actual size against the expected one.
///
/// Width, height and area ratios must all lie within `1 ± tolerance`.
pub fn check_image_size(
    actual: (u32, u32),
    expected: (u32, u32),
    url: &str,
    tolerance: f64,
) -> Result<(), ImageSizeMismatch> {
    let (aw, ah) = (actual.0 as f64, actual.1 as f64);
    let (ew, eh) = (expected.0 as f64, expected.1 as f64);
    let band = (1.0 - tolerance)..=(1.0 + tolerance);

    let ratios = [aw / ew, ah / eh, (aw * ah) / (ew * eh)];
    // NaN ratios (zero expected size) fall outside the band too
    if ratios.iter().all(|r| band.contains(r)) {
        return Ok(());
    }

    log::warn!(
        "Image size mismatch for {}: {}x{} instead of {}x{}",
        url,
        actual.0,
        actual.1,
        expected.0,
        expected.1
    );
    Err(ImageSizeMismatch {
        actual_width: actual.0,
        actual_height: actual.1,
        expected_width: expected.0,
        expected_height: expected.1,
        url: url.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "http://x/img";

    #[test]
    fn test_same_size_passes() {
        assert!(check_image_size((100, 100), (100, 100), URL, DEFAULT_IMAGE_SIZE_TOLERANCE).is_ok());
    }

    #[test]
    fn test_small_deviation_passes() {
        assert!(check_image_size((95, 105), (100, 100), URL, DEFAULT_IMAGE_SIZE_TOLERANCE).is_ok());
    }

    #[test]
    fn test_half_width_fails() {
        let err = check_image_size((50, 100), (100, 100), URL, DEFAULT_IMAGE_SIZE_TOLERANCE).unwrap_err();
        assert_eq!(err.actual_width, 50);
        assert_eq!(err.expected_width, 100);
        assert_eq!(err.url, URL);
        assert!(err.to_string().contains("50x100"));
    }

    #[test]
    fn test_area_ratio_checked() {
        // Each side within 20% but the area is 1.19^2 ~ 1.42
        assert!(check_image_size((119, 119), (100, 100), URL, DEFAULT_IMAGE_SIZE_TOLERANCE).is_err());
    }

    #[test]
    fn test_zero_expected_fails() {
        assert!(check_image_size((10, 10), (0, 0), URL, DEFAULT_IMAGE_SIZE_TOLERANCE).is_err());
    }
}
