use std::io::Cursor;

use image::codecs::png::PngEncoder;
use image::{
    ExtendedColorType, GrayImage, ImageEncoder, ImageError, ImageReader, Luma, Rgba, RgbaImage,
};

use super::{PainterError, PainterResult};
use crate::geometry::{ImageBounds, PixelPoint, Rgb};
use crate::labels::{LabelSet, VOID_LABEL_ID};

pub(crate) const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];
const OPAQUE: u8 = 255;

/// Per-pixel counts of what a class-removal sweep cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    pub cleared_fringe: u64,
    pub cleared_removed: u64,
    pub cleared_orphaned: u64,
    pub kept: u64,
}

impl SweepReport {
    pub const fn cleared(&self) -> u64 {
        self.cleared_fringe + self.cleared_removed + self.cleared_orphaned
    }
}

/// The authoritative label raster for one image, at its natural resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskBuffer {
    pixels: RgbaImage,
}

impl MaskBuffer {
    pub fn new(bounds: ImageBounds) -> Self {
        Self {
            pixels: RgbaImage::new(bounds.width, bounds.height),
        }
    }

    pub fn from_image(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    /// Decodes a mask and takes its dimensions as the natural resolution.
    pub fn decode(encoded: &[u8]) -> PainterResult<Self> {
        let pixels = decode_rgba(encoded)?;
        Ok(Self { pixels })
    }

    /// Replaces the pixel grid with a decoded mask of the same dimensions.
    /// On failure the current pixels are left untouched.
    pub fn load(&mut self, encoded: &[u8]) -> PainterResult<()> {
        let decoded = decode_rgba(encoded)?;
        let expected = self.bounds();
        let actual = ImageBounds::new(decoded.width(), decoded.height());
        if actual != expected {
            tracing::warn!(?expected, ?actual, "mask dimensions do not match source image");
            return Err(PainterError::DimensionMismatch { expected, actual });
        }

        self.pixels = decoded;
        tracing::debug!(width = actual.width, height = actual.height, "loaded mask");
        Ok(())
    }

    /// Encodes the grid as RGBA8 PNG; transparent and class pixels survive bit-exact.
    pub fn export(&self) -> PainterResult<Vec<u8>> {
        let mut encoded = Vec::new();
        PngEncoder::new(&mut encoded)
            .write_image(
                self.pixels.as_raw(),
                self.pixels.width(),
                self.pixels.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(PainterError::Encode)?;
        tracing::debug!(bytes = encoded.len(), "exported mask");
        Ok(encoded)
    }

    pub fn bounds(&self) -> ImageBounds {
        ImageBounds::new(self.pixels.width(), self.pixels.height())
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }

    pub fn pixel(&self, point: PixelPoint) -> Option<[u8; 4]> {
        if !self.bounds().contains(point) {
            return None;
        }
        Some(self.pixels.get_pixel(point.x as u32, point.y as u32).0)
    }

    /// Writes one pixel; out-of-bounds writes are dropped.
    pub(crate) fn put(&mut self, point: PixelPoint, value: [u8; 4]) -> bool {
        if !self.bounds().contains(point) {
            return false;
        }
        self.pixels.put_pixel(point.x as u32, point.y as u32, Rgba(value));
        true
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.pixels().all(|pixel| pixel.0[3] == 0)
    }

    /// Clears the removed class, any non-opaque pixel, and any color outside `keep`.
    pub fn sweep_remove_class(&mut self, removed: Rgb, keep: &[Rgb]) -> SweepReport {
        let mut report = SweepReport::default();

        for pixel in self.pixels.pixels_mut() {
            let value = pixel.0;
            if value[3] != OPAQUE {
                if value != TRANSPARENT {
                    report.cleared_fringe += 1;
                }
                pixel.0 = TRANSPARENT;
            } else if removed.matches(value) {
                report.cleared_removed += 1;
                pixel.0 = TRANSPARENT;
            } else if !keep.iter().any(|color| color.matches(value)) {
                report.cleared_orphaned += 1;
                pixel.0 = TRANSPARENT;
            } else {
                report.kept += 1;
            }
        }

        tracing::debug!(
            removed = %removed,
            keep = keep.len(),
            fringe = report.cleared_fringe,
            class = report.cleared_removed,
            orphaned = report.cleared_orphaned,
            "swept mask"
        );
        report
    }

    /// Rewrites every opaque `from` pixel to `to`, returning how many changed.
    pub fn recolor_class(&mut self, from: Rgb, to: Rgb) -> u64 {
        let mut changed = 0;
        for pixel in self.pixels.pixels_mut() {
            if pixel.0[3] == OPAQUE && from.matches(pixel.0) {
                pixel.0 = to.to_rgba();
                changed += 1;
            }
        }
        changed
    }

    /// True when every pixel is transparent or an exact opaque `keep` color.
    pub fn is_normalized(&self, keep: &[Rgb]) -> bool {
        self.pixels.pixels().all(|pixel| match pixel.0[3] {
            0 => true,
            OPAQUE => keep.iter().any(|color| color.matches(pixel.0)),
            _ => false,
        })
    }

    /// Class-code raster: each pixel holds its label id, 0 for unlabeled or unknown.
    pub fn to_class_codes(&self, labels: &LabelSet) -> GrayImage {
        let mut codes = GrayImage::new(self.width(), self.height());
        for (code, pixel) in codes.pixels_mut().zip(self.pixels.pixels()) {
            *code = Luma([class_code(pixel.0, labels)]);
        }
        codes
    }

    pub fn from_class_codes(codes: &GrayImage, labels: &LabelSet) -> Self {
        let mut pixels = RgbaImage::new(codes.width(), codes.height());
        for (pixel, code) in pixels.pixels_mut().zip(codes.pixels()) {
            let id = usize::from(code.0[0]);
            if id == VOID_LABEL_ID {
                continue;
            }
            if let Some(label) = labels.get(id) {
                *pixel = Rgba(label.color.to_rgba());
            }
        }
        Self { pixels }
    }

    /// Pixel counts indexed by label id.
    pub fn class_histogram(&self, labels: &LabelSet) -> Vec<u64> {
        let mut counts = vec![0_u64; labels.len()];
        for pixel in self.pixels.pixels() {
            counts[usize::from(class_code(pixel.0, labels))] += 1;
        }
        counts
    }
}

fn class_code(pixel: [u8; 4], labels: &LabelSet) -> u8 {
    if pixel[3] != OPAQUE {
        return VOID_LABEL_ID as u8;
    }
    labels
        .find_by_color(Rgb::new(pixel[0], pixel[1], pixel[2]))
        .and_then(|id| u8::try_from(id).ok())
        .unwrap_or(VOID_LABEL_ID as u8)
}

/// Decodes a source image in full and returns its natural pixel dimensions.
/// A valid header over a truncated or corrupt body is a decode error.
pub fn source_dimensions(encoded: &[u8]) -> PainterResult<ImageBounds> {
    let image = ImageReader::new(Cursor::new(encoded))
        .with_guessed_format()
        .map_err(|err| PainterError::Decode(ImageError::IoError(err)))?
        .decode()
        .map_err(|err| {
            tracing::warn!(?err, "failed to decode source image");
            PainterError::Decode(err)
        })?;
    Ok(ImageBounds::new(image.width(), image.height()))
}

fn decode_rgba(encoded: &[u8]) -> PainterResult<RgbaImage> {
    let image = image::load_from_memory(encoded).map_err(|err| {
        tracing::warn!(?err, "failed to decode mask");
        PainterError::Decode(err)
    })?;
    Ok(image.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Rgb = Rgb::new(255, 0, 0);
    const B: Rgb = Rgb::new(0, 255, 0);
    const C: Rgb = Rgb::new(0, 0, 255);

    fn buffer_with(pixels: &[(i32, i32, [u8; 4])]) -> MaskBuffer {
        let mut buffer = MaskBuffer::new(ImageBounds::new(4, 4));
        for &(x, y, value) in pixels {
            assert!(buffer.put(PixelPoint::new(x, y), value));
        }
        buffer
    }

    #[test]
    fn new_buffer_is_transparent_at_natural_size() {
        let buffer = MaskBuffer::new(ImageBounds::new(7, 3));
        assert_eq!(buffer.bounds(), ImageBounds::new(7, 3));
        assert!(buffer.is_blank());
        assert_eq!(buffer.pixel(PixelPoint::new(6, 2)), Some(TRANSPARENT));
        assert_eq!(buffer.pixel(PixelPoint::new(7, 2)), None);
    }

    #[test]
    fn sweep_keeps_only_listed_classes_and_clears_fringe() {
        let mut buffer = buffer_with(&[
            (0, 0, A.to_rgba()),
            (1, 0, B.to_rgba()),
            (2, 0, C.to_rgba()),
            (3, 0, [255, 0, 0, 128]),
            (0, 1, [0, 0, 0, 255]),
        ]);

        let report = buffer.sweep_remove_class(B, &[A]);

        assert_eq!(buffer.pixel(PixelPoint::new(0, 0)), Some(A.to_rgba()));
        assert_eq!(buffer.pixel(PixelPoint::new(1, 0)), Some(TRANSPARENT));
        assert_eq!(buffer.pixel(PixelPoint::new(2, 0)), Some(TRANSPARENT));
        assert_eq!(buffer.pixel(PixelPoint::new(3, 0)), Some(TRANSPARENT));
        assert_eq!(buffer.pixel(PixelPoint::new(0, 1)), Some(TRANSPARENT));
        assert_eq!(
            report,
            SweepReport {
                cleared_fringe: 1,
                cleared_removed: 1,
                cleared_orphaned: 2,
                kept: 1,
            }
        );
        assert!(buffer.is_normalized(&[A]));
    }

    #[test]
    fn sweep_treats_semi_transparent_keep_color_as_fringe() {
        let mut buffer = buffer_with(&[(2, 2, [255, 0, 0, 254])]);
        assert!(!buffer.is_normalized(&[A]));

        buffer.sweep_remove_class(B, &[A]);

        assert_eq!(buffer.pixel(PixelPoint::new(2, 2)), Some(TRANSPARENT));
        assert!(buffer.is_normalized(&[A]));
    }

    #[test]
    fn sweep_zeroes_transparent_pixels_with_stale_rgb() {
        let mut buffer = buffer_with(&[(1, 1, [9, 9, 9, 0])]);
        let report = buffer.sweep_remove_class(B, &[A]);
        assert_eq!(buffer.pixel(PixelPoint::new(1, 1)), Some(TRANSPARENT));
        assert_eq!(report.cleared_fringe, 1);
    }

    #[test]
    fn export_then_load_is_pixel_identical() {
        let original = buffer_with(&[
            (0, 0, A.to_rgba()),
            (3, 3, C.to_rgba()),
            (1, 2, [12, 34, 56, 200]),
        ]);
        let encoded = original.export().expect("export should work");

        let mut reloaded = MaskBuffer::new(original.bounds());
        reloaded.load(&encoded).expect("load should work");
        assert_eq!(reloaded, original);

        let decoded = MaskBuffer::decode(&encoded).expect("decode should work");
        assert_eq!(decoded, original);
    }

    #[test]
    fn load_rejects_dimension_mismatch_without_touching_pixels() {
        let small = MaskBuffer::new(ImageBounds::new(2, 2))
            .export()
            .expect("export should work");
        let mut buffer = buffer_with(&[(0, 0, A.to_rgba())]);
        let before = buffer.clone();

        let err = buffer.load(&small).expect_err("mismatched mask should fail");
        assert!(matches!(
            err,
            PainterError::DimensionMismatch {
                expected: ImageBounds { width: 4, height: 4 },
                actual: ImageBounds { width: 2, height: 2 },
            }
        ));
        assert_eq!(buffer, before);
    }

    #[test]
    fn load_rejects_garbage_without_touching_pixels() {
        let mut buffer = buffer_with(&[(0, 0, A.to_rgba())]);
        let before = buffer.clone();

        let err = buffer
            .load(b"definitely not an image")
            .expect_err("garbage should fail");
        assert!(matches!(err, PainterError::Decode(_)));
        assert_eq!(buffer, before);
    }

    #[test]
    fn source_dimensions_decodes_whole_image() {
        let encoded = MaskBuffer::new(ImageBounds::new(12, 5))
            .export()
            .expect("export should work");
        assert_eq!(
            source_dimensions(&encoded).expect("decode should work"),
            ImageBounds::new(12, 5)
        );
        assert!(source_dimensions(b"nope").is_err());

        let noisy = RgbaImage::from_fn(64, 64, |x, y| {
            Rgba([(x * 7 + y * 13) as u8, (x * y) as u8, (x ^ y) as u8, 255])
        });
        let encoded = MaskBuffer::from_image(noisy).export().expect("export noisy");
        // Cut inside the pixel data: the header still parses, the body does not.
        let truncated = &encoded[..encoded.len() / 2];
        assert!(ImageReader::new(Cursor::new(truncated))
            .with_guessed_format()
            .expect("format from signature")
            .into_dimensions()
            .is_ok());
        assert!(matches!(
            source_dimensions(truncated),
            Err(PainterError::Decode(_))
        ));
    }

    #[test]
    fn class_codes_map_colors_to_label_ids() {
        let mut labels = LabelSet::new();
        labels.add("a", A).expect("add a");
        labels.add("c", C).expect("add c");
        let buffer = buffer_with(&[
            (0, 0, A.to_rgba()),
            (1, 0, C.to_rgba()),
            (2, 0, B.to_rgba()),
            (3, 0, [0, 0, 255, 100]),
        ]);

        let codes = buffer.to_class_codes(&labels);
        assert_eq!(codes.get_pixel(0, 0).0, [1]);
        assert_eq!(codes.get_pixel(1, 0).0, [2]);
        assert_eq!(codes.get_pixel(2, 0).0, [0]);
        assert_eq!(codes.get_pixel(3, 0).0, [0]);

        let rebuilt = MaskBuffer::from_class_codes(&codes, &labels);
        assert_eq!(rebuilt.pixel(PixelPoint::new(0, 0)), Some(A.to_rgba()));
        assert_eq!(rebuilt.pixel(PixelPoint::new(1, 0)), Some(C.to_rgba()));
        assert_eq!(rebuilt.pixel(PixelPoint::new(2, 0)), Some(TRANSPARENT));

        let histogram = buffer.class_histogram(&labels);
        assert_eq!(histogram, vec![14, 1, 1]);
    }

    #[test]
    fn recolor_class_only_touches_opaque_matches() {
        let mut buffer = buffer_with(&[
            (0, 0, A.to_rgba()),
            (1, 0, [255, 0, 0, 10]),
            (2, 0, B.to_rgba()),
        ]);

        assert_eq!(buffer.recolor_class(A, C), 1);
        assert_eq!(buffer.pixel(PixelPoint::new(0, 0)), Some(C.to_rgba()));
        assert_eq!(buffer.pixel(PixelPoint::new(1, 0)), Some([255, 0, 0, 10]));
        assert_eq!(buffer.pixel(PixelPoint::new(2, 0)), Some(B.to_rgba()));
    }
}
