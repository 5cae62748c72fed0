//! Encoding a buffer to disk at a compression level.
//!
//! Writes go to a uniquely named temp file beside the destination and are
//! renamed into place only after the encoder finished, so a failed save never
//! leaves a partial file behind and concurrent saves never clobber each other.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, ImageFormat};

use crate::error::EncodeError;
use crate::image::{ChannelOrder, PixelBuffer};
use crate::io::source::to_dynamic;

/// Compression level used when nothing else is configured.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;
/// Lowest accepted PNG level; `-1` selects the encoder's default.
pub const MIN_PNG_COMPRESSION: i32 = -1;
/// Highest accepted PNG level.
pub const MAX_PNG_COMPRESSION: i32 = 9;

/// Map a zlib-style level to the PNG encoder's presets.
///
/// | level   | preset  |
/// |---------|---------|
/// | -1      | Default |
/// | 0..=2   | Fast    |
/// | 3..=6   | Default |
/// | 7..=9   | Best    |
pub fn png_compression(level: i32) -> Result<CompressionType, EncodeError> {
    match level {
        -1 => Ok(CompressionType::Default),
        0..=2 => Ok(CompressionType::Fast),
        3..=6 => Ok(CompressionType::Default),
        7..=9 => Ok(CompressionType::Best),
        _ => Err(EncodeError::InvalidCompressionLevel {
            level,
            min: MIN_PNG_COMPRESSION,
            max: MAX_PNG_COMPRESSION,
        }),
    }
}

/// Encode `buffer` to `path`, picking the format from the extension.
///
/// PNG honours `compression_level`; other formats use their encoder defaults.
/// Missing parent directories are created. An existing file at `path` is
/// replaced.
pub fn save_image(
    buffer: &PixelBuffer<u8>,
    path: &Path,
    compression_level: i32,
) -> Result<(), EncodeError> {
    let format = ImageFormat::from_path(path)
        .map_err(|_| EncodeError::UnsupportedFormat(path.to_path_buf()))?;

    // Validate before touching the filesystem.
    let png = match format {
        ImageFormat::Png => Some(png_compression(compression_level)?),
        _ => None,
    };

    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent)?;
            parent
        }
        None => Path::new("."),
    };

    // Unique per call, so concurrent saves to one destination never share it.
    // Dropping it on any early return deletes it.
    let mut tmp = tempfile::Builder::new()
        .prefix(&tmp_prefix_for(path))
        .suffix(".tmp")
        .tempfile_in(dir)?;
    write_encoded(buffer, tmp.as_file_mut(), format, png)?;

    tmp.persist(path).map_err(|e| EncodeError::Io(e.error))?;
    Ok(())
}

fn write_encoded(
    buffer: &PixelBuffer<u8>,
    file: &mut File,
    format: ImageFormat,
    png: Option<CompressionType>,
) -> Result<(), EncodeError> {
    let mut writer = BufWriter::new(file);

    match png {
        Some(compression) => {
            let encoder = PngEncoder::new_with_quality(&mut writer, compression, FilterType::Adaptive);
            encoder.write_image(
                buffer.samples(),
                buffer.width(),
                buffer.height(),
                color_type(buffer.channels()),
            )?;
        }
        None => {
            let img = to_dynamic(buffer).ok_or_else(|| {
                EncodeError::Io(std::io::Error::other("buffer does not match its declared shape"))
            })?;
            img.write_to(&mut writer, format)?;
        }
    }

    writer.flush()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}

fn color_type(channels: ChannelOrder) -> ExtendedColorType {
    match channels {
        ChannelOrder::Luma => ExtendedColorType::L8,
        ChannelOrder::Rgb => ExtendedColorType::Rgb8,
        ChannelOrder::Rgba => ExtendedColorType::Rgba8,
    }
}

fn tmp_prefix_for(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    format!(".{file_name}.")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_png_compression_mapping() {
        assert!(matches!(png_compression(-1), Ok(CompressionType::Default)));
        assert!(matches!(png_compression(0), Ok(CompressionType::Fast)));
        assert!(matches!(png_compression(3), Ok(CompressionType::Default)));
        assert!(matches!(png_compression(9), Ok(CompressionType::Best)));
        assert!(matches!(
            png_compression(10),
            Err(EncodeError::InvalidCompressionLevel { level: 10, .. })
        ));
        assert!(png_compression(-2).is_err());
    }

    #[test]
    fn test_save_png_writes_exactly_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let buf = PixelBuffer::filled(4, 3, ChannelOrder::Rgb, 42u8);

        save_image(&buf, &path, 3).unwrap();

        assert_eq!(entries(dir.path()), vec!["out.png".to_string()]);
        let back = image::open(&path).unwrap().to_rgb8();
        assert_eq!(back.dimensions(), (4, 3));
        assert!(back.pixels().all(|p| p.0 == [42, 42, 42]));
    }

    #[test]
    fn test_invalid_level_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let buf = PixelBuffer::filled(2, 2, ChannelOrder::Rgb, 1u8);

        let err = save_image(&buf, &path, 42).unwrap_err();
        assert!(matches!(err, EncodeError::InvalidCompressionLevel { .. }));
        assert!(entries(dir.path()).is_empty());
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.nope");
        let buf = PixelBuffer::filled(2, 2, ChannelOrder::Rgb, 1u8);

        assert!(matches!(
            save_image(&buf, &path, 3),
            Err(EncodeError::UnsupportedFormat(_))
        ));
        assert!(entries(dir.path()).is_empty());
    }

    #[test]
    fn test_save_overwrites_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");

        save_image(&PixelBuffer::filled(2, 2, ChannelOrder::Rgb, 10u8), &path, 3).unwrap();
        save_image(&PixelBuffer::filled(2, 2, ChannelOrder::Rgb, 99u8), &path, 9).unwrap();

        let back = image::open(&path).unwrap().to_rgb8();
        assert_eq!(back.get_pixel(0, 0).0, [99, 99, 99]);
        assert_eq!(entries(dir.path()), vec!["out.png".to_string()]);
    }

    #[test]
    fn test_concurrent_saves_to_one_path_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.png");

        let results: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..6u8)
                .map(|i| {
                    let path = &path;
                    scope.spawn(move || {
                        let buf = PixelBuffer::filled(300, 300, ChannelOrder::Rgb, i * 40);
                        save_image(&buf, path, 3)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for result in &results {
            assert!(result.is_ok(), "{result:?}");
        }
        assert_eq!(entries(dir.path()), vec!["shared.png".to_string()]);
        let back = image::open(&path).unwrap().to_rgb8();
        let first = back.get_pixel(0, 0).0;
        assert_eq!(first[0] % 40, 0);
        assert!(back.pixels().all(|p| p.0 == first), "output mixes two writes");
    }

    #[test]
    fn test_save_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/out.bmp");
        save_image(&PixelBuffer::filled(2, 2, ChannelOrder::Rgb, 7u8), &path, 3).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_save_into_a_file_path_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();
        let path = blocker.join("out.png");

        let err = save_image(&PixelBuffer::filled(2, 2, ChannelOrder::Rgb, 7u8), &path, 3);
        assert!(matches!(err, Err(EncodeError::Io(_))));
        assert_eq!(entries(dir.path()), vec!["blocker".to_string()]);
    }
}
