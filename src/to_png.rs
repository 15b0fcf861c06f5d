//! Host-side PNG previews of wall frames, one soft disc per LED.
#![cfg(feature = "host")]

use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use png::{BitDepth, ColorType, Encoder, ScaledFloat};

use crate::frame::Frame2d;

/// Inverse gamma applied to buffer values before they are written as linear light.
pub const PREVIEW_INVERSE_GAMMA: f32 = 2.2;

/// Write `frame` as a PNG no larger than `max_dimension` pixels on its long side.
///
/// # Errors
///
/// Returns any I/O or PNG encoding error.
pub fn write_frame_png<const W: usize, const H: usize>(
    frame: &Frame2d<W, H>,
    output_path: impl AsRef<Path>,
    max_dimension: u32,
) -> Result<(), Box<dyn Error>> {
    write_frame_png_with_gamma(frame, output_path, max_dimension, PREVIEW_INVERSE_GAMMA)
}

/// Like [`write_frame_png`] with an explicit preview inverse gamma.
///
/// Use `1.0` for frames that already went through the gamma table.
///
/// # Errors
///
/// Returns any I/O or PNG encoding error.
pub fn write_frame_png_with_gamma<const W: usize, const H: usize>(
    frame: &Frame2d<W, H>,
    output_path: impl AsRef<Path>,
    max_dimension: u32,
    inverse_gamma: f32,
) -> Result<(), Box<dyn Error>> {
    let output_path = output_path.as_ref();
    let preview = Preview::fit::<W, H>(max_dimension, inverse_gamma);
    let pixels = preview.render(frame);

    let mut encoder = preview_encoder::<W, H>(&preview, output_path)?;
    encoder.set_source_gamma(ScaledFloat::new(1.0));
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&pixels)?;
    info!("wrote preview {}", output_path.display());
    Ok(())
}

/// Write `frames` as a looping animated PNG, `frame_delay_ms` per frame.
///
/// # Errors
///
/// Returns any I/O or PNG encoding error, or an error if there are no frames or the
/// delay does not fit the APNG delay field.
pub fn write_frames_apng<const W: usize, const H: usize>(
    frames: &[Frame2d<W, H>],
    output_path: impl AsRef<Path>,
    max_dimension: u32,
    frame_delay_ms: u16,
) -> Result<(), Box<dyn Error>> {
    if frames.is_empty() {
        return Err("an animation needs at least one frame".into());
    }
    let output_path = output_path.as_ref();
    let preview = Preview::fit::<W, H>(max_dimension, PREVIEW_INVERSE_GAMMA);

    let mut encoder = preview_encoder::<W, H>(&preview, output_path)?;
    encoder.set_source_gamma(ScaledFloat::new(1.0));
    encoder.set_animated(u32::try_from(frames.len())?, 0)?;
    let mut writer = encoder.write_header()?;
    for frame in frames {
        writer.set_frame_delay(frame_delay_ms, 1000)?;
        writer.write_image_data(&preview.render(frame))?;
    }
    writer.finish()?;
    info!("wrote animation {}", output_path.display());
    Ok(())
}

fn preview_encoder<const W: usize, const H: usize>(
    preview: &Preview,
    output_path: &Path,
) -> Result<Encoder<'static, BufWriter<File>>, Box<dyn Error>> {
    if let Some(parent) = output_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let (width, height) = preview.image_size::<W, H>();
    let mut encoder = Encoder::new(BufWriter::new(File::create(output_path)?), width, height);
    encoder.set_color(ColorType::Rgb);
    encoder.set_depth(BitDepth::Sixteen);
    Ok(encoder)
}

/// Geometry of one LED cell in the preview image.
#[derive(Clone, Copy, Debug)]
struct Preview {
    cell_size: u32,
    radius: u32,
    inverse_gamma: f32,
}

impl Preview {
    /// Largest cell size whose image fits in `max_dimension`.
    fn fit<const W: usize, const H: usize>(max_dimension: u32, inverse_gamma: f32) -> Self {
        assert!(inverse_gamma > 0.0, "inverse_gamma must be positive");
        let mut cell_size = max_dimension.max(4);
        loop {
            let preview = Self::with_cell_size(cell_size, inverse_gamma);
            let (width, height) = preview.image_size::<W, H>();
            if cell_size <= 4 || width.max(height) <= max_dimension {
                return preview;
            }
            cell_size -= 1;
        }
    }

    fn with_cell_size(cell_size: u32, inverse_gamma: f32) -> Self {
        let margin = (cell_size / 8).max(1);
        Self {
            cell_size,
            radius: (cell_size - 2 * margin) / 2,
            inverse_gamma,
        }
    }

    // The border is one LED radius on every side.
    const fn image_size<const W: usize, const H: usize>(&self) -> (u32, u32) {
        (
            W as u32 * self.cell_size + 2 * self.radius,
            H as u32 * self.cell_size + 2 * self.radius,
        )
    }

    /// 16-bit big-endian RGB samples for the whole image.
    fn render<const W: usize, const H: usize>(&self, frame: &Frame2d<W, H>) -> Vec<u8> {
        let (width, height) = self.image_size::<W, H>();
        let mut bytes = vec![0u8; (width * height * 6) as usize];

        let centre = (self.cell_size as f32 - 1.0) / 2.0;
        let radius = self.radius as f32;
        let solid_radius = radius * 2.0 / 3.0;

        for (row_index, row) in frame.iter().enumerate() {
            for (column_index, pixel) in row.iter().enumerate() {
                let linear = [pixel.r, pixel.g, pixel.b].map(|channel| {
                    libm::powf(f32::from(channel) / 255.0, self.inverse_gamma)
                });
                let origin_x = self.radius + column_index as u32 * self.cell_size;
                let origin_y = self.radius + row_index as u32 * self.cell_size;

                for local_y in 0..self.cell_size {
                    for local_x in 0..self.cell_size {
                        let distance = libm::hypotf(local_x as f32 - centre, local_y as f32 - centre);
                        if distance > radius {
                            continue;
                        }
                        let intensity = if distance <= solid_radius {
                            1.0
                        } else {
                            (radius - distance) / (radius - solid_radius)
                        };
                        let offset =
                            (((origin_y + local_y) * width + origin_x + local_x) * 6) as usize;
                        for (sample, level) in bytes[offset..offset + 6].chunks_exact_mut(2).zip(linear) {
                            let value = ((level * intensity).clamp(0.0, 1.0) * 65535.0 + 0.5) as u16;
                            sample.copy_from_slice(&value.to_be_bytes());
                        }
                    }
                }
            }
        }
        bytes
    }
}
