#![cfg(feature = "host")]
#![allow(missing_docs)]
//! Host-level tests for frame drawing and the PNG preview.

use std::error::Error;
use std::fs::File;

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use led_wall::frame::Frame2d;
use led_wall::pong::Pong;
use led_wall::to_png::{write_frame_png, write_frame_png_with_gamma, write_frames_apng};
use png::{BitDepth, ColorType};
use smart_leds::RGB8;

type Frame = Frame2d<12, 8>;

struct Decoded {
    width: u32,
    height: u32,
    bytes: Vec<u8>,
}

impl Decoded {
    fn read(path: &std::path::Path) -> Result<Self, Box<dyn Error>> {
        let decoder = png::Decoder::new(File::open(path)?);
        let mut reader = decoder.read_info()?;
        let mut bytes = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut bytes)?;
        assert_eq!(info.color_type, ColorType::Rgb);
        assert_eq!(info.bit_depth, BitDepth::Sixteen);
        bytes.truncate(info.buffer_size());
        Ok(Self {
            width: info.width,
            height: info.height,
            bytes,
        })
    }

    fn rgb16(&self, x: u32, y: u32) -> [u16; 3] {
        let offset = ((y * self.width + x) * 6) as usize;
        let sample = |index: usize| {
            u16::from_be_bytes([self.bytes[offset + index], self.bytes[offset + index + 1]])
        };
        [sample(0), sample(2), sample(4)]
    }
}

#[test]
fn preview_lights_the_drawn_leds() -> Result<(), Box<dyn Error>> {
    let directory = tempfile::tempdir()?;
    let path = directory.path().join("preview.png");

    let mut frame = Frame::new();
    Rectangle::new(Point::new(2, 2), Size::new(3, 2))
        .into_styled(PrimitiveStyle::with_fill(Rgb888::RED))
        .draw(&mut frame)?;
    frame[(11, 7)] = RGB8::new(0, 0, 255);

    // 12 columns at 9 px plus a 3 px border on both sides = 114 px wide.
    write_frame_png(&frame, &path, 120)?;
    let decoded = Decoded::read(&path)?;
    assert_eq!((decoded.width, decoded.height), (114, 78));

    let led_centre = |x: u32, y: u32| (3 + x * 9 + 4, 3 + y * 9 + 4);
    let (red_x, red_y) = led_centre(3, 2);
    assert_eq!(decoded.rgb16(red_x, red_y), [u16::MAX, 0, 0]);
    let (blue_x, blue_y) = led_centre(11, 7);
    assert_eq!(decoded.rgb16(blue_x, blue_y), [0, 0, u16::MAX]);
    let (dark_x, dark_y) = led_centre(0, 0);
    assert_eq!(decoded.rgb16(dark_x, dark_y), [0, 0, 0]);
    // gaps between LEDs stay black
    assert_eq!(decoded.rgb16(red_x + 4, red_y + 4), [0, 0, 0]);
    Ok(())
}

#[test]
fn linear_preview_keeps_half_brightness() -> Result<(), Box<dyn Error>> {
    let directory = tempfile::tempdir()?;
    let path = directory.path().join("nested").join("linear.png");

    let frame = Frame::filled(RGB8::new(0, 255, 0));
    write_frame_png_with_gamma(&frame, &path, 120, 1.0)?;
    let decoded = Decoded::read(&path)?;
    assert_eq!(decoded.rgb16(7, 7), [0, u16::MAX, 0]);
    Ok(())
}

#[test]
fn pong_animation_is_written() -> Result<(), Box<dyn Error>> {
    let directory = tempfile::tempdir()?;
    let path = directory.path().join("pong.png");

    let mut pong = Pong::<48, 32>::new();
    let frames: Vec<Frame2d<48, 32>> = (0..10)
        .map(|_| {
            pong.update(0.05, 1, -1);
            let mut frame = Frame2d::new();
            pong.draw(&mut frame);
            frame
        })
        .collect();

    write_frames_apng(&frames, &path, 240, 50)?;
    let reader = png::Decoder::new(File::open(&path)?).read_info()?;
    let animation = reader.info().animation_control.ok_or("missing acTL chunk")?;
    assert_eq!(animation.num_frames, 10);
    Ok(())
}

#[test]
fn empty_animation_is_an_error() {
    let directory = tempfile::tempdir().expect("temp dir");
    let frames: [Frame; 0] = [];
    assert!(write_frames_apng(&frames, directory.path().join("empty.png"), 100, 50).is_err());
}
