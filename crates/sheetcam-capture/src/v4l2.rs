//! Video4Linux2 camera backend.

use std::io;

use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::{Device, MmapStream};
use v4l::video::Capture;
use v4l::{Format, FourCC};

use crate::{yuyv_to_rgb, CameraBackend, CameraDevice, CaptureError, CapturePixelFormat, DeviceConfig};
use sheetcam_core::{Frame, PixelFormat};

const BUFFER_COUNT: u32 = 4;

/// Opens `/dev/video{index}` through V4L2 memory-mapped streaming.
#[derive(Clone, Copy, Debug, Default)]
pub struct V4l2Backend;

impl V4l2Backend {
    pub fn new() -> Self {
        Self
    }
}

fn fourcc(format: CapturePixelFormat) -> FourCC {
    match format {
        CapturePixelFormat::Yuyv => FourCC::new(b"YUYV"),
        CapturePixelFormat::Mjpeg => FourCC::new(b"MJPG"),
    }
}

impl CameraBackend for V4l2Backend {
    fn open(&self, config: &DeviceConfig) -> Result<Box<dyn CameraDevice>, CaptureError> {
        let unavailable = |e: io::Error| CaptureError::DeviceUnavailable {
            index: config.index,
            reason: e.to_string(),
        };

        let device = Device::new(config.index).map_err(unavailable)?;
        let wanted = Format::new(config.width, config.height, fourcc(config.pixel_format));
        let format = device.set_format(&wanted).map_err(unavailable)?;
        if format.fourcc != wanted.fourcc {
            return Err(CaptureError::DeviceUnavailable {
                index: config.index,
                reason: format!("device does not support {}", wanted.fourcc),
            });
        }
        if format.width != config.width || format.height != config.height {
            log::warn!(
                "camera {} delivers {}x{} instead of {}x{}",
                config.index,
                format.width,
                format.height,
                config.width,
                config.height
            );
        }

        let mut stream =
            MmapStream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT).map_err(unavailable)?;
        stream.set_timeout(config.read_timeout());

        Ok(Box::new(V4l2Device {
            stream: Some(stream),
            device: Some(device),
            format,
            pixel_format: config.pixel_format,
        }))
    }
}

struct V4l2Device {
    // Dropped before the device it maps.
    stream: Option<MmapStream<'static>>,
    device: Option<Device>,
    format: Format,
    pixel_format: CapturePixelFormat,
}

impl V4l2Device {
    fn to_frame(&self, data: &[u8]) -> Result<Frame, CaptureError> {
        match self.pixel_format {
            CapturePixelFormat::Yuyv => yuyv_to_rgb(
                data,
                self.format.width as usize,
                self.format.height as usize,
                self.format.stride as usize,
            ),
            CapturePixelFormat::Mjpeg => {
                let rgb = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
                    .map_err(|e| CaptureError::Read(format!("bad MJPEG buffer: {e}")))?
                    .to_rgb8();
                let (w, h) = rgb.dimensions();
                Ok(Frame::new(w as usize, h as usize, PixelFormat::Rgb8, rgb.into_raw())?)
            }
        }
    }
}

impl CameraDevice for V4l2Device {
    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        let stream = self.stream.as_mut().ok_or(CaptureError::Closed)?;
        let (buf, meta) = match stream.next() {
            Ok(next) => next,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => return Err(CaptureError::Timeout),
            Err(e) => return Err(CaptureError::Read(e.to_string())),
        };
        let used = (meta.bytesused as usize).min(buf.len());
        // Copy out before the buffer is re-queued on the next read.
        let data = buf[..used].to_vec();
        self.to_frame(&data)
    }

    fn close(&mut self) {
        self.stream = None;
        self.device = None;
    }
}
