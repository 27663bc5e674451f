use serde::{Deserialize, Serialize};

/// Pixel format requested from the camera.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapturePixelFormat {
    /// Packed 4:2:2 `Y0 U Y1 V`.
    #[default]
    Yuyv,
    /// Motion JPEG; every buffer is a JPEG image.
    Mjpeg,
}

/// Camera selection and stream settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device index (`/dev/video{index}` on Linux).
    pub index: usize,
    pub width: u32,
    pub height: u32,
    /// Upper bound on one blocking device read.
    pub read_timeout_ms: u64,
    pub pixel_format: CapturePixelFormat,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: 1280,
            height: 720,
            read_timeout_ms: 500,
            pixel_format: CapturePixelFormat::Yuyv,
        }
    }
}

impl DeviceConfig {
    pub fn read_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.read_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: DeviceConfig =
            serde_json::from_str(r#"{ "index": 2, "pixel_format": "mjpeg" }"#).unwrap();
        assert_eq!(cfg.index, 2);
        assert_eq!(cfg.pixel_format, CapturePixelFormat::Mjpeg);
        assert_eq!((cfg.width, cfg.height), (1280, 720));
        assert_eq!(cfg.read_timeout(), std::time::Duration::from_millis(500));
    }
}
