use std::sync::Arc;

use sheetcam_aruco::{MarkerDetection, MarkerDetector};
use sheetcam_capture::{CameraBackend, CaptureController};
use sheetcam_core::Frame;
use sheetcam_postprocess::{PostProcessParams, PostProcessor};
use sheetcam_rectify::{build_correspondence, Rectifier};

use crate::{encode, EncodedImage, ImageFormat, SheetcamConfig, SheetcamError};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// The request-facing side of sheetcam.
///
/// Owns the [`CaptureController`] and the detection, rectification and
/// post-processing stages. Every method takes `&self`; share the service
/// behind an `Arc` between request handlers. Only the controller touches
/// the camera; everything else works on the latest published frame.
pub struct VisionService {
    controller: CaptureController,
    detector: MarkerDetector,
    rectifier: Rectifier,
    config: SheetcamConfig,
}

impl VisionService {
    pub fn new(controller: CaptureController, config: SheetcamConfig) -> Result<Self, SheetcamError> {
        let detector = MarkerDetector::new(config.detector.clone())?;
        let rectifier = Rectifier::new(config.rectifier.clone())?;
        config.postprocess.validate()?;
        Ok(Self {
            controller,
            detector,
            rectifier,
            config,
        })
    }

    /// Build the controller for `config.device` on `backend`.
    pub fn with_backend(backend: Arc<dyn CameraBackend>, config: SheetcamConfig) -> Result<Self, SheetcamError> {
        let controller = CaptureController::new(backend, config.device.clone());
        Self::new(controller, config)
    }

    pub fn config(&self) -> &SheetcamConfig {
        &self.config
    }

    pub fn controller(&self) -> &CaptureController {
        &self.controller
    }

    pub fn is_capturing(&self) -> bool {
        self.controller.is_running()
    }

    /// Start the capture loop. No-op when already running.
    pub fn start_capture(&self) -> Result<(), SheetcamError> {
        Ok(self.controller.start()?)
    }

    /// Stop the capture loop. No-op when stopped.
    pub fn stop_capture(&self) {
        self.controller.stop();
    }

    /// The latest camera frame.
    pub fn latest_frame(&self) -> Result<Arc<Frame>, SheetcamError> {
        Ok(self.controller.latest_frame()?)
    }

    /// Encode the latest camera frame.
    pub fn get_raw_frame(&self, format: ImageFormat) -> Result<EncodedImage, SheetcamError> {
        let frame = self.latest_frame()?;
        Ok(encode(&frame, format)?)
    }

    /// Raw frame in the configured default format.
    pub fn get_raw_frame_default(&self) -> Result<EncodedImage, SheetcamError> {
        self.get_raw_frame(self.config.raw_format)
    }

    /// Detect, rectify and post-process the latest frame, then encode it.
    pub fn get_rectified_frame(
        &self,
        output_size: u32,
        params: &PostProcessParams,
        format: ImageFormat,
    ) -> Result<EncodedImage, SheetcamError> {
        let frame = self.latest_frame()?;
        let out = self.process_frame(&frame, output_size, params)?;
        Ok(encode(&out, format)?)
    }

    /// Rectified frame with the configured size, post-processing and format.
    pub fn get_rectified_frame_default(&self) -> Result<EncodedImage, SheetcamError> {
        self.get_rectified_frame(
            self.config.rectifier.output_size,
            &self.config.postprocess,
            self.config.rectified_format,
        )
    }

    /// Markers visible in the latest frame.
    pub fn detect_markers(&self) -> Result<MarkerDetection, SheetcamError> {
        let frame = self.latest_frame()?;
        Ok(self.detector.detect(&frame))
    }

    /// Markers visible in `frame`.
    pub fn detect(&self, frame: &Frame) -> MarkerDetection {
        self.detector.detect(frame)
    }

    /// Full pipeline on a given frame: detection, `output_size²`
    /// rectification and post-processing.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frame, params), fields(width = frame.width(), height = frame.height()))
    )]
    pub fn process_frame(
        &self,
        frame: &Frame,
        output_size: u32,
        params: &PostProcessParams,
    ) -> Result<Frame, SheetcamError> {
        let post = PostProcessor::new(params.clone())?;
        let detection = self.detector.detect(frame);
        log::debug!("frame has markers {:?}", detection.ids().collect::<Vec<_>>());

        let set = build_correspondence(
            &detection,
            &self.rectifier.params().corner_table,
            output_size,
        )?;
        let rectified = self.rectifier.rectify(frame, &set)?;
        Ok(post.run(&rectified.image)?)
    }
}

impl std::fmt::Debug for VisionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionService")
            .field("controller", &self.controller)
            .field("config", &self.config)
            .finish()
    }
}
