use crate::{auto_brightness_contrast, combine, compute_mask, gamma_adjust};
use crate::{MaskPolicy, PostProcessError};
use serde::{Deserialize, Serialize};
use sheetcam_core::Frame;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Which image [`PostProcessor::run`] returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostProcessOutput {
    /// Auto-contrast and gamma only.
    Normalized,
    /// Binary ink mask of the normalised image (grey frame).
    Mask,
    /// Normalised image with the background painted white.
    #[default]
    Composite,
}

/// Parameters of the post-processing chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessParams {
    /// Percentage of pixels saturated by auto-contrast (split between ends).
    pub clip_percent: f32,
    pub gamma: f32,
    pub mask: MaskPolicy,
    pub output: PostProcessOutput,
}

impl Default for PostProcessParams {
    fn default() -> Self {
        Self {
            clip_percent: 1.0,
            gamma: 1.0,
            mask: MaskPolicy::default(),
            output: PostProcessOutput::default(),
        }
    }
}

impl PostProcessParams {
    pub fn validate(&self) -> Result<(), PostProcessError> {
        if !self.gamma.is_finite() || self.gamma <= 0.0 {
            return Err(PostProcessError::InvalidGamma(self.gamma));
        }
        if !self.clip_percent.is_finite() || !(0.0..100.0).contains(&self.clip_percent) {
            return Err(PostProcessError::InvalidClipPercent(self.clip_percent));
        }
        Ok(())
    }
}

/// Auto-contrast → gamma → mask / composite.
#[derive(Clone, Debug, Default)]
pub struct PostProcessor {
    params: PostProcessParams,
}

impl PostProcessor {
    pub fn new(params: PostProcessParams) -> Result<Self, PostProcessError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &PostProcessParams {
        &self.params
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frame), fields(width = frame.width(), height = frame.height()))
    )]
    pub fn run(&self, frame: &Frame) -> Result<Frame, PostProcessError> {
        let p = &self.params;
        let normalized = gamma_adjust(&auto_brightness_contrast(frame, p.clip_percent)?, p.gamma)?;
        match p.output {
            PostProcessOutput::Normalized => Ok(normalized),
            PostProcessOutput::Mask => Ok(compute_mask(&normalized, &p.mask)?.into()),
            PostProcessOutput::Composite => {
                let mask = compute_mask(&normalized, &p.mask)?;
                combine(&normalized, &mask)
            }
        }
    }
}
