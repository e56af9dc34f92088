/// Edit operations and non-destructive edit parameters
///
/// `EditAction` is the closed set of operations the editor can commit to
/// history. Every variant has a display label and a stable key, so the
/// history panel never has to guess what an entry was.
///
/// `EditParams` stores tone and colour adjustments. It travels inside
/// `EditAction::Adjust` and is applied by the pipeline's adjust pass.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::data::ImagePayload;
use crate::error::ValidationError;

/// Largest accepted blur sigma
pub const MAX_BLUR_SIGMA: f32 = 100.0;

/// All adjustment parameters for an image
///
/// These values are applied per pixel by the pipeline's adjust pass.
/// A default value means "no adjustment".
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct EditParams {
    // ========== Exposure & Tone ==========

    /// Exposure adjustment in stops (-5.0 to +5.0)
    pub exposure: f32,

    /// Contrast adjustment (-100.0 to +100.0)
    /// - Negative values flatten, positive values boost midtone separation
    pub contrast: f32,

    /// Highlights adjustment (-100.0 to +100.0)
    /// - Negative values recover bright areas
    pub highlights: f32,

    /// Shadows adjustment (-100.0 to +100.0)
    /// - Positive values lift dark areas
    pub shadows: f32,

    /// Whites adjustment (-100.0 to +100.0), moves the white point
    pub whites: f32,

    /// Blacks adjustment (-100.0 to +100.0), moves the black point
    pub blacks: f32,

    // ========== Color ==========

    /// Vibrance adjustment (-100.0 to +100.0)
    /// - Saturation that mostly affects muted colours
    pub vibrance: f32,

    /// Saturation adjustment (-100.0 to +100.0)
    /// - -100.0 = grayscale, 0.0 = original
    pub saturation: f32,

    // ========== White Balance ==========

    /// Temperature shift (-100 to +100)
    /// - Negative values = cooler (more blue)
    /// - Positive values = warmer (more yellow/orange)
    pub temperature: i32,

    /// Tint shift (-100 to +100)
    /// - Negative values = more green
    /// - Positive values = more magenta
    pub tint: i32,
}

impl Default for EditParams {
    fn default() -> Self {
        Self {
            exposure: 0.0,
            contrast: 0.0,
            highlights: 0.0,
            shadows: 0.0,
            whites: 0.0,
            blacks: 0.0,
            vibrance: 0.0,
            saturation: 0.0,
            temperature: 0,
            tint: 0,
        }
    }
}

impl EditParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if this represents an unedited image (all values at default)
    pub fn is_unedited(&self) -> bool {
        *self == Self::default()
    }

    /// Clamp every field into its documented range
    pub fn clamped(mut self) -> Self {
        self.exposure = self.exposure.clamp(-5.0, 5.0);
        for v in [
            &mut self.contrast,
            &mut self.highlights,
            &mut self.shadows,
            &mut self.whites,
            &mut self.blacks,
            &mut self.vibrance,
            &mut self.saturation,
        ] {
            *v = v.clamp(-100.0, 100.0);
        }
        self.temperature = self.temperature.clamp(-100, 100);
        self.tint = self.tint.clamp(-100, 100);
        self
    }

    /// Set a single field by name ("exposure", "contrast", ...)
    fn set_field(&mut self, name: &str, value: &str) -> Result<(), String> {
        let float = || {
            value
                .parse::<f32>()
                .map_err(|_| format!("invalid value for {}: {}", name, value))
        };
        let int = || {
            value
                .parse::<i32>()
                .map_err(|_| format!("invalid value for {}: {}", name, value))
        };
        match name {
            "exposure" => self.exposure = float()?,
            "contrast" => self.contrast = float()?,
            "highlights" => self.highlights = float()?,
            "shadows" => self.shadows = float()?,
            "whites" => self.whites = float()?,
            "blacks" => self.blacks = float()?,
            "vibrance" => self.vibrance = float()?,
            "saturation" => self.saturation = float()?,
            "temperature" => self.temperature = int()?,
            "tint" => self.tint = int()?,
            other => return Err(format!("unknown adjustment: {}", other)),
        }
        Ok(())
    }
}

/// Clockwise rotation step
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Cw90 => 90,
            Rotation::Cw180 => 180,
            Rotation::Cw270 => 270,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipAxis {
    Horizontal,
    Vertical,
}

/// Named one-click filters
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum FilterKind {
    Grayscale,
    Sepia,
    Invert,
    /// Gaussian blur with the given sigma
    Blur(f32),
    Sharpen,
}

impl FilterKind {
    /// Reject parameters the pixel pass cannot handle
    ///
    /// Actions can arrive through serde as well as the parser, so both the
    /// parser and the pipeline go through here.
    pub fn validate(self) -> Result<Self, ValidationError> {
        match self {
            FilterKind::Blur(sigma) if !(sigma.is_finite() && sigma > 0.0 && sigma <= MAX_BLUR_SIGMA) => {
                Err(ValidationError::InvalidBlur(sigma.to_string()))
            }
            other => Ok(other),
        }
    }
}

/// AI-assisted operations whose rendered result is committed as an edit
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum AiOperation {
    BackgroundRemoval,
    Enhance,
    StyleTransfer(String),
    Generate(String),
}

impl AiOperation {
    pub fn key(&self) -> &'static str {
        match self {
            AiOperation::BackgroundRemoval => "background_removal",
            AiOperation::Enhance => "enhance",
            AiOperation::StyleTransfer(_) => "style_transfer",
            AiOperation::Generate(_) => "generate",
        }
    }
}

/// One committed editor operation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditAction {
    /// The captured/selected image a session starts from
    Initial,
    Rotate { rotation: Rotation },
    Flip { axis: FlipAxis },
    Filter { filter: FilterKind },
    Crop { x: u32, y: u32, width: u32, height: u32 },
    Adjust { params: EditParams },
    /// Replace the image with the output of an AI operation
    AiResult { operation: AiOperation, image: ImagePayload },
}

impl EditAction {
    /// Stable snake_case identifier ("rotate_90", "flip_horizontal", ...)
    pub fn key(&self) -> String {
        match self {
            EditAction::Initial => "initial".to_string(),
            EditAction::Rotate { rotation } => format!("rotate_{}", rotation.degrees()),
            EditAction::Flip { axis: FlipAxis::Horizontal } => "flip_horizontal".to_string(),
            EditAction::Flip { axis: FlipAxis::Vertical } => "flip_vertical".to_string(),
            EditAction::Filter { filter } => match filter {
                FilterKind::Grayscale => "filter_grayscale".to_string(),
                FilterKind::Sepia => "filter_sepia".to_string(),
                FilterKind::Invert => "filter_invert".to_string(),
                FilterKind::Blur(_) => "filter_blur".to_string(),
                FilterKind::Sharpen => "filter_sharpen".to_string(),
            },
            EditAction::Crop { .. } => "crop".to_string(),
            EditAction::Adjust { .. } => "adjust".to_string(),
            EditAction::AiResult { operation, .. } => format!("ai_{}", operation.key()),
        }
    }

    /// Human-readable label for the history panel
    pub fn label(&self) -> String {
        match self {
            EditAction::Initial => "Original".to_string(),
            EditAction::Rotate { rotation } => format!("Rotate {}°", rotation.degrees()),
            EditAction::Flip { axis: FlipAxis::Horizontal } => "Flip horizontal".to_string(),
            EditAction::Flip { axis: FlipAxis::Vertical } => "Flip vertical".to_string(),
            EditAction::Filter { filter } => match filter {
                FilterKind::Grayscale => "Grayscale filter".to_string(),
                FilterKind::Sepia => "Sepia filter".to_string(),
                FilterKind::Invert => "Invert filter".to_string(),
                FilterKind::Blur(sigma) => format!("Blur ({:.1})", sigma),
                FilterKind::Sharpen => "Sharpen filter".to_string(),
            },
            EditAction::Crop { width, height, .. } => format!("Crop {}×{}", width, height),
            EditAction::Adjust { .. } => "Adjustments".to_string(),
            EditAction::AiResult { operation, .. } => match operation {
                AiOperation::BackgroundRemoval => "AI: Background removal".to_string(),
                AiOperation::Enhance => "AI: Enhance".to_string(),
                AiOperation::StyleTransfer(style) => format!("AI: Style ({})", style),
                AiOperation::Generate(_) => "AI: Generated image".to_string(),
            },
        }
    }
}

impl fmt::Display for EditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Parse the command-line form of an action
///
/// Accepted forms: `rotate_90`, `flip_vertical`, `filter_sepia`,
/// `filter_blur:2.5`, `crop:x,y,w,h`, `adjust:exposure=1,contrast=20`.
/// AI results carry an image and cannot be parsed from text.
impl FromStr for EditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, arg) = match s.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (s, None),
        };

        let action = match (name, arg) {
            ("rotate_90", None) => EditAction::Rotate { rotation: Rotation::Cw90 },
            ("rotate_180", None) => EditAction::Rotate { rotation: Rotation::Cw180 },
            ("rotate_270", None) => EditAction::Rotate { rotation: Rotation::Cw270 },
            ("flip_horizontal", None) => EditAction::Flip { axis: FlipAxis::Horizontal },
            ("flip_vertical", None) => EditAction::Flip { axis: FlipAxis::Vertical },
            ("filter_grayscale", None) => EditAction::Filter { filter: FilterKind::Grayscale },
            ("filter_sepia", None) => EditAction::Filter { filter: FilterKind::Sepia },
            ("filter_invert", None) => EditAction::Filter { filter: FilterKind::Invert },
            ("filter_sharpen", None) => EditAction::Filter { filter: FilterKind::Sharpen },
            ("filter_blur", arg) => {
                let sigma = match arg {
                    Some(v) => v.parse::<f32>().map_err(|_| format!("invalid blur sigma: {}", v))?,
                    None => 2.0,
                };
                let filter = FilterKind::Blur(sigma).validate().map_err(|e| e.to_string())?;
                EditAction::Filter { filter }
            }
            ("crop", Some(arg)) => {
                let parts = arg
                    .split(',')
                    .map(|p| p.trim().parse::<u32>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| format!("invalid crop region: {}", arg))?;
                match parts.as_slice() {
                    &[x, y, width, height] if width > 0 && height > 0 => {
                        EditAction::Crop { x, y, width, height }
                    }
                    _ => return Err(format!("crop expects x,y,width,height: {}", arg)),
                }
            }
            ("adjust", Some(arg)) => {
                let mut params = EditParams::new();
                for pair in arg.split(',').filter(|p| !p.is_empty()) {
                    let (field, value) = pair
                        .split_once('=')
                        .ok_or_else(|| format!("expected name=value: {}", pair))?;
                    params.set_field(field.trim(), value.trim())?;
                }
                EditAction::Adjust { params: params.clamped() }
            }
            _ => return Err(format!("unknown edit action: {}", s)),
        };

        Ok(action)
    }
}

/// The image being edited: the untouched original plus the actions applied to it
#[derive(Debug, Clone, PartialEq)]
pub struct EditDocument {
    /// Original captured/selected image, never modified
    pub base: ImagePayload,
    /// Applied actions, oldest first (excludes `Initial`)
    pub actions: Vec<EditAction>,
}

impl EditDocument {
    pub fn new(base: ImagePayload) -> Self {
        Self {
            base,
            actions: Vec::new(),
        }
    }

    pub fn is_unedited(&self) -> bool {
        self.actions.is_empty()
    }

    /// Labels of the applied actions, oldest first
    pub fn labels(&self) -> Vec<String> {
        self.actions.iter().map(EditAction::label).collect()
    }
}
