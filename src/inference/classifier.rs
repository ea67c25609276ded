use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use image::imageops::FilterType;
use tch::{CModule, Device, Kind, Tensor, nn::ModuleT};

use crate::models::Prediction;

const IMAGE_SIZE: u32 = 224;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("failed to read label file: {0}")]
    Labels(#[from] std::io::Error),
    #[error("label file is empty")]
    NoLabels,
    #[error("model error: {0}")]
    Model(#[from] tch::TchError),
    #[error("model outputs {model} classes but the label file lists {labels}")]
    LabelMismatch { model: usize, labels: usize },
    #[error("model returned an empty probability vector")]
    EmptyOutput,
}

/// Wraps the TorchScript classifier artifact and its ordered label list,
/// both loaded once at startup. The module is behind a Mutex so concurrent
/// requests serialize their forward passes.
pub struct Classifier {
    module: Mutex<CModule>,
    labels: Vec<String>,
}

impl Classifier {
    /// Loads the artifact and the sidecar label list together, and runs one
    /// probe forward pass so a label/output arity mismatch aborts startup
    /// instead of mislabeling predictions later.
    pub fn load(model_path: &Path, labels_path: &Path) -> Result<Self, InferenceError> {
        let labels: Vec<String> = fs::read_to_string(labels_path)?
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();
        if labels.is_empty() {
            return Err(InferenceError::NoLabels);
        }

        let device = Device::cuda_if_available();
        let module = CModule::load_on_device(model_path, device)?;

        let probe = Tensor::zeros(
            [1, 3, IMAGE_SIZE as i64, IMAGE_SIZE as i64],
            (Kind::Float, device),
        );
        let classes = module.forward_t(&probe, false).view([-1]).size()[0] as usize;
        if classes != labels.len() {
            return Err(InferenceError::LabelMismatch {
                model: classes,
                labels: labels.len(),
            });
        }

        log::info!(
            "Loaded classifier from {} with {} classes on {:?}",
            model_path.display(),
            labels.len(),
            device
        );

        Ok(Self {
            module: Mutex::new(module),
            labels,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Decodes the image at `path`, runs one forward pass, and returns the
    /// arg-max label with its probability as a percentage. Decode failures
    /// propagate to the caller.
    pub fn classify(&self, path: &Path) -> Result<Prediction, InferenceError> {
        let tensor = preprocess(path)?;
        let output = self
            .module
            .lock()
            .unwrap()
            .forward_t(&tensor, false)
            .softmax(-1, Kind::Float)
            .view([-1]);

        let classes = output.size()[0] as usize;
        let mut probabilities = vec![0.0f32; classes];
        output.copy_data(&mut probabilities, classes);

        let (index, confidence) =
            select_top(&probabilities).ok_or(InferenceError::EmptyOutput)?;
        Ok(Prediction {
            label: self.labels[index].clone(),
            confidence,
            probabilities,
        })
    }
}

/// Decode, resize to a fixed square, scale pixels to [0,1], and lay the
/// image out as a 1x3xHxW float tensor.
fn preprocess(path: &Path) -> Result<Tensor, InferenceError> {
    let img = image::open(path)?;
    let rgb = img
        .resize_exact(IMAGE_SIZE, IMAGE_SIZE, FilterType::Triangle)
        .to_rgb8();

    let side = IMAGE_SIZE as usize;
    let mut chw = vec![0.0f32; 3 * side * side];
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for channel in 0..3 {
            chw[channel * side * side + y as usize * side + x as usize] =
                pixel[channel] as f32 / 255.0;
        }
    }

    Ok(Tensor::from_slice(&chw).view([1, 3, side as i64, side as i64]))
}

/// Arg-max over the probability vector, with the winning probability scaled
/// to a percentage and rounded to two decimals.
fn select_top(probabilities: &[f32]) -> Option<(usize, f64)> {
    probabilities
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(Ordering::Equal))
        .map(|(index, p)| (index, (*p as f64 * 100.0 * 100.0).round() / 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_top_picks_the_maximum() {
        let probs = [0.05f32, 0.7, 0.15, 0.1];
        let (index, confidence) = select_top(&probs).unwrap();
        assert_eq!(index, 1);
        assert!((confidence - 70.0).abs() < 1e-6);
    }

    #[test]
    fn confidence_is_rounded_to_two_decimals() {
        let probs = [0.123456f32, 0.876544];
        let (index, confidence) = select_top(&probs).unwrap();
        assert_eq!(index, 1);
        assert_eq!(confidence, 87.65);
    }

    #[test]
    fn select_top_on_empty_vector_is_none() {
        assert!(select_top(&[]).is_none());
    }

    #[test]
    fn preprocess_produces_a_unit_scaled_chw_tensor() {
        let img = image::RgbImage::from_pixel(64, 48, image::Rgb([255, 128, 0]));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.png");
        img.save(&path).unwrap();

        let tensor = preprocess(&path).unwrap();
        assert_eq!(tensor.size(), vec![1, 3, 224, 224]);
        let max = tensor.max().double_value(&[]);
        let min = tensor.min().double_value(&[]);
        assert!(max <= 1.0 && min >= 0.0);
    }
}
