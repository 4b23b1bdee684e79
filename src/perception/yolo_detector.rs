/// ONNX YOLOv8 detection adapter.
///
/// Letterboxes the screenshot to the model input size, runs the session and
/// maps the proposals back to pixel-space [`Detection`]s after per-class NMS.
use std::path::Path;

use image::DynamicImage;
use ndarray::{Array4, ArrayViewD};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;

use crate::config::DetectorConfig;
use crate::errors::{CvPomError, CvPomResult};
use crate::perception::traits::Detector;
use crate::perception::types::{BBox, Detection};

const INPUT_SIZE: u32 = 640;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
    orig_w: u32,
    orig_h: u32,
}

#[derive(Debug, Clone, PartialEq)]
struct Proposal {
    bbox: [f32; 4], // x1, y1, x2, y2 in original pixels
    confidence: f32,
    class_id: usize,
}

pub struct YoloDetector {
    session: Session,
    conf_threshold: f32,
    iou_threshold: f32,
    class_names: Vec<String>,
}

impl YoloDetector {
    pub fn new(
        model_path: &Path,
        conf_threshold: f32,
        iou_threshold: f32,
        class_names: Vec<String>,
    ) -> CvPomResult<Self> {
        if !model_path.exists() {
            return Err(CvPomError::Detection(format!(
                "model not found: {}",
                model_path.display()
            )));
        }
        let session = Session::builder()
            .map_err(|e| CvPomError::Detection(format!("ort session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| CvPomError::Detection(format!("ort opt-level: {e}")))?
            .commit_from_file(model_path)
            .map_err(|e| CvPomError::Detection(format!("ort load model: {e}")))?;

        tracing::info!(path = %model_path.display(), classes = class_names.len(), "YOLO detector loaded");
        Ok(Self {
            session,
            conf_threshold,
            iou_threshold,
            class_names,
        })
    }

    pub fn from_config(config: &DetectorConfig) -> CvPomResult<Self> {
        let path = config
            .model_path
            .as_deref()
            .ok_or_else(|| CvPomError::Config("[detector].model_path is not set".into()))?;
        Self::new(
            path,
            config.conf_threshold,
            config.iou_threshold,
            config.class_names.clone(),
        )
    }

    fn label(&self, class_id: usize) -> String {
        class_label(&self.class_names, class_id)
    }
}

impl Detector for YoloDetector {
    fn detect(&mut self, image: &DynamicImage) -> CvPomResult<Vec<Detection>> {
        let (input, letterbox) = preprocess(image);
        let input_value = Tensor::from_array(input)
            .map_err(|e| CvPomError::Detection(format!("ort tensor: {e}")))?;

        let output = {
            let outputs = self
                .session
                .run(ort::inputs![input_value])
                .map_err(|e| CvPomError::Detection(format!("ort run: {e}")))?;
            outputs[0]
                .try_extract_array::<f32>()
                .map_err(|e| CvPomError::Detection(format!("extract tensor: {e}")))?
                .to_owned()
        };

        let proposals = decode(&output.view(), &letterbox, self.conf_threshold)?;
        let kept = nms(&proposals, self.iou_threshold);
        tracing::debug!(proposals = proposals.len(), kept = kept.len(), "yolo inference");

        Ok(kept
            .into_iter()
            .map(|i| {
                let p = &proposals[i];
                Detection::new(
                    self.label(p.class_id),
                    p.confidence,
                    BBox::new(
                        p.bbox[0].round() as i32,
                        p.bbox[1].round() as i32,
                        p.bbox[2].round() as i32,
                        p.bbox[3].round() as i32,
                    ),
                )
            })
            .collect())
    }
}

fn class_label(class_names: &[String], class_id: usize) -> String {
    class_names
        .get(class_id)
        .cloned()
        .unwrap_or_else(|| format!("class_{class_id}"))
}

/// Resize + letterbox + normalise → NCHW f32 tensor.
fn preprocess(img: &DynamicImage) -> (Array4<f32>, Letterbox) {
    let sz = INPUT_SIZE;
    let (ow, oh) = (img.width() as f32, img.height() as f32);
    let scale = (sz as f32 / ow).min(sz as f32 / oh);
    let nw = ((ow * scale).round() as u32).clamp(1, sz);
    let nh = ((oh * scale).round() as u32).clamp(1, sz);
    let pad_x = (sz - nw) as f32 / 2.0;
    let pad_y = (sz - nh) as f32 / 2.0;

    let resized = img
        .resize_exact(nw, nh, image::imageops::FilterType::CatmullRom)
        .to_rgb8();
    let mut canvas = image::RgbImage::from_pixel(sz, sz, image::Rgb([114, 114, 114]));
    image::imageops::overlay(&mut canvas, &resized, pad_x.round() as i64, pad_y.round() as i64);

    let mut tensor = Array4::<f32>::zeros((1, 3, sz as usize, sz as usize));
    for (x, y, p) in canvas.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        tensor[[0, 0, y, x]] = p[0] as f32 / 255.0;
        tensor[[0, 1, y, x]] = p[1] as f32 / 255.0;
        tensor[[0, 2, y, x]] = p[2] as f32 / 255.0;
    }

    let letterbox = Letterbox {
        scale,
        pad_x,
        pad_y,
        orig_w: img.width(),
        orig_h: img.height(),
    };
    (tensor, letterbox)
}

/// YOLOv8 output `[1, 4 + classes, proposals]` → proposals in original pixels.
fn decode(
    output: &ArrayViewD<f32>,
    lb: &Letterbox,
    conf_threshold: f32,
) -> CvPomResult<Vec<Proposal>> {
    let shape = output.shape();
    if shape.len() != 3 || shape[1] < 5 {
        return Err(CvPomError::Detection(format!(
            "unexpected output shape: {shape:?}"
        )));
    }
    let num_classes = shape[1] - 4;
    let (max_x, max_y) = (lb.orig_w as f32, lb.orig_h as f32);

    let mut proposals = Vec::new();
    for i in 0..shape[2] {
        let (class_id, score) = (0..num_classes)
            .map(|c| (c, output[[0, 4 + c, i]]))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
        if score < conf_threshold {
            continue;
        }

        let (cx, cy) = (output[[0, 0, i]], output[[0, 1, i]]);
        let (w, h) = (output[[0, 2, i]], output[[0, 3, i]]);
        let unpad = |v: f32, pad: f32, max: f32| ((v - pad) / lb.scale).clamp(0.0, max);
        proposals.push(Proposal {
            bbox: [
                unpad(cx - w / 2.0, lb.pad_x, max_x),
                unpad(cy - h / 2.0, lb.pad_y, max_y),
                unpad(cx + w / 2.0, lb.pad_x, max_x),
                unpad(cy + h / 2.0, lb.pad_y, max_y),
            ],
            confidence: score,
            class_id,
        });
    }
    Ok(proposals)
}

/// Greedy per-class NMS. Returns kept indices, highest confidence first.
fn nms(dets: &[Proposal], iou_threshold: f32) -> Vec<usize> {
    let mut order: Vec<usize> = (0..dets.len()).collect();
    order.sort_by(|&a, &b| dets[b].confidence.total_cmp(&dets[a].confidence));

    let mut suppressed = vec![false; dets.len()];
    let mut keep = Vec::new();
    for (pos, &i) in order.iter().enumerate() {
        if suppressed[i] {
            continue;
        }
        keep.push(i);
        for &j in &order[pos + 1..] {
            if !suppressed[j]
                && dets[i].class_id == dets[j].class_id
                && iou(&dets[i].bbox, &dets[j].bbox) > iou_threshold
            {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let inter = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0)
        * (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let union = (a[2] - a[0]) * (a[3] - a[1]) + (b[2] - b[0]) * (b[3] - b[1]) - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}
