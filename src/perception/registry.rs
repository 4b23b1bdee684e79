/// Element registry — merges detections and OCR text regions into the
/// ordered, immutable element list of a single screenshot.
use std::cmp::Ordering;

use crate::config::{RegistryConfig, TieBreak};
use crate::errors::CvPomResult;
use crate::perception::types::{Detection, Element, TextRegion};

/// Immutable, ordered set of elements built from one screenshot.
///
/// Order is detections in source order, followed by text regions that did not
/// attach to any detection (also in source order).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementRegistry {
    elements: Vec<Element>,
}

impl ElementRegistry {
    /// Build the registry from raw detector and recognizer output.
    ///
    /// Every text region attaches to the detection it overlaps most
    /// (intersection ÷ smaller box area), provided the overlap reaches
    /// `config.min_overlap`. Equal overlaps are settled by `config.tie_break`.
    /// Several regions attached to one detection are joined with a space.
    pub fn build(
        detections: Vec<Detection>,
        text_regions: Vec<TextRegion>,
        config: &RegistryConfig,
    ) -> Self {
        let detections: Vec<Detection> = detections
            .into_iter()
            .filter(|d| {
                let ok = d.bbox.is_valid();
                if !ok {
                    tracing::warn!(label = %d.label, bbox = ?d.bbox, "dropping degenerate detection box");
                }
                ok
            })
            .collect();

        let mut attached: Vec<Vec<String>> = vec![Vec::new(); detections.len()];
        let mut standalone: Vec<Element> = Vec::new();

        for region in text_regions {
            if !region.bbox.is_valid() {
                tracing::warn!(text = %region.text, bbox = ?region.bbox, "dropping degenerate text box");
                continue;
            }
            match best_container(&detections, &region, config) {
                Some(idx) => attached[idx].push(region.text),
                None => standalone.push(Element {
                    label: config.text_label.clone(),
                    text: Some(region.text),
                    bbox: region.bbox,
                    confidence: 1.0,
                }),
            }
        }

        let mut elements: Vec<Element> = detections
            .into_iter()
            .zip(attached)
            .map(|(det, texts)| Element {
                label: det.label,
                text: if texts.is_empty() {
                    None
                } else {
                    Some(texts.join(" "))
                },
                bbox: det.bbox,
                confidence: det.confidence.clamp(0.0, 1.0),
            })
            .collect();

        tracing::debug!(
            detections = elements.len(),
            standalone_text = standalone.len(),
            "element registry built"
        );

        elements.extend(standalone);
        Self { elements }
    }

    /// Wrap an already-merged element list, e.g. one loaded from JSON.
    pub fn from_elements(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.elements.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// JSON list of `{label, text, box, confidence}` objects.
    pub fn to_json(&self) -> CvPomResult<String> {
        Ok(serde_json::to_string(&self.elements)?)
    }

    pub fn to_json_pretty(&self) -> CvPomResult<String> {
        Ok(serde_json::to_string_pretty(&self.elements)?)
    }

    pub fn from_json(json: &str) -> CvPomResult<Self> {
        let elements: Vec<Element> = serde_json::from_str(json)?;
        Ok(Self { elements })
    }
}

impl<'a> IntoIterator for &'a ElementRegistry {
    type Item = &'a Element;
    type IntoIter = std::slice::Iter<'a, Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

/// Index of the detection that should own `region`, if any.
fn best_container(
    detections: &[Detection],
    region: &TextRegion,
    config: &RegistryConfig,
) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;

    for (idx, det) in detections.iter().enumerate() {
        let overlap = det.bbox.overlap_ratio(&region.bbox);
        if overlap <= 0.0 || overlap < config.min_overlap {
            continue;
        }
        best = match best {
            None => Some((idx, overlap)),
            Some((best_idx, best_overlap)) => {
                let ord = overlap
                    .partial_cmp(&best_overlap)
                    .unwrap_or(Ordering::Equal);
                let replace = match ord {
                    Ordering::Greater => true,
                    Ordering::Less => false,
                    Ordering::Equal => match config.tie_break {
                        TieBreak::SmallestArea => {
                            det.bbox.area() < detections[best_idx].bbox.area()
                        }
                        TieBreak::First => false,
                    },
                };
                if replace {
                    Some((idx, overlap))
                } else {
                    Some((best_idx, best_overlap))
                }
            }
        };
    }

    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::types::BBox;

    fn det(label: &str, b: [i32; 4]) -> Detection {
        Detection::new(label, 0.9, BBox::from(b))
    }

    fn txt(text: &str, b: [i32; 4]) -> TextRegion {
        TextRegion::new(text, BBox::from(b))
    }

    #[test]
    fn text_attaches_to_overlapping_detection() {
        let reg = ElementRegistry::build(
            vec![det("button", [0, 0, 100, 40]), det("input", [0, 100, 300, 140])],
            vec![txt("Submit", [20, 10, 80, 30])],
            &RegistryConfig::default(),
        );
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.elements()[0].text.as_deref(), Some("Submit"));
        assert_eq!(reg.elements()[1].text, None);
    }

    #[test]
    fn zero_overlap_text_becomes_standalone_element() {
        let reg = ElementRegistry::build(
            vec![det("button", [0, 0, 100, 40])],
            vec![txt("Welcome", [400, 400, 500, 420])],
            &RegistryConfig::default(),
        );
        assert_eq!(reg.len(), 2);
        let standalone = &reg.elements()[1];
        assert_eq!(standalone.label, "text");
        assert_eq!(standalone.text.as_deref(), Some("Welcome"));
        assert_eq!(standalone.confidence, 1.0);
        assert_eq!(standalone.bbox, BBox::new(400, 400, 500, 420));
    }

    #[test]
    fn overlap_below_threshold_stays_standalone() {
        // 20% of the text box lies inside the button.
        let reg = ElementRegistry::build(
            vec![det("button", [0, 0, 100, 40])],
            vec![txt("Edge", [90, 10, 140, 30])],
            &RegistryConfig::default(),
        );
        assert_eq!(reg.elements()[0].text, None);
        assert_eq!(reg.elements()[1].label, "text");
    }

    #[test]
    fn nested_containers_prefer_tightest_box() {
        let reg = ElementRegistry::build(
            vec![
                det("card", [0, 0, 400, 300]),
                det("button", [10, 10, 110, 50]),
            ],
            vec![txt("Buy", [30, 20, 60, 40])],
            &RegistryConfig::default(),
        );
        assert_eq!(reg.elements()[0].text, None);
        assert_eq!(reg.elements()[1].text.as_deref(), Some("Buy"));
    }

    #[test]
    fn first_tie_break_keeps_source_order() {
        let config = RegistryConfig {
            tie_break: TieBreak::First,
            ..RegistryConfig::default()
        };
        let reg = ElementRegistry::build(
            vec![
                det("card", [0, 0, 400, 300]),
                det("button", [10, 10, 110, 50]),
            ],
            vec![txt("Buy", [30, 20, 60, 40])],
            &config,
        );
        assert_eq!(reg.elements()[0].text.as_deref(), Some("Buy"));
        assert_eq!(reg.elements()[1].text, None);
    }

    #[test]
    fn larger_overlap_beats_smaller_area() {
        let reg = ElementRegistry::build(
            vec![
                det("panel", [0, 0, 200, 200]),
                det("chip", [45, 0, 70, 20]),
            ],
            // fully inside panel; only partially inside chip
            vec![txt("Label", [40, 5, 60, 15])],
            &RegistryConfig::default(),
        );
        assert_eq!(reg.elements()[0].text.as_deref(), Some("Label"));
        assert_eq!(reg.elements()[1].text, None);
    }

    #[test]
    fn multiple_regions_join_in_source_order() {
        let reg = ElementRegistry::build(
            vec![det("card", [0, 0, 300, 100])],
            vec![
                txt("Your", [10, 10, 50, 30]),
                txt("business", [60, 10, 140, 30]),
            ],
            &RegistryConfig::default(),
        );
        assert_eq!(reg.elements()[0].text.as_deref(), Some("Your business"));
    }

    #[test]
    fn association_is_deterministic() {
        let dets = vec![
            det("a", [0, 0, 100, 100]),
            det("b", [50, 50, 150, 150]),
            det("c", [200, 0, 300, 50]),
        ];
        let texts = vec![
            txt("one", [60, 60, 90, 90]),
            txt("two", [210, 10, 240, 30]),
            txt("three", [500, 500, 520, 520]),
        ];
        let first = ElementRegistry::build(dets.clone(), texts.clone(), &RegistryConfig::default());
        for _ in 0..5 {
            let again =
                ElementRegistry::build(dets.clone(), texts.clone(), &RegistryConfig::default());
            assert_eq!(first, again);
        }
    }

    #[test]
    fn degenerate_boxes_are_dropped() {
        let reg = ElementRegistry::build(
            vec![det("line", [0, 5, 100, 5]), det("button", [0, 0, 10, 10])],
            vec![txt("dot", [2, 1, 3, 1])],
            &RegistryConfig::default(),
        );
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.elements()[0].label, "button");
    }

    #[test]
    fn custom_text_label() {
        let config = RegistryConfig {
            text_label: "ocr_element".into(),
            ..RegistryConfig::default()
        };
        let reg = ElementRegistry::build(vec![], vec![txt("hi", [0, 0, 10, 10])], &config);
        assert_eq!(reg.elements()[0].label, "ocr_element");
    }

    #[test]
    fn json_round_trip_preserves_elements() {
        let reg = ElementRegistry::build(
            vec![
                Detection::new("button", 0.87, BBox::new(0, 0, 100, 40)),
                Detection::new("icon", 0.33, BBox::new(120, 0, 140, 20)),
            ],
            vec![
                txt("Update", [10, 10, 90, 30]),
                txt("Footer", [0, 500, 100, 520]),
            ],
            &RegistryConfig::default(),
        );
        let json = reg.to_json().unwrap();
        let parsed = ElementRegistry::from_json(&json).unwrap();
        assert_eq!(parsed, reg);

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["box"], serde_json::json!([0, 0, 100, 40]));
        assert_eq!(value[1]["text"], serde_json::Value::Null);
    }
}
