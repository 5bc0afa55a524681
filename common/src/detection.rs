//! Detection results shared by the client, the renderer and the reports.
//!
use serde::{Deserialize, Serialize};

/// Rectangular region in relative image coordinates.
///
/// All four values are fractions of the image dimensions and are expected in `[0, 1]`. Values
/// returned by the remote service can slightly overshoot, so use [`BoundingBox::clamped`] before
/// converting to pixels.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Whether all coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        [self.left, self.top, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Clamp the box into the unit square.
    ///
    /// Edges outside `[0, 1]` are moved onto the border, shrinking the box to its overlap with the
    /// image. Boxes entirely outside end up with zero width or height.
    pub fn clamped(&self) -> Self {
        let left = self.left.max(0.0).min(1.0);
        let top = self.top.max(0.0).min(1.0);
        let width = (self.width - (left - self.left)).max(0.0).min(1.0 - left);
        let height = (self.height - (top - self.top)).max(0.0).min(1.0 - top);

        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Age estimate in years.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AgeRange {
    pub low: u32,
    pub high: u32,
}

impl AgeRange {
    /// Midpoint of the range.
    pub fn midpoint(&self) -> f32 {
        (self.low + self.high) as f32 / 2.0
    }
}

/// A categorical prediction with its confidence, e.g. gender `Female` at 99.1%.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Prediction<T> {
    pub value: T,
    pub confidence: f32,
}

impl<T> Prediction<T> {
    pub fn new(value: T, confidence: f32) -> Self {
        Self { value, confidence }
    }
}

/// Attributes predicted for a single face.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct FaceAttributes {
    pub age_range: Option<AgeRange>,
    pub gender: Option<Prediction<String>>,
    /// The emotion with the highest confidence.
    pub dominant_emotion: Option<Prediction<String>>,
    /// All emotions reported for the face.
    #[serde(default)]
    pub emotions: Vec<Prediction<String>>,
    pub smile: Option<Prediction<bool>>,
    pub eyeglasses: Option<Prediction<bool>>,
}

/// Attributes of a detected label (object or scene concept).
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct LabelAttributes {
    pub name: String,
    /// Confidence of the label as a whole. Located instances carry their own confidence in
    /// [`Detection::confidence`].
    pub label_confidence: f32,
    /// Number of located instances reported for this label.
    pub instance_count: usize,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DetectionKind {
    Face(FaceAttributes),
    Label(LabelAttributes),
}

/// Typed outcome of one recognition call.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Detection {
    /// Location of the detection. General labels describe the whole image and carry none.
    pub bbox: Option<BoundingBox>,
    /// Confidence in percent (0 - 100).
    pub confidence: f32,
    pub kind: DetectionKind,
}

impl Detection {
    pub fn face(bbox: BoundingBox, confidence: f32, attributes: FaceAttributes) -> Self {
        Self {
            bbox: Some(bbox),
            confidence,
            kind: DetectionKind::Face(attributes),
        }
    }

    /// Label whose detection confidence is also the label confidence.
    pub fn label(
        name: impl Into<String>,
        bbox: Option<BoundingBox>,
        confidence: f32,
        instance_count: usize,
    ) -> Self {
        Self::instance(name, bbox, confidence, confidence, instance_count)
    }

    /// One located instance of a label. `confidence` belongs to the instance,
    /// `label_confidence` to the label.
    pub fn instance(
        name: impl Into<String>,
        bbox: Option<BoundingBox>,
        confidence: f32,
        label_confidence: f32,
        instance_count: usize,
    ) -> Self {
        Self {
            bbox,
            confidence,
            kind: DetectionKind::Label(LabelAttributes {
                name: name.into(),
                label_confidence,
                instance_count,
            }),
        }
    }

    pub fn is_face(&self) -> bool {
        matches!(self.kind, DetectionKind::Face(_))
    }

    pub fn as_face(&self) -> Option<&FaceAttributes> {
        match &self.kind {
            DetectionKind::Face(face) => Some(face),
            DetectionKind::Label(_) => None,
        }
    }

    pub fn as_label(&self) -> Option<&LabelAttributes> {
        match &self.kind {
            DetectionKind::Label(label) => Some(label),
            DetectionKind::Face(_) => None,
        }
    }

    /// Primary attribute: `Face` for faces, the label name for labels.
    pub fn primary_attribute(&self) -> &str {
        match &self.kind {
            DetectionKind::Face(_) => "Face",
            DetectionKind::Label(label) => &label.name,
        }
    }

    /// Confidence of the face, or of the label as a whole for labels.
    pub fn label_confidence(&self) -> f32 {
        match &self.kind {
            DetectionKind::Face(_) => self.confidence,
            DetectionKind::Label(label) => label.label_confidence,
        }
    }

    /// Short annotation with the confidence rounded to one decimal, e.g. `Person 97.3%`.
    pub fn caption(&self) -> String {
        format!("{} {:.1}%", self.primary_attribute(), self.confidence)
    }
}

/// All detections of one image: faces first, then labels, each in the order the service
/// returned them.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Analysis {
    pub detections: Vec<Detection>,
}

impl Analysis {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn faces(&self) -> impl Iterator<Item = &Detection> {
        self.detections.iter().filter(|d| d.is_face())
    }

    pub fn labels(&self) -> impl Iterator<Item = &Detection> {
        self.detections.iter().filter(|d| !d.is_face())
    }

    /// Labels located in the image.
    pub fn located_labels(&self) -> impl Iterator<Item = &Detection> {
        self.labels().filter(|d| d.bbox.is_some())
    }

    /// Labels describing the image as a whole.
    pub fn general_labels(&self) -> impl Iterator<Item = &Detection> {
        self.labels().filter(|d| d.bbox.is_none())
    }

    /// Distinct label names in order of first appearance.
    pub fn label_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = vec![];
        for label in self.labels().filter_map(Detection::as_label) {
            if !names.contains(&label.name.as_str()) {
                names.push(&label.name);
            }
        }
        names
    }
}
