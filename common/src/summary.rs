//! Aggregate statistics over one analysis.
//!
use serde::Serialize;

use crate::detection::Analysis;

/// Maximum number of labels listed in [`Summary::top_labels`].
pub const TOP_LABELS: usize = 8;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DetectionCounts {
    pub faces: usize,
    /// Distinct label names.
    pub labels: usize,
    /// Distinct label names with at least one located instance.
    pub labels_with_boxes: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Summary {
    /// Highest confidence seen per emotion across all faces, in order of first appearance.
    pub emotions: Vec<(String, f32)>,
    /// Midpoint of the age range of every face that has one.
    pub ages: Vec<f32>,
    /// Most confident distinct labels, highest first.
    pub top_labels: Vec<(String, f32)>,
    pub counts: DetectionCounts,
}

impl Summary {
    pub fn from_analysis(analysis: &Analysis) -> Self {
        let mut emotions: Vec<(String, f32)> = vec![];
        let mut ages = vec![];

        for face in analysis.faces().filter_map(|d| d.as_face()) {
            for emotion in face.emotions.iter() {
                match emotions.iter_mut().find(|(name, _)| *name == emotion.value) {
                    Some((_, max)) => *max = f32::max(*max, emotion.confidence),
                    None => emotions.push((emotion.value.clone(), emotion.confidence)),
                }
            }
            if let Some(age_range) = face.age_range {
                ages.push(age_range.midpoint());
            }
        }

        let mut top_labels: Vec<(String, f32)> = vec![];
        for label in analysis.labels() {
            let name = label.primary_attribute();
            match top_labels.iter_mut().find(|(n, _)| n == name) {
                Some((_, max)) => *max = f32::max(*max, label.label_confidence()),
                None => top_labels.push((name.to_owned(), label.label_confidence())),
            }
        }
        let distinct_labels = top_labels.len();
        // Stable sort keeps first-appearance order for equal confidences
        top_labels.sort_by(|a, b| b.1.total_cmp(&a.1));
        top_labels.truncate(TOP_LABELS);

        let mut located_names: Vec<&str> = analysis
            .located_labels()
            .map(|d| d.primary_attribute())
            .collect();
        located_names.sort_unstable();
        located_names.dedup();

        Self {
            emotions,
            ages,
            top_labels,
            counts: DetectionCounts {
                faces: analysis.faces().count(),
                labels: distinct_labels,
                labels_with_boxes: located_names.len(),
            },
        }
    }

    /// Mean of [`Summary::ages`], if any face carried an age estimate.
    pub fn mean_age(&self) -> Option<f32> {
        match self.ages.len() {
            0 => None,
            n => Some(self.ages.iter().sum::<f32>() / n as f32),
        }
    }
}
