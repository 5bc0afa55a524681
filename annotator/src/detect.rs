//! Detection client.
//!
//! [`Detector`] abstracts the remote face and label detection endpoints. [`analyze`] validates the
//! image bytes locally and only then calls the detector, so malformed input never reaches the
//! network.
use aws_sdk_rekognition::{
    error::DisplayErrorContext,
    primitives::Blob,
    types::{self as sdk, Attribute, Image},
    Client,
};
use common::{AgeRange, Analysis, BoundingBox, Detection, FaceAttributes, Prediction};
use image::{ImageFormat, RgbImage};

use crate::{
    config::Config,
    error::{AnnotateError, Result},
};

/// Largest payload the detection service accepts as inline bytes.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Remote face and label detection.
#[allow(async_fn_in_trait)]
pub trait Detector {
    async fn detect_faces(&self, image: &[u8]) -> Result<Vec<Detection>>;
    async fn detect_labels(&self, image: &[u8]) -> Result<Vec<Detection>>;
}

/// Validate the image bytes, then run face and label detection.
///
/// Faces come first in the result, followed by labels.
pub async fn analyze<D: Detector>(detector: &D, image: &[u8]) -> Result<Analysis> {
    check_image_bytes(image)?;

    let mut detections = detector.detect_faces(image).await?;
    log::debug!("Detected {} faces", detections.len());
    let labels = detector.detect_labels(image).await?;
    log::debug!("Detected {} label detections", labels.len());
    detections.extend(labels);

    Ok(Analysis::new(detections))
}

/// Check that the bytes look like an image the detection service accepts.
pub fn check_image_bytes(image: &[u8]) -> Result<ImageFormat> {
    if image.is_empty() {
        return Err(AnnotateError::InvalidInput("image is empty".into()));
    }
    if image.len() > MAX_IMAGE_BYTES {
        return Err(AnnotateError::InvalidInput(format!(
            "image has {} bytes, at most {} are supported",
            image.len(),
            MAX_IMAGE_BYTES
        )));
    }

    match image::guess_format(image) {
        Ok(format @ (ImageFormat::Jpeg | ImageFormat::Png)) => Ok(format),
        Ok(format) => Err(AnnotateError::InvalidInput(format!(
            "unsupported image format {format:?}, expected JPEG or PNG"
        ))),
        Err(_) => Err(AnnotateError::InvalidInput(
            "unrecognized image format".into(),
        )),
    }
}

/// Check and decode the image bytes into an RGB buffer.
pub fn decode_image(image: &[u8]) -> Result<RgbImage> {
    let format = check_image_bytes(image)?;
    let decoded = image::load_from_memory_with_format(image, format)
        .map_err(|err| AnnotateError::InvalidInput(format!("failed to decode image: {err}")))?;

    Ok(decoded.to_rgb8())
}

/// [`Detector`] backed by AWS Rekognition.
pub struct RekognitionDetector {
    client: Client,
    max_labels: i32,
    min_confidence: f32,
}

impl RekognitionDetector {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            max_labels: config.max_labels,
            min_confidence: config.min_confidence,
        }
    }
}

impl Detector for RekognitionDetector {
    async fn detect_faces(&self, image: &[u8]) -> Result<Vec<Detection>> {
        let output = self
            .client
            .detect_faces()
            .image(image_param(image))
            .attributes(Attribute::All)
            .send()
            .await
            .map_err(|err| {
                match err
                    .as_service_error()
                    .map(|e| e.is_invalid_image_format_exception())
                {
                    Some(true) => AnnotateError::InvalidInput("image format rejected".into()),
                    _ => AnnotateError::RemoteService(format!(
                        "face detection failed: {}",
                        DisplayErrorContext(&err)
                    )),
                }
            })?;

        Ok(output.face_details().iter().filter_map(face_from_sdk).collect())
    }

    async fn detect_labels(&self, image: &[u8]) -> Result<Vec<Detection>> {
        let output = self
            .client
            .detect_labels()
            .image(image_param(image))
            .max_labels(self.max_labels)
            .min_confidence(self.min_confidence)
            .send()
            .await
            .map_err(|err| {
                match err
                    .as_service_error()
                    .map(|e| e.is_invalid_image_format_exception())
                {
                    Some(true) => AnnotateError::InvalidInput("image format rejected".into()),
                    _ => AnnotateError::RemoteService(format!(
                        "label detection failed: {}",
                        DisplayErrorContext(&err)
                    )),
                }
            })?;

        Ok(labels_from_sdk(output.labels()))
    }
}

fn image_param(image: &[u8]) -> Image {
    Image::builder().bytes(Blob::new(image.to_vec())).build()
}

fn bbox_from_sdk(bbox: &sdk::BoundingBox) -> BoundingBox {
    BoundingBox::new(
        bbox.left().unwrap_or_default(),
        bbox.top().unwrap_or_default(),
        bbox.width().unwrap_or_default(),
        bbox.height().unwrap_or_default(),
    )
}

/// Convert a face reported by the service. Faces without a bounding box are dropped.
fn face_from_sdk(face: &sdk::FaceDetail) -> Option<Detection> {
    let Some(bbox) = face.bounding_box() else {
        log::warn!("Skipping face without bounding box");
        return None;
    };

    let age_range = face.age_range().and_then(|range| {
        let low: Option<i32> = range.low().into();
        let high: Option<i32> = range.high().into();
        match (low, high) {
            (Some(low), Some(high)) => Some(AgeRange {
                low: low.max(0) as u32,
                high: high.max(0) as u32,
            }),
            _ => None,
        }
    });

    let gender = face.gender().and_then(|gender| {
        gender.value().map(|value| {
            Prediction::new(
                value.as_str().to_owned(),
                gender.confidence().unwrap_or_default(),
            )
        })
    });

    let emotions: Vec<Prediction<String>> = face
        .emotions()
        .iter()
        .filter_map(|emotion| {
            emotion.r#type().map(|name| {
                Prediction::new(
                    name.as_str().to_owned(),
                    emotion.confidence().unwrap_or_default(),
                )
            })
        })
        .collect();
    let dominant_emotion = emotions
        .iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
        .cloned();

    let smile = face.smile().and_then(|smile| {
        let value: Option<bool> = smile.value().into();
        value.map(|value| Prediction::new(value, smile.confidence().unwrap_or_default()))
    });
    let eyeglasses = face.eyeglasses().and_then(|eyeglasses| {
        let value: Option<bool> = eyeglasses.value().into();
        value.map(|value| Prediction::new(value, eyeglasses.confidence().unwrap_or_default()))
    });

    Some(Detection::face(
        bbox_from_sdk(bbox),
        face.confidence().unwrap_or_default(),
        FaceAttributes {
            age_range,
            gender,
            dominant_emotion,
            emotions,
            smile,
            eyeglasses,
        },
    ))
}

/// Convert labels reported by the service.
///
/// Every located instance becomes its own detection. Labels without instances become a single
/// detection without a bounding box.
fn labels_from_sdk(labels: &[sdk::Label]) -> Vec<Detection> {
    let mut detections = vec![];

    for label in labels {
        let name = label.name().unwrap_or("Unknown");
        let confidence = label.confidence().unwrap_or_default();
        let instances: Vec<_> = label
            .instances()
            .iter()
            .filter_map(|instance| {
                instance
                    .bounding_box()
                    .map(|bbox| (bbox_from_sdk(bbox), instance.confidence()))
            })
            .collect();

        match instances.len() {
            0 => detections.push(Detection::label(name, None, confidence, 0)),
            count => detections.extend(instances.into_iter().map(|(bbox, instance_confidence)| {
                Detection::instance(
                    name,
                    Some(bbox),
                    instance_confidence.unwrap_or(confidence),
                    confidence,
                    count,
                )
            })),
        }
    }

    detections
}
