//! Renderer drawing detections onto a copy of the image.
//!
//! Boxes are drawn in result order without z-ordering or deduplication. Faces share one color,
//! labels get one color per distinct name, assigned in order of first appearance.
use common::{Analysis, BoundingBox, Detection, DetectionKind};
use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut},
    rect::Rect,
};
use rusttype::{point, Font, Scale};

use crate::error::{AnnotateError, Result};

pub const FACE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Qualitative palette for labels, cycled when there are more names than colors.
pub const LABEL_PALETTE: [Rgb<u8>; 12] = [
    Rgb([141, 211, 199]),
    Rgb([255, 255, 179]),
    Rgb([190, 186, 218]),
    Rgb([251, 128, 114]),
    Rgb([128, 177, 211]),
    Rgb([253, 180, 98]),
    Rgb([179, 222, 105]),
    Rgb([252, 205, 229]),
    Rgb([217, 217, 217]),
    Rgb([188, 128, 189]),
    Rgb([204, 235, 197]),
    Rgb([255, 237, 111]),
];

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

const FACE_LINE_WIDTH: u32 = 3;
const LABEL_LINE_WIDTH: u32 = 2;
const TEXT_SCALE: f32 = 16.0;
const TEXT_PADDING: i32 = 3;
/// Number of general labels listed in the legend.
const LEGEND_LABELS: usize = 5;

/// Convert a relative bounding box into a pixel rectangle on a `width` x `height` canvas.
///
/// The box is clamped to the unit square first, so the rectangle always lies inside the canvas.
/// Returns `None` for boxes that cover less than one pixel in either direction.
pub fn to_pixel_rect(bbox: &BoundingBox, width: u32, height: u32) -> Result<Option<Rect>> {
    if !bbox.is_finite() {
        return Err(AnnotateError::Render(format!(
            "bounding box with non-finite coordinates: {bbox:?}"
        )));
    }

    let bbox = bbox.clamped();
    let (width, height) = (width as f32, height as f32);

    // Coordinate frame basis is on the top left corner
    let (x, y) = ((bbox.left * width).round(), (bbox.top * height).round());
    let w = (bbox.width * width).round().min(width - x);
    let h = (bbox.height * height).round().min(height - y);

    if w < 1.0 || h < 1.0 {
        return Ok(None);
    }

    Ok(Some(Rect::at(x as i32, y as i32).of_size(w as u32, h as u32)))
}

/// Color of a detection. `label_names` are the distinct label names of the analysis.
pub fn color_for(detection: &Detection, label_names: &[&str]) -> Rgb<u8> {
    match &detection.kind {
        DetectionKind::Face(_) => FACE_COLOR,
        DetectionKind::Label(label) => {
            let index = label_names
                .iter()
                .position(|name| *name == label.name)
                .unwrap_or(0);
            LABEL_PALETTE[index % LABEL_PALETTE.len()]
        }
    }
}

/// Text lines drawn next to a detection. `face_number` counts faces from 1.
pub fn annotation_lines(detection: &Detection, face_number: usize) -> Vec<String> {
    match &detection.kind {
        DetectionKind::Face(face) => {
            let mut lines = vec![format!("Face {face_number}: {:.1}%", detection.confidence)];
            if let Some(age) = face.age_range {
                lines.push(format!("Age: {}-{}", age.low, age.high));
            }
            if let Some(gender) = &face.gender {
                lines.push(gender.value.clone());
            }
            if let Some(emotion) = &face.dominant_emotion {
                lines.push(emotion.value.clone());
            }
            lines
        }
        DetectionKind::Label(_) => vec![detection.caption()],
    }
}

/// Legend text listing the first general labels. Empty when there are none.
pub fn legend_lines(analysis: &Analysis) -> Vec<String> {
    let general: Vec<String> = analysis
        .general_labels()
        .take(LEGEND_LABELS)
        .map(|d| format!("{} ({:.1}%)", d.primary_attribute(), d.confidence))
        .collect();
    if general.is_empty() {
        return general;
    }

    let mut lines = vec!["General labels:".to_owned()];
    lines.extend(general);
    lines
}

/// Draws detections onto images.
pub struct Renderer {
    font: Option<Font<'static>>,
    scale: Scale,
}

impl Renderer {
    /// Create a renderer. Without a font only the boxes are drawn.
    pub fn new(font: Option<Font<'static>>) -> Self {
        Self {
            font,
            scale: Scale::uniform(TEXT_SCALE),
        }
    }

    /// Draw all detections of `analysis` onto a copy of `image`.
    ///
    /// All boxes are converted before anything is drawn, so malformed box data fails without
    /// producing a partial image.
    pub fn render(&self, image: &RgbImage, analysis: &Analysis) -> Result<RgbImage> {
        let (width, height) = image.dimensions();

        let mut rects = Vec::with_capacity(analysis.detections.len());
        for detection in analysis.detections.iter() {
            let rect = match &detection.bbox {
                Some(bbox) => to_pixel_rect(bbox, width, height)?,
                None => None,
            };
            rects.push(rect);
        }

        let mut frame = image.clone();
        let label_names = analysis.label_names();
        let mut face_number = 0;

        for (detection, rect) in analysis.detections.iter().zip(rects) {
            if detection.is_face() {
                face_number += 1;
            }
            let Some(rect) = rect else {
                continue;
            };

            let color = color_for(detection, &label_names);
            let line_width = if detection.is_face() {
                FACE_LINE_WIDTH
            } else {
                LABEL_LINE_WIDTH
            };
            draw_thick_rect(&mut frame, rect, color, line_width);

            let (text_color, background) = if detection.is_face() {
                (color, WHITE)
            } else {
                (BLACK, color)
            };
            self.draw_text_block(
                &mut frame,
                &annotation_lines(detection, face_number),
                rect.left(),
                rect.top(),
                text_color,
                background,
            );
        }

        self.draw_legend(&mut frame, analysis);

        Ok(frame)
    }

    /// List general labels in the bottom-left corner.
    fn draw_legend(&self, frame: &mut RgbImage, analysis: &Analysis) {
        let lines = legend_lines(analysis);
        if lines.is_empty() {
            return;
        }

        let y_bottom = frame.height() as i32 - 10;
        self.draw_text_block(frame, &lines, 10, y_bottom, WHITE, BLACK);
    }

    fn line_height(&self) -> i32 {
        self.scale.y.ceil() as i32 + 2
    }

    fn block_height(&self, lines: usize) -> i32 {
        lines as i32 * self.line_height() + 2 * TEXT_PADDING
    }

    /// Draw text lines on a filled background, ending just above `y_anchor`.
    ///
    /// The block is shifted down when it would leave the top of the image.
    fn draw_text_block(
        &self,
        frame: &mut RgbImage,
        lines: &[String],
        x: i32,
        y_anchor: i32,
        text_color: Rgb<u8>,
        background: Rgb<u8>,
    ) {
        let Some(font) = &self.font else {
            return;
        };
        if lines.is_empty() {
            return;
        }

        let block_width = lines
            .iter()
            .map(|line| text_width(font, self.scale, line))
            .max()
            .unwrap_or(0)
            + 2 * TEXT_PADDING;
        let block_height = self.block_height(lines.len());
        let y_top = (y_anchor - block_height).max(0);

        draw_filled_rect_mut(
            frame,
            Rect::at(x, y_top).of_size(block_width.max(1) as u32, block_height as u32),
            background,
        );
        for (i, line) in lines.iter().enumerate() {
            draw_text_mut(
                frame,
                text_color,
                x + TEXT_PADDING,
                y_top + TEXT_PADDING + i as i32 * self.line_height(),
                self.scale,
                font,
                line,
            );
        }
    }
}

/// Draw a hollow rectangle with the border growing inwards.
fn draw_thick_rect(frame: &mut RgbImage, rect: Rect, color: Rgb<u8>, line_width: u32) {
    for inset in 0..line_width {
        let (w, h) = (rect.width(), rect.height());
        if w <= 2 * inset || h <= 2 * inset {
            break;
        }
        let inner = Rect::at(rect.left() + inset as i32, rect.top() + inset as i32)
            .of_size(w - 2 * inset, h - 2 * inset);
        draw_hollow_rect_mut(frame, inner, color);
    }
}

/// Width in pixels of `text` rendered with `font` at `scale`.
fn text_width(font: &Font, scale: Scale, text: &str) -> i32 {
    font.layout(text, scale, point(0.0, 0.0))
        .filter_map(|glyph| glyph.pixel_bounding_box())
        .map(|bbox| bbox.max.x)
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod test {
    use super::*;
    use common::{AgeRange, FaceAttributes, Prediction};
    use proptest::prelude::*;

    fn face(bbox: BoundingBox) -> Detection {
        Detection::face(
            bbox,
            98.5,
            FaceAttributes {
                age_range: Some(AgeRange { low: 20, high: 30 }),
                ..Default::default()
            },
        )
    }

    fn gray_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([40, 40, 40]))
    }

    #[test]
    fn pixel_rect_of_example_face() -> Result<()> {
        let rect = to_pixel_rect(&BoundingBox::new(0.1, 0.1, 0.2, 0.2), 1000, 1000)?.unwrap();

        assert_eq!((rect.left(), rect.top()), (100, 100));
        assert_eq!((rect.width(), rect.height()), (200, 200));

        Ok(())
    }

    #[test]
    fn pixel_rect_is_clamped_to_canvas() -> Result<()> {
        let rect = to_pixel_rect(&BoundingBox::new(-0.2, 0.9, 0.5, 0.4), 200, 100)?.unwrap();

        assert_eq!((rect.left(), rect.top()), (0, 90));
        assert_eq!(rect.right(), 59);
        assert_eq!(rect.bottom(), 99);

        Ok(())
    }

    #[test]
    fn degenerate_and_malformed_boxes() {
        assert!(matches!(
            to_pixel_rect(&BoundingBox::new(0.5, 0.5, 0.0, 0.2), 100, 100),
            Ok(None)
        ));
        assert!(matches!(
            to_pixel_rect(&BoundingBox::new(1.2, 0.5, 0.3, 0.2), 100, 100),
            Ok(None)
        ));
        assert!(matches!(
            to_pixel_rect(&BoundingBox::new(f32::NAN, 0.5, 0.3, 0.2), 100, 100),
            Err(AnnotateError::Render(_))
        ));
        assert!(matches!(
            to_pixel_rect(&BoundingBox::new(0.1, 0.5, f32::INFINITY, 0.2), 100, 100),
            Err(AnnotateError::Render(_))
        ));
    }

    proptest! {
        #[test]
        fn pixel_rect_stays_inside_image(
            left in 0.0f32..=1.0,
            top in 0.0f32..=1.0,
            width in 0.0f32..=1.0,
            height in 0.0f32..=1.0,
            image_width in 1u32..2000,
            image_height in 1u32..2000,
        ) {
            let bbox = BoundingBox::new(left, top, width, height);
            if let Some(rect) = to_pixel_rect(&bbox, image_width, image_height).unwrap() {
                prop_assert!(rect.left() >= 0);
                prop_assert!(rect.top() >= 0);
                prop_assert!(rect.right() < image_width as i32);
                prop_assert!(rect.bottom() < image_height as i32);
            }
        }
    }

    #[test]
    fn draws_face_rectangle_at_expected_pixels() -> Result<()> {
        let image = gray_image(1000, 1000);
        let analysis = Analysis::new(vec![face(BoundingBox::new(0.1, 0.1, 0.2, 0.2))]);

        let frame = Renderer::new(None).render(&image, &analysis)?;

        assert_eq!(*frame.get_pixel(100, 100), FACE_COLOR);
        assert_eq!(*frame.get_pixel(299, 100), FACE_COLOR);
        assert_eq!(*frame.get_pixel(100, 299), FACE_COLOR);
        assert_eq!(*frame.get_pixel(299, 299), FACE_COLOR);
        // Border is three pixels wide
        assert_eq!(*frame.get_pixel(102, 150), FACE_COLOR);
        assert_eq!(*frame.get_pixel(103, 150), Rgb([40, 40, 40]));
        // Outside and inside of the box stay untouched
        assert_eq!(*frame.get_pixel(99, 99), Rgb([40, 40, 40]));
        assert_eq!(*frame.get_pixel(300, 300), Rgb([40, 40, 40]));
        assert_eq!(*frame.get_pixel(200, 200), Rgb([40, 40, 40]));

        Ok(())
    }

    #[test]
    fn zero_detections_leave_image_unchanged() -> Result<()> {
        let image = gray_image(64, 48);
        let frame = Renderer::new(None).render(&image, &Analysis::default())?;
        assert_eq!(frame, image);

        Ok(())
    }

    #[test]
    fn rendering_is_deterministic() -> Result<()> {
        let image = gray_image(320, 240);
        let bbox = Some(BoundingBox::new(0.4, 0.4, 0.5, 0.5));
        let analysis = Analysis::new(vec![
            face(BoundingBox::new(0.1, 0.1, 0.2, 0.2)),
            face(BoundingBox::new(0.15, 0.15, 0.2, 0.2)),
            Detection::label("Person", bbox, 97.0, 1),
            Detection::label("Office", None, 80.0, 0),
        ]);
        let renderer = Renderer::new(None);

        let first = renderer.render(&image, &analysis)?;
        let second = renderer.render(&image, &analysis)?;

        assert_eq!(first.as_raw(), second.as_raw());
        assert_ne!(first, image);

        Ok(())
    }

    #[test]
    fn malformed_box_fails_rendering() {
        let image = gray_image(10, 10);
        let analysis = Analysis::new(vec![
            face(BoundingBox::new(0.1, 0.1, 0.2, 0.2)),
            Detection::label("Broken", Some(BoundingBox::new(f32::NAN, 0.0, 1.0, 1.0)), 50.0, 1),
        ]);

        let result = Renderer::new(None).render(&image, &analysis);
        assert!(matches!(result, Err(AnnotateError::Render(_))));
    }

    #[test]
    fn colors_by_variant_and_label_name() {
        let bbox = Some(BoundingBox::new(0.0, 0.0, 0.5, 0.5));
        let analysis = Analysis::new(vec![
            face(BoundingBox::new(0.1, 0.1, 0.2, 0.2)),
            face(BoundingBox::new(0.5, 0.5, 0.2, 0.2)),
            Detection::label("Person", bbox, 97.0, 2),
            Detection::label("Chair", bbox, 90.0, 1),
            Detection::label("Person", bbox, 95.0, 2),
        ]);
        let names = analysis.label_names();
        let colors: Vec<_> = analysis
            .detections
            .iter()
            .map(|d| color_for(d, &names))
            .collect();

        assert_eq!(colors[0], FACE_COLOR);
        assert_eq!(colors[1], FACE_COLOR);
        assert_eq!(colors[2], LABEL_PALETTE[0]);
        assert_eq!(colors[3], LABEL_PALETTE[1]);
        assert_eq!(colors[4], LABEL_PALETTE[0]);
    }

    #[test]
    fn face_annotation_lines() {
        let mut detection = face(BoundingBox::new(0.1, 0.1, 0.2, 0.2));
        if let DetectionKind::Face(attributes) = &mut detection.kind {
            attributes.gender = Some(Prediction::new("Female".into(), 99.9));
            attributes.dominant_emotion = Some(Prediction::new("HAPPY".into(), 88.0));
        }

        assert_eq!(
            annotation_lines(&detection, 2),
            vec!["Face 2: 98.5%", "Age: 20-30", "Female", "HAPPY"]
        );

        let label = Detection::label("Laptop", None, 91.26, 0);
        assert_eq!(annotation_lines(&label, 0), vec!["Laptop 91.3%"]);
    }

    #[test]
    fn legend_lists_at_most_five_general_labels() {
        let analysis = Analysis::new(
            (0..8)
                .map(|i| Detection::label(format!("Scene{i}"), None, 90.0 - i as f32, 0))
                .collect(),
        );

        let lines = legend_lines(&analysis);

        assert_eq!(lines.len(), 1 + LEGEND_LABELS);
        assert_eq!(lines[0], "General labels:");
        assert_eq!(lines[1], "Scene0 (90.0%)");
        assert_eq!(lines[5], "Scene4 (86.0%)");
        assert!(legend_lines(&Analysis::default()).is_empty());
    }

    #[test]
    fn text_is_drawn_inside_the_canvas() -> Result<()> {
        let Some(font) = crate::font::load_font(None) else {
            // No font installed, only boxes can be drawn
            return Ok(());
        };
        let renderer = Renderer::new(Some(font));
        let image = gray_image(200, 200);
        let mut detections = vec![face(BoundingBox::new(0.1, 0.0, 0.3, 0.3))];
        detections.extend(
            (0..8).map(|i| Detection::label(format!("Scene{i}"), None, 90.0 - i as f32, 0)),
        );
        let analysis = Analysis::new(detections);

        let frame = renderer.render(&image, &analysis)?;

        // Caption of a box at the top edge is pushed down onto the canvas
        assert_eq!(*frame.get_pixel(20, 0), WHITE);

        // Legend background covers exactly the header and five labels above the bottom margin
        let legend_top = (200 - 10 - renderer.block_height(1 + LEGEND_LABELS)) as u32;
        assert_eq!(*frame.get_pixel(10, legend_top), BLACK);
        assert_eq!(*frame.get_pixel(10, 189), BLACK);
        assert_eq!(*frame.get_pixel(10, legend_top - 1), Rgb([40, 40, 40]));
        assert_eq!(*frame.get_pixel(10, 190), Rgb([40, 40, 40]));

        Ok(())
    }
}
