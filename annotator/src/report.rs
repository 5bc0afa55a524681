//! Human readable reports: the console summary and the HTML report.
//!
use base64::{engine::general_purpose::STANDARD, Engine};
use common::{Analysis, Detection, DetectionKind, Summary};

/// Image reference embedded in the HTML report.
pub enum ReportImage<'a> {
    /// PNG bytes, embedded as a data URI.
    Inline(&'a [u8]),
    /// Path relative to the report.
    Linked(&'a str),
}

/// Escape text for use in HTML element content and attribute values.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Describe the attributes of a detection in one line, e.g. `Age 20-30, Female, HAPPY`.
fn attribute_text(detection: &Detection) -> String {
    match &detection.kind {
        DetectionKind::Face(face) => {
            let mut parts = vec![];
            if let Some(age) = face.age_range {
                parts.push(format!("Age {}-{}", age.low, age.high));
            }
            if let Some(gender) = &face.gender {
                parts.push(gender.value.clone());
            }
            if let Some(emotion) = &face.dominant_emotion {
                parts.push(emotion.value.clone());
            }
            parts.join(", ")
        }
        DetectionKind::Label(label) => match label.instance_count {
            0 => label.name.clone(),
            n => format!("{} ({} instances)", label.name, n),
        },
    }
}

/// Compose a standalone HTML page with the annotated image, a results table and summary
/// statistics.
pub fn html_report(name: &str, analysis: &Analysis, image: ReportImage) -> String {
    let summary = Summary::from_analysis(analysis);
    let title = escape_html(name);
    let src = match image {
        ReportImage::Inline(png) => format!("data:image/png;base64,{}", STANDARD.encode(png)),
        ReportImage::Linked(path) => escape_html(path),
    };

    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Detection results: {title}</title>\n\
         <style>\n\
         body {{ font-family: sans-serif; margin: 2em; }}\n\
         table {{ border-collapse: collapse; margin-bottom: 1.5em; }}\n\
         th, td {{ border: 1px solid #999; padding: 4px 8px; text-align: left; }}\n\
         img {{ max-width: 100%; }}\n\
         </style>\n</head>\n<body>\n\
         <h1>Detection results: {title}</h1>\n\
         <img src=\"{src}\" alt=\"Annotated {title}\">\n"
    );

    html.push_str("<h2>Detections</h2>\n");
    if analysis.is_empty() {
        html.push_str("<p>Nothing detected.</p>\n");
    } else {
        html.push_str(
            "<table>\n<tr><th>#</th><th>Type</th><th>Attributes</th><th>Confidence</th>\
             <th>Left</th><th>Top</th><th>Width</th><th>Height</th></tr>\n",
        );
        for (i, detection) in analysis.detections.iter().enumerate() {
            let kind = if detection.is_face() { "Face" } else { "Label" };
            let bbox_cells = match &detection.bbox {
                Some(bbox) => format!(
                    "<td>{:.3}</td><td>{:.3}</td><td>{:.3}</td><td>{:.3}</td>",
                    bbox.left, bbox.top, bbox.width, bbox.height
                ),
                None => "<td colspan=\"4\">whole image</td>".to_owned(),
            };
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.1}%</td>{}</tr>\n",
                i + 1,
                kind,
                escape_html(&attribute_text(detection)),
                detection.confidence,
                bbox_cells
            ));
        }
        html.push_str("</table>\n");
    }

    let counts = &summary.counts;
    html.push_str("<h2>Summary</h2>\n<table>\n");
    html.push_str(&format!("<tr><th>Faces</th><td>{}</td></tr>\n", counts.faces));
    html.push_str(&format!("<tr><th>Total labels</th><td>{}</td></tr>\n", counts.labels));
    html.push_str(&format!(
        "<tr><th>Labels with boxes</th><td>{}</td></tr>\n",
        counts.labels_with_boxes
    ));
    if let Some(age) = summary.mean_age() {
        html.push_str(&format!("<tr><th>Mean age</th><td>{age:.1}</td></tr>\n"));
    }
    html.push_str("</table>\n");

    html.push_str(&confidence_table("Emotions (max confidence)", &summary.emotions));
    html.push_str(&confidence_table("Top labels", &summary.top_labels));

    html.push_str("</body>\n</html>\n");
    html
}

/// Two column table of names and confidences. Empty when there are no rows.
fn confidence_table(heading: &str, rows: &[(String, f32)]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut table = format!("<h3>{heading}</h3>\n<table>\n");
    for (name, confidence) in rows {
        table.push_str(&format!(
            "<tr><td>{}</td><td>{confidence:.1}%</td></tr>\n",
            escape_html(name)
        ));
    }
    table.push_str("</table>\n");
    table
}

/// Text summary of an analysis for the terminal.
pub fn console_summary(name: &str, analysis: &Analysis) -> String {
    let rule = "=".repeat(50);
    let mut lines = vec![rule.clone(), format!("Analysis results for: {name}"), rule];

    let faces: Vec<_> = analysis.faces().collect();
    if faces.is_empty() {
        lines.push("\nNo faces detected".to_owned());
    } else {
        lines.push(format!("\nFACES DETECTED: {}", faces.len()));
        lines.push("-".repeat(30));
        for (i, face) in faces.iter().enumerate() {
            lines.push(format!("Face {}: {:.1}% confidence", i + 1, face.confidence));
            let Some(attributes) = face.as_face() else {
                continue;
            };
            if let Some(age) = attributes.age_range {
                lines.push(format!("  Age: {}-{}", age.low, age.high));
            }
            if let Some(gender) = &attributes.gender {
                lines.push(format!("  Gender: {} ({:.1}%)", gender.value, gender.confidence));
            }
            if let Some(emotion) = &attributes.dominant_emotion {
                lines.push(format!(
                    "  Primary emotion: {} ({:.1}%)",
                    emotion.value, emotion.confidence
                ));
            }
            if let Some(smile) = &attributes.smile {
                lines.push(format!("  Smiling: {} ({:.1}%)", smile.value, smile.confidence));
            }
            if let Some(eyeglasses) = &attributes.eyeglasses {
                lines.push(format!(
                    "  Eyeglasses: {} ({:.1}%)",
                    eyeglasses.value, eyeglasses.confidence
                ));
            }
        }
    }

    let names = analysis.label_names();
    if names.is_empty() {
        lines.push("\nNo objects/labels detected".to_owned());
    } else {
        lines.push(format!("\nOBJECTS/LABELS DETECTED: {}", names.len()));
        lines.push("-".repeat(30));
        for name in names {
            let detections: Vec<_> = analysis
                .labels()
                .filter(|d| d.primary_attribute() == name)
                .collect();
            let confidence = detections
                .iter()
                .map(|d| d.label_confidence())
                .fold(0.0, f32::max);
            lines.push(format!("{name}: {confidence:.1}%"));

            let located: Vec<_> = detections.iter().filter(|d| d.bbox.is_some()).collect();
            if !located.is_empty() {
                lines.push(format!("   Instances found: {}", located.len()));
                for instance in located.iter().take(3) {
                    lines.push(format!("     - Confidence: {:.1}%", instance.confidence));
                }
            }
        }
    }

    lines.join("\n") + "\n"
}

#[cfg(test)]
mod test {
    use super::*;
    use common::{AgeRange, BoundingBox, FaceAttributes, Prediction};

    fn analysis() -> Analysis {
        Analysis::new(vec![
            Detection::face(
                BoundingBox::new(0.1, 0.1, 0.2, 0.2),
                98.5,
                FaceAttributes {
                    age_range: Some(AgeRange { low: 20, high: 30 }),
                    gender: Some(Prediction::new("Female".into(), 99.2)),
                    dominant_emotion: Some(Prediction::new("HAPPY".into(), 91.0)),
                    emotions: vec![Prediction::new("HAPPY".into(), 91.0)],
                    smile: Some(Prediction::new(true, 88.0)),
                    eyeglasses: None,
                },
            ),
            Detection::label("Person", Some(BoundingBox::new(0.0, 0.0, 0.5, 1.0)), 99.4, 1),
            Detection::label("<Office>", None, 75.25, 0),
        ])
    }

    #[test]
    fn html_report_lists_detections() {
        let html = html_report("Team & friends", &analysis(), ReportImage::Linked("team.png"));

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Detection results: Team &amp; friends</title>"));
        assert!(html.contains("<img src=\"team.png\""));
        assert!(html.contains("<td>Age 20-30, Female, HAPPY</td><td>98.5%</td>"));
        assert!(html.contains("<td>0.100</td><td>0.100</td><td>0.200</td><td>0.200</td>"));
        assert!(html.contains("Person (1 instances)"));
        assert!(html.contains("&lt;Office&gt;"));
        assert!(html.contains("<td colspan=\"4\">whole image</td>"));
        assert!(html.contains("<tr><th>Faces</th><td>1</td></tr>"));
        assert!(html.contains("<tr><th>Mean age</th><td>25.0</td></tr>"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn html_report_inlines_image() {
        let html = html_report("x", &Analysis::default(), ReportImage::Inline(b"abc"));

        assert!(html.contains("src=\"data:image/png;base64,YWJj\""));
        assert!(html.contains("Nothing detected."));
    }

    #[test]
    fn console_summary_mentions_everything() {
        let text = console_summary("sample", &analysis());

        assert!(text.contains("Analysis results for: sample"));
        assert!(text.contains("FACES DETECTED: 1"));
        assert!(text.contains("Face 1: 98.5% confidence"));
        assert!(text.contains("  Gender: Female (99.2%)"));
        assert!(text.contains("  Smiling: true (88.0%)"));
        assert!(text.contains("OBJECTS/LABELS DETECTED: 2"));
        assert!(text.contains("Person: 99.4%"));
        assert!(text.contains("   Instances found: 1"));
        assert!(text.contains("<Office>: 75.2%") || text.contains("<Office>: 75.3%"));
    }

    #[test]
    fn console_summary_uses_the_label_confidence() {
        let bbox = Some(BoundingBox::new(0.1, 0.1, 0.2, 0.2));
        let analysis = Analysis::new(vec![
            Detection::instance("Person", bbox, 80.0, 99.0, 2),
            Detection::instance("Person", bbox, 75.0, 99.0, 2),
        ]);

        let text = console_summary("crowd", &analysis);

        assert!(text.contains("Person: 99.0%"));
        assert!(text.contains("   Instances found: 2"));
        assert!(text.contains("     - Confidence: 80.0%"));
        assert!(text.contains("     - Confidence: 75.0%"));
    }

    #[test]
    fn console_summary_without_detections() {
        let text = console_summary("empty", &Analysis::default());

        assert!(text.contains("No faces detected"));
        assert!(text.contains("No objects/labels detected"));
    }
}
