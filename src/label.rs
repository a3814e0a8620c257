//! YOLO detection label text codec.
//!
//! YOLO uses one `.txt` file per image plus a `classes.txt` file for class
//! names. Each label line is:
//!
//! ```text
//! <class_id> <x_center> <y_center> <width> <height>
//! ```
//!
//! with all coordinates normalized to [0, 1] relative to image size. This
//! module only converts between [`PixelLabel`]s and that text shape; reading
//! and writing files is the host's job.

use crate::editor::PixelLabel;
use crate::error::LabelError;

/// Encode labels as YOLO detection lines for an image of the given pixel
/// size.
pub fn encode_labels(labels: &[PixelLabel], image_w: u32, image_h: u32) -> String {
    let (iw, ih) = (image_w as f32, image_h as f32);
    labels
        .iter()
        .map(|l| {
            let x_center = (l.x + l.width / 2.0) / iw;
            let y_center = (l.y + l.height / 2.0) / ih;
            let w = l.width / iw;
            let h = l.height / ih;
            format!(
                "{} {:.6} {:.6} {:.6} {:.6}",
                l.class_id, x_center, y_center, w, h
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decode YOLO detection lines back into pixel labels.
///
/// Class names are looked up in `classes` by line index; ids beyond the list
/// get a generated `class_{id}` name, matching how unlabeled datasets are
/// usually imported.
pub fn decode_labels(
    text: &str,
    classes: &[String],
    image_w: u32,
    image_h: u32,
) -> Result<Vec<PixelLabel>, LabelError> {
    let (iw, ih) = (image_w as f32, image_h as f32);
    let mut labels = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(LabelError::WrongFieldCount {
                line,
                count: parts.len(),
            });
        }

        let class_id: u32 = parts[0].parse().map_err(|_| LabelError::InvalidClassId {
            line,
            token: parts[0].to_string(),
        })?;

        let mut coords = [0.0f32; 4];
        for (slot, token) in coords.iter_mut().zip(&parts[1..]) {
            *slot = token.parse().map_err(|_| LabelError::InvalidCoordinates {
                line,
                message: format!("'{token}' is not a number"),
            })?;
        }
        let [x_center, y_center, w, h] = coords;
        for v in coords {
            if !(0.0..=1.0).contains(&v) {
                return Err(LabelError::InvalidCoordinates {
                    line,
                    message: format!("{v} outside [0, 1]"),
                });
            }
        }

        let class_name = classes
            .get(class_id as usize)
            .cloned()
            .unwrap_or_else(|| format!("class_{class_id}"));

        labels.push(PixelLabel {
            x: (x_center - w / 2.0) * iw,
            y: (y_center - h / 2.0) * ih,
            width: w * iw,
            height: h * ih,
            class_id,
            class_name,
        });
    }

    Ok(labels)
}

/// Encode a class list in `classes.txt` shape: one name per line, line index
/// = class id.
pub fn encode_classes(classes: &[String]) -> String {
    classes.join("\n")
}

/// Decode a `classes.txt`-shaped class list.
pub fn decode_classes(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}
