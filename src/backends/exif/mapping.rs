// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Fixed translation from exiftool tag names to record fields.
//!
//! | Field                | Tag(s)                         | Shape                         |
//! |----------------------|--------------------------------|-------------------------------|
//! | `create`, `modify`   | CreateDate, ModifyDate         | `YYYY-MM-DDThh:mm:ss`         |
//! | `contentType`        | MIMEType                       | string                        |
//! | `width`, `height`    | ImageWidth, ImageHeight        | number                        |
//! | `orientation`        | Orientation                    | number                        |
//! | `gpsLatitude/Longitude` | GPSLatitude, GPSLongitude   | number                        |
//! | `gpsTimestamp`       | GPSDateStamp + GPSTimeStamp    | unix seconds (UTC)            |
//! | `cameraModel`        | Make + Model                   | `Make Model`                  |
//! | `cameraAperture`     | FNumber                        | `f/2.8`                       |
//! | `cameraExposureTime` | ExposureTime                   | `1/250s`                      |
//! | `cameraFocalLength`  | FocalLength                    | `50mm`                        |
//! | `cameraISO`          | ISO                            | `ISO200`                      |
//! | `cameraDatetime`     | DateTimeOriginal               | `YYYY-MM-DDThh:mm:ss`         |
//! | `cameraLensModel`    | LensModel                      | string                        |
//! | `cameraFlashMode`    | Flash                          | number                        |
//! | `cameraFlashFired`   | Flash                          | bit 0 as bool                 |
//! | `warning`            | Warning                        | as reported                   |
//!
//! Fields whose tag is absent or unusable are omitted.

use chrono::NaiveDateTime;
use serde_json::{Map, Number, Value};

use crate::types::Metadata;
use crate::utils::prune_empty;

/// Largest denominator used when rendering exposure times as fractions.
const MAX_EXPOSURE_DENOMINATOR: i64 = 9999;

pub fn map_exif(raw: &Value) -> Metadata {
    let tags = Tags(raw.as_object());
    let flash = tags.number("Flash");

    let entries: [(&str, Option<Value>); 19] = [
        ("create", tags.datetime("CreateDate")),
        ("modify", tags.datetime("ModifyDate")),
        ("contentType", tags.truthy("MIMEType")),
        ("width", tags.number("ImageWidth")),
        ("height", tags.number("ImageHeight")),
        ("orientation", tags.number("Orientation")),
        ("gpsLatitude", tags.number("GPSLatitude")),
        ("gpsLongitude", tags.number("GPSLongitude")),
        ("gpsTimestamp", tags.gps_timestamp()),
        ("cameraModel", tags.camera_model()),
        ("cameraAperture", tags.aperture()),
        ("cameraExposureTime", tags.exposure_time()),
        ("cameraFocalLength", tags.suffixed("FocalLength", "", "mm")),
        ("cameraISO", tags.suffixed("ISO", "ISO", "")),
        ("cameraDatetime", tags.datetime("DateTimeOriginal")),
        ("cameraLensModel", tags.truthy("LensModel")),
        ("cameraFlashFired", flash.as_ref().and_then(flash_fired)),
        ("cameraFlashMode", flash),
        ("warning", tags.truthy("Warning")),
    ];

    let map: Map<String, Value> = entries
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field.to_string(), v)))
        .collect();

    match prune_empty(Value::Object(map)) {
        Some(Value::Object(map)) => Metadata::from(map),
        _ => Metadata::new(),
    }
}

struct Tags<'a>(Option<&'a Map<String, Value>>);

impl<'a> Tags<'a> {
    fn get(&self, tag: &str) -> Option<&'a Value> {
        self.0.and_then(|m| m.get(tag))
    }

    fn truthy(&self, tag: &str) -> Option<Value> {
        self.get(tag).filter(|v| is_truthy(v)).cloned()
    }

    fn number(&self, tag: &str) -> Option<Value> {
        self.get(tag).and_then(as_number)
    }

    fn datetime(&self, tag: &str) -> Option<Value> {
        self.get(tag)
            .and_then(Value::as_str)
            .and_then(normalize_datetime)
            .map(Value::String)
    }

    fn gps_timestamp(&self) -> Option<Value> {
        let date = self.get("GPSDateStamp")?.as_str()?;
        let time = self.get("GPSTimeStamp")?.as_str()?;
        if !matches_shape(date, "dddd:dd:dd") || !matches_shape(time, "dd:dd:dd") {
            return None;
        }
        let stamp = NaiveDateTime::parse_from_str(&format!("{} {}", date, time), "%Y:%m:%d %H:%M:%S").ok()?;
        Some(Value::from(stamp.and_utc().timestamp()))
    }

    fn camera_model(&self) -> Option<Value> {
        let make = self.get("Make").filter(|v| is_truthy(v)).map(display_scalar);
        let model = self.get("Model").filter(|v| is_truthy(v)).map(display_scalar);
        let combined = match (make, model) {
            (None, None) => return None,
            (None, Some(model)) => model,
            (Some(make), None) => make,
            (Some(make), Some(model)) if model.starts_with(&make) => model,
            (Some(make), Some(model)) => format!("{} {}", make, model),
        };
        Some(Value::String(combined))
    }

    fn aperture(&self) -> Option<Value> {
        let value = self.number("FNumber").and_then(|v| v.as_f64()).filter(|v| *v != 0.0)?;
        Some(Value::String(format!("f/{}", trim_decimals(value, 2))))
    }

    fn exposure_time(&self) -> Option<Value> {
        let value = self.number("ExposureTime").and_then(|v| v.as_f64()).filter(|v| *v != 0.0)?;
        let (n, d) = best_fraction(value, MAX_EXPOSURE_DENOMINATOR);
        Some(Value::String(format!("{}/{}s", n, d)))
    }

    fn suffixed(&self, tag: &str, prefix: &str, suffix: &str) -> Option<Value> {
        let value = self.get(tag).filter(|v| is_truthy(v))?;
        Some(Value::String(format!("{}{}{}", prefix, display_scalar(value), suffix)))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn display_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Numbers pass through; numeric strings are converted; anything else is dropped.
fn as_number(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(s) => {
            let parsed: f64 = s.trim().parse().ok()?;
            number_value(parsed)
        }
        _ => None,
    }
}

fn number_value(value: f64) -> Option<Value> {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(Value::from(value as i64))
    } else {
        Number::from_f64(value).map(Value::Number)
    }
}

fn flash_fired(flash: &Value) -> Option<Value> {
    let mode = flash.as_i64().or_else(|| flash.as_f64().map(|f| f as i64))?;
    Some(Value::Bool(mode & 1 == 1))
}

/// `YYYY:MM:DD hh:mm:ss` to `YYYY-MM-DDThh:mm:ss`; other shapes are rejected.
fn normalize_datetime(value: &str) -> Option<String> {
    if !matches_shape(value, "dddd:dd:dd dd:dd:dd") {
        return None;
    }
    let (date, time) = value.split_at(10);
    Some(format!("{}T{}", date.replace(':', "-"), &time[1..]))
}

/// `d` matches an ASCII digit, a space matches any whitespace, anything else matches itself.
fn matches_shape(value: &str, shape: &str) -> bool {
    value.len() == shape.len()
        && value.chars().zip(shape.chars()).all(|(c, s)| match s {
            'd' => c.is_ascii_digit(),
            ' ' => c.is_whitespace(),
            other => c == other,
        })
}

fn trim_decimals(value: f64, places: usize) -> String {
    let fixed = format!("{:.*}", places, value);
    if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        fixed
    }
}

/// Closest fraction to `value` with a denominator no larger than `max_denominator`.
fn best_fraction(value: f64, max_denominator: i64) -> (i64, i64) {
    let sign = if value < 0.0 { -1 } else { 1 };
    let target = value.abs();

    let (mut p0, mut q0, mut p1, mut q1) = (0i64, 1i64, 1i64, 0i64);
    let mut rest = target;
    for _ in 0..64 {
        let whole = rest.floor();
        let a = whole as i64;
        let q2 = q0 + a * q1;
        if q2 > max_denominator {
            break;
        }
        (p0, q0, p1, q1) = (p1, q1, p0 + a * p1, q2);
        let fraction = rest - whole;
        if fraction < 1e-12 {
            break;
        }
        rest = 1.0 / fraction;
    }

    if q1 == 0 {
        return (sign * target.round() as i64, 1);
    }

    let k = (max_denominator - q0) / q1;
    let (bp, bq) = (p0 + k * p1, q0 + k * q1);
    let convergent_error = (p1 as f64 / q1 as f64 - target).abs();
    let bound_error = (bp as f64 / bq as f64 - target).abs();
    if bq > 0 && bound_error < convergent_error {
        (sign * bp, bq)
    } else {
        (sign * p1, q1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn camera_document_is_mapped() {
        let raw = json!({
            "SourceFile": "/tmp/x",
            "MIMEType": "image/jpeg",
            "ImageWidth": 4000,
            "ImageHeight": "3000",
            "Orientation": 1,
            "CreateDate": "2023:07:14 09:30:05",
            "DateTimeOriginal": "2023:07:14 09:30:05",
            "Make": "Canon",
            "Model": "Canon EOS R6",
            "FNumber": 2.8,
            "ExposureTime": 0.004,
            "FocalLength": 50,
            "ISO": 400,
            "LensModel": "RF50mm F1.8 STM",
            "Flash": 16,
            "GPSLatitude": 59.3293,
            "GPSLongitude": 18.0686,
            "GPSDateStamp": "2023:07:14",
            "GPSTimeStamp": "07:30:05",
        });

        let mapped = map_exif(&raw);
        assert_eq!(mapped.get("contentType"), Some(&json!("image/jpeg")));
        assert_eq!(mapped.get("width"), Some(&json!(4000)));
        assert_eq!(mapped.get("height"), Some(&json!(3000)));
        assert_eq!(mapped.get("create"), Some(&json!("2023-07-14T09:30:05")));
        assert_eq!(mapped.get("cameraModel"), Some(&json!("Canon EOS R6")));
        assert_eq!(mapped.get("cameraAperture"), Some(&json!("f/2.8")));
        assert_eq!(mapped.get("cameraExposureTime"), Some(&json!("1/250s")));
        assert_eq!(mapped.get("cameraFocalLength"), Some(&json!("50mm")));
        assert_eq!(mapped.get("cameraISO"), Some(&json!("ISO400")));
        assert_eq!(mapped.get("cameraFlashMode"), Some(&json!(16)));
        assert_eq!(mapped.get("cameraFlashFired"), Some(&json!(false)));
        assert_eq!(mapped.get("gpsTimestamp"), Some(&json!(1689319805)));
        assert!(!mapped.contains("SourceFile"));
        assert!(!mapped.contains("warning"));
        assert!(!mapped.contains("modify"));
    }

    #[test]
    fn make_is_prefixed_when_model_lacks_it() {
        let mapped = map_exif(&json!({"Make": "NIKON", "Model": "Z 6"}));
        assert_eq!(mapped.get("cameraModel"), Some(&json!("NIKON Z 6")));

        let mapped = map_exif(&json!({"Model": "iPhone 14"}));
        assert_eq!(mapped.get("cameraModel"), Some(&json!("iPhone 14")));
    }

    #[test]
    fn unusable_values_are_omitted() {
        let mapped = map_exif(&json!({
            "CreateDate": "0000:00:00",
            "ImageWidth": "wide",
            "FNumber": 0,
            "GPSDateStamp": "2023:07:14",
            "GPSTimeStamp": "7:30",
            "MIMEType": "",
            "Warning": "",
        }));
        assert!(mapped.is_empty());
    }

    #[test]
    fn flash_fired_reads_bit_zero() {
        let mapped = map_exif(&json!({"Flash": 25}));
        assert_eq!(mapped.get("cameraFlashFired"), Some(&json!(true)));
        assert_eq!(mapped.get("cameraFlashMode"), Some(&json!(25)));
    }

    #[test]
    fn non_object_document_maps_to_nothing() {
        assert!(map_exif(&json!([1, 2])).is_empty());
    }

    #[test]
    fn fractions_use_bounded_denominators() {
        assert_eq!(best_fraction(0.5, 9999), (1, 2));
        assert_eq!(best_fraction(2.0, 9999), (2, 1));
        assert_eq!(best_fraction(1.0 / 3.0, 9999), (1, 3));
        assert_eq!(best_fraction(0.0125, 9999), (1, 80));
    }

    #[test]
    fn aperture_keeps_two_decimals_at_most() {
        assert_eq!(trim_decimals(1.4, 2), "1.4");
        assert_eq!(trim_decimals(4.0, 2), "4");
        assert_eq!(trim_decimals(3.456, 2), "3.46");
    }
}
