//! Open settings bag with typed views over the keys the engine knows about.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Settings key holding the club logo as a data URL.
pub const CLUB_LOGO_KEY: &str = "clubLogo";

const LABEL_COLUMNS: &str = "labelColumns";
const LABEL_ROWS: &str = "labelRows";
const LABEL_MARGIN_TOP: &str = "labelMarginTop";
const LABEL_MARGIN_LEFT: &str = "labelMarginLeft";
const LABEL_FONT_SIZE: &str = "labelFontSize";

/// String-keyed bag of tagged values. Unknown keys pass through verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(Map<String, Value>);

impl Settings {
    /// Empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Writes `key`, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Removes `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no key is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlays every key of `other`, leaving keys absent from `other` alone.
    pub fn merge(&mut self, other: Settings) {
        for (k, v) in other.0 {
            self.0.insert(k, v);
        }
    }

    /// Stored club logo, if any.
    pub fn club_logo(&self) -> Option<&str> {
        self.0
            .get(CLUB_LOGO_KEY)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Stores the club logo data URL.
    pub fn set_club_logo(&mut self, data_url: String) {
        self.0.insert(CLUB_LOGO_KEY.to_string(), Value::String(data_url));
    }

    /// Removes the logo. Returns true when one was stored.
    pub fn clear_club_logo(&mut self) -> bool {
        self.0.remove(CLUB_LOGO_KEY).is_some()
    }

    /// Label-print layout, with defaults for missing or mistyped keys.
    pub fn label_layout(&self) -> LabelLayout {
        let d = LabelLayout::default();
        LabelLayout {
            columns: self.u32_or(LABEL_COLUMNS, d.columns),
            rows: self.u32_or(LABEL_ROWS, d.rows),
            margin_top_mm: self.f64_or(LABEL_MARGIN_TOP, d.margin_top_mm),
            margin_left_mm: self.f64_or(LABEL_MARGIN_LEFT, d.margin_left_mm),
            font_size_pt: self.f64_or(LABEL_FONT_SIZE, d.font_size_pt),
        }
    }

    /// Writes every label layout key.
    pub fn set_label_layout(&mut self, layout: &LabelLayout) {
        self.set(LABEL_COLUMNS, Value::from(layout.columns));
        self.set(LABEL_ROWS, Value::from(layout.rows));
        self.set(LABEL_MARGIN_TOP, Value::from(layout.margin_top_mm));
        self.set(LABEL_MARGIN_LEFT, Value::from(layout.margin_left_mm));
        self.set(LABEL_FONT_SIZE, Value::from(layout.font_size_pt));
    }

    fn u32_or(&self, key: &str, default: u32) -> u32 {
        self.0
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(default)
    }

    fn f64_or(&self, key: &str, default: f64) -> f64 {
        self.0.get(key).and_then(Value::as_f64).unwrap_or(default)
    }
}

/// Sheet layout used when printing result labels.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelLayout {
    /// Labels per row.
    pub columns: u32,
    /// Labels per column.
    pub rows: u32,
    /// Top page margin in millimetres.
    pub margin_top_mm: f64,
    /// Left page margin in millimetres.
    pub margin_left_mm: f64,
    /// Label font size in points.
    pub font_size_pt: f64,
}

impl Default for LabelLayout {
    fn default() -> Self {
        Self {
            columns: 3,
            rows: 8,
            margin_top_mm: 15.0,
            margin_left_mm: 7.0,
            font_size_pt: 10.0,
        }
    }
}
