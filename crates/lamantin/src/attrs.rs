//! Attribute vocabulary.
//!
//! Every attribute crosses the API as a string, the way a DOT attribute would. Known attributes
//! are parsed into typed fields when they are set; everything is also kept verbatim so callers
//! can read it back.

use crate::error::{Error, Result};
use crate::geom::Size;

/// Points per inch. Node `width` / `height` and graph `nodesep` / `ranksep` are in inches.
pub const POINTS_PER_INCH: f64 = 72.0;

pub const DEFAULT_NODE_WIDTH_IN: f64 = 0.75;
pub const DEFAULT_NODE_HEIGHT_IN: f64 = 0.5;
pub const DEFAULT_NODESEP_IN: f64 = 0.25;
pub const DEFAULT_RANKSEP_IN: f64 = 0.5;

/// Padding between a cluster border and its content, in points.
pub const CLUSTER_MARGIN: f64 = 8.0;

const LABEL_DIM_PREFIX: &str = "\u{1}dim:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankDir {
    #[default]
    TB,
    BT,
    LR,
    RL,
}

impl RankDir {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TB" | "TD" => Some(Self::TB),
            "BT" => Some(Self::BT),
            "LR" => Some(Self::LR),
            "RL" => Some(Self::RL),
            _ => None,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::LR | Self::RL)
    }
}

/// Encodes a pre-measured label size as an engine-native `label` value.
///
/// The engine never sees label text from bridges that measure their own labels: it only needs
/// the box to reserve. Sizes are whole points.
pub fn encode_label_dim(width: i32, height: i32) -> String {
    format!("{LABEL_DIM_PREFIX}{}x{}", width.max(0), height.max(0))
}

/// Decodes a value produced by [`encode_label_dim`].
pub fn decode_label_dim(value: &str) -> Option<Size> {
    let rest = value.strip_prefix(LABEL_DIM_PREFIX)?;
    let (w, h) = rest.split_once('x')?;
    let w: i32 = w.parse().ok()?;
    let h: i32 = h.parse().ok()?;
    Some(Size::new(w.max(0) as f64, h.max(0) as f64))
}

/// Label size for a plain-text label: a rough fixed-pitch estimate.
pub(crate) fn estimate_text_label(value: &str) -> Size {
    if value.is_empty() {
        return Size::default();
    }
    let lines: Vec<&str> = value.split('\n').collect();
    let max_chars = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    Size::new(max_chars as f64 * 7.0 + 4.0, lines.len() as f64 * 14.0 + 4.0)
}

pub(crate) fn label_size(value: &str) -> Size {
    decode_label_dim(value).unwrap_or_else(|| estimate_text_label(value))
}

pub(crate) fn parse_inches(name: &str, value: &str) -> Result<f64> {
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(invalid(name, value)),
    }
}

pub(crate) fn parse_minlen(name: &str, value: &str) -> Result<u32> {
    let v: i64 = value.trim().parse().map_err(|_| invalid(name, value))?;
    u32::try_from(v).map_err(|_| invalid(name, value))
}

pub(crate) fn parse_rankdir(name: &str, value: &str) -> Result<RankDir> {
    RankDir::parse(value).ok_or_else(|| invalid(name, value))
}

fn invalid(name: &str, value: &str) -> Error {
    Error::InvalidAttribute {
        name: name.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_dim_codec_keeps_whole_points() {
        let encoded = encode_label_dim(42, 17);
        assert_eq!(decode_label_dim(&encoded), Some(Size::new(42.0, 17.0)));
        assert_eq!(decode_label_dim("42x17"), None);
    }

    #[test]
    fn plain_labels_fall_back_to_an_estimate() {
        let size = label_size("abc");
        assert_eq!(size, Size::new(25.0, 18.0));
        assert!(label_size("").is_empty());
    }

    #[test]
    fn minlen_rejects_negative_values() {
        assert_eq!(parse_minlen("minlen", "0").ok(), Some(0));
        assert!(parse_minlen("minlen", "-1").is_err());
        assert!(parse_minlen("minlen", "one").is_err());
    }

    #[test]
    fn rankdir_accepts_td_alias() {
        assert_eq!(RankDir::parse("td"), Some(RankDir::TB));
        assert_eq!(RankDir::parse("LR"), Some(RankDir::LR));
        assert_eq!(RankDir::parse("diagonal"), None);
    }
}
