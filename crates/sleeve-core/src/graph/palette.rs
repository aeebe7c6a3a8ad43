//! Edge colors, one per reconcile cycle.
//!
//! Hues are spread evenly around the color wheel (`hue = i / n`) at a low
//! saturation and full value, giving pastel colors that stay readable
//! behind black edge labels. Colors are assigned over the *sorted* list of
//! reconcile ids so the same cycles always get the same colors, whatever
//! order they were logged in.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::GraphConfig;

/// Convert HSV (all components in `0.0..=1.0`) to RGB.
#[must_use]
#[allow(clippy::suboptimal_flops)]
pub fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> (f64, f64, f64) {
    if saturation <= 0.0 {
        return (value, value, value);
    }

    let scaled = hue.rem_euclid(1.0) * 6.0;
    let sector = scaled.floor();
    let f = scaled - sector;
    let p = value * (1.0 - saturation);
    let q = value * (1.0 - saturation * f);
    let t = value * (1.0 - saturation * (1.0 - f));

    // `sector` is in 0.0..6.0 because the hue was wrapped into 0.0..1.0.
    match sector_index(sector) {
        0 => (value, t, p),
        1 => (q, value, p),
        2 => (p, value, t),
        3 => (p, q, value),
        4 => (t, p, value),
        _ => (value, p, q),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn sector_index(sector: f64) -> u8 {
    sector.clamp(0.0, 5.0) as u8
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
/// Scale to `0..=255`, truncating.
fn channel(component: f64) -> u8 {
    (component.clamp(0.0, 1.0) * 255.0) as u8
}

/// `#rrggbb` for an RGB triple.
#[must_use]
pub fn to_hex((r, g, b): (f64, f64, f64)) -> String {
    format!("#{:02x}{:02x}{:02x}", channel(r), channel(g), channel(b))
}

/// `n` evenly spaced colors.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn pastel_palette(n: usize, config: &GraphConfig) -> Vec<String> {
    (0..n)
        .map(|i| {
            let hue = i as f64 / n as f64;
            to_hex(hsv_to_rgb(hue, config.saturation, config.value))
        })
        .collect()
}

/// Map each distinct id to a color. Ids are sorted and deduplicated first.
#[must_use]
pub fn assign_colors<'a, I>(ids: I, config: &GraphConfig) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = &'a str>,
{
    let ids: BTreeSet<&str> = ids.into_iter().collect();
    let palette = pastel_palette(ids.len(), config);
    ids.into_iter()
        .map(str::to_string)
        .zip(palette)
        .collect()
}
