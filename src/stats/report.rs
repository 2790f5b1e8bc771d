//! Statistics report types and terminal formatting.
//!
//! A [`Statistics`] report can be rendered as text (Display) or serialized
//! as JSON.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::format::ShapeType;

/// Shape and track counts for one geometry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ShapeTrackCount {
    pub shape: usize,
    pub track: usize,
}

/// Counts for one label.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LabelStatistics {
    /// Shape and track counts per geometry, keyed by the geometry name.
    pub geometries: BTreeMap<ShapeType, ShapeTrackCount>,
    pub tag: usize,
    /// Drawn instances: shapes plus visible track keyframes.
    pub manually: usize,
    /// Frames filled in between keyframes.
    pub interpolated: usize,
    pub total: usize,
}

impl LabelStatistics {
    pub(crate) fn count(&mut self, shape_type: ShapeType) -> &mut ShapeTrackCount {
        self.geometries.entry(shape_type).or_default()
    }

    /// Shapes and tracks of all geometries together.
    pub fn objects(&self) -> ShapeTrackCount {
        self.geometries
            .values()
            .fold(ShapeTrackCount::default(), |acc, c| ShapeTrackCount {
                shape: acc.shape + c.shape,
                track: acc.track + c.track,
            })
    }

    pub(crate) fn absorb(&mut self, other: &LabelStatistics) {
        for (shape_type, count) in &other.geometries {
            let entry = self.count(*shape_type);
            entry.shape += count.shape;
            entry.track += count.track;
        }
        self.tag += other.tag;
        self.manually += other.manually;
        self.interpolated += other.interpolated;
        self.total += other.total;
    }
}

/// Per-label annotation statistics of a collection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    /// Every label of the task; skeleton sublabels are keyed
    /// `parent::sublabel`.
    pub labels: BTreeMap<String, LabelStatistics>,
    /// Sum over top-level labels.
    pub total: LabelStatistics,
    /// Display-only option for histogram rendering width.
    #[serde(skip)]
    pub(crate) bar_width: usize,
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(
            f,
            "╭─────────────────────────────────────────────────────────────╮"
        )?;
        writeln!(
            f,
            "│               📊  Annotation Statistics                    │"
        )?;
        writeln!(
            f,
            "╰─────────────────────────────────────────────────────────────╯"
        )?;
        writeln!(f)?;

        self.fmt_summary(f)?;
        writeln!(f)?;
        self.fmt_labels(f)?;
        writeln!(f)?;
        self.fmt_geometries(f)?;

        Ok(())
    }
}

impl Statistics {
    fn fmt_summary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.total;
        let objects = t.objects();

        writeln!(
            f,
            "┌─ Summary ─────────────────────────────────────────────────┐"
        )?;
        writeln!(
            f,
            "│                                                           │"
        )?;
        for (name, value) in [
            ("Labels:", self.labels.len()),
            ("Shapes:", objects.shape),
            ("Tracks:", objects.track),
            ("Tags:", t.tag),
            ("Manual:", t.manually),
            ("Interpolated:", t.interpolated),
        ] {
            writeln!(
                f,
                "│   {:<14} {:>8}                                  │",
                name,
                format_number(value)
            )?;
        }
        writeln!(
            f,
            "│                                                           │"
        )?;
        let manual = fmt_percent(t.manually, t.total);
        writeln!(
            f,
            "│   Drawn by hand: {:>8} of {}{}│",
            manual,
            format_number(t.total),
            " ".repeat(
                59usize
                    .saturating_sub(24)
                    .saturating_sub(manual.len().max(8))
                    .saturating_sub(format_number(t.total).len())
            )
        )?;
        writeln!(
            f,
            "│                                                           │"
        )?;
        writeln!(
            f,
            "└───────────────────────────────────────────────────────────┘"
        )?;

        Ok(())
    }

    fn fmt_labels(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = format!("Labels ({})", self.labels.len());
        writeln!(
            f,
            "┌─ {} {}┐",
            header,
            "─".repeat(57usize.saturating_sub(header.len()))
        )?;
        writeln!(
            f,
            "│                                                           │"
        )?;

        if self.labels.is_empty() {
            writeln!(
                f,
                "│   No labels defined.                                      │"
            )?;
        } else {
            let max_total = self.labels.values().map(|s| s.total).max().unwrap_or(1);
            for (name, stats) in &self.labels {
                let bar = render_bar(stats.total, max_total, self.bar_width);
                writeln!(
                    f,
                    "│   {:<16} {:>7} {:>6}  {}│",
                    truncate_label(name, 16),
                    format_number(stats.total),
                    fmt_percent(stats.manually, stats.total),
                    pad_bar(&bar, self.bar_width)
                )?;
            }
        }

        writeln!(
            f,
            "│                                                           │"
        )?;
        writeln!(
            f,
            "└───────────────────────────────────────────────────────────┘"
        )?;

        Ok(())
    }

    fn fmt_geometries(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "┌─ Geometry ────────────────────────────────────────────────┐"
        )?;
        writeln!(
            f,
            "│                                                           │"
        )?;
        writeln!(
            f,
            "│   {:<16} {:>10} {:>10}                     │",
            "Type", "Shapes", "Tracks"
        )?;

        let used: Vec<_> = self
            .total
            .geometries
            .iter()
            .filter(|(_, c)| c.shape + c.track > 0)
            .collect();
        if used.is_empty() {
            writeln!(
                f,
                "│   No shapes or tracks found.                              │"
            )?;
        }
        for (shape_type, count) in used {
            writeln!(
                f,
                "│   {:<16} {:>10} {:>10}                     │",
                shape_type.as_str(),
                format_number(count.shape),
                format_number(count.track)
            )?;
        }

        writeln!(
            f,
            "│                                                           │"
        )?;
        writeln!(
            f,
            "└───────────────────────────────────────────────────────────┘"
        )?;
        Ok(())
    }
}

/// Format a number with thousands separators.
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Format a percentage, handling zero denominators.
fn fmt_percent(numerator: usize, denominator: usize) -> String {
    if denominator == 0 {
        "n/a".to_string()
    } else {
        format!("{:.1}%", (numerator as f64 / denominator as f64) * 100.0)
    }
}

/// Render a horizontal bar using Unicode block characters.
fn render_bar(count: usize, max_count: usize, width: usize) -> String {
    if max_count == 0 || width == 0 {
        return String::new();
    }

    let filled = (count * width) / max_count;
    let filled = filled.min(width);
    "█".repeat(filled) + &"░".repeat(width - filled)
}

/// Pad a bar string to ensure consistent column alignment.
fn pad_bar(bar: &str, width: usize) -> String {
    let visual_len = bar.chars().count();
    let padding = (width + 2).saturating_sub(visual_len);
    format!("{}{}", bar, " ".repeat(padding))
}

/// Truncate a label to fit in the display column.
fn truncate_label(label: &str, max_len: usize) -> String {
    if label.chars().count() <= max_len {
        label.to_string()
    } else {
        let head: String = label.chars().take(max_len - 1).collect();
        format!("{}…", head)
    }
}
