//! Run-length encoding of binary masks.
//!
//! A mask is stored as alternating run lengths of background and foreground
//! pixels, always starting with a background run (possibly of length zero),
//! followed by its inclusive pixel box `[left, top, right, bottom]`. Runs
//! cover the box row by row.

/// Smallest mask area, in pixels, that survives cropping.
pub const MIN_MASK_AREA: f64 = 1.0;

/// The points of a void mask.
pub const EMPTY_MASK: [f64; 4] = [0.0, 0.0, 0.0, 0.0];

/// Inclusive pixel box of a mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaskBorders {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl MaskBorders {
    pub fn width(&self) -> i64 {
        self.right.saturating_sub(self.left).saturating_add(1)
    }

    pub fn height(&self) -> i64 {
        self.bottom.saturating_sub(self.top).saturating_add(1)
    }

    /// Reads the box from the last four values of mask points.
    pub fn from_points(points: &[f64]) -> Option<Self> {
        let n = points.len();
        if n < 4 {
            return None;
        }
        Some(Self {
            left: points[n - 4].round() as i64,
            top: points[n - 3].round() as i64,
            right: points[n - 2].round() as i64,
            bottom: points[n - 1].round() as i64,
        })
    }

    fn to_points(self) -> [f64; 4] {
        [
            self.left as f64,
            self.top as f64,
            self.right as f64,
            self.bottom as f64,
        ]
    }
}

/// Encodes a row-major 0/1 mask. Any non-zero byte is foreground.
pub fn mask_to_rle(mask: &[u8]) -> Vec<u32> {
    let mut rle: Vec<u32> = Vec::new();
    let mut previous = false;
    for (index, &value) in mask.iter().enumerate() {
        let value = value != 0;
        if index == 0 {
            if value {
                rle.extend([0, 1]);
            } else {
                rle.push(1);
            }
        } else if value == previous {
            if let Some(last) = rle.last_mut() {
                *last += 1;
            }
        } else {
            rle.push(1);
        }
        previous = value;
    }
    rle
}

/// Decodes runs into a `width * height` row-major 0/1 mask.
///
/// Runs that overflow the buffer are truncated; a short encoding leaves the
/// remaining pixels as background.
pub fn rle_to_mask(rle: &[u32], width: usize, height: usize) -> Vec<u8> {
    let total = width * height;
    let mut decoded = vec![0u8; total];
    let mut index = 0usize;
    let mut value = 0u8;
    for &count in rle {
        let end = (index + count as usize).min(total);
        if value == 1 {
            decoded[index..end].fill(1);
        }
        index = end;
        value ^= 1;
        if index >= total {
            break;
        }
    }
    decoded
}

/// Converts mask points (runs, without the box) into run counts.
pub fn points_to_runs(points: &[f64]) -> Vec<u32> {
    points.iter().map(|v| v.max(0.0).round() as u32).collect()
}

/// Returns whether the pixel at `index` (row-major inside the mask box) is
/// foreground, reading the runs directly without decoding.
pub fn is_foreground_at(runs: &[f64], index: usize) -> bool {
    let mut start = 0usize;
    for (i, &count) in runs.iter().enumerate() {
        let end = start + count.max(0.0).round() as usize;
        if index < end {
            return i % 2 == 1;
        }
        start = end;
    }
    false
}

/// Walks the runs of a mask positioned at `(left, top)` with row width
/// `box_width`, returning the tightest box around foreground pixels that
/// fall inside a `frame_width` x `frame_height` image.
pub fn find_mask_borders(
    runs: &[u32],
    left: i64,
    top: i64,
    box_width: i64,
    frame_width: u32,
    frame_height: u32,
) -> Option<MaskBorders> {
    if box_width <= 0 {
        return None;
    }

    let mut borders: Option<MaskBorders> = None;
    let mut offset: i64 = 0;
    for (i, &count) in runs.iter().enumerate() {
        let count = i64::from(count);
        if i % 2 == 1 {
            for pixel in offset..offset + count {
                let x = left + pixel % box_width;
                let y = top + pixel / box_width;
                if x < 0 || y < 0 || x >= i64::from(frame_width) || y >= i64::from(frame_height) {
                    continue;
                }
                borders = Some(match borders {
                    None => MaskBorders {
                        left: x,
                        top: y,
                        right: x,
                        bottom: y,
                    },
                    Some(b) => MaskBorders {
                        left: b.left.min(x),
                        top: b.top.min(y),
                        right: b.right.max(x),
                        bottom: b.bottom.max(y),
                    },
                });
            }
        }
        offset += count;
    }
    borders
}

/// Crops mask points (runs followed by the box) to the tightest foreground
/// box inside the frame and re-encodes them.
///
/// Returns [`EMPTY_MASK`] when no foreground pixel survives.
pub fn crop_mask(points: &[f64], frame_width: u32, frame_height: u32) -> Vec<f64> {
    let Some(source) = MaskBorders::from_points(points) else {
        return EMPTY_MASK.to_vec();
    };
    if source.width() <= 0 || source.height() <= 0 {
        return EMPTY_MASK.to_vec();
    }

    // only the part of the box inside the frame is decoded
    let clip = MaskBorders {
        left: source.left.max(0),
        top: source.top.max(0),
        right: source.right.min(i64::from(frame_width) - 1),
        bottom: source.bottom.min(i64::from(frame_height) - 1),
    };
    if clip.width() <= 0 || clip.height() <= 0 {
        return EMPTY_MASK.to_vec();
    }

    let visible = decode_clipped(&points_to_runs(&points[..points.len() - 4]), source, clip);
    let Some(target) = find_mask_borders(
        &mask_to_rle(&visible),
        clip.left,
        clip.top,
        clip.width(),
        frame_width,
        frame_height,
    ) else {
        return EMPTY_MASK.to_vec();
    };
    if ((target.width() * target.height()) as f64) < MIN_MASK_AREA {
        return EMPTY_MASK.to_vec();
    }

    let mut cropped = Vec::with_capacity((target.width() * target.height()) as usize);
    for y in target.top..=target.bottom {
        let row = ((y - clip.top) * clip.width()) as usize;
        for x in target.left..=target.right {
            cropped.push(visible[row + (x - clip.left) as usize]);
        }
    }

    let mut result: Vec<f64> = mask_to_rle(&cropped).into_iter().map(f64::from).collect();
    result.extend(target.to_points());
    result
}

/// Decodes the runs of a mask placed at `source` into the pixels of `clip`,
/// a sub-box of `source`. Runs past the end of the source box are dropped.
fn decode_clipped(runs: &[u32], source: MaskBorders, clip: MaskBorders) -> Vec<u8> {
    let width = source.width();
    let total = width.saturating_mul(source.height());
    let first_clip_row = clip.top - source.top;
    let last_clip_row = clip.bottom - source.top;
    let mut pixels = vec![0u8; (clip.width() * clip.height()) as usize];

    let mut offset: i64 = 0;
    for (i, &count) in runs.iter().enumerate() {
        if offset >= total {
            break;
        }
        let end = offset.saturating_add(i64::from(count)).min(total);
        if i % 2 == 1 && end > offset {
            let first_row = (offset / width).max(first_clip_row);
            let last_row = ((end - 1) / width).min(last_clip_row);
            for row in first_row..=last_row {
                let row_start = row * width;
                let from = (offset.max(row_start) - row_start + source.left).max(clip.left);
                let to = (end.min(row_start.saturating_add(width)) - row_start + source.left).min(clip.right + 1);
                let base = (row - first_clip_row) * clip.width();
                for x in from..to {
                    pixels[(base + x - clip.left) as usize] = 1;
                }
            }
        }
        offset = end;
    }
    pixels
}

/// Returns true if the mask points hold no usable pixels.
pub fn is_void(points: &[f64]) -> bool {
    points.len() <= 4
        || points[..points.len() - 4]
            .iter()
            .skip(1)
            .step_by(2)
            .all(|v| *v == 0.0)
}

/// Clears every pixel of `target` that is foreground in `cutter`, then crops
/// the result to the frame.
///
/// Both arguments are complete mask points (runs followed by the box).
pub fn subtract_mask(target: &[f64], cutter: &[f64], frame_width: u32, frame_height: u32) -> Vec<f64> {
    let (Some(tb), Some(cb)) = (MaskBorders::from_points(target), MaskBorders::from_points(cutter)) else {
        return target.to_vec();
    };
    if tb.width() <= 0 || tb.height() <= 0 || cb.width() <= 0 || cb.height() <= 0 {
        return target.to_vec();
    }

    let mut pixels = rle_to_mask(
        &points_to_runs(&target[..target.len() - 4]),
        tb.width() as usize,
        tb.height() as usize,
    );
    let cut = rle_to_mask(
        &points_to_runs(&cutter[..cutter.len() - 4]),
        cb.width() as usize,
        cb.height() as usize,
    );

    let x0 = tb.left.max(cb.left);
    let x1 = tb.right.min(cb.right);
    let y0 = tb.top.max(cb.top);
    let y1 = tb.bottom.min(cb.bottom);
    for y in y0..=y1 {
        for x in x0..=x1 {
            let c = ((y - cb.top) * cb.width() + (x - cb.left)) as usize;
            if cut[c] == 1 {
                let t = ((y - tb.top) * tb.width() + (x - tb.left)) as usize;
                pixels[t] = 0;
            }
        }
    }

    let mut result: Vec<f64> = mask_to_rle(&pixels).into_iter().map(f64::from).collect();
    result.extend(tb.to_points());
    crop_mask(&result, frame_width, frame_height)
}

/// Returns true if any foreground pixel of `a` is also foreground in `b`.
pub fn masks_overlap(a: &[f64], b: &[f64]) -> bool {
    let (Some(ab), Some(bb)) = (MaskBorders::from_points(a), MaskBorders::from_points(b)) else {
        return false;
    };
    let x0 = ab.left.max(bb.left);
    let x1 = ab.right.min(bb.right);
    let y0 = ab.top.max(bb.top);
    let y1 = ab.bottom.min(bb.bottom);
    if x0 > x1 || y0 > y1 {
        return false;
    }
    let a_runs = &a[..a.len() - 4];
    let b_runs = &b[..b.len() - 4];
    (y0..=y1).any(|y| {
        (x0..=x1).any(|x| {
            let ai = ((y - ab.top) * ab.width() + (x - ab.left)) as usize;
            let bi = ((y - bb.top) * bb.width() + (x - bb.left)) as usize;
            is_foreground_at(a_runs, ai) && is_foreground_at(b_runs, bi)
        })
    })
}
