//! Dash walking for axis-aligned strokes, shared by every surface.

pub type Point = (f64, f64);

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentDashes {
    /// Painted runs, ordered from the segment's start.
    pub runs: Vec<(Point, Point)>,
    /// Pattern phase at the segment's end, for the next edge of a path.
    pub end_phase: f64,
}

/// Splits an axis-aligned segment into painted runs. Only the part within one
/// period and one band width of `[0, extent.0] x [0, extent.1]` is walked,
/// so the cost depends on the visible extent and not on the segment length.
/// The returned phase always advances by the full length.
pub fn dash_axis_segment(
    from: Point,
    to: Point,
    band: f64,
    extent: (f64, f64),
    pattern: Option<(f64, f64)>,
    phase: f64,
) -> SegmentDashes {
    let horizontal = (from.1 - to.1).abs() <= f64::EPSILON;
    let (start, end, across, along_extent, across_extent) = if horizontal {
        (from.0, to.0, from.1, extent.0, extent.1)
    } else {
        (from.1, to.1, from.0, extent.1, extent.0)
    };
    let length = (end - start).abs();
    let direction = if end >= start { 1.0 } else { -1.0 };
    let pattern = pattern.filter(|(dash, gap)| dash + gap > 0.0);
    let period = pattern.map(|(dash, gap)| dash + gap);
    let end_phase = period.map_or(phase, |period| (phase + length) % period);

    let point_at = |distance: f64| {
        let along = start + direction * distance;
        if horizontal {
            (along, across)
        } else {
            (across, along)
        }
    };

    let half = band / 2.0;
    let margin = period.unwrap_or(0.0) + band + 1.0;
    let visible = if across + half >= 0.0 && across - half <= across_extent {
        visible_span(start, direction, length, -margin, along_extent + margin)
    } else {
        None
    };
    let Some((clip_start, clip_end)) = visible else {
        return SegmentDashes {
            runs: Vec::new(),
            end_phase,
        };
    };

    let (Some((dash, _)), Some(period)) = (pattern, period) else {
        return SegmentDashes {
            runs: vec![(point_at(clip_start), point_at(clip_end))],
            end_phase,
        };
    };

    let mut runs = Vec::new();
    let mut travelled = clip_start;
    let mut phase = (phase + clip_start) % period;
    while travelled < clip_end {
        let (on, remaining) = if phase < dash {
            (true, dash - phase)
        } else {
            (false, period - phase)
        };
        let step = remaining.min(clip_end - travelled);
        if on {
            runs.push((point_at(travelled), point_at(travelled + step)));
        }
        travelled += step;
        phase = (phase + step) % period;
    }

    SegmentDashes { runs, end_phase }
}

/// Distances along a segment from `start` whose points fall inside
/// `[low, high]`, clamped to `[0, length]`.
fn visible_span(start: f64, direction: f64, length: f64, low: f64, high: f64) -> Option<(f64, f64)> {
    let (from, to) = if direction > 0.0 {
        (low - start, high - start)
    } else {
        (start - high, start - low)
    };
    let from = from.max(0.0);
    let to = to.min(length);
    (from < to).then_some((from, to))
}

/// The four edges of a rectangle in stroke order, as one closed path.
pub fn rect_edges(left: f64, top: f64, right: f64, bottom: f64) -> [(Point, Point); 4] {
    [
        ((left, top), (right, top)),
        ((right, top), (right, bottom)),
        ((right, bottom), (left, bottom)),
        ((left, bottom), (left, top)),
    ]
}
