//! # Geometry Derivation
//!
//! Projects a finished detailing onto explicit coordinates for viewers:
//! bar centre-lines, stirrup loops and the section outline.
//!
//! Axes: `x` along the span from the left support face, `y` across the width
//! with 0 on the web centre-line, `z` up from the soffit. All in mm.
//!
//! The projection carries no state of its own; [`Geometry3D::recover_bars`]
//! and [`Geometry3D::stirrup_positions_mm`] read the original layout back.

use serde::{Deserialize, Serialize};

use crate::calculations::detailing::{BarArrangement, BarPosition, DetailingResult};
use crate::calculations::inputs::{BeamGeometry, SectionShape, SupportCondition};
use crate::errors::{CalcError, CalcResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Point3 { x, y, z }
    }
}

/// Point in the cross-section plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub y: f64,
    pub z: f64,
}

/// Straight bar centre-line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebarSegment {
    /// Schedule mark ("B1", "T1")
    pub mark: String,
    pub position: BarPosition,
    /// 0 for the layer nearest the face
    pub layer: u32,
    pub diameter_mm: u32,
    pub start: Point3,
    pub end: Point3,
}

impl RebarSegment {
    pub fn length_mm(&self) -> f64 {
        self.end.x - self.start.x
    }
}

/// Closed stirrup centre-line at one position along the span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StirrupLoop {
    pub x_mm: f64,
    /// Index of the stirrup zone the loop belongs to
    pub zone_index: usize,
    pub diameter_mm: u32,
    pub legs: u32,
    /// Corners: bottom-left, bottom-right, top-right, top-left
    pub vertices: Vec<Point3>,
}

/// Viewer-ready geometry of one beam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry3D {
    pub span_mm: f64,
    pub width_mm: f64,
    pub total_depth_mm: f64,
    /// Closed polygon, counter-clockwise from the bottom-left corner
    pub section_outline: Vec<Point2>,
    pub bars: Vec<RebarSegment>,
    pub stirrups: Vec<StirrupLoop>,
}

/// Bars read back from the projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveredBars {
    pub count: u32,
    pub diameter_mm: u32,
    pub bars_per_layer: Vec<u32>,
    /// Distance from the near face to each layer centre (mm)
    pub layer_offsets_mm: Vec<f64>,
}

impl Geometry3D {
    /// Bar group at one face, `None` when the face has no bars
    pub fn recover_bars(&self, position: BarPosition) -> Option<RecoveredBars> {
        let bars: Vec<&RebarSegment> =
            self.bars.iter().filter(|b| b.position == position).collect();
        let first = bars.first()?;
        let layers = bars.iter().map(|b| b.layer).max().unwrap_or(0) + 1;

        let mut bars_per_layer = vec![0u32; layers as usize];
        let mut layer_offsets_mm = vec![0.0; layers as usize];
        for bar in &bars {
            let layer = bar.layer as usize;
            bars_per_layer[layer] += 1;
            layer_offsets_mm[layer] = match position {
                BarPosition::Bottom => bar.start.z,
                BarPosition::Top => self.total_depth_mm - bar.start.z,
            };
        }

        Some(RecoveredBars {
            count: bars.len() as u32,
            diameter_mm: first.diameter_mm,
            bars_per_layer,
            layer_offsets_mm,
        })
    }

    /// Stirrup positions along the span (mm)
    pub fn stirrup_positions_mm(&self) -> Vec<f64> {
        self.stirrups.iter().map(|s| s.x_mm).collect()
    }

    pub fn stirrup_count(&self) -> usize {
        self.stirrups.len()
    }
}

fn section_outline(geometry: &BeamGeometry) -> Vec<Point2> {
    let half = geometry.width_mm / 2.0;
    let depth = geometry.total_depth_mm;
    let p = |y, z| Point2 { y, z };
    match geometry.section {
        SectionShape::Rectangular => {
            vec![p(-half, 0.0), p(half, 0.0), p(half, depth), p(-half, depth)]
        }
        SectionShape::TBeam {
            flange_width_mm,
            flange_depth_mm,
        } => {
            let flange_half = flange_width_mm / 2.0;
            let soffit = depth - flange_depth_mm;
            vec![
                p(-half, 0.0),
                p(half, 0.0),
                p(half, soffit),
                p(flange_half, soffit),
                p(flange_half, depth),
                p(-flange_half, depth),
                p(-flange_half, soffit),
                p(-half, soffit),
            ]
        }
        // Flange overhangs on the +y side
        SectionShape::LBeam {
            flange_width_mm,
            flange_depth_mm,
        } => {
            let soffit = depth - flange_depth_mm;
            let outer = -half + flange_width_mm;
            vec![
                p(-half, 0.0),
                p(half, 0.0),
                p(half, soffit),
                p(outer, soffit),
                p(outer, depth),
                p(-half, depth),
            ]
        }
    }
}

/// Lateral bar positions for `n` bars: outer bars tight in the stirrup
/// corners, the rest evenly between them
fn bar_y_positions(n: u32, bars: &BarArrangement, width_mm: f64) -> Vec<f64> {
    let edge = width_mm / 2.0
        - bars.clear_cover_mm
        - bars.stirrup_diameter_mm as f64
        - bars.diameter_mm as f64 / 2.0;
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let pitch = 2.0 * edge / (n - 1) as f64;
            (0..n).map(|i| -edge + i as f64 * pitch).collect()
        }
    }
}

fn bar_segments(
    mark: &str,
    bars: &BarArrangement,
    geometry: &BeamGeometry,
    x_start: f64,
    x_end: f64,
) -> Vec<RebarSegment> {
    let offsets = bars.layer_offsets_mm();
    let mut segments = Vec::with_capacity(bars.count as usize);
    for (layer, (&n, &offset)) in bars.bars_per_layer.iter().zip(&offsets).enumerate() {
        let z = match bars.position {
            BarPosition::Bottom => offset,
            BarPosition::Top => geometry.total_depth_mm - offset,
        };
        for y in bar_y_positions(n, bars, geometry.width_mm) {
            segments.push(RebarSegment {
                mark: mark.to_string(),
                position: bars.position,
                layer: layer as u32,
                diameter_mm: bars.diameter_mm,
                start: Point3::new(x_start, y, z),
                end: Point3::new(x_end, y, z),
            });
        }
    }
    segments
}

/// Derive viewer geometry from a detailing.
///
/// Bars extend past each anchored support face by the detailing's anchorage
/// (the free end of a cantilever stops at the span). Stirrup loops sit on
/// the stirrup centre-line, cover plus half a stirrup diameter inside the
/// concrete face.
pub fn derive_geometry(
    detailing: &DetailingResult,
    geometry: &BeamGeometry,
) -> CalcResult<Geometry3D> {
    geometry.validate()?;
    if (detailing.span_mm - geometry.span_mm).abs() > 1e-6 {
        return Err(CalcError::invalid_input(
            "span_mm",
            format!("{} vs {}", detailing.span_mm, geometry.span_mm),
            "Detailing was produced for a different span",
        ));
    }

    let span = geometry.span_mm;
    let x_start = -detailing.anchorage_mm;
    let x_end = match geometry.support {
        SupportCondition::Cantilever => span,
        _ => span + detailing.anchorage_mm,
    };

    let mut bars = bar_segments("B1", &detailing.bottom, geometry, x_start, x_end);
    bars.extend(bar_segments("T1", &detailing.top, geometry, x_start, x_end));

    let inset = geometry.clear_cover_mm + detailing.stirrup.diameter_mm as f64 / 2.0;
    let y = geometry.width_mm / 2.0 - inset;
    let (z_low, z_high) = (inset, geometry.total_depth_mm - inset);
    let zones = &detailing.stirrup_zones;

    let stirrups = detailing
        .stirrup_positions_mm
        .iter()
        .map(|&x| {
            let zone_index = zones
                .iter()
                .position(|z| x >= z.start_mm && x < z.end_mm)
                .unwrap_or(zones.len().saturating_sub(1));
            StirrupLoop {
                x_mm: x,
                zone_index,
                diameter_mm: detailing.stirrup.diameter_mm,
                legs: detailing.stirrup.legs,
                vertices: vec![
                    Point3::new(x, -y, z_low),
                    Point3::new(x, y, z_low),
                    Point3::new(x, y, z_high),
                    Point3::new(x, -y, z_high),
                ],
            }
        })
        .collect();

    Ok(Geometry3D {
        span_mm: span,
        width_mm: geometry.width_mm,
        total_depth_mm: geometry.total_depth_mm,
        section_outline: section_outline(geometry),
        bars,
        stirrups,
    })
}
