//! Axial hex geometry for the honeycomb.
//!
//! Hexes are flat-topped and addressed by cube coordinates `(q, r, s)` with
//! `q + r + s == 0`. Pixel space is y-down, matching the rendering surface, so
//! a larger `r` moves a hex further down the screen.
//!
//! Everything here is pure and free of ECS state.

use std::ops::Add;

use bevy::math::Vec2;
use bevy::reflect::Reflect;
use hexx::{Hex, HexLayout};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::slots::RawOffset;

const SQRT_3: f32 = 1.732_050_8;

/// Largest accepted magnitude of any cube component. Sums and differences of
/// two in-range coordinates stay well inside `i32`.
pub const MAX_COORDINATE: i32 = 1 << 20;

/// Rejected explicit cube coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexError {
    /// `q + r + s` did not sum to zero.
    #[error("cube coordinate ({q}, {r}, {s}) violates q + r + s == 0")]
    OffAxis {
        /// Supplied q.
        q: i32,
        /// Supplied r.
        r: i32,
        /// Supplied s.
        s: i32,
    },
    /// A component is beyond [`MAX_COORDINATE`].
    #[error("coordinate ({q}, {r}) outside ±{max}", max = MAX_COORDINATE)]
    OutOfRange {
        /// Rounded q.
        q: i64,
        /// Rounded r.
        r: i64,
    },
    /// A component is NaN or infinite.
    #[error("coordinate component is not a finite number")]
    NotFinite,
}

/// Cube/axial hex coordinate. `s` is always derived as `-q - r`.
///
/// Deserialization accepts fractional or inconsistent input and normalizes it
/// through [`RawOffset`], so a stored coordinate can never break the invariant.
/// Components beyond [`MAX_COORDINATE`] are rejected.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect, Serialize, Deserialize,
)]
#[serde(try_from = "RawOffset")]
pub struct HexCoordinate {
    q: i32,
    r: i32,
    s: i32,
}

impl HexCoordinate {
    /// The origin hex.
    pub const ZERO: Self = Self { q: 0, r: 0, s: 0 };

    /// Builds a coordinate from its axial part, deriving `s`.
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r, s: -q - r }
    }

    /// Builds a coordinate from all three cube components, rejecting off-axis
    /// or out-of-range input.
    pub fn from_cube(q: i32, r: i32, s: i32) -> Result<Self, HexError> {
        if !is_valid_cube(q, r, s) {
            return Err(HexError::OffAxis { q, r, s });
        }
        Self::checked(q.into(), r.into())
    }

    /// Axial constructor for untrusted input: fails instead of overflowing.
    pub fn checked(q: i64, r: i64) -> Result<Self, HexError> {
        let limit = u64::from(MAX_COORDINATE.unsigned_abs());
        if q.unsigned_abs() > limit
            || r.unsigned_abs() > limit
            || q.saturating_add(r).unsigned_abs() > limit
        {
            return Err(HexError::OutOfRange { q, r });
        }
        // In range, so the narrowing casts are lossless.
        Ok(Self::new(q as i32, r as i32))
    }

    /// Axial column.
    pub const fn q(&self) -> i32 {
        self.q
    }

    /// Axial row.
    pub const fn r(&self) -> i32 {
        self.r
    }

    /// Derived third cube component.
    pub const fn s(&self) -> i32 {
        self.s
    }

    /// `q + r + s == 0`.
    pub const fn is_valid(&self) -> bool {
        is_valid_cube(self.q, self.r, self.s)
    }

    /// Cube distance in hex steps.
    pub fn distance_to(self, other: Self) -> u32 {
        hex_distance(self, other)
    }
}

impl Add for HexCoordinate {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.q + rhs.q, self.r + rhs.r)
    }
}

impl From<HexCoordinate> for Hex {
    fn from(c: HexCoordinate) -> Self {
        Hex::new(c.q, c.r)
    }
}

impl From<Hex> for HexCoordinate {
    fn from(h: Hex) -> Self {
        Self::new(h.x, h.y)
    }
}

/// Validity check on raw cube components.
pub const fn is_valid_cube(q: i32, r: i32, s: i32) -> bool {
    q as i64 + r as i64 + s as i64 == 0
}

/// Pixel mapping parameters.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct HexGeometry {
    /// Spacing constant `S` between adjacent hex centers.
    pub spacing: f32,
    /// Radius (center to vertex) used when outlining a cell.
    pub hex_size: f32,
}

impl Default for HexGeometry {
    fn default() -> Self {
        Self {
            spacing: 65.0,
            hex_size: 30.0,
        }
    }
}

impl HexGeometry {
    /// Center of `hex` in pixel space.
    ///
    /// # Examples
    /// ```
    /// # use hex_footprint::hex_math::{HexCoordinate, HexGeometry};
    /// let g = HexGeometry::default();
    /// assert_eq!(g.axial_to_pixel(HexCoordinate::ZERO).x, 0.0);
    /// assert_eq!(g.axial_to_pixel(HexCoordinate::new(2, -1)).x, 195.0);
    /// ```
    pub fn axial_to_pixel(&self, hex: HexCoordinate) -> Vec2 {
        self.layout().hex_to_world_pos(hex.into())
    }

    /// Flat-top hexx layout scaled by the spacing. Its y axis already points
    /// down the screen, so no inversion is needed.
    fn layout(&self) -> HexLayout {
        HexLayout::flat().with_hex_size(self.spacing)
    }

    /// Hex containing `point`, found by inverting [`Self::axial_to_pixel`]
    /// and cube-rounding the result.
    pub fn pixel_to_axial(&self, point: Vec2) -> HexCoordinate {
        let q = (2.0 / 3.0 * point.x) / self.spacing;
        let r = (-1.0 / 3.0 * point.x + SQRT_3 / 3.0 * point.y) / self.spacing;
        cube_round(q, r, -q - r)
    }

    /// Outline of the cell at `hex`, sized by [`Self::hex_size`].
    pub fn cell_polygon(&self, hex: HexCoordinate) -> [Vec2; 6] {
        hex_polygon(self.axial_to_pixel(hex), self.hex_size)
    }
}

/// Six vertices of a flat-top hexagon; vertex `i` sits at `i * 60°`.
///
/// The path is closed implicitly: the last vertex connects back to the first.
pub fn hex_polygon(center: Vec2, size: f32) -> [Vec2; 6] {
    std::array::from_fn(|i| {
        let angle = std::f32::consts::FRAC_PI_3 * i as f32;
        Vec2::new(
            center.x + size * angle.cos(),
            center.y + size * angle.sin(),
        )
    })
}

/// Cube distance `(|Δq| + |Δq + Δr| + |Δr|) / 2`.
pub fn hex_distance(a: HexCoordinate, b: HexCoordinate) -> u32 {
    Hex::from(a).unsigned_distance_to(Hex::from(b))
}

/// Rounds fractional cube components to the nearest valid hex.
///
/// Each component is rounded independently, then the one with the largest
/// rounding error is recomputed from the other two.
pub fn cube_round(fq: f32, fr: f32, fs: f32) -> HexCoordinate {
    let mut q = fq.round();
    let mut r = fr.round();
    let mut s = fs.round();

    let dq = (q - fq).abs();
    let dr = (r - fr).abs();
    let ds = (s - fs).abs();

    if dq > dr && dq > ds {
        q = -r - s;
    } else if dr > ds {
        r = -q - s;
    } else {
        s = -q - r;
    }

    HexCoordinate {
        q: q as i32,
        r: r as i32,
        s: s as i32,
    }
}

/// `center` followed by each ring out to `radius`, innermost first.
pub fn hex_spiral(center: HexCoordinate, radius: u32) -> Vec<HexCoordinate> {
    let origin = Hex::from(center);
    std::iter::once(center)
        .chain((1..=radius).flat_map(|k| origin.ring(k).map(HexCoordinate::from)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-3
    }

    // ── construction ────────────────────────────────────────────────

    #[test]
    fn new_derives_s() {
        let h = HexCoordinate::new(3, -5);
        assert_eq!(h.s(), 2);
        assert!(h.is_valid());
    }

    #[test]
    fn from_cube_rejects_off_axis() {
        assert_eq!(
            HexCoordinate::from_cube(1, 1, 1),
            Err(HexError::OffAxis { q: 1, r: 1, s: 1 })
        );
        assert_eq!(
            HexCoordinate::from_cube(1, -1, 0),
            Ok(HexCoordinate::new(1, -1))
        );
    }

    #[test]
    fn from_cube_rejects_out_of_range() {
        let big = MAX_COORDINATE + 1;
        assert!(matches!(
            HexCoordinate::from_cube(big, -big, 0),
            Err(HexError::OutOfRange { .. })
        ));
        assert!(is_valid_cube(i32::MAX, i32::MIN, 1));
    }

    #[test]
    fn checked_rejects_overflowing_sum() {
        let half = i64::from(MAX_COORDINATE) / 2 + 1;
        assert!(HexCoordinate::checked(half, half).is_err());
        assert_eq!(
            HexCoordinate::checked(-3, 1),
            Ok(HexCoordinate::new(-3, 1))
        );
    }

    #[test]
    fn add_keeps_invariant() {
        let sum = HexCoordinate::new(3, -2) + HexCoordinate::new(-2, 1);
        assert_eq!(sum, HexCoordinate::new(1, -1));
        assert!(sum.is_valid());
    }

    #[test]
    fn hexx_conversion_round_trips() {
        let h = HexCoordinate::new(-4, 7);
        assert_eq!(HexCoordinate::from(Hex::from(h)), h);
    }

    // ── axial_to_pixel / pixel_to_axial ─────────────────────────────

    #[test]
    fn origin_maps_to_origin() {
        let g = HexGeometry::default();
        assert_eq!(g.axial_to_pixel(HexCoordinate::ZERO), Vec2::ZERO);
    }

    #[test]
    fn unit_q_step_matches_formula() {
        let g = HexGeometry::default();
        let p = g.axial_to_pixel(HexCoordinate::new(1, 0));
        assert!(close(p, Vec2::new(97.5, 65.0 * SQRT_3 / 2.0)));
    }

    #[test]
    fn unit_r_step_moves_straight_down() {
        let g = HexGeometry::default();
        let p = g.axial_to_pixel(HexCoordinate::new(0, 1));
        assert!(close(p, Vec2::new(0.0, 65.0 * SQRT_3)));
    }

    #[test]
    fn pixel_near_center_rounds_to_that_hex() {
        let g = HexGeometry::default();
        let target = HexCoordinate::new(2, -3);
        let p = g.axial_to_pixel(target) + Vec2::new(10.0, -8.0);
        assert_eq!(g.pixel_to_axial(p), target);
    }

    #[test]
    fn cube_round_recomputes_largest_error_axis() {
        // q has the largest rounding error and is rebuilt from r and s.
        let h = cube_round(0.45, 0.3, -0.75);
        assert!(h.is_valid());
        assert_eq!(h, HexCoordinate::new(1, 0));
    }

    #[test]
    fn cube_round_falls_back_to_s_on_ties() {
        let h = cube_round(0.0, 0.0, 0.0);
        assert_eq!(h, HexCoordinate::ZERO);
    }

    // ── polygon ─────────────────────────────────────────────────────

    #[test]
    fn polygon_first_vertex_is_on_positive_x() {
        let verts = hex_polygon(Vec2::new(10.0, 20.0), 5.0);
        assert!(close(verts[0], Vec2::new(15.0, 20.0)));
        assert!(close(verts[3], Vec2::new(5.0, 20.0)));
    }

    #[test]
    fn polygon_vertices_sit_on_circle() {
        let c = Vec2::new(-3.0, 4.0);
        for v in hex_polygon(c, 12.0) {
            assert!(((v - c).length() - 12.0).abs() < 1e-4);
        }
    }

    #[test]
    fn cell_polygon_uses_hex_size() {
        let g = HexGeometry::default();
        let verts = g.cell_polygon(HexCoordinate::ZERO);
        assert!(close(verts[0], Vec2::new(30.0, 0.0)));
    }

    // ── distance / spiral ───────────────────────────────────────────

    #[test]
    fn distance_matches_cube_formula() {
        let a = HexCoordinate::new(0, 0);
        let b = HexCoordinate::new(3, -1);
        assert_eq!(hex_distance(a, b), 3);
        assert_eq!(a.distance_to(HexCoordinate::new(-2, 3)), 3);
    }

    #[test]
    fn spiral_starts_at_center_and_counts_rings() {
        let c = HexCoordinate::new(1, 1);
        let spiral = hex_spiral(c, 2);
        assert_eq!(spiral[0], c);
        assert_eq!(spiral.len(), 1 + 6 + 12);
        for (i, h) in spiral.iter().enumerate().skip(1) {
            let expected = if i <= 6 { 1 } else { 2 };
            assert_eq!(hex_distance(c, *h), expected);
        }
    }

    #[test]
    fn spiral_radius_zero_is_center_only() {
        assert_eq!(hex_spiral(HexCoordinate::ZERO, 0), vec![HexCoordinate::ZERO]);
    }

    // ── serde normalization ─────────────────────────────────────────

    #[test]
    fn deserialize_recomputes_stale_s() {
        let h: HexCoordinate = serde_json::from_str(r#"{"q": 2, "r": -1, "s": 7}"#).unwrap();
        assert_eq!(h, HexCoordinate::new(2, -1));
        assert_eq!(h.s(), -1);
    }

    #[test]
    fn deserialize_rejects_huge_components() {
        let err = serde_json::from_str::<HexCoordinate>(r#"{"q": 1e10, "r": 1e10}"#)
            .unwrap_err();
        assert!(err.to_string().contains("outside"), "{err}");
    }

    #[test]
    fn deserialize_rounds_fractional_axial() {
        let h: HexCoordinate = serde_json::from_str(r#"{"q": -2.0, "r": 0.3}"#).unwrap();
        assert_eq!(h, HexCoordinate::new(-2, 0));
    }

    // ── properties ──────────────────────────────────────────────────

    fn hex_strategy() -> impl Strategy<Value = HexCoordinate> {
        (-40i32..40, -40i32..40).prop_map(|(q, r)| HexCoordinate::new(q, r))
    }

    proptest! {
        #[test]
        fn pixel_round_trip_recovers_hex(h in hex_strategy()) {
            let g = HexGeometry::default();
            let back = g.pixel_to_axial(g.axial_to_pixel(h));
            prop_assert!(back.is_valid());
            prop_assert_eq!(back, h);
        }

        #[test]
        fn rounding_always_yields_valid_cube(x in -3000.0f32..3000.0, y in -3000.0f32..3000.0) {
            let g = HexGeometry::default();
            prop_assert!(g.pixel_to_axial(Vec2::new(x, y)).is_valid());
        }

        #[test]
        fn distance_is_metric(a in hex_strategy(), b in hex_strategy(), c in hex_strategy()) {
            prop_assert_eq!(hex_distance(a, a), 0);
            prop_assert_eq!(hex_distance(a, b), hex_distance(b, a));
            prop_assert!(hex_distance(a, c) <= hex_distance(a, b) + hex_distance(b, c));
        }
    }
}
