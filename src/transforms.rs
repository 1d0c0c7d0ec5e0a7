//! Rotation / mirror algebra.
//!
//! All orientation math in the crate goes through this module. A placed
//! sub-region is transformed by its own orientation first (in region-local
//! space), then by the schematic-level orientation, then translated by the
//! placement origin. [`Transform`] carries that composition as a signed
//! permutation matrix plus translation, so the forward and inverse mappings
//! come from the same data.

use crate::block_position::BlockPosition;
use crate::block_state::BlockState;
use crate::bounding_box::BoundingBox;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

/// Clockwise rotation around the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    #[default]
    None,
    Clockwise90,
    Clockwise180,
    CounterClockwise90,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [
        Rotation::None,
        Rotation::Clockwise90,
        Rotation::Clockwise180,
        Rotation::CounterClockwise90,
    ];

    /// Number of clockwise quarter turns.
    pub fn steps(self) -> u8 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 1,
            Rotation::Clockwise180 => 2,
            Rotation::CounterClockwise90 => 3,
        }
    }

    pub fn from_steps(steps: i32) -> Rotation {
        Rotation::ALL[steps.rem_euclid(4) as usize]
    }

    pub fn from_degrees(degrees: i32) -> Option<Rotation> {
        if degrees % 90 != 0 {
            return None;
        }
        Some(Rotation::from_steps(degrees / 90))
    }

    pub fn degrees(self) -> i32 {
        self.steps() as i32 * 90
    }

    pub fn inverse(self) -> Rotation {
        Rotation::from_steps(-(self.steps() as i32))
    }

    /// Whether the rotation swaps the horizontal axes.
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Rotation::Clockwise90 | Rotation::CounterClockwise90)
    }

    fn matrix(self) -> Matrix3 {
        match self {
            Rotation::None => Matrix3::IDENTITY,
            Rotation::Clockwise90 => Matrix3([[0, 0, -1], [0, 1, 0], [1, 0, 0]]),
            Rotation::Clockwise180 => Matrix3([[-1, 0, 0], [0, 1, 0], [0, 0, -1]]),
            Rotation::CounterClockwise90 => Matrix3([[0, 0, 1], [0, 1, 0], [-1, 0, 0]]),
        }
    }
}

/// Mirror across a vertical plane.
///
/// `FrontBack` negates X, `LeftRight` negates Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mirror {
    #[default]
    None,
    LeftRight,
    FrontBack,
}

impl Mirror {
    pub const ALL: [Mirror; 3] = [Mirror::None, Mirror::LeftRight, Mirror::FrontBack];

    fn bits(self) -> u8 {
        match self {
            Mirror::None => 0,
            Mirror::FrontBack => 0b01,
            Mirror::LeftRight => 0b10,
        }
    }

    fn matrix(self) -> Matrix3 {
        match self {
            Mirror::None => Matrix3::IDENTITY,
            Mirror::FrontBack => Matrix3([[-1, 0, 0], [0, 1, 0], [0, 0, 1]]),
            Mirror::LeftRight => Matrix3([[1, 0, 0], [0, 1, 0], [0, 0, -1]]),
        }
    }
}

/// Group addition of two rotations.
pub fn compose_rotation(a: Rotation, b: Rotation) -> Rotation {
    Rotation::from_steps(a.steps() as i32 + b.steps() as i32)
}

/// Mirror component of applying `a` then `b`.
///
/// Modelled as XOR over the axis set: the same axis twice cancels. Two
/// different axes leave no mirror; the pair amounts to a half turn, which
/// [`Orientation::then`] folds into the rotation.
pub fn compose_mirror(a: Mirror, b: Mirror) -> Mirror {
    match a.bits() ^ b.bits() {
        0b01 => Mirror::FrontBack,
        0b10 => Mirror::LeftRight,
        _ => Mirror::None,
    }
}

/// The mirror that has the same effect once a rotation has been layered on
/// top of the frame it was defined in. Quarter turns swap the mirror axis.
pub fn mirror_under_rotation(mirror: Mirror, rotation: Rotation) -> Mirror {
    if !rotation.is_quarter_turn() {
        return mirror;
    }
    match mirror {
        Mirror::None => Mirror::None,
        Mirror::FrontBack => Mirror::LeftRight,
        Mirror::LeftRight => Mirror::FrontBack,
    }
}

/// A mirror followed by a rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Orientation {
    pub mirror: Mirror,
    pub rotation: Rotation,
}

impl Orientation {
    pub const IDENTITY: Orientation = Orientation {
        mirror: Mirror::None,
        rotation: Rotation::None,
    };

    pub fn new(mirror: Mirror, rotation: Rotation) -> Self {
        Orientation { mirror, rotation }
    }

    pub fn is_identity(&self) -> bool {
        self.mirror == Mirror::None && self.rotation == Rotation::None
    }

    /// Apply `self` first, then `outer`, normalised back to mirror-then-rotate.
    pub fn then(self, outer: Orientation) -> Orientation {
        let outer_mirror = mirror_under_rotation(outer.mirror, self.rotation);
        let mut rotation = compose_rotation(outer.rotation, self.rotation);
        if outer_mirror != Mirror::None
            && self.mirror != Mirror::None
            && outer_mirror != self.mirror
        {
            // Mirrors on both axes are a half turn.
            rotation = compose_rotation(rotation, Rotation::Clockwise180);
        }
        Orientation {
            mirror: compose_mirror(outer_mirror, self.mirror),
            rotation,
        }
    }

    pub fn inverse(self) -> Orientation {
        if self.mirror == Mirror::None {
            Orientation::new(Mirror::None, self.rotation.inverse())
        } else {
            // Any reflection of the plane is its own inverse.
            self
        }
    }

    /// Maps a direction id (0 down, 1 up, 2 north, 3 south, 4 west, 5 east).
    /// Unknown ids come back unchanged.
    pub fn rotate_direction(self, id: i8) -> i8 {
        const DIRECTIONS: [BlockPosition; 6] = [
            BlockPosition::new(0, -1, 0),
            BlockPosition::new(0, 1, 0),
            BlockPosition::new(0, 0, -1),
            BlockPosition::new(0, 0, 1),
            BlockPosition::new(-1, 0, 0),
            BlockPosition::new(1, 0, 0),
        ];
        let Some(unit) = usize::try_from(id).ok().and_then(|i| DIRECTIONS.get(i)) else {
            return id;
        };
        let moved = self.matrix().apply(*unit);
        DIRECTIONS
            .iter()
            .position(|d| *d == moved)
            .map_or(id, |i| i as i8)
    }

    fn matrix(self) -> Matrix3 {
        self.rotation.matrix().mul(&self.mirror.matrix())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Matrix3([[i32; 3]; 3]);

impl Matrix3 {
    const IDENTITY: Matrix3 = Matrix3([[1, 0, 0], [0, 1, 0], [0, 0, 1]]);

    fn mul(&self, rhs: &Matrix3) -> Matrix3 {
        let mut out = [[0; 3]; 3];
        for (r, row) in out.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.0[r][k] * rhs.0[k][c]).sum();
            }
        }
        Matrix3(out)
    }

    fn transpose(&self) -> Matrix3 {
        let m = &self.0;
        Matrix3([
            [m[0][0], m[1][0], m[2][0]],
            [m[0][1], m[1][1], m[2][1]],
            [m[0][2], m[1][2], m[2][2]],
        ])
    }

    fn apply(&self, p: BlockPosition) -> BlockPosition {
        let m = &self.0;
        BlockPosition::new(
            m[0][0] * p.x + m[0][1] * p.y + m[0][2] * p.z,
            m[1][0] * p.x + m[1][1] * p.y + m[1][2] * p.z,
            m[2][0] * p.x + m[2][1] * p.y + m[2][2] * p.z,
        )
    }

    fn apply_f64(&self, v: (f64, f64, f64)) -> (f64, f64, f64) {
        let m = &self.0;
        (
            m[0][0] as f64 * v.0 + m[0][1] as f64 * v.1 + m[0][2] as f64 * v.2,
            m[1][0] as f64 * v.0 + m[1][1] as f64 * v.1 + m[1][2] as f64 * v.2,
            m[2][0] as f64 * v.0 + m[2][1] as f64 * v.1 + m[2][2] as f64 * v.2,
        )
    }
}

/// Orientation plus integer translation: `p -> M * p + t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transform {
    orientation: Orientation,
    matrix: Matrix3,
    translation: BlockPosition,
}

impl Default for Transform {
    fn default() -> Self {
        Transform::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        orientation: Orientation::IDENTITY,
        matrix: Matrix3::IDENTITY,
        translation: BlockPosition::ORIGIN,
    };

    pub fn from_orientation(orientation: Orientation) -> Self {
        Transform {
            orientation,
            matrix: orientation.matrix(),
            translation: BlockPosition::ORIGIN,
        }
    }

    pub fn translation(offset: BlockPosition) -> Self {
        Transform {
            translation: offset,
            ..Transform::IDENTITY
        }
    }

    pub fn with_translation(mut self, offset: BlockPosition) -> Self {
        self.translation = offset;
        self
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn offset(&self) -> BlockPosition {
        self.translation
    }

    pub fn apply(&self, pos: BlockPosition) -> BlockPosition {
        self.matrix.apply(pos) + self.translation
    }

    /// The linear part only, for offsets and sizes.
    pub fn apply_linear(&self, pos: BlockPosition) -> BlockPosition {
        self.matrix.apply(pos)
    }

    /// Continuous positions rotate around block centres, so that a point
    /// inside block `p` ends up inside block `apply(p)`.
    pub fn apply_vec(&self, v: (f64, f64, f64)) -> (f64, f64, f64) {
        let centred = (v.0 - 0.5, v.1 - 0.5, v.2 - 0.5);
        let r = self.matrix.apply_f64(centred);
        (
            r.0 + 0.5 + self.translation.x as f64,
            r.1 + 0.5 + self.translation.y as f64,
            r.2 + 0.5 + self.translation.z as f64,
        )
    }

    /// `self` followed by `outer`.
    pub fn then(&self, outer: &Transform) -> Transform {
        Transform {
            orientation: self.orientation.then(outer.orientation),
            matrix: outer.matrix.mul(&self.matrix),
            translation: outer.matrix.apply(self.translation) + outer.translation,
        }
    }

    pub fn inverse(&self) -> Transform {
        let inv = self.matrix.transpose();
        Transform {
            orientation: self.orientation.inverse(),
            matrix: inv,
            translation: -inv.apply(self.translation),
        }
    }

    pub fn transform_box(&self, bb: &BoundingBox) -> BoundingBox {
        BoundingBox::from_corners(self.apply(bb.min), self.apply(bb.max))
    }

    pub fn transform_yaw(&self, yaw: f32) -> f32 {
        transform_yaw(yaw, self.orientation.mirror, self.orientation.rotation)
    }

    pub fn transform_direction(&self, id: i8) -> i8 {
        self.orientation.rotate_direction(id)
    }
}

/// Transform a relative block position: mirror first, then rotate.
pub fn transform_block_pos(pos: BlockPosition, mirror: Mirror, rotation: Rotation) -> BlockPosition {
    Orientation::new(mirror, rotation).matrix().apply(pos)
}

/// Undo [`transform_block_pos`].
pub fn reverse_transform_block_pos(
    pos: BlockPosition,
    mirror: Mirror,
    rotation: Rotation,
) -> BlockPosition {
    Orientation::new(mirror, rotation)
        .matrix()
        .transpose()
        .apply(pos)
}

/// Transform a position inside a region of the given (absolute) size,
/// re-anchored so the result is relative to the transformed region's
/// minimum corner.
pub fn transform_local_pos(
    pos: BlockPosition,
    region_size: BlockPosition,
    mirror: Mirror,
    rotation: Rotation,
) -> BlockPosition {
    let t = Transform::from_orientation(Orientation::new(mirror, rotation));
    let extent = t.transform_box(&BoundingBox::new(
        BlockPosition::ORIGIN,
        region_size.abs().relative_end_from_size(),
    ));
    t.apply(pos) - extent.min
}

/// Continuous variant of [`transform_block_pos`], rotating around block centres.
pub fn transform_vec(v: (f64, f64, f64), mirror: Mirror, rotation: Rotation) -> (f64, f64, f64) {
    Transform::from_orientation(Orientation::new(mirror, rotation)).apply_vec(v)
}

/// Transform an entity yaw (degrees, 0 = south, 90 = west).
pub fn transform_yaw(yaw: f32, mirror: Mirror, rotation: Rotation) -> f32 {
    let mirrored = match mirror {
        Mirror::None => yaw,
        Mirror::LeftRight => 180.0 - yaw,
        Mirror::FrontBack => -yaw,
    };
    wrap_degrees(mirrored + rotation.degrees() as f32)
}

/// Transform a 16-step rotation value (signs, banners, skulls).
pub fn transform_rotation16(value: i32, mirror: Mirror, rotation: Rotation) -> i32 {
    let mirrored = match mirror {
        Mirror::None => value,
        Mirror::FrontBack => 16 - value,
        Mirror::LeftRight => 8 - value,
    };
    (mirrored + rotation.steps() as i32 * 4).rem_euclid(16)
}

fn wrap_degrees(value: f32) -> f32 {
    let mut v = value % 360.0;
    if v >= 180.0 {
        v -= 360.0;
    }
    if v < -180.0 {
        v += 360.0;
    }
    v
}

// ── Block state orientation ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Horizontal {
    North,
    East,
    South,
    West,
}

impl Horizontal {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "north" => Some(Horizontal::North),
            "east" => Some(Horizontal::East),
            "south" => Some(Horizontal::South),
            "west" => Some(Horizontal::West),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Horizontal::North => "north",
            Horizontal::East => "east",
            Horizontal::South => "south",
            Horizontal::West => "west",
        }
    }

    fn rotate(self, rotation: Rotation) -> Self {
        const ORDER: [Horizontal; 4] = [
            Horizontal::North,
            Horizontal::East,
            Horizontal::South,
            Horizontal::West,
        ];
        let idx = ORDER.iter().position(|d| *d == self).unwrap_or(0);
        ORDER[(idx + rotation.steps() as usize) % 4]
    }

    fn mirror(self, mirror: Mirror) -> Self {
        match (mirror, self) {
            (Mirror::FrontBack, Horizontal::East) => Horizontal::West,
            (Mirror::FrontBack, Horizontal::West) => Horizontal::East,
            (Mirror::LeftRight, Horizontal::North) => Horizontal::South,
            (Mirror::LeftRight, Horizontal::South) => Horizontal::North,
            (_, d) => d,
        }
    }
}

fn map_direction_value(value: &str, f: impl Fn(Horizontal) -> Horizontal) -> Option<SmolStr> {
    Horizontal::parse(value).map(|d| SmolStr::new(f(d).name()))
}

/// Rail shapes are made of direction tokens; re-map them and restore the
/// canonical token order.
fn map_rail_shape(shape: &str, f: impl Fn(Horizontal) -> Horizontal) -> Option<SmolStr> {
    if let Some(dir) = shape.strip_prefix("ascending_") {
        return map_direction_value(dir, f).map(|d| SmolStr::new(format!("ascending_{}", d)));
    }
    let (a, b) = shape.split_once('_')?;
    let a = f(Horizontal::parse(a)?);
    let b = f(Horizontal::parse(b)?);
    let has = |d: Horizontal| a == d || b == d;
    let name = if has(Horizontal::North) && has(Horizontal::South) {
        "north_south".to_string()
    } else if has(Horizontal::East) && has(Horizontal::West) {
        "east_west".to_string()
    } else {
        let ns = if has(Horizontal::North) { "north" } else { "south" };
        let ew = if has(Horizontal::East) { "east" } else { "west" };
        format!("{}_{}", ns, ew)
    };
    Some(SmolStr::new(name))
}

fn swap_left_right(value: &str) -> Option<SmolStr> {
    if let Some(rest) = value.strip_suffix("left") {
        Some(SmolStr::new(format!("{}right", rest)))
    } else {
        value
            .strip_suffix("right")
            .map(|rest| SmolStr::new(format!("{}left", rest)))
    }
}

/// Rotate the orientation-bearing properties of a block state.
pub fn transform_block_state_rotate(state: &BlockState, rotation: Rotation) -> BlockState {
    if rotation == Rotation::None || state.properties.is_empty() {
        return state.clone();
    }
    let rot = |d: Horizontal| d.rotate(rotation);
    let mut properties = Vec::with_capacity(state.properties.len());

    for (key, value) in &state.properties {
        let new_value = match key.as_str() {
            "facing" | "horizontal_facing" => map_direction_value(value, rot),
            "axis" if rotation.is_quarter_turn() => match value.as_str() {
                "x" => Some(SmolStr::new("z")),
                "z" => Some(SmolStr::new("x")),
                _ => None,
            },
            "rotation" => value.parse::<i32>().ok().map(|r| {
                SmolStr::new(transform_rotation16(r, Mirror::None, rotation).to_string())
            }),
            "shape" => map_rail_shape(value, rot),
            _ => None,
        };
        let new_key = Horizontal::parse(key)
            .map(|d| SmolStr::new(d.rotate(rotation).name()))
            .unwrap_or_else(|| key.clone());
        properties.push((new_key, new_value.unwrap_or_else(|| value.clone())));
    }

    BlockState::new(state.name.clone()).with_properties(properties)
}

/// Mirror the orientation-bearing properties of a block state.
pub fn transform_block_state_mirror(state: &BlockState, mirror: Mirror) -> BlockState {
    if mirror == Mirror::None || state.properties.is_empty() {
        return state.clone();
    }
    let mir = |d: Horizontal| d.mirror(mirror);
    let mut properties = Vec::with_capacity(state.properties.len());

    for (key, value) in &state.properties {
        let new_value = match key.as_str() {
            "facing" | "horizontal_facing" => map_direction_value(value, mir),
            "rotation" => value.parse::<i32>().ok().map(|r| {
                SmolStr::new(transform_rotation16(r, mirror, Rotation::None).to_string())
            }),
            "shape" => map_rail_shape(value, mir).or_else(|| swap_left_right(value)),
            "hinge" | "type" => swap_left_right(value),
            _ => None,
        };
        let new_key = Horizontal::parse(key)
            .map(|d| SmolStr::new(d.mirror(mirror).name()))
            .unwrap_or_else(|| key.clone());
        properties.push((new_key, new_value.unwrap_or_else(|| value.clone())));
    }

    BlockState::new(state.name.clone()).with_properties(properties)
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

impl fmt::Display for Mirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mirror::None => "none",
            Mirror::LeftRight => "left_right",
            Mirror::FrontBack => "front_back",
        };
        f.write_str(s)
    }
}
