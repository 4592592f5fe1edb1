//! Records that travel from producers to listeners.

use kairos_core::{ObjectId, Quat, Vec3};

/// Geometry an object is drawn with.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// Axis-aligned box given by its half extents.
    Box {
        /// Half size along each local axis.
        half_extents: Vec3,
    },
    /// Sphere.
    Sphere {
        /// Radius in metres.
        radius: f64,
    },
    /// Cylinder along the local z axis.
    Cylinder {
        /// Radius in metres.
        radius: f64,
        /// Half the length along z.
        half_height: f64,
    },
    /// Capsule along the local z axis.
    Capsule {
        /// Radius of the caps and shaft.
        radius: f64,
        /// Half the shaft length along z.
        half_height: f64,
    },
    /// A named mesh resolved by the listener.
    Mesh {
        /// Asset name or path.
        name: String,
    },
}

/// RGBA colour with components in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl Color {
    /// An opaque colour.
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }
}

/// Presentation changes for one object. Absent fields are unchanged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetaUpdate {
    /// New colour.
    pub color: Option<Color>,
    /// New texture name.
    pub texture: Option<String>,
    /// New text label.
    pub label: Option<String>,
}

impl MetaUpdate {
    /// Whether the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.texture.is_none() && self.label.is_none()
    }
}

/// One queued update.
#[derive(Clone, Debug, PartialEq)]
pub enum Update {
    /// New pose.
    State {
        /// The object.
        id: ObjectId,
        /// World position.
        position: Vec3,
        /// World orientation.
        orientation: Quat,
    },
    /// New presentation metadata.
    Meta {
        /// The object.
        id: ObjectId,
        /// What changed.
        meta: MetaUpdate,
    },
}

impl Update {
    /// The object this update is about.
    pub fn id(&self) -> ObjectId {
        match self {
            Self::State { id, .. } | Self::Meta { id, .. } => *id,
        }
    }
}
