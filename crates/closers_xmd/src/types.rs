//! Decoded animation data.

use std::collections::BTreeMap;

use derive_more::derive::{Constructor, Deref, IntoIterator};
use glam::{Quat, Vec3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Leading bytes of every animation file
pub const MAGIC: [u8; 18] = *b"\x91CLOSERS_XMD_0001\x00";

/// Bone pose stored by keyframes without scale
#[derive(Constructor, Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoneTransform {
    /// Orientation relative to the parent bone
    pub rotation: Quat,
    /// Translation relative to the parent bone
    pub position: Vec3,
}

/// Bone pose stored by keyframes with scale
#[derive(Constructor, Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScaledBoneTransform {
    /// Orientation relative to the parent bone
    pub rotation: Quat,
    /// Scale along each axis
    pub scale: Vec3,
    /// Translation relative to the parent bone
    pub position: Vec3,
}

/// A pose of the whole skeleton at one point in time.
///
/// Files fill one of the two transform lists. Each list holds one entry per bone, in bone order.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Keyframe {
    /// Time in seconds from the start of the animation
    pub time: f32,
    /// Poses with scale, empty when the file stores them without
    pub scale_transforms: Vec<ScaledBoneTransform>,
    /// Poses without scale
    pub transforms: Vec<BoneTransform>,
}

/// A bone pose reduced to the channels used for playback
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    /// Orientation relative to the parent bone
    pub rotation: Quat,
    /// Translation relative to the parent bone
    pub position: Vec3,
}

impl From<&BoneTransform> for Pose {
    fn from(value: &BoneTransform) -> Self {
        Pose {
            rotation: value.rotation,
            position: value.position,
        }
    }
}

impl From<&ScaledBoneTransform> for Pose {
    fn from(value: &ScaledBoneTransform) -> Self {
        Pose {
            rotation: value.rotation,
            position: value.position,
        }
    }
}

impl Keyframe {
    /// Number of bones posed by this keyframe
    pub fn bone_count(&self) -> usize {
        if self.transforms.is_empty() {
            self.scale_transforms.len()
        } else {
            self.transforms.len()
        }
    }

    /// Poses of this keyframe in bone order, from `transforms` unless it is empty
    pub fn poses(&self) -> Box<dyn Iterator<Item = Pose> + '_> {
        if self.transforms.is_empty() {
            Box::new(self.scale_transforms.iter().map(Pose::from))
        } else {
            Box::new(self.transforms.iter().map(Pose::from))
        }
    }
}

/// A named animation
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Animation {
    /// Name used to look the animation up
    pub name: String,
    /// Second name, often localized
    pub alt_name: String,
    /// Length in seconds as stored in the file
    pub duration: f32,
    /// Unknown, kept for writing the file back
    pub reserved: u16,
    pub keyframes: Vec<Keyframe>,
}

/// A decoded animation file
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Xmd {
    /// Number of bones posed by every keyframe
    pub bone_count: u32,
    /// Unknown, kept for writing the file back
    pub reserved: u32,
    pub animations: Vec<Animation>,
}

impl Xmd {
    /// Names of the animations in file order
    pub fn animation_names(&self) -> impl Iterator<Item = &str> {
        self.animations.iter().map(|animation| animation.name.as_str())
    }
}

/// Animation names declared by each file, keyed by file name
#[derive(Constructor, Clone, Debug, Default, PartialEq, Eq, Deref, IntoIterator)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct AnimationManifest(BTreeMap<String, Vec<String>>);

impl AnimationManifest {
    /// Record the animations of a decoded file
    pub fn insert(&mut self, file_name: impl Into<String>, xmd: &Xmd) {
        self.0.insert(
            file_name.into(),
            xmd.animation_names().map(str::to_owned).collect(),
        );
    }

    /// Render the manifest as pretty printed JSON
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
