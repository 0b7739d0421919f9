//! Reshaping decoded keyframes into per bone channels.
//!
//! Bones are matched to poses by position only: the `i`th name in the bone list names the `i`th
//! transform of every keyframe.

use glam::{Quat, Vec3};
use tracing::{instrument, warn};

use crate::{
    error::{Error, Result},
    types::{Animation, Xmd},
};

/// Channels of a single bone, sampled at the times of the owning [`Clip`]
#[derive(Clone, Debug, PartialEq)]
pub struct BoneTrack {
    /// Position of the bone in the skeleton
    pub bone: usize,
    /// Name from the supplied bone list, if it was long enough
    pub name: Option<String>,
    /// One rotation per keyframe
    pub quaternions: Vec<Quat>,
    /// One translation per keyframe
    pub positions: Vec<Vec3>,
}

impl BoneTrack {
    /// Name of the rotation channel, `<bone>.quaternion`
    pub fn quaternion_track_name(&self) -> Option<String> {
        self.name.as_ref().map(|name| format!("{name}.quaternion"))
    }

    /// Name of the translation channel, `<bone>.position`
    pub fn position_track_name(&self) -> Option<String> {
        self.name.as_ref().map(|name| format!("{name}.position"))
    }

    /// Quaternions as `x, y, z, w` runs
    pub fn quaternion_values(&self) -> Vec<f32> {
        self.quaternions.iter().flat_map(|q| q.to_array()).collect()
    }

    /// Positions as `x, y, z` runs
    pub fn position_values(&self) -> Vec<f32> {
        self.positions.iter().flat_map(|p| p.to_array()).collect()
    }
}

/// Playback ready form of one animation
#[derive(Clone, Debug, PartialEq)]
pub struct Clip {
    /// Name of the source animation
    pub name: String,
    /// Keyframe times shared by every track
    pub times: Vec<f32>,
    /// One track per bone, in bone order
    pub tracks: Vec<BoneTrack>,
}

impl Clip {
    /// Length of the clip, the latest keyframe time
    pub fn duration(&self) -> f32 {
        self.times.iter().copied().fold(0.0, f32::max)
    }

    /// Build the clip of one animation.
    ///
    /// Every keyframe must pose exactly `bone_count` bones.
    pub fn from_animation<S: AsRef<str>>(
        animation: &Animation,
        bone_count: u32,
        bone_names: &[S],
    ) -> Result<Clip> {
        let bones = bone_count as usize;
        let frames = animation.keyframes.len();
        let mut tracks: Vec<BoneTrack> = (0..bones)
            .map(|bone| BoneTrack {
                bone,
                name: bone_names.get(bone).map(|name| name.as_ref().to_owned()),
                quaternions: Vec::with_capacity(frames),
                positions: Vec::with_capacity(frames),
            })
            .collect();
        let mut times = Vec::with_capacity(frames);

        for (index, keyframe) in animation.keyframes.iter().enumerate() {
            let found = keyframe.bone_count();
            if found != bones {
                return Err(Error::BoneCountMismatch {
                    animation: animation.name.clone(),
                    keyframe: index,
                    expected: bone_count,
                    found,
                });
            }

            times.push(keyframe.time);
            for (track, pose) in tracks.iter_mut().zip(keyframe.poses()) {
                track.quaternions.push(pose.rotation);
                track.positions.push(pose.position);
            }
        }

        Ok(Clip {
            name: animation.name.clone(),
            times,
            tracks,
        })
    }
}

/// Build one clip per animation of a decoded file.
///
/// A bone list whose length differs from the bone count of the file is logged and tolerated;
/// bones without a name get unnamed tracks.
#[instrument(skip_all, fields(animations = xmd.animations.len()), err)]
pub fn build_clips<S: AsRef<str>>(xmd: &Xmd, bone_names: &[S]) -> Result<Vec<Clip>> {
    if bone_names.len() != xmd.bone_count as usize {
        warn!(
            names = bone_names.len(),
            bones = xmd.bone_count,
            "bone list does not match the bone count"
        );
    }

    xmd.animations
        .iter()
        .map(|animation| Clip::from_animation(animation, xmd.bone_count, bone_names))
        .collect()
}
