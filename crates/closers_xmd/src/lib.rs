//! # XMD Format Documentation
//!
//! This crate decodes the **XMD** skeletal animations used by the game *Closers*. A file holds
//! any number of named animations over a single skeleton.
//!
//! ## File Structure
//!
//! | Offset (bytes) | Field       | Description                                                |
//! |----------------|-------------|------------------------------------------------------------|
//! | 0x0000         | Magic       | 18 bytes: `0x91` `CLOSERS_XMD_0001` `0x00`                 |
//! | 0x0012         | Bone Count  | 4 bytes: Number of bones posed by every keyframe           |
//! | 0x0016         | Reserved    | 4 bytes: Unknown purpose                                   |
//! | 0x001A         | Animations  | varint: Number of animation records that follow            |
//!
//! Counts and string lengths are variable length integers, see [`varint`]. Floats and fixed
//! size integers are little-endian.
//!
//! ### Animation
//!
//! | Field          | Description                                                       |
//! |----------------|-------------------------------------------------------------------|
//! | Name           | varint byte length, then UTF-16 text                              |
//! | Alternate Name | varint byte length, then UTF-16 text                              |
//! | Duration       | f32                                                               |
//! | Reserved       | u16                                                               |
//! | Keyframes      | varint count, then that many keyframes                            |
//!
//! ### Keyframe
//!
//! | Field            | Description                                                     |
//! |------------------|-----------------------------------------------------------------|
//! | Time             | f32                                                             |
//! | Scaled Poses     | varint count of (quaternion `xyzw`, scale `xyz`, position `xyz`)|
//! | Poses            | varint count of (quaternion `xyzw`, position `xyz`)             |
//!
//! Only one of the two pose lists is filled, with one entry per bone.
//!
//! ## Example
//!
//! ```no_run
//! # fn main() -> closers_xmd::error::Result<()> {
//! let bytes = std::fs::read("SEHA.XMD")?;
//! let xmd = closers_xmd::decode(&bytes)?;
//! let bones = ["Bip01", "Bip01_Pelvis"];
//! for clip in closers_xmd::clip::build_clips(&xmd, &bones)? {
//!     println!("{} runs for {}s", clip.name, clip.duration());
//! }
//! # Ok(())
//! # }
//! ```

pub mod clip;
pub mod error;
pub mod read;
pub mod types;
pub mod varint;
mod write;

pub use clip::{build_clips, BoneTrack, Clip};
pub use read::{DecoderOptions, XmdDecoder};
pub use types::{Animation, AnimationManifest, BoneTransform, Keyframe, ScaledBoneTransform, Xmd};

/// Decode a whole animation file in one call
pub fn decode(data: &[u8]) -> error::Result<Xmd> {
    XmdDecoder::new(data)?.decode_to_end()
}
