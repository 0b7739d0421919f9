//! Decoding animation files as a resumable task.
//!
//! Keyframes make up nearly all of a file. [`XmdDecoder::step`] decodes at most
//! [`DecoderOptions::batch_size`] keyframes before handing control back to the caller.
//!
//! ```no_run
//! use closers_xmd::read::{DecoderOptions, Progress, XmdDecoder};
//!
//! fn decode(data: &[u8]) -> closers_xmd::error::Result<()> {
//!     let options = DecoderOptions::builder().batch_size(100).build();
//!     let mut decoder = XmdDecoder::with_options(data, options)?;
//!     while let Progress::Pending { keyframes, .. } = decoder.step()? {
//!         println!("{keyframes} keyframes");
//!     }
//!     for animation in decoder.finish().animations {
//!         println!("{} lasts {}s", animation.name, animation.duration);
//!     }
//!     Ok(())
//! }
//! ```

use std::io::{self, Cursor};

use bon::Builder;
use byteorder::{LittleEndian, ReadBytesExt};
use glam::{Quat, Vec3};
use tracing::{debug, instrument, trace};
use widestring::U16String;

use crate::{
    error::{Error, Result},
    types::{Animation, BoneTransform, Keyframe, ScaledBoneTransform, Xmd, MAGIC},
    varint::{ReadVarIntExt, MAX_LEN},
};

/// Bytes taken by a [`BoneTransform`]
const TRANSFORM_SIZE: usize = 28;
/// Bytes taken by a [`ScaledBoneTransform`]
const SCALED_TRANSFORM_SIZE: usize = 40;

/// Options for [`XmdDecoder`]
#[derive(Builder, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Number of keyframes decoded per step
    #[builder(default = 25)]
    pub batch_size: usize,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Outcome of a single [`XmdDecoder::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// More animations remain
    Pending {
        /// Animations fully decoded
        animations: usize,
        /// Animations declared by the file
        total: usize,
        /// Keyframes decoded so far across all animations
        keyframes: usize,
    },
    /// Every animation has been decoded
    Complete,
}

#[derive(Debug)]
struct PartialAnimation {
    animation: Animation,
    remaining: usize,
}

/// Resumable decoder over an animation file
#[derive(Debug)]
pub struct XmdDecoder<'a> {
    cursor: Cursor<&'a [u8]>,
    options: DecoderOptions,
    total: usize,
    keyframes: usize,
    current: Option<PartialAnimation>,
    xmd: Xmd,
}

impl<'a> XmdDecoder<'a> {
    /// Start decoding with the default batch size
    pub fn new(data: &'a [u8]) -> Result<Self> {
        Self::with_options(data, DecoderOptions::default())
    }

    /// Start decoding, reading the file header and the animation count
    #[instrument(skip(data), fields(len = data.len()), err)]
    pub fn with_options(data: &'a [u8], options: DecoderOptions) -> Result<Self> {
        if data.len() < MAGIC.len() || data[..MAGIC.len()] != MAGIC {
            return Err(Error::InvalidMagic {
                found: data[..data.len().min(MAGIC.len())].to_vec(),
            });
        }

        let mut decoder = Self {
            cursor: Cursor::new(data),
            options,
            total: 0,
            keyframes: 0,
            current: None,
            xmd: Xmd::default(),
        };
        decoder.cursor.set_position(MAGIC.len() as u64);
        decoder.xmd.bone_count = decoder.read(|c| c.read_u32::<LittleEndian>())?;
        decoder.xmd.reserved = decoder.read(|c| c.read_u32::<LittleEndian>())?;
        decoder.total = decoder.read(|c| c.read_varint())? as usize;
        debug!(
            bones = decoder.xmd.bone_count,
            animations = decoder.total,
            "xmd header"
        );

        decoder.xmd.animations = Vec::with_capacity(decoder.total.min(decoder.remaining()));
        Ok(decoder)
    }

    /// Decode the next batch of keyframes.
    ///
    /// Animation headers are read as they are reached and do not count against the batch. A
    /// step after completion does nothing. A failed step leaves the decoder in an unspecified
    /// position and it should be dropped.
    pub fn step(&mut self) -> Result<Progress> {
        let mut budget = self.options.batch_size.max(1);

        while budget > 0 && !self.is_complete() {
            let mut partial = match self.current.take() {
                Some(partial) => partial,
                None => self.read_animation_header()?,
            };

            while partial.remaining > 0 && budget > 0 {
                let keyframe = self.read_keyframe()?;
                partial.animation.keyframes.push(keyframe);
                partial.remaining -= 1;
                budget -= 1;
                self.keyframes += 1;
            }

            if partial.remaining == 0 {
                trace!(
                    name = %partial.animation.name,
                    keyframes = partial.animation.keyframes.len(),
                    "animation decoded"
                );
                self.xmd.animations.push(partial.animation);
            } else {
                self.current = Some(partial);
            }
        }

        if self.is_complete() && self.remaining() > 0 {
            debug!(trailing = self.remaining(), "bytes after last animation");
        }
        Ok(self.progress())
    }

    /// Current progress without doing any work
    pub fn progress(&self) -> Progress {
        if self.is_complete() {
            Progress::Complete
        } else {
            Progress::Pending {
                animations: self.xmd.animations.len(),
                total: self.total,
                keyframes: self.keyframes,
            }
        }
    }

    /// Whether every declared animation has been decoded
    pub fn is_complete(&self) -> bool {
        self.xmd.animations.len() >= self.total
    }

    /// Bone count from the file header
    pub fn bone_count(&self) -> u32 {
        self.xmd.bone_count
    }

    /// Animations fully decoded so far
    pub fn animations(&self) -> &[Animation] {
        &self.xmd.animations
    }

    /// Consume the decoder, returning what has been decoded so far
    pub fn finish(self) -> Xmd {
        self.xmd
    }

    /// Drive the task to completion in the calling thread
    pub fn decode_to_end(mut self) -> Result<Xmd> {
        while let Progress::Pending { .. } = self.step()? {}
        Ok(self.xmd)
    }

    fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len() as u64;
        len.saturating_sub(self.cursor.position()) as usize
    }

    /// Run a read against the cursor, tagging failures with the offset the read started at
    fn read<T>(&mut self, f: impl FnOnce(&mut Cursor<&'a [u8]>) -> io::Result<T>) -> Result<T> {
        let offset = self.cursor.position();
        f(&mut self.cursor).map_err(|err| match err.kind() {
            io::ErrorKind::UnexpectedEof => Error::UnexpectedEof { offset },
            io::ErrorKind::InvalidData => Error::VarIntTooLong {
                offset,
                max: MAX_LEN,
            },
            _ => Error::IOError(err),
        })
    }

    fn read_f32(&mut self) -> Result<f32> {
        self.read(|c| c.read_f32::<LittleEndian>())
    }

    fn read_vec3(&mut self) -> Result<Vec3> {
        let mut xyz = [0f32; 3];
        self.read(|c| c.read_f32_into::<LittleEndian>(&mut xyz))?;
        Ok(Vec3::from_array(xyz))
    }

    fn read_quat(&mut self) -> Result<Quat> {
        let mut xyzw = [0f32; 4];
        self.read(|c| c.read_f32_into::<LittleEndian>(&mut xyzw))?;
        Ok(Quat::from_array(xyzw))
    }

    /// A byte length followed by that many bytes of UTF-16
    fn read_wide_string(&mut self) -> Result<String> {
        let len = self.read(|c| c.read_varint())?;
        let offset = self.cursor.position();
        if len % 2 != 0 {
            return Err(Error::OddStringLength { offset, len });
        }
        if len as usize > self.remaining() {
            return Err(Error::UnexpectedEof { offset });
        }

        let mut units = vec![0u16; len as usize / 2];
        self.read(|c| c.read_u16_into::<LittleEndian>(&mut units))?;
        Ok(U16String::from_vec(units).to_string_lossy())
    }

    fn read_animation_header(&mut self) -> Result<PartialAnimation> {
        let name = self.read_wide_string()?;
        let alt_name = self.read_wide_string()?;
        let duration = self.read_f32()?;
        let reserved = self.read(|c| c.read_u16::<LittleEndian>())?;
        let remaining = self.read(|c| c.read_varint())? as usize;
        debug!(%name, duration, keyframes = remaining, "animation");

        Ok(PartialAnimation {
            animation: Animation {
                name,
                alt_name,
                duration,
                reserved,
                keyframes: Vec::with_capacity(remaining.min(self.remaining() / 4)),
            },
            remaining,
        })
    }

    fn read_keyframe(&mut self) -> Result<Keyframe> {
        let time = self.read_f32()?;

        let count = self.read(|c| c.read_varint())? as usize;
        let mut scale_transforms =
            Vec::with_capacity(count.min(self.remaining() / SCALED_TRANSFORM_SIZE));
        for _ in 0..count {
            let rotation = self.read_quat()?;
            let scale = self.read_vec3()?;
            let position = self.read_vec3()?;
            scale_transforms.push(ScaledBoneTransform {
                rotation,
                scale,
                position,
            });
        }

        let count = self.read(|c| c.read_varint())? as usize;
        let mut transforms = Vec::with_capacity(count.min(self.remaining() / TRANSFORM_SIZE));
        for _ in 0..count {
            let rotation = self.read_quat()?;
            let position = self.read_vec3()?;
            transforms.push(BoneTransform { rotation, position });
        }

        Ok(Keyframe {
            time,
            scale_transforms,
            transforms,
        })
    }
}

/// Read the file header and the declared animation count without decoding any animation
pub fn read_header(data: &[u8]) -> Result<(u32, usize)> {
    let decoder = XmdDecoder::new(data)?;
    Ok((decoder.bone_count(), decoder.total))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use super::*;
    use crate::write::test::walk_cycle;

    #[test]
    #[traced_test]
    fn steps_in_batches() -> Result<()> {
        let xmd = walk_cycle();
        let bytes = xmd.to_bytes()?;

        let options = DecoderOptions::builder().batch_size(4).build();
        let mut decoder = XmdDecoder::with_options(&bytes, options)?;
        assert_eq!(decoder.bone_count(), 3);
        assert_eq!(
            decoder.progress(),
            Progress::Pending {
                animations: 0,
                total: 3,
                keyframes: 0
            }
        );

        // WALK has 6 keyframes, IDLE has none and TURN has 3
        assert_eq!(
            decoder.step()?,
            Progress::Pending {
                animations: 0,
                total: 3,
                keyframes: 4
            }
        );
        assert!(decoder.animations().is_empty());
        assert_eq!(
            decoder.step()?,
            Progress::Pending {
                animations: 2,
                total: 3,
                keyframes: 8
            }
        );
        assert_eq!(decoder.step()?, Progress::Complete);
        assert_eq!(decoder.step()?, Progress::Complete);
        assert_eq!(decoder.finish(), xmd);
        Ok(())
    }

    #[test]
    fn default_batch() -> Result<()> {
        assert_eq!(DecoderOptions::default().batch_size, 25);

        let bytes = walk_cycle().to_bytes()?;
        let mut decoder = XmdDecoder::new(&bytes)?;
        assert_eq!(decoder.step()?, Progress::Complete);
        assert_eq!(read_header(&bytes)?, (3, 3));
        Ok(())
    }

    #[test]
    fn rejects_magic() -> Result<()> {
        let mut bytes = walk_cycle().to_bytes()?;
        bytes[1] = b'c';
        let err = XmdDecoder::new(&bytes).unwrap_err();
        assert!(matches!(err, Error::InvalidMagic { ref found } if found.len() == 18));

        let err = XmdDecoder::new(&bytes[..5]).unwrap_err();
        assert!(matches!(err, Error::InvalidMagic { ref found } if found.len() == 5));
        Ok(())
    }

    #[test]
    #[traced_test]
    fn truncated_keyframe() -> Result<()> {
        let bytes = walk_cycle().to_bytes()?;
        let err = XmdDecoder::new(&bytes[..bytes.len() - 3])?
            .decode_to_end()
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof { offset } if offset as usize >= bytes.len() - 12));
        Ok(())
    }

    #[test]
    fn odd_name_length() -> Result<()> {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&[0x81, 0x83, b'a', 0, b'b']);

        let err = XmdDecoder::new(&bytes)?.decode_to_end().unwrap_err();
        assert!(matches!(err, Error::OddStringLength { offset: 28, len: 3 }));
        Ok(())
    }

    #[test]
    fn unterminated_count() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&[0; 8]);
        bytes.extend_from_slice(&[0x01; 6]);

        let err = XmdDecoder::new(&bytes).unwrap_err();
        assert!(matches!(
            err,
            Error::VarIntTooLong {
                offset: 26,
                max: 5
            }
        ));
    }

    #[test]
    fn count_ends_mid_varint() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&[0; 8]);
        bytes.extend_from_slice(&[0x01, 0x02]);

        let err = XmdDecoder::new(&bytes).unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof { offset: 26 }));
    }
}
