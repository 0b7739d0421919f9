use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use glam::{Quat, Vec3};

use crate::{
    error::{Error, Result},
    types::{Animation, Keyframe, Xmd, MAGIC},
    varint::WriteVarIntExt,
};

impl Xmd {
    /// Write the file in the layout read by [`crate::read::XmdDecoder`]
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_u32::<LittleEndian>(self.bone_count)?;
        writer.write_u32::<LittleEndian>(self.reserved)?;
        write_count(writer, self.animations.len())?;
        for animation in &self.animations {
            write_animation(writer, animation)?;
        }
        Ok(())
    }

    /// Encode the whole file into a buffer
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write(&mut out)?;
        Ok(out)
    }
}

fn write_count<W: Write>(writer: &mut W, count: usize) -> Result<()> {
    let count = u32::try_from(count)
        .map_err(|_| Error::CustomError(format!("count {count} does not fit in a u32")))?;
    writer.write_varint(count)?;
    Ok(())
}

fn write_wide_string<W: Write>(writer: &mut W, value: &str) -> Result<()> {
    let units: Vec<u16> = value.encode_utf16().collect();
    write_count(writer, units.len() * 2)?;
    for unit in units {
        writer.write_u16::<LittleEndian>(unit)?;
    }
    Ok(())
}

fn write_floats<W: Write>(writer: &mut W, values: &[f32]) -> Result<()> {
    for value in values {
        writer.write_f32::<LittleEndian>(*value)?;
    }
    Ok(())
}

fn write_rotation<W: Write>(writer: &mut W, rotation: Quat) -> Result<()> {
    write_floats(writer, &rotation.to_array())
}

fn write_vec3<W: Write>(writer: &mut W, value: Vec3) -> Result<()> {
    write_floats(writer, &value.to_array())
}

fn write_animation<W: Write>(writer: &mut W, animation: &Animation) -> Result<()> {
    write_wide_string(writer, &animation.name)?;
    write_wide_string(writer, &animation.alt_name)?;
    writer.write_f32::<LittleEndian>(animation.duration)?;
    writer.write_u16::<LittleEndian>(animation.reserved)?;
    write_count(writer, animation.keyframes.len())?;
    for keyframe in &animation.keyframes {
        write_keyframe(writer, keyframe)?;
    }
    Ok(())
}

fn write_keyframe<W: Write>(writer: &mut W, keyframe: &Keyframe) -> Result<()> {
    writer.write_f32::<LittleEndian>(keyframe.time)?;

    write_count(writer, keyframe.scale_transforms.len())?;
    for transform in &keyframe.scale_transforms {
        write_rotation(writer, transform.rotation)?;
        write_vec3(writer, transform.scale)?;
        write_vec3(writer, transform.position)?;
    }

    write_count(writer, keyframe.transforms.len())?;
    for transform in &keyframe.transforms {
        write_rotation(writer, transform.rotation)?;
        write_vec3(writer, transform.position)?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::types::{BoneTransform, ScaledBoneTransform};

    /// Three bones with a scaled walk, an empty idle and an unscaled turn
    pub(crate) fn walk_cycle() -> Xmd {
        let walk = (0..6)
            .map(|i| {
                let t = i as f32 * 0.2;
                Keyframe {
                    time: t,
                    scale_transforms: (0..3)
                        .map(|bone| {
                            ScaledBoneTransform::new(
                                Quat::from_rotation_y(t + bone as f32),
                                Vec3::ONE,
                                Vec3::new(bone as f32, t, 0.0),
                            )
                        })
                        .collect(),
                    transforms: vec![],
                }
            })
            .collect();

        let turn = (0..3)
            .map(|i| {
                let t = i as f32 * 0.5;
                Keyframe {
                    time: t,
                    scale_transforms: vec![],
                    transforms: (0..3)
                        .map(|bone| {
                            BoneTransform::new(
                                Quat::from_rotation_z(t),
                                Vec3::new(0.0, bone as f32, -t),
                            )
                        })
                        .collect(),
                }
            })
            .collect();

        Xmd {
            bone_count: 3,
            reserved: 7,
            animations: vec![
                Animation {
                    name: "WALK".into(),
                    alt_name: "walk_01".into(),
                    duration: 1.0,
                    reserved: 1,
                    keyframes: walk,
                },
                Animation {
                    name: "IDLE".into(),
                    alt_name: String::new(),
                    duration: 0.0,
                    reserved: 0,
                    keyframes: vec![],
                },
                Animation {
                    name: "TURN".into(),
                    alt_name: "턴".into(),
                    duration: 1.0,
                    reserved: 0,
                    keyframes: turn,
                },
            ],
        }
    }

    #[test]
    fn header_layout() -> Result<()> {
        let xmd = Xmd {
            bone_count: 2,
            reserved: 0,
            animations: vec![Animation {
                name: "A".into(),
                alt_name: "".into(),
                duration: 0.5,
                reserved: 0,
                keyframes: vec![Keyframe {
                    time: 0.0,
                    scale_transforms: vec![],
                    transforms: vec![],
                }],
            }],
        };

        let bytes = xmd.to_bytes()?;
        assert_eq!(&bytes[..18], &MAGIC);
        assert_eq!(
            &bytes[18..],
            &[
                2, 0, 0, 0, // bones
                0, 0, 0, 0, // reserved
                0x81, // animations
                0x82, b'A', 0, // name
                0x80, // alt name
                0, 0, 0, 0x3F, // duration
                0, 0, // reserved
                0x81, // keyframes
                0, 0, 0, 0, // time
                0x80, 0x80, // transform counts
            ]
        );
        Ok(())
    }

    #[test]
    fn wide_names() -> Result<()> {
        let bytes = walk_cycle().to_bytes()?;
        let decoded = crate::decode(&bytes)?;
        assert_eq!(decoded.animations[2].alt_name, "턴");
        assert_eq!(decoded, walk_cycle());
        Ok(())
    }
}
