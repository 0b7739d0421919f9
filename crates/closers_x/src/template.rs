//! The closed set of templates data objects are built from.
//!
//! Templates declared inside a file are skipped by both parsers, objects can only be of a kind
//! listed in [`Kind`].

use std::fmt;

/// Primitive member types
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Scalar {
    /// 16 bit unsigned integer, stored as 32 bits in binary lists
    Word,
    /// 32 bit unsigned integer
    Dword,
    /// Float, with the width given by the file header
    Float,
    /// Quoted string
    String,
}

impl Scalar {
    /// Whether values are read as integers
    pub const fn is_integer(&self) -> bool {
        matches!(self, Scalar::Word | Scalar::Dword)
    }
}

/// Type of a template member, or of the elements of an array member
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValueKind {
    /// A primitive value
    Scalar(Scalar),
    /// A nested object, written without name or braces
    Object(Kind),
}

/// Where the element count of an array member comes from
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArraySize {
    /// Fixed number of elements
    Literal(usize),
    /// Value of a member declared earlier in the same template
    Member(&'static str),
}

/// A single member of a template
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Member {
    /// Property name
    pub name: &'static str,
    /// Type of the value, or of each element for arrays
    pub kind: ValueKind,
    /// Element count when the member is an array
    pub array: Option<ArraySize>,
}

/// Member layout and nesting rules of an object kind
#[derive(Debug, PartialEq, Eq)]
pub struct Template {
    /// The kind described
    pub kind: Kind,
    /// Members in declaration order
    pub members: &'static [Member],
    /// Whether objects accept children after their members
    pub open: bool,
    /// Kinds accepted as children, any kind when `None`
    pub allowed: Option<&'static [Kind]>,
}

impl Template {
    /// Whether a child object of `kind` may be inserted
    pub fn allows(&self, kind: Kind) -> bool {
        self.open && self.allowed.map_or(true, |allowed| allowed.contains(&kind))
    }
}

const fn scalar(name: &'static str, scalar: Scalar) -> Member {
    Member {
        name,
        kind: ValueKind::Scalar(scalar),
        array: None,
    }
}

const fn object(name: &'static str, kind: Kind) -> Member {
    Member {
        name,
        kind: ValueKind::Object(kind),
        array: None,
    }
}

const fn array(name: &'static str, kind: ValueKind, size: ArraySize) -> Member {
    Member {
        name,
        kind,
        array: Some(size),
    }
}

const DWORD: ValueKind = ValueKind::Scalar(Scalar::Dword);
const FLOAT: ValueKind = ValueKind::Scalar(Scalar::Float);

macro_rules! kinds {
    ($($kind:ident),+ $(,)?) => {
        /// Every object kind with a known template
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Kind {
            $(
                #[allow(missing_docs)]
                $kind,
            )+
        }

        impl Kind {
            /// Every kind
            pub const ALL: &'static [Kind] = &[$(Kind::$kind),+];

            /// Name used for the kind in files
            pub const fn name(&self) -> &'static str {
                match self {
                    $(Kind::$kind => stringify!($kind),)+
                }
            }
        }
    };
}

kinds! {
    Animation,
    AnimationKey,
    AnimationOptions,
    AnimationSet,
    AnimTicksPerSecond,
    BumpMapFilename,
    ColorRGB,
    ColorRGBA,
    Coords2d,
    EmissiveMapFilename,
    FloatKeys,
    Frame,
    FrameTransformMatrix,
    FVFData,
    Header,
    IndexedColor,
    LightMapFilename,
    Material,
    Matrix4x4,
    Mesh,
    MeshFace,
    MeshMaterialList,
    MeshNormals,
    MeshTextureCoords,
    MeshVertexColors,
    NormalMapFilename,
    SkinWeights,
    TextureFilename,
    TimedFloatKeys,
    Vector,
    VertexDuplicationIndices,
    XSkinMeshHeader,
}

impl Kind {
    /// Look up a kind by the name used in files
    pub fn from_name(name: &str) -> Option<Kind> {
        Kind::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// The template describing this kind
    pub fn template(&self) -> &'static Template {
        match self {
            Kind::Animation => &ANIMATION,
            Kind::AnimationKey => &ANIMATION_KEY,
            Kind::AnimationOptions => &ANIMATION_OPTIONS,
            Kind::AnimationSet => &ANIMATION_SET,
            Kind::AnimTicksPerSecond => &ANIM_TICKS_PER_SECOND,
            Kind::BumpMapFilename => &BUMP_MAP_FILENAME,
            Kind::ColorRGB => &COLOR_RGB,
            Kind::ColorRGBA => &COLOR_RGBA,
            Kind::Coords2d => &COORDS_2D,
            Kind::EmissiveMapFilename => &EMISSIVE_MAP_FILENAME,
            Kind::FloatKeys => &FLOAT_KEYS,
            Kind::Frame => &FRAME,
            Kind::FrameTransformMatrix => &FRAME_TRANSFORM_MATRIX,
            Kind::FVFData => &FVF_DATA,
            Kind::Header => &HEADER,
            Kind::IndexedColor => &INDEXED_COLOR,
            Kind::LightMapFilename => &LIGHT_MAP_FILENAME,
            Kind::Material => &MATERIAL,
            Kind::Matrix4x4 => &MATRIX_4X4,
            Kind::Mesh => &MESH,
            Kind::MeshFace => &MESH_FACE,
            Kind::MeshMaterialList => &MESH_MATERIAL_LIST,
            Kind::MeshNormals => &MESH_NORMALS,
            Kind::MeshTextureCoords => &MESH_TEXTURE_COORDS,
            Kind::MeshVertexColors => &MESH_VERTEX_COLORS,
            Kind::NormalMapFilename => &NORMAL_MAP_FILENAME,
            Kind::SkinWeights => &SKIN_WEIGHTS,
            Kind::TextureFilename => &TEXTURE_FILENAME,
            Kind::TimedFloatKeys => &TIMED_FLOAT_KEYS,
            Kind::Vector => &VECTOR,
            Kind::VertexDuplicationIndices => &VERTEX_DUPLICATION_INDICES,
            Kind::XSkinMeshHeader => &XSKIN_MESH_HEADER,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

macro_rules! template {
    ($kind:ident, [$($member:expr),* $(,)?] $(,)?) => {
        Template {
            kind: Kind::$kind,
            members: &[$($member),*],
            open: false,
            allowed: None,
        }
    };
    ($kind:ident, open $allowed:expr, [$($member:expr),* $(,)?] $(,)?) => {
        Template {
            kind: Kind::$kind,
            members: &[$($member),*],
            open: true,
            allowed: $allowed,
        }
    };
}

const FILENAME: Member = scalar("filename", Scalar::String);

static ANIMATION: Template = template!(Animation, open None, []);

static ANIMATION_KEY: Template = template!(
    AnimationKey,
    [
        scalar("keyType", Scalar::Dword),
        scalar("nKeys", Scalar::Dword),
        array(
            "keys",
            ValueKind::Object(Kind::TimedFloatKeys),
            ArraySize::Member("nKeys"),
        ),
    ],
);

static ANIMATION_OPTIONS: Template = template!(
    AnimationOptions,
    [
        scalar("openclosed", Scalar::Dword),
        scalar("positionquality", Scalar::Dword),
    ],
);

static ANIMATION_SET: Template = template!(AnimationSet, open Some(&[Kind::Animation]), []);

static ANIM_TICKS_PER_SECOND: Template = template!(
    AnimTicksPerSecond,
    [scalar("AnimTicksPerSecond", Scalar::Dword)],
);

static BUMP_MAP_FILENAME: Template = template!(BumpMapFilename, [FILENAME]);

static COLOR_RGB: Template = template!(
    ColorRGB,
    [
        scalar("red", Scalar::Float),
        scalar("green", Scalar::Float),
        scalar("blue", Scalar::Float),
    ],
);

static COLOR_RGBA: Template = template!(
    ColorRGBA,
    [
        scalar("red", Scalar::Float),
        scalar("green", Scalar::Float),
        scalar("blue", Scalar::Float),
        scalar("alpha", Scalar::Float),
    ],
);

static COORDS_2D: Template = template!(
    Coords2d,
    [scalar("u", Scalar::Float), scalar("v", Scalar::Float)],
);

static EMISSIVE_MAP_FILENAME: Template = template!(EmissiveMapFilename, [FILENAME]);

static FLOAT_KEYS: Template = template!(
    FloatKeys,
    [
        scalar("nValues", Scalar::Dword),
        array("values", FLOAT, ArraySize::Member("nValues")),
    ],
);

static FRAME: Template = template!(Frame, open None, []);

static FRAME_TRANSFORM_MATRIX: Template = template!(
    FrameTransformMatrix,
    [object("frameMatrix", Kind::Matrix4x4)],
);

static FVF_DATA: Template = template!(
    FVFData,
    [
        scalar("dwFVF", Scalar::Dword),
        scalar("nDWords", Scalar::Dword),
        array("data", DWORD, ArraySize::Member("nDWords")),
    ],
);

static HEADER: Template = template!(
    Header,
    [
        scalar("major", Scalar::Word),
        scalar("minor", Scalar::Word),
        scalar("flags", Scalar::Dword),
    ],
);

static INDEXED_COLOR: Template = template!(
    IndexedColor,
    [
        scalar("index", Scalar::Dword),
        object("indexColor", Kind::ColorRGBA),
    ],
);

static LIGHT_MAP_FILENAME: Template = template!(LightMapFilename, [FILENAME]);

static MATERIAL: Template = template!(
    Material,
    open None,
    [
        object("faceColor", Kind::ColorRGBA),
        scalar("power", Scalar::Float),
        object("specularColor", Kind::ColorRGB),
        object("emissiveColor", Kind::ColorRGB),
    ],
);

static MATRIX_4X4: Template = template!(
    Matrix4x4,
    [array("matrix", FLOAT, ArraySize::Literal(16))],
);

static MESH: Template = template!(
    Mesh,
    open None,
    [
        scalar("nVertices", Scalar::Dword),
        array(
            "vertices",
            ValueKind::Object(Kind::Vector),
            ArraySize::Member("nVertices"),
        ),
        scalar("nFaces", Scalar::Dword),
        array(
            "faces",
            ValueKind::Object(Kind::MeshFace),
            ArraySize::Member("nFaces"),
        ),
    ],
);

static MESH_FACE: Template = template!(
    MeshFace,
    [
        scalar("nFaceVertexIndices", Scalar::Dword),
        array(
            "faceVertexIndices",
            DWORD,
            ArraySize::Member("nFaceVertexIndices"),
        ),
    ],
);

static MESH_MATERIAL_LIST: Template = template!(
    MeshMaterialList,
    open Some(&[Kind::Material]),
    [
        scalar("nMaterials", Scalar::Dword),
        scalar("nFaceIndices", Scalar::Dword),
        array("faceIndices", DWORD, ArraySize::Member("nFaceIndices")),
    ],
);

static MESH_NORMALS: Template = template!(
    MeshNormals,
    [
        scalar("nNormals", Scalar::Dword),
        array(
            "normals",
            ValueKind::Object(Kind::Vector),
            ArraySize::Member("nNormals"),
        ),
        scalar("nFaceNormals", Scalar::Dword),
        array(
            "faceNormals",
            ValueKind::Object(Kind::MeshFace),
            ArraySize::Member("nFaceNormals"),
        ),
    ],
);

static MESH_TEXTURE_COORDS: Template = template!(
    MeshTextureCoords,
    [
        scalar("nTextureCoords", Scalar::Dword),
        array(
            "textureCoords",
            ValueKind::Object(Kind::Coords2d),
            ArraySize::Member("nTextureCoords"),
        ),
    ],
);

static MESH_VERTEX_COLORS: Template = template!(
    MeshVertexColors,
    [
        scalar("nVertexColors", Scalar::Dword),
        array(
            "vertexColors",
            ValueKind::Object(Kind::IndexedColor),
            ArraySize::Member("nVertexColors"),
        ),
    ],
);

static NORMAL_MAP_FILENAME: Template = template!(NormalMapFilename, [FILENAME]);

static SKIN_WEIGHTS: Template = template!(
    SkinWeights,
    [
        scalar("transformNodeName", Scalar::String),
        scalar("nWeights", Scalar::Dword),
        array("vertexIndices", DWORD, ArraySize::Member("nWeights")),
        array("weights", FLOAT, ArraySize::Member("nWeights")),
        object("matrixOffset", Kind::Matrix4x4),
    ],
);

static TEXTURE_FILENAME: Template = template!(TextureFilename, [FILENAME]);

static TIMED_FLOAT_KEYS: Template = template!(
    TimedFloatKeys,
    [
        scalar("time", Scalar::Dword),
        object("tfkeys", Kind::FloatKeys),
    ],
);

static VECTOR: Template = template!(
    Vector,
    [
        scalar("x", Scalar::Float),
        scalar("y", Scalar::Float),
        scalar("z", Scalar::Float),
    ],
);

static VERTEX_DUPLICATION_INDICES: Template = template!(
    VertexDuplicationIndices,
    [
        scalar("nIndices", Scalar::Dword),
        scalar("nOriginalVertices", Scalar::Dword),
        array("indices", DWORD, ArraySize::Member("nIndices")),
    ],
);

static XSKIN_MESH_HEADER: Template = template!(
    XSkinMeshHeader,
    [
        scalar("nMaxSkinWeightsPerVertex", Scalar::Word),
        scalar("nMaxSkinWeightsPerFace", Scalar::Word),
        scalar("nBones", Scalar::Word),
    ],
);
