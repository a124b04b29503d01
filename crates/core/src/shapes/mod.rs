use std::{fmt, str::FromStr};

use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::AvatarError;

macro_rules! blend_shapes {
    ($($variant:ident => $name:literal,)+) => {
        /// Named facial deformation channel a mesh may expose.
        ///
        /// The set is closed: every generator writes only to these names, and
        /// meshes declare which of them they carry.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum BlendShape {
            $($variant,)+
        }

        impl BlendShape {
            /// Every shape, in declaration order.
            pub const ALL: &'static [BlendShape] = &[$(BlendShape::$variant,)+];

            /// The morph target name used by ARKit-style rigs.
            pub fn name(self) -> &'static str {
                match self {
                    $(BlendShape::$variant => $name,)+
                }
            }
        }

        impl FromStr for BlendShape {
            type Err = AvatarError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(BlendShape::$variant),)+
                    _ => Err(AvatarError::UnknownBlendShape(s.to_string())),
                }
            }
        }
    };
}

blend_shapes! {
    VisemeSil => "viseme_sil",
    VisemePP => "viseme_PP",
    VisemeFF => "viseme_FF",
    VisemeTH => "viseme_TH",
    VisemeDD => "viseme_DD",
    VisemeKK => "viseme_kk",
    VisemeCH => "viseme_CH",
    VisemeSS => "viseme_SS",
    VisemeNN => "viseme_nn",
    VisemeRR => "viseme_RR",
    VisemeAA => "viseme_aa",
    VisemeE => "viseme_E",
    VisemeI => "viseme_I",
    VisemeO => "viseme_O",
    VisemeU => "viseme_U",
    EyeBlinkLeft => "eyeBlinkLeft",
    EyeBlinkRight => "eyeBlinkRight",
    EyeLookUpLeft => "eyeLookUpLeft",
    EyeLookUpRight => "eyeLookUpRight",
    EyeLookDownLeft => "eyeLookDownLeft",
    EyeLookDownRight => "eyeLookDownRight",
    EyeLookInLeft => "eyeLookInLeft",
    EyeLookInRight => "eyeLookInRight",
    EyeLookOutLeft => "eyeLookOutLeft",
    EyeLookOutRight => "eyeLookOutRight",
    BrowInnerUp => "browInnerUp",
    BrowDownLeft => "browDownLeft",
    BrowDownRight => "browDownRight",
    BrowOuterUpLeft => "browOuterUpLeft",
    BrowOuterUpRight => "browOuterUpRight",
    MouthSmileLeft => "mouthSmileLeft",
    MouthSmileRight => "mouthSmileRight",
    MouthFrownLeft => "mouthFrownLeft",
    MouthFrownRight => "mouthFrownRight",
    JawOpen => "jawOpen",
}

impl BlendShape {
    /// Number of shapes in the closed set.
    pub const COUNT: usize = BlendShape::ALL.len();

    /// Whether this is one of the `viseme_*` lip-sync shapes.
    pub fn is_viseme(self) -> bool {
        self.index() <= BlendShape::VisemeU.index()
    }

    /// Shapes owned by the lip-sync driver: every viseme plus the jaw.
    pub fn is_lip_sync(self) -> bool {
        self.is_viseme() || self == BlendShape::JawOpen
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for BlendShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dense mapping from every [`BlendShape`] to a weight.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMap {
    values: [f32; BlendShape::COUNT],
}

impl Default for WeightMap {
    fn default() -> Self {
        Self {
            values: [0.0; BlendShape::COUNT],
        }
    }
}

impl WeightMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, shape: BlendShape) -> f32 {
        self.values[shape.index()]
    }

    pub fn set(&mut self, shape: BlendShape, value: f32) {
        self.values[shape.index()] = value;
    }

    /// Resets every weight to zero.
    pub fn clear(&mut self) {
        self.values = [0.0; BlendShape::COUNT];
    }

    /// Zeroes every `viseme_*` weight, leaving the rest untouched.
    pub fn clear_visemes(&mut self) {
        for shape in BlendShape::ALL.iter().copied().filter(|s| s.is_viseme()) {
            self.set(shape, 0.0);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlendShape, f32)> + '_ {
        BlendShape::ALL
            .iter()
            .map(move |shape| (*shape, self.values[shape.index()]))
    }
}

impl Serialize for WeightMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(BlendShape::COUNT))?;
        for (shape, value) in self.iter() {
            map.serialize_entry(shape.name(), &value)?;
        }
        map.end()
    }
}

/// The subset of blend shapes a mesh exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShapeSet {
    bits: u64,
}

impl ShapeSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        BlendShape::ALL.iter().copied().collect()
    }

    /// Builds a set from morph target names, ignoring names outside the
    /// closed set.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        names
            .into_iter()
            .filter_map(|name| name.parse::<BlendShape>().ok())
            .collect()
    }

    pub fn insert(&mut self, shape: BlendShape) {
        self.bits |= 1u64 << shape.index();
    }

    pub fn contains(&self, shape: BlendShape) -> bool {
        self.bits & (1u64 << shape.index()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = BlendShape> + '_ {
        BlendShape::ALL
            .iter()
            .copied()
            .filter(move |shape| self.contains(*shape))
    }
}

impl FromIterator<BlendShape> for ShapeSet {
    fn from_iter<I: IntoIterator<Item = BlendShape>>(iter: I) -> Self {
        let mut set = ShapeSet::empty();
        for shape in iter {
            set.insert(shape);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_set_has_expected_groups() {
        assert_eq!(BlendShape::COUNT, 35);
        let visemes = BlendShape::ALL.iter().filter(|s| s.is_viseme()).count();
        assert_eq!(visemes, 15);
        assert!(!BlendShape::JawOpen.is_viseme());
        assert!(BlendShape::JawOpen.is_lip_sync());
        assert!(!BlendShape::EyeBlinkLeft.is_lip_sync());
    }

    #[test]
    fn names_parse_back() {
        for shape in BlendShape::ALL {
            assert_eq!(shape.name().parse::<BlendShape>().unwrap(), *shape);
        }

        let err = "viseme_XX".parse::<BlendShape>().unwrap_err();
        assert!(format!("{err}").contains("viseme_XX"));
    }

    #[test]
    fn clear_visemes_keeps_other_shapes() {
        let mut map = WeightMap::new();
        map.set(BlendShape::VisemeAA, 0.5);
        map.set(BlendShape::JawOpen, 0.3);
        map.set(BlendShape::EyeBlinkLeft, 0.7);

        map.clear_visemes();

        assert_eq!(map.get(BlendShape::VisemeAA), 0.0);
        assert_eq!(map.get(BlendShape::JawOpen), 0.3);
        assert_eq!(map.get(BlendShape::EyeBlinkLeft), 0.7);
    }

    #[test]
    fn shape_set_ignores_unknown_names() {
        let set = ShapeSet::from_names(["jawOpen", "eyeBlinkLeft", "tongueOut"]);

        assert_eq!(set.len(), 2);
        assert!(set.contains(BlendShape::JawOpen));
        assert!(!set.contains(BlendShape::VisemeSil));
        assert_eq!(ShapeSet::all().len(), BlendShape::COUNT);
    }

    #[test]
    fn weight_map_serializes_by_name() {
        let mut map = WeightMap::new();
        map.set(BlendShape::JawOpen, 0.25);

        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["jawOpen"], 0.25);
        assert_eq!(json["viseme_sil"], 0.0);
    }
}
