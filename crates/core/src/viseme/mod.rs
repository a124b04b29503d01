//! Static viseme table.
//!
//! Viseme ids arrive on the wire as bare integers in `0..=21`. They are turned
//! into [`Viseme`] at the boundary; anything outside the range is treated as
//! silence.

use serde::Serialize;

use crate::BlendShape::{self, *};

/// Phonetic class of a mouth shape, numbered as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum Viseme {
    /// Mouth at rest.
    Silence = 0,
    /// æ, ə, ʌ
    Ae = 1,
    /// ɑ
    Aa = 2,
    /// ɔ
    Ao = 3,
    /// ɛ, ʊ
    Eh = 4,
    /// ɝ
    Er = 5,
    /// j, i, ɪ
    Iy = 6,
    /// w, u
    Uw = 7,
    /// o
    Ow = 8,
    /// aʊ
    Aw = 9,
    /// ɔɪ
    Oy = 10,
    /// aɪ
    Ay = 11,
    /// h
    H = 12,
    /// ɹ
    R = 13,
    /// l
    L = 14,
    /// s, z
    S = 15,
    /// ʃ, tʃ, dʒ, ʒ
    Sh = 16,
    /// ð
    Th = 17,
    /// f, v
    F = 18,
    /// d, t, n, θ
    D = 19,
    /// k, g, ŋ
    K = 20,
    /// p, b, m
    P = 21,
}

impl Viseme {
    pub const ALL: [Viseme; 22] = [
        Viseme::Silence,
        Viseme::Ae,
        Viseme::Aa,
        Viseme::Ao,
        Viseme::Eh,
        Viseme::Er,
        Viseme::Iy,
        Viseme::Uw,
        Viseme::Ow,
        Viseme::Aw,
        Viseme::Oy,
        Viseme::Ay,
        Viseme::H,
        Viseme::R,
        Viseme::L,
        Viseme::S,
        Viseme::Sh,
        Viseme::Th,
        Viseme::F,
        Viseme::D,
        Viseme::K,
        Viseme::P,
    ];

    /// Converts a wire id, returning `None` outside `0..=21`.
    pub fn from_id(id: i32) -> Option<Self> {
        usize::try_from(id)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }

    /// Converts a wire id, mapping unknown ids to [`Viseme::Silence`].
    pub fn from_id_or_silence(id: i32) -> Self {
        Self::from_id(id).unwrap_or(Viseme::Silence)
    }

    pub fn id(self) -> i32 {
        self as i32
    }

    /// IPA symbols covered by this class.
    pub fn phonemes(self) -> &'static str {
        match self {
            Viseme::Silence => "",
            Viseme::Ae => "æ ə ʌ",
            Viseme::Aa => "ɑ",
            Viseme::Ao => "ɔ",
            Viseme::Eh => "ɛ ʊ",
            Viseme::Er => "ɝ",
            Viseme::Iy => "j i ɪ",
            Viseme::Uw => "w u",
            Viseme::Ow => "o",
            Viseme::Aw => "aʊ",
            Viseme::Oy => "ɔɪ",
            Viseme::Ay => "aɪ",
            Viseme::H => "h",
            Viseme::R => "ɹ",
            Viseme::L => "l",
            Viseme::S => "s z",
            Viseme::Sh => "ʃ tʃ dʒ ʒ",
            Viseme::Th => "ð",
            Viseme::F => "f v",
            Viseme::D => "d t n θ",
            Viseme::K => "k g ŋ",
            Viseme::P => "p b m",
        }
    }

    /// Blend shapes this viseme drives and their nominal weights.
    ///
    /// The weights describe the mouth shape but the lip-sync driver only uses
    /// them as a presence mask.
    pub fn contributions(self) -> &'static [(BlendShape, f32)] {
        match self {
            Viseme::Silence => &[(VisemeSil, 1.0)],
            Viseme::Ae => &[(VisemePP, 0.8), (VisemeFF, 0.2)],
            Viseme::Aa => &[(VisemeAA, 1.0)],
            Viseme::Ao => &[(VisemeAA, 0.6), (VisemeO, 0.4)],
            Viseme::Eh => &[(VisemeE, 0.8), (VisemeI, 0.2)],
            Viseme::Er => &[(VisemeE, 0.5), (VisemeRR, 0.5)],
            Viseme::Iy => &[(VisemeI, 0.8), (VisemeE, 0.2)],
            Viseme::Uw => &[(VisemeU, 0.8), (VisemeO, 0.2)],
            Viseme::Ow => &[(VisemeO, 1.0)],
            Viseme::Aw => &[(VisemeAA, 0.5), (VisemeU, 0.5)],
            Viseme::Oy => &[(VisemeO, 0.6), (VisemeI, 0.4)],
            Viseme::Ay => &[(VisemeAA, 0.6), (VisemeI, 0.4)],
            Viseme::H => &[(VisemeKK, 0.6), (VisemeNN, 0.4)],
            Viseme::R => &[(VisemeRR, 1.0)],
            Viseme::L => &[(VisemeNN, 0.8), (VisemeDD, 0.2)],
            Viseme::S => &[(VisemeSS, 0.8), (VisemeTH, 0.2)],
            Viseme::Sh => &[(VisemeCH, 0.8), (VisemeSS, 0.2)],
            Viseme::Th => &[(VisemeTH, 1.0)],
            Viseme::F => &[(VisemeFF, 1.0)],
            Viseme::D => &[(VisemeDD, 0.8), (VisemeNN, 0.2)],
            Viseme::K => &[(VisemeKK, 1.0)],
            Viseme::P => &[(VisemePP, 1.0)],
        }
    }

    /// Heuristic jaw opening for this viseme before intensity scaling.
    pub fn jaw_open_amount(self) -> f32 {
        let id = self.id();
        if id == 0 {
            0.0
        } else if (10..=14).contains(&id) {
            // wide open vowels
            0.6 + (id - 10) as f32 * 0.08
        } else if (1..=2).contains(&id) {
            0.1
        } else if matches!(id, 7 | 11 | 12) {
            // 11 and 12 never get here, the wide-open branch claims them first
            0.3
        } else {
            0.25 + id as f32 * 0.03
        }
    }
}

/// Contribution weights for any wire id, falling back to silence.
pub fn contributions_for(id: i32) -> &'static [(BlendShape, f32)] {
    Viseme::from_id_or_silence(id).contributions()
}

/// Jaw opening for any wire id, falling back to silence.
pub fn jaw_open_amount_for(id: i32) -> f32 {
    Viseme::from_id_or_silence(id).jaw_open_amount()
}

/// Serializable row of the viseme table, used by tooling.
#[derive(Debug, Clone, Serialize)]
pub struct VisemeDescriptor {
    pub id: i32,
    pub viseme: Viseme,
    pub phonemes: &'static str,
    pub contributions: Vec<(&'static str, f32)>,
    pub jaw_open: f32,
}

impl From<Viseme> for VisemeDescriptor {
    fn from(viseme: Viseme) -> Self {
        Self {
            id: viseme.id(),
            viseme,
            phonemes: viseme.phonemes(),
            contributions: viseme
                .contributions()
                .iter()
                .map(|(shape, weight)| (shape.name(), *weight))
                .collect(),
            jaw_open: viseme.jaw_open_amount(),
        }
    }
}

/// The whole table in id order.
pub fn viseme_table() -> Vec<VisemeDescriptor> {
    Viseme::ALL.iter().copied().map(VisemeDescriptor::from).collect()
}
