// Pitch classes: the twelve semitone names in a fixed cyclic order.
//
// All pitch arithmetic in the crate goes through `PitchClass`, which wraps
// modulo 12. Sharps are the canonical spelling; flats and the odd enharmonics
// (Cb, Fb, E#, B#) are accepted on input and normalized away.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the 12 semitone names, C = 0 through B = 11.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PitchClass {
    C = 0,
    CSharp = 1,
    D = 2,
    DSharp = 3,
    E = 4,
    F = 5,
    FSharp = 6,
    G = 7,
    GSharp = 8,
    A = 9,
    ASharp = 10,
    B = 11,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Semitones above C (0-11).
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(semitones: u8) -> Self {
        PitchClass::ALL[(semitones % 12) as usize]
    }

    /// Pitch class of a MIDI note number.
    pub fn from_midi(key: u8) -> Self {
        PitchClass::from_index(key % 12)
    }

    /// Move up (or down, for negative values) by a number of semitones.
    pub fn transpose(self, semitones: i32) -> Self {
        let pc = (self.index() as i32 + semitones).rem_euclid(12);
        PitchClass::from_index(pc as u8)
    }

    /// Upward semitone distance from `self` to `other`, in 0..12.
    pub fn interval_to(self, other: PitchClass) -> u8 {
        (other.index() + 12 - self.index()) % 12
    }

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PitchClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        let natural = match chars.next() {
            Some('C') => 0,
            Some('D') => 2,
            Some('E') => 4,
            Some('F') => 5,
            Some('G') => 7,
            Some('A') => 9,
            Some('B') => 11,
            _ => return Err(Error::UnknownPitch(s.to_string())),
        };
        let accidental = match chars.as_str() {
            "" => 0,
            "#" => 1,
            "b" => -1,
            _ => return Err(Error::UnknownPitch(s.to_string())),
        };
        Ok(PitchClass::from_index(natural).transpose(accidental))
    }
}
