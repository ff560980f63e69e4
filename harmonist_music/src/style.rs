// Rendering styles.
//
// A style fixes the General MIDI programs of the two output tracks and where
// the chord track sits relative to the melody: its octave and its loudness,
// both derived from melody statistics. Styles are numbered 0-5 on the command
// line in declaration order.

use crate::error::{Error, Result};
use crate::melody::Melody;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    #[default]
    Piano,
    Guitar,
    Orchestra,
    Japanese,
    Xylophone,
    Choir,
}

impl Style {
    pub const ALL: [Style; 6] = [
        Style::Piano,
        Style::Guitar,
        Style::Orchestra,
        Style::Japanese,
        Style::Xylophone,
        Style::Choir,
    ];

    pub fn from_index(index: usize) -> Option<Style> {
        Style::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Style::Piano => "piano",
            Style::Guitar => "guitar",
            Style::Orchestra => "orchestra",
            Style::Japanese => "japanese",
            Style::Xylophone => "xylophone",
            Style::Choir => "choir",
        }
    }

    /// GM program of the chord track.
    pub fn chord_program(self) -> u8 {
        match self {
            Style::Piano => 4,      // electric piano
            Style::Guitar => 24,    // nylon guitar
            Style::Orchestra => 42, // cello
            Style::Japanese => 73,  // flute
            Style::Xylophone => 13,
            Style::Choir => 52, // choir aahs
        }
    }

    /// GM program of the melody track.
    pub fn melody_program(self) -> u8 {
        match self {
            Style::Piano => 4,
            Style::Guitar => 24,
            Style::Orchestra => 40, // violin
            Style::Japanese => 107, // koto
            Style::Xylophone => 13,
            Style::Choir => 14, // tubular bells
        }
    }

    /// Base octave of the chord track. Chord notes add their own offset.
    pub fn chord_octave(self, melody: &Melody) -> i8 {
        match self {
            Style::Japanese => melody.average_octave() - 1,
            Style::Choir => melody.highest_octave(),
            _ => melody.lowest_octave() - 1,
        }
    }

    /// Velocity of every chord note.
    pub fn chord_volume(self, melody: &Melody) -> u8 {
        let avg = melody.average_volume() as i32;
        let volume = match self {
            Style::Piano => avg,
            Style::Guitar => (avg + 4).min(127),
            Style::Orchestra => (avg - 10).max(16),
            Style::Japanese => (avg + 20).min(127),
            Style::Xylophone | Style::Choir => (avg - 8).max(16),
        };
        volume.clamp(0, 127) as u8
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts a style number (`0`-`5`) or a name (`"guitar"`).
impl FromStr for Style {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(index) = s.parse::<usize>() {
            return Style::from_index(index)
                .ok_or_else(|| Error::Config(format!("style number must be 0-5, got {index}")));
        }
        Style::ALL
            .iter()
            .copied()
            .find(|style| style.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Config(format!("unknown style '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;
    use crate::melody::MelodyEvent;
    use crate::pitch::PitchClass;

    fn melody() -> Melody {
        // Octaves 3, 4, 5, 5 -> lowest 3, average 4, highest 5.
        // Volumes 60, 70, 80, 90 -> average 75.
        let events = vec![
            MelodyEvent::note(PitchClass::C, 3, 60, 0.0, 1.0),
            MelodyEvent::note(PitchClass::E, 4, 70, 1.0, 1.0),
            MelodyEvent::note(PitchClass::G, 5, 80, 2.0, 1.0),
            MelodyEvent::note(PitchClass::C, 5, 90, 3.0, 1.0),
        ];
        Melody::new(events, Key::parse("C").unwrap()).unwrap()
    }

    #[test]
    fn test_chord_octaves() {
        let m = melody();
        let octaves: Vec<i8> = Style::ALL.iter().map(|s| s.chord_octave(&m)).collect();
        assert_eq!(octaves, vec![2, 2, 2, 3, 2, 5]);
    }

    #[test]
    fn test_chord_volumes() {
        let m = melody();
        let volumes: Vec<u8> = Style::ALL.iter().map(|s| s.chord_volume(&m)).collect();
        assert_eq!(volumes, vec![75, 79, 65, 95, 67, 67]);
    }

    #[test]
    fn test_volume_clamps() {
        let quiet = Melody::new(
            vec![MelodyEvent::note(PitchClass::C, 4, 20, 0.0, 1.0)],
            Key::parse("C").unwrap(),
        )
        .unwrap();
        assert_eq!(Style::Orchestra.chord_volume(&quiet), 16);
        let loud = Melody::new(
            vec![MelodyEvent::note(PitchClass::C, 4, 120, 0.0, 1.0)],
            Key::parse("C").unwrap(),
        )
        .unwrap();
        assert_eq!(Style::Japanese.chord_volume(&loud), 127);
    }

    #[test]
    fn test_parse_by_number_and_name() {
        assert_eq!("0".parse::<Style>().unwrap(), Style::Piano);
        assert_eq!("5".parse::<Style>().unwrap(), Style::Choir);
        assert_eq!("Guitar".parse::<Style>().unwrap(), Style::Guitar);
        assert!("6".parse::<Style>().is_err());
        assert!("banjo".parse::<Style>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Style::Japanese).unwrap();
        assert_eq!(json, "\"japanese\"");
        let back: Style = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Style::Japanese);
    }
}
