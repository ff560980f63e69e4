// The melody the accompaniment is fitted to.
//
// A melody is a time-ordered list of note and rest events measured in bars
// (one bar = one chord slot), plus the key it was classified into. The search
// treats it as read-only. Construction is the boundary where degenerate input
// is rejected: empty melodies, melodies without a single sounding note, and
// melodies shorter than one bar never reach the fitness evaluator.

use crate::error::{Error, Result};
use crate::key::Key;
use crate::key_detect::detect_key;
use crate::pitch::PitchClass;
use serde::{Deserialize, Serialize};

/// Slack when rounding the melody's end up to whole bars.
const BAR_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Sound {
    Note {
        pitch: PitchClass,
        /// Scientific octave number (middle C = C4).
        octave: i8,
        /// MIDI velocity, 0-127.
        volume: u8,
    },
    Rest,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MelodyEvent {
    /// Onset in bars from the start of the piece.
    pub start: f64,
    /// Length in bars.
    pub duration: f64,
    pub sound: Sound,
}

impl MelodyEvent {
    pub fn note(pitch: PitchClass, octave: i8, volume: u8, start: f64, duration: f64) -> Self {
        MelodyEvent {
            start,
            duration,
            sound: Sound::Note {
                pitch,
                octave,
                volume,
            },
        }
    }

    pub fn rest(start: f64, duration: f64) -> Self {
        MelodyEvent {
            start,
            duration,
            sound: Sound::Rest,
        }
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    pub fn is_rest(&self) -> bool {
        matches!(self.sound, Sound::Rest)
    }

    pub fn pitch(&self) -> Option<PitchClass> {
        match self.sound {
            Sound::Note { pitch, .. } => Some(pitch),
            Sound::Rest => None,
        }
    }

    /// Length of the part of this event inside `[bar_start, bar_end)`.
    pub fn overlap(&self, bar_start: f64, bar_end: f64) -> f64 {
        (self.end().min(bar_end) - self.start.max(bar_start)).max(0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Melody {
    events: Vec<MelodyEvent>,
    key: Key,
    size_in_bars: usize,
}

impl Melody {
    /// Validate and sort the events. Sorting is stable so simultaneous events
    /// keep their input order.
    pub fn new(mut events: Vec<MelodyEvent>, key: Key) -> Result<Self> {
        validate_events(&events)?;
        events.sort_by(|a, b| a.start.total_cmp(&b.start));
        let end = events.iter().map(MelodyEvent::end).fold(0.0, f64::max);
        if end + BAR_EPSILON < 1.0 {
            return Err(Error::MelodyTooShort { bars: end });
        }
        let size_in_bars = (end - BAR_EPSILON).ceil() as usize;
        Ok(Melody {
            events,
            key,
            size_in_bars,
        })
    }

    /// Build a melody whose key is classified from its own notes.
    pub fn with_detected_key(events: Vec<MelodyEvent>) -> Result<Self> {
        validate_events(&events)?;
        let key = detect_key(&events)?;
        Melody::new(events, key)
    }

    pub fn events(&self) -> &[MelodyEvent] {
        &self.events
    }

    pub fn key(&self) -> Key {
        self.key
    }

    /// Number of chord slots needed to cover the melody.
    pub fn size_in_bars(&self) -> usize {
        self.size_in_bars
    }

    fn note_octaves(&self) -> impl Iterator<Item = i8> + '_ {
        self.events.iter().filter_map(|e| match e.sound {
            Sound::Note { octave, .. } => Some(octave),
            Sound::Rest => None,
        })
    }

    pub fn lowest_octave(&self) -> i8 {
        self.note_octaves().min().unwrap_or(4)
    }

    pub fn highest_octave(&self) -> i8 {
        self.note_octaves().max().unwrap_or(4)
    }

    /// Integer mean octave of the sounding notes.
    pub fn average_octave(&self) -> i8 {
        let (sum, count) = self
            .note_octaves()
            .fold((0i64, 0i64), |(s, c), o| (s + o as i64, c + 1));
        if count == 0 {
            4
        } else {
            sum.div_euclid(count) as i8
        }
    }

    /// Integer mean velocity of the sounding notes.
    pub fn average_volume(&self) -> u8 {
        let (sum, count) = self
            .events
            .iter()
            .filter_map(|e| match e.sound {
                Sound::Note { volume, .. } => Some(volume as u32),
                Sound::Rest => None,
            })
            .fold((0u32, 0u32), |(s, c), v| (s + v, c + 1));
        if count == 0 { 64 } else { (sum / count) as u8 }
    }
}

fn validate_events(events: &[MelodyEvent]) -> Result<()> {
    if events.iter().all(MelodyEvent::is_rest) {
        return Err(Error::EmptyMelody);
    }
    for (index, event) in events.iter().enumerate() {
        if !event.start.is_finite() || event.start < 0.0 {
            return Err(Error::InvalidEvent {
                index,
                reason: format!("start {} must be a non-negative number", event.start),
            });
        }
        if !event.duration.is_finite() || event.duration <= 0.0 {
            return Err(Error::InvalidEvent {
                index,
                reason: format!("duration {} must be positive", event.duration),
            });
        }
        if let Sound::Note { volume, .. } = event.sound {
            if volume > 127 {
                return Err(Error::InvalidEvent {
                    index,
                    reason: format!("volume {volume} exceeds 127"),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::PitchClass::*;

    fn c_major() -> Key {
        Key::parse("C").unwrap()
    }

    #[test]
    fn test_empty_melody_rejected() {
        assert!(matches!(Melody::new(vec![], c_major()), Err(Error::EmptyMelody)));
        let rests = vec![MelodyEvent::rest(0.0, 2.0)];
        assert!(matches!(Melody::new(rests, c_major()), Err(Error::EmptyMelody)));
    }

    #[test]
    fn test_short_melody_rejected() {
        let events = vec![MelodyEvent::note(C, 4, 80, 0.0, 0.5)];
        assert!(matches!(
            Melody::new(events, c_major()),
            Err(Error::MelodyTooShort { .. })
        ));
    }

    #[test]
    fn test_bad_duration_rejected() {
        let events = vec![
            MelodyEvent::note(C, 4, 80, 0.0, 1.0),
            MelodyEvent::note(D, 4, 80, 1.0, 0.0),
        ];
        assert!(matches!(
            Melody::new(events, c_major()),
            Err(Error::InvalidEvent { index: 1, .. })
        ));
    }

    #[test]
    fn test_size_in_bars_rounds_up() {
        let events = vec![
            MelodyEvent::note(C, 4, 80, 0.0, 1.0),
            MelodyEvent::note(E, 4, 80, 1.0, 1.25),
        ];
        let melody = Melody::new(events, c_major()).unwrap();
        assert_eq!(melody.size_in_bars(), 3);

        // Float noise does not add a phantom bar.
        let events = vec![MelodyEvent::note(C, 4, 80, 0.0, 2.0 + 1e-12)];
        assert_eq!(Melody::new(events, c_major()).unwrap().size_in_bars(), 2);
    }

    #[test]
    fn test_events_sorted() {
        let events = vec![
            MelodyEvent::note(G, 4, 80, 1.0, 1.0),
            MelodyEvent::note(C, 4, 80, 0.0, 1.0),
        ];
        let melody = Melody::new(events, c_major()).unwrap();
        assert_eq!(melody.events()[0].pitch(), Some(C));
    }

    #[test]
    fn test_statistics() {
        let events = vec![
            MelodyEvent::note(C, 3, 60, 0.0, 1.0),
            MelodyEvent::rest(1.0, 1.0),
            MelodyEvent::note(E, 5, 100, 2.0, 1.0),
            MelodyEvent::note(G, 4, 80, 3.0, 1.0),
        ];
        let melody = Melody::new(events, c_major()).unwrap();
        assert_eq!(melody.lowest_octave(), 3);
        assert_eq!(melody.highest_octave(), 5);
        assert_eq!(melody.average_octave(), 4);
        assert_eq!(melody.average_volume(), 80);
    }

    #[test]
    fn test_overlap_clipping() {
        let e = MelodyEvent::note(C, 4, 80, 0.5, 1.0);
        assert_eq!(e.overlap(0.0, 1.0), 0.5);
        assert_eq!(e.overlap(1.0, 2.0), 0.5);
        assert_eq!(e.overlap(2.0, 3.0), 0.0);
    }
}
