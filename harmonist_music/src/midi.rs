// MIDI import and export.
//
// Import reads a Standard MIDI File with metrical timing, takes the first
// track that contains notes, and flattens it into a monophonic line of note
// and rest events measured in bars. Export writes SMF Format 1 with three
// tracks: tempo, melody, chords (one chord per bar).
//
// Uses the `midly` crate for parsing and writing.

use crate::chord::Accompaniment;
use crate::error::{Error, Result};
use crate::melody::{Melody, MelodyEvent, Sound};
use crate::pitch::PitchClass;
use crate::style::Style;
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::cmp::Reverse;
use std::path::Path;
use tracing::debug;

/// Microseconds per quarter note when a file carries no tempo event (120 bpm).
pub const DEFAULT_TEMPO: u32 = 500_000;

/// Ticks per quarter note in MIDI output.
const TICKS_PER_QUARTER: u16 = 480;

/// GM percussion channel; its notes are not melody.
const DRUM_CHANNEL: u8 = 9;

const MELODY_CHANNEL: u8 = 0;
const CHORD_CHANNEL: u8 = 1;

/// How MIDI time maps onto bars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportOptions {
    /// Quarter notes per bar, i.e. per chord slot.
    pub quarters_per_bar: f64,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            quarters_per_bar: 1.0,
        }
    }
}

/// Melody events read from a file, plus the file's tempo.
#[derive(Debug, Clone, PartialEq)]
pub struct MelodyTrack {
    pub events: Vec<MelodyEvent>,
    /// Microseconds per quarter note.
    pub tempo: u32,
}

/// Read a melody from a MIDI file on disk.
pub fn read_melody(path: &Path, options: &ImportOptions) -> Result<MelodyTrack> {
    let bytes = std::fs::read(path)?;
    parse_melody(&bytes, options)
}

/// Read a melody from in-memory MIDI data.
pub fn parse_melody(bytes: &[u8], options: &ImportOptions) -> Result<MelodyTrack> {
    let smf = Smf::parse(bytes)?;
    let ticks_per_quarter = match smf.header.timing {
        Timing::Metrical(tpq) if tpq.as_int() > 0 => tpq.as_int(),
        _ => return Err(Error::UnsupportedTiming),
    };
    let tempo = smf
        .tracks
        .iter()
        .flatten()
        .find_map(|event| match event.kind {
            TrackEventKind::Meta(MetaMessage::Tempo(t)) => Some(t.as_int()),
            _ => None,
        })
        .unwrap_or(DEFAULT_TEMPO);

    let (track_index, notes) = smf
        .tracks
        .iter()
        .map(|track| track_notes(track))
        .enumerate()
        .find(|(_, notes)| !notes.is_empty())
        .ok_or(Error::NoNotes)?;

    let ticks_per_bar = ticks_per_quarter as f64 * options.quarters_per_bar;
    let events = monophonic_events(notes, ticks_per_bar);
    debug!(
        track = track_index,
        ticks_per_quarter,
        tempo,
        events = events.len(),
        "melody imported"
    );
    Ok(MelodyTrack { events, tempo })
}

/// A note with absolute tick bounds.
#[derive(Debug, Clone, Copy)]
struct RawNote {
    start: u64,
    end: u64,
    key: u8,
    velocity: u8,
}

/// Pair note-ons with note-offs. A note-on with velocity 0 is a note-off; a
/// repeated note-on closes the sounding note of the same key. Notes still
/// open at the end of the track end there.
fn track_notes(track: &[TrackEvent]) -> Vec<RawNote> {
    let mut tick: u64 = 0;
    let mut open: [Option<(u64, u8)>; 128] = [None; 128];
    let mut notes = Vec::new();

    let mut close = |open: &mut [Option<(u64, u8)>; 128], key: u8, end: u64| {
        if let Some((start, velocity)) = open[key as usize].take() {
            if end > start {
                notes.push(RawNote {
                    start,
                    end,
                    key,
                    velocity,
                });
            }
        }
    };

    for event in track {
        tick += event.delta.as_int() as u64;
        let TrackEventKind::Midi { channel, message } = event.kind else {
            continue;
        };
        if channel.as_int() == DRUM_CHANNEL {
            continue;
        }
        match message {
            MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                close(&mut open, key.as_int(), tick);
                open[key.as_int() as usize] = Some((tick, vel.as_int()));
            }
            MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                close(&mut open, key.as_int(), tick);
            }
            _ => {}
        }
    }
    for key in 0..128u8 {
        close(&mut open, key, tick);
    }
    notes
}

/// Keep the highest note of each onset, cut every note off at the next
/// onset, and fill gaps (including leading silence) with rests.
fn monophonic_events(mut notes: Vec<RawNote>, ticks_per_bar: f64) -> Vec<MelodyEvent> {
    notes.sort_by_key(|n| (n.start, Reverse(n.key)));
    notes.dedup_by_key(|n| n.start);

    let to_bars = |ticks: u64| ticks as f64 / ticks_per_bar;
    let mut events = Vec::with_capacity(notes.len() * 2);
    let mut cursor = 0u64;
    for (i, note) in notes.iter().enumerate() {
        if note.start > cursor {
            events.push(MelodyEvent::rest(
                to_bars(cursor),
                to_bars(note.start - cursor),
            ));
        }
        let end = notes
            .get(i + 1)
            .map_or(note.end, |next| note.end.min(next.start));
        events.push(MelodyEvent::note(
            PitchClass::from_midi(note.key),
            (note.key / 12) as i8 - 1,
            note.velocity,
            to_bars(note.start),
            to_bars(end - note.start),
        ));
        cursor = end;
    }
    events
}

/// MIDI key of a pitch class in a scientific octave, if it is in range.
fn midi_key(pitch: PitchClass, octave: i32) -> Option<u8> {
    let key = (octave + 1) * 12 + pitch.index() as i32;
    u8::try_from(key).ok().filter(|&k| k <= 127)
}

fn bar_tick(bars: f64, ticks_per_bar: f64) -> u32 {
    (bars * ticks_per_bar).round().max(0.0) as u32
}

/// Render melody and accompaniment into an in-memory SMF.
pub fn render(
    melody: &Melody,
    accompaniment: &Accompaniment,
    style: Style,
    options: &ImportOptions,
    tempo: u32,
) -> Smf<'static> {
    let ticks_per_bar = TICKS_PER_QUARTER as f64 * options.quarters_per_bar;
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    smf.tracks.push(vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo.min(0xFF_FFFF)))),
        },
        end_of_track(),
    ]);

    let mut melody_notes = Vec::new();
    for event in melody.events() {
        if let Sound::Note {
            pitch,
            octave,
            volume,
        } = event.sound
        {
            if let Some(key) = midi_key(pitch, octave as i32) {
                melody_notes.push((
                    bar_tick(event.start, ticks_per_bar),
                    bar_tick(event.end(), ticks_per_bar),
                    key,
                    volume.min(127),
                ));
            }
        }
    }
    smf.tracks.push(note_track(
        b"Melody",
        MELODY_CHANNEL,
        style.melody_program(),
        melody_notes,
    ));

    let base_octave = style.chord_octave(melody) as i32;
    let volume = style.chord_volume(melody);
    let mut chord_notes = Vec::new();
    for (bar, chord) in accompaniment.chords().iter().enumerate() {
        let Some(notes) = chord.notes() else {
            continue;
        };
        let start = bar_tick(bar as f64, ticks_per_bar);
        let end = bar_tick(bar as f64 + 1.0, ticks_per_bar);
        for note in notes {
            if let Some(key) = midi_key(note.pitch, base_octave + note.octave_offset as i32) {
                chord_notes.push((start, end, key, volume));
            }
        }
    }
    smf.tracks.push(note_track(
        b"Chords",
        CHORD_CHANNEL,
        style.chord_program(),
        chord_notes,
    ));

    smf
}

/// Render and write to a file.
pub fn write_midi(
    path: &Path,
    melody: &Melody,
    accompaniment: &Accompaniment,
    style: Style,
    options: &ImportOptions,
    tempo: u32,
) -> Result<()> {
    let smf = render(melody, accompaniment, style, options, tempo);
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    std::fs::write(path, &buf)?;
    Ok(())
}

fn end_of_track() -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    }
}

/// Build a track from `(start_tick, end_tick, key, velocity)` notes.
fn note_track(
    name: &'static [u8],
    channel: u8,
    program: u8,
    notes: Vec<(u32, u32, u8, u8)>,
) -> Track<'static> {
    let channel = u4::new(channel);
    let mut messages: Vec<(u32, bool, MidiMessage)> = Vec::with_capacity(notes.len() * 2);
    for (start, end, key, velocity) in notes {
        if end <= start {
            continue;
        }
        messages.push((
            start,
            true,
            MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(velocity.max(1)),
            },
        ));
        messages.push((
            end,
            false,
            MidiMessage::NoteOff {
                key: u7::new(key),
                vel: u7::new(0),
            },
        ));
    }
    // Offs before ons at the same tick so repeated keys re-attack cleanly.
    messages.sort_by_key(|&(tick, is_on, _)| (tick, is_on));

    let mut track: Track<'static> = vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(name)),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange {
                    program: u7::new(program),
                },
            },
        },
    ];
    let mut last_tick = 0u32;
    for (tick, _, message) in messages {
        track.push(TrackEvent {
            delta: u28::new(tick - last_tick),
            kind: TrackEventKind::Midi { channel, message },
        });
        last_tick = tick;
    }
    track.push(end_of_track());
    track
}
