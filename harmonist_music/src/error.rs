// Library error type.
//
// Three families: configuration errors (bad key names, counts, percentages)
// rejected before any population is built; degenerate-input errors (empty or
// sub-bar melodies) rejected at the melody boundary; and numeric edge cases in
// selection. Nothing is retried. I/O, JSON and MIDI failures are wrapped so
// the CLI can attach context.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown pitch name '{0}'")]
    UnknownPitch(String),

    #[error("invalid key name '{0}' (expected a tonic such as C, F# or Bb, optionally followed by 'm')")]
    InvalidKey(String),

    #[error("invalid melody event at index {index}: {reason}")]
    InvalidEvent { index: usize, reason: String },

    #[error("melody contains no notes")]
    EmptyMelody,

    #[error("melody lasts {bars:.3} bars; at least one full bar is required")]
    MelodyTooShort { bars: f64 },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("selection needs {requested} distinct parents but the population holds {available}")]
    NotEnoughParents { requested: usize, available: usize },

    #[error("cannot sample parents: total fitness is not positive ({0})")]
    ZeroFitnessSum(f64),

    #[error("candidate chord pool is empty")]
    EmptyPool,

    #[error("population already initialized ({generation} generations completed)")]
    AlreadyInitialized { generation: usize },

    #[error("evolution already ran all {generations} generations")]
    RunFinished { generations: usize },

    #[error("unsupported MIDI timing: only metrical (ticks per quarter) files can be read")]
    UnsupportedTiming,

    #[error("MIDI file contains no note events")]
    NoNotes,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("MIDI decode error: {0}")]
    Midi(#[from] midly::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
