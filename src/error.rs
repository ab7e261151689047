use std::io;
use std::sync;
use thiserror::Error;

/// Failures of the host collaborators around the VM. The VM's own terminal
/// outcomes (halt, unsupported or invalid opcodes) are not errors, see
/// [`crate::instruction::ExecutionResult`].
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors (reading a ROM, talking to the terminal)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("program is {size} bytes, at most {max} bytes fit in memory")]
    ProgramTooLarge { size: usize, max: usize },

    #[error("sound device error: {0}")]
    Sound(String),

    /// a thread panicked while holding the timer lock
    #[error("mutex poisoned: {0}")]
    Poison(String),

    /// the user asked to leave, e.g. pressed escape
    #[error("interrupted by user")]
    Interrupted,
}

impl<T> From<sync::PoisonError<T>> for Error {
    fn from(err: sync::PoisonError<T>) -> Self {
        Error::Poison(err.to_string())
    }
}
