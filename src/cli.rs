use clap::{ArgAction, Parser, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;

/// which physical keys stand in for the hex keypad
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KeymapChoice {
    /// 1234/qwer/asdf/zxcv, shaped like the COSMAC keypad
    Conventional,
    /// 0-9 and a-f press the key they name
    Literal,
}

#[derive(Parser, Debug)]
#[command(
    name = "chip8-vm",
    about = "Run CHIP-8 programs in the terminal",
    version
)]
pub struct Cli {
    /// Program image to load at 0x200
    pub rom: PathBuf,

    /// Instructions executed per 60Hz frame
    #[arg(short = 'c', long, default_value_t = 10)]
    pub cycles_per_frame: usize,

    /// Seed for the RND instruction (random when omitted)
    #[arg(short = 's', long)]
    pub seed: Option<u64>,

    /// Keyboard layout for the hex keypad
    #[arg(short = 'k', long, value_enum, default_value_t = KeymapChoice::Conventional)]
    pub keymap: KeymapChoice,

    /// How long a key press counts as held, in milliseconds
    #[arg(long, default_value_t = 150)]
    pub key_hold_ms: u64,

    /// Don't beep
    #[arg(short = 'm', long)]
    pub mute: bool,

    /// More logging on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    pub fn key_hold(&self) -> Duration {
        Duration::from_millis(self.key_hold_ms)
    }
}
