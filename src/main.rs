use std::error::Error;
use std::fs::File;
use std::process;

use chip8_vm::cli::{Cli, KeymapChoice};
use chip8_vm::display::{MonoTermDisplay, CHIP8_HEIGHT, CHIP8_WIDTH};
use chip8_vm::input::{KeyTranslator, Keymap, TermInput};
use chip8_vm::sound::{Mute, SimpleBeep, Sound};
use chip8_vm::timer::{Ticker, TIMER_HZ};
use chip8_vm::{Chip8Interpreter, ExecutionResult};
use clap::Parser;
use log::info;

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    // read the program before touching the terminal, so errors stay legible
    let mut f = File::open(&cli.rom)?;

    // initialise
    let translator: Box<dyn KeyTranslator> = match cli.keymap {
        KeymapChoice::Conventional => Box::new(Keymap::conventional()),
        KeymapChoice::Literal => Box::new(Keymap::literal()),
    };
    let sound: Box<dyn Sound + Send> = if cli.mute {
        Box::new(Mute::new())
    } else {
        Box::new(SimpleBeep::new())
    };

    let (result, report) = {
        let mut display = MonoTermDisplay::new(CHIP8_WIDTH, CHIP8_HEIGHT)?;
        let mut input = TermInput::new(translator, cli.key_hold())?;
        let mut interpreter = Chip8Interpreter::new(&mut display, &mut input, sound);
        if let Some(seed) = cli.seed {
            interpreter = interpreter.with_seed(seed);
        }
        interpreter.load_program(&mut f)?;

        let ticker = Ticker::spawn(interpreter.timers(), TIMER_HZ)?;
        let result = interpreter.main_loop(cli.cycles_per_frame);
        drop(ticker);
        // stop any tone that was still sounding
        interpreter.timers().set_sound(0)?;

        info!(
            "keys requested:\n{}",
            interpreter.state().key_request_grid()
        );
        (result, interpreter.state().to_string())
    };

    // shove some junk on stdout to stop the cli messing up the last frame
    for _ in 0..(CHIP8_HEIGHT / 3) {
        println!();
    }

    match result {
        Ok(ExecutionResult::Halt) | Ok(ExecutionResult::Continue) => Ok(()),
        Ok(stopped) => {
            eprintln!("{}", stopped);
            eprintln!("{}", report);
            process::exit(1);
        }
        Err(chip8_vm::Error::Interrupted) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
