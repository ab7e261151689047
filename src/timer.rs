//! delay and sound timers
//!
//! The two timers are the only state shared between the interpreter and the
//! outside world: the interpreter loads and reads them, while a 60Hz tick
//! counts them down. Both sides go through one mutex, so a tick lands between
//! two instructions and never in the middle of one.
use crate::error::Error;
use crate::sound::Sound;
use log::{debug, error};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// nominal tick rate
pub const TIMER_HZ: u32 = 60;

struct TimerUnit {
    delay: u8,
    sound: u8,
    audio: Box<dyn Sound + Send>,
}

/// shared handle to the delay/sound timer pair; clones refer to the same timers
#[derive(Clone)]
pub struct Timers {
    unit: Arc<Mutex<TimerUnit>>,
}

impl Timers {
    pub fn new(audio: Box<dyn Sound + Send>) -> Self {
        Timers {
            unit: Arc::new(Mutex::new(TimerUnit {
                delay: 0,
                sound: 0,
                audio,
            })),
        }
    }

    pub fn delay(&self) -> Result<u8, Error> {
        Ok(self.unit.lock()?.delay)
    }

    pub fn sound(&self) -> Result<u8, Error> {
        Ok(self.unit.lock()?.sound)
    }

    pub fn set_delay(&self, val: u8) -> Result<(), Error> {
        self.unit.lock()?.delay = val;
        Ok(())
    }

    /// load the sound timer; the tone starts on any non-zero value and stops
    /// if a running timer is cut short with zero
    pub fn set_sound(&self, val: u8) -> Result<(), Error> {
        let mut unit = self.unit.lock()?;
        let was = unit.sound;
        unit.sound = val;
        if val != 0 {
            debug!("tone on for {} ticks", val);
            unit.audio.set_tone(true)?;
        } else if was != 0 {
            debug!("tone cut short");
            unit.audio.set_tone(false)?;
        }
        Ok(())
    }

    /// count both timers down by one; mutes the tone when the sound timer
    /// reaches zero
    pub fn tick(&self) -> Result<(), Error> {
        let mut unit = self.unit.lock()?;
        if unit.delay != 0 {
            unit.delay -= 1;
        }
        if unit.sound != 0 {
            unit.sound -= 1;
            if unit.sound == 0 {
                debug!("tone off");
                unit.audio.set_tone(false)?;
            }
        }
        Ok(())
    }
}

/// background tick source; calls [`Timers::tick`] at a fixed rate until dropped
pub struct Ticker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn(timers: Timers, rate_hz: u32) -> Result<Self, Error> {
        let running = Arc::new(AtomicBool::new(true));
        let period = Duration::from_secs(1) / rate_hz.max(1);
        let handle = thread::Builder::new().name("chip8-timers".to_string()).spawn({
            let running = Arc::clone(&running);
            move || {
                let mut next = Instant::now() + period;
                loop {
                    // a full period passes before the first tick; schedule
                    // from the previous deadline so we don't drift
                    let now = Instant::now();
                    if next > now {
                        spin_sleep::sleep(next - now);
                    }
                    next += period;
                    if !running.load(Ordering::Relaxed) {
                        break;
                    }
                    if let Err(e) = timers.tick() {
                        error!("timer tick failed, stopping timers: {}", e);
                        break;
                    }
                }
            }
        })?;
        Ok(Ticker {
            running,
            handle: Some(handle),
        })
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
