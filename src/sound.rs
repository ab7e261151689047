use crate::error::Error;
use beep::beep;

/// the tone generator; the timers switch it on and off as the sound timer
/// leaves and reaches zero
pub trait Sound {
    fn set_tone(&mut self, enabled: bool) -> Result<(), Error>;
}

const SIMPLEBEEP_PITCH: u16 = 2093; // C

/// PC speaker
pub struct SimpleBeep {
    is_beeping: bool,
}

impl SimpleBeep {
    pub fn new() -> Self {
        SimpleBeep { is_beeping: false }
    }
}

impl Default for SimpleBeep {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for SimpleBeep {
    fn set_tone(&mut self, enabled: bool) -> Result<(), Error> {
        if enabled == self.is_beeping {
            return Ok(());
        }
        let pitch = if enabled { SIMPLEBEEP_PITCH } else { 0 };
        beep(pitch).map_err(|e| Error::Sound(e.to_string()))?;
        self.is_beeping = enabled;
        Ok(())
    }
}

pub struct Mute {}

impl Mute {
    pub fn new() -> Self {
        Mute {}
    }
}

impl Default for Mute {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for Mute {
    fn set_tone(&mut self, _enabled: bool) -> Result<(), Error> {
        Ok(())
    }
}
