use crate::error::Error;
use crossterm::event::{poll, read, Event, KeyCode, KeyModifiers};
use crossterm::terminal;
use log::{debug, warn};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// map of keys read from the keyboard to what the chip8 might expect
/// where '1' => 0x01 and 'a' => 0x0a
const CHIP8_LITERAL_KEYMAP: [(char, u8); 16] = [
    ('0', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('4', 0x04),
    ('5', 0x05),
    ('6', 0x06),
    ('7', 0x07),
    ('8', 0x08),
    ('9', 0x09),
    ('a', 0x0a),
    ('b', 0x0b),
    ('c', 0x0c),
    ('d', 0x0d),
    ('e', 0x0e),
    ('f', 0x0f),
];

/// ditto using left-hand side of qwerty keyboard, laid out like the COSMAC
/// keypad:
///   1 2 3 C      1 2 3 4
///   4 5 6 D  <=  q w e r
///   7 8 9 E      a s d f
///   A 0 B F      z x c v
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

/// reads the 16-key keypad
pub trait Input {
    /// is logical key `key` (0x0-0xf) held right now
    fn is_key_down(&mut self, key: u8) -> Result<bool, Error>;

    /// block until a key is pressed, and say which one
    fn wait_for_key(&mut self) -> Result<u8, Error>;
}

/// turns a physical key into a logical CHIP-8 key. Different games want
/// different layouts, so this is kept apart from reading the keyboard.
pub trait KeyTranslator {
    fn translate(&self, key: char) -> Option<u8>;
}

/// table-driven [`KeyTranslator`]
#[derive(Debug, Clone)]
pub struct Keymap {
    keys: HashMap<char, u8>,
}

impl Keymap {
    pub fn conventional() -> Self {
        Keymap {
            keys: HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
        }
    }

    pub fn literal() -> Self {
        Keymap {
            keys: HashMap::from(CHIP8_LITERAL_KEYMAP),
        }
    }
}

impl KeyTranslator for Keymap {
    fn translate(&self, key: char) -> Option<u8> {
        self.keys.get(&key.to_ascii_lowercase()).copied()
    }
}

/// keypad on the terminal, via crossterm. Terminals only report presses, so
/// a key counts as held for `key_hold` after its last press (auto-repeat
/// keeps it held).
pub struct TermInput {
    translator: Box<dyn KeyTranslator>,
    key_hold: Duration,
    last_pressed: [Option<Instant>; 16],
}

impl TermInput {
    pub fn new(translator: Box<dyn KeyTranslator>, key_hold: Duration) -> Result<Self, Error> {
        terminal::enable_raw_mode()?;
        Ok(TermInput {
            translator,
            key_hold,
            last_pressed: [None; 16],
        })
    }

    /// record a terminal event, returning the logical key if it was a mapped
    /// key press
    fn handle_event(&mut self, event: Event) -> Result<Option<u8>, Error> {
        match event {
            Event::Key(evt) => match evt.code {
                KeyCode::Esc => Err(Error::Interrupted),
                KeyCode::Char('c') if evt.modifiers.contains(KeyModifiers::CONTROL) => {
                    Err(Error::Interrupted)
                }
                KeyCode::Char(key) => match self.translator.translate(key) {
                    Some(mapped_key) => {
                        self.last_pressed[mapped_key as usize & 0x0f] = Some(Instant::now());
                        Ok(Some(mapped_key))
                    }
                    None => {
                        warn!("can't map {:?} to a CHIP-8 key", key);
                        Ok(None)
                    }
                },
                other => {
                    debug!("ignoring key {:?}", other);
                    Ok(None)
                }
            },
            _ => Ok(None),
        }
    }

    fn read_pending(&mut self) -> Result<(), Error> {
        while poll(Duration::from_millis(0))? {
            let event = read()?;
            self.handle_event(event)?;
        }
        Ok(())
    }
}

impl Drop for TermInput {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

impl Input for TermInput {
    fn is_key_down(&mut self, key: u8) -> Result<bool, Error> {
        self.read_pending()?;
        Ok(match self.last_pressed[key as usize & 0x0f] {
            Some(at) => at.elapsed() < self.key_hold,
            None => false,
        })
    }

    fn wait_for_key(&mut self) -> Result<u8, Error> {
        debug!("waiting for a key press");
        loop {
            let event = read()?;
            if let Some(key) = self.handle_event(event)? {
                return Ok(key);
            }
        }
    }
}

/// dummy Input implementation for testing: `held` keys are always down, and
/// waits are answered from `queued` in order
pub struct DummyInput {
    held: Vec<u8>,
    queued: VecDeque<u8>,
}

impl DummyInput {
    pub fn new(held: &[u8]) -> Self {
        DummyInput {
            held: Vec::from(held),
            queued: VecDeque::new(),
        }
    }

    pub fn with_presses(mut self, presses: &[u8]) -> Self {
        self.queued.extend(presses);
        self
    }
}

impl Input for DummyInput {
    fn is_key_down(&mut self, key: u8) -> Result<bool, Error> {
        Ok(self.held.contains(&key))
    }

    /// nothing left to press means nobody is at the keyboard
    fn wait_for_key(&mut self) -> Result<u8, Error> {
        self.queued.pop_front().ok_or(Error::Interrupted)
    }
}
