use crate::error::Error;
use crate::font;
use std::io;

// NB. addresses are u16 as per the chip-8 and always wrap at the top of RAM;
//     lengths are usize to stop endless casting

/// how much RAM we have
pub const CHIP8_RAM_SIZE_BYTES: usize = 4096;

/// mask an address into the 12bit address space
pub const ADDR_MASK: u16 = 0x0FFF;

/// where the program is loaded
pub const CHIP8_PROGRAM_ADDR: u16 = 0x0200;

/// largest program image that fits between the program address and the top of RAM
pub const CHIP8_MAX_PROGRAM_BYTES: usize = CHIP8_RAM_SIZE_BYTES - CHIP8_PROGRAM_ADDR as usize;

/// Represents the flat, wrapping address space the interpreter sees
pub trait MemoryMap {
    /// read one byte; `addr` wraps at the top of RAM
    fn read_byte(&self, addr: u16) -> u8;

    /// write one byte; `addr` wraps at the top of RAM
    fn write_byte(&mut self, addr: u16, val: u8);

    /// get a big-endian two-byte word (opcodes)
    fn get_word(&self, addr: u16) -> u16 {
        ((self.read_byte(addr) as u16) << 8) | self.read_byte(addr.wrapping_add(1)) as u16
    }

    /// fill `buf` from consecutive addresses starting at `addr`
    fn read_into(&self, addr: u16, buf: &mut [u8]) {
        for (offset, byte) in buf.iter_mut().enumerate() {
            *byte = self.read_byte(addr.wrapping_add(offset as u16));
        }
    }

    /// write a chunk of bytes into "RAM"
    fn write(&mut self, data: &[u8], addr: u16) {
        for (offset, byte) in data.iter().enumerate() {
            self.write_byte(addr.wrapping_add(offset as u16), *byte);
        }
    }
}

/// 4K of RAM with both fonts at the bottom and programs loaded at 0x200:
///   0x0000-0x004f  small font, 16 x 5 bytes
///   0x0050-0x00ef  large font, 16 x 10 bytes
///   0x00f0-0x01ff  unused
///   0x0200-0x0fff  program
pub struct Chip8MemoryMap {
    bytes: Box<[u8]>,
}

impl MemoryMap for Chip8MemoryMap {
    fn read_byte(&self, addr: u16) -> u8 {
        self.bytes[(addr & ADDR_MASK) as usize]
    }

    fn write_byte(&mut self, addr: u16, val: u8) {
        self.bytes[(addr & ADDR_MASK) as usize] = val;
    }
}

impl Default for Chip8MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

impl Chip8MemoryMap {
    /// zeroed RAM with the fonts baked in
    pub fn new() -> Self {
        let mut mm = Chip8MemoryMap {
            bytes: vec![0u8; CHIP8_RAM_SIZE_BYTES].into_boxed_slice(),
        };
        mm.write(&font::SMALL_FONT, font::SMALL_FONT_ADDR);
        mm.write(&font::LARGE_FONT, font::LARGE_FONT_ADDR);
        mm
    }

    /// load a CHIP-8 program at 0x200, returning how many bytes were read
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, Error> {
        let mut buf = Vec::new();
        let len = reader.read_to_end(&mut buf)?;
        if len > CHIP8_MAX_PROGRAM_BYTES {
            return Err(Error::ProgramTooLarge {
                size: len,
                max: CHIP8_MAX_PROGRAM_BYTES,
            });
        }
        self.write(&buf, CHIP8_PROGRAM_ADDR);
        Ok(len)
    }
}
