use crate::memory::{Chip8MemoryMap, MemoryMap, ADDR_MASK, CHIP8_PROGRAM_ADDR};
use crate::timer::Timers;
use std::fmt;

/// index of the flag register
pub const VF: usize = 0xF;

/// how many return addresses the stack holds; the pointer wraps past this
pub const STACK_DEPTH: usize = 16;

/// Everything the interpreter mutates while running a program.
///
/// Register widths are enforced on every write: V registers are u8, I and PC
/// are 12bit and wrap at 0x1000, SP is 4bit and wraps at 16. Stack overflow
/// and underflow are not errors: SP wraps and the oldest entries are
/// overwritten.
pub struct MachineState {
    pub memory: Chip8MemoryMap,
    pub v: [u8; 16],
    i: u16,
    pc: u16,
    sp: u8,
    stack: [u16; STACK_DEPTH],
    /// HP-48 style flag registers, only touched by `LD R, Vx` / `LD Vx, R`
    pub rpl: [u8; 8],
    /// every key the program has asked about, one bit per key
    key_request_mask: u16,
    pub timers: Timers,
}

impl MachineState {
    /// zeroed machine with the fonts in memory and PC at the program start
    pub fn new(timers: Timers) -> Self {
        MachineState {
            memory: Chip8MemoryMap::new(),
            v: [0; 16],
            i: 0,
            pc: CHIP8_PROGRAM_ADDR,
            sp: 0,
            stack: [0; STACK_DEPTH],
            rpl: [0; 8],
            key_request_mask: 0,
            timers,
        }
    }

    pub fn i(&self) -> u16 {
        self.i
    }

    pub fn set_i(&mut self, addr: u16) {
        self.i = addr & ADDR_MASK;
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, addr: u16) {
        self.pc = addr & ADDR_MASK;
    }

    /// step over one instruction
    pub fn skip(&mut self) {
        self.set_pc(self.pc.wrapping_add(2));
    }

    pub fn sp(&self) -> u8 {
        self.sp
    }

    pub fn stack(&self) -> &[u16; STACK_DEPTH] {
        &self.stack
    }

    /// fetch the opcode at PC and advance PC past it
    pub fn fetch(&mut self) -> u16 {
        let opcode = self.memory.get_word(self.pc);
        self.skip();
        opcode
    }

    /// store the return address, then bump SP
    pub fn push(&mut self, addr: u16) {
        self.stack[self.sp as usize] = addr & ADDR_MASK;
        self.sp = (self.sp + 1) % STACK_DEPTH as u8;
    }

    /// drop SP, then read the return address; popping an empty stack wraps
    /// round to the top slot
    pub fn pop(&mut self) -> u16 {
        self.sp = (self.sp + STACK_DEPTH as u8 - 1) % STACK_DEPTH as u8;
        self.stack[self.sp as usize]
    }

    pub fn key_request_mask(&self) -> u16 {
        self.key_request_mask
    }

    pub fn note_key_request(&mut self, key: u8) {
        self.key_request_mask |= 1 << (key & 0x0f);
    }

    /// the keypad as a 4x4 grid of requested (1) / not requested (.) keys
    pub fn key_request_grid(&self) -> String {
        const LAYOUT: [[u8; 4]; 4] = [
            [0x1, 0x2, 0x3, 0xC],
            [0x4, 0x5, 0x6, 0xD],
            [0x7, 0x8, 0x9, 0xE],
            [0xA, 0x0, 0xB, 0xF],
        ];
        LAYOUT
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&k| {
                        if self.key_request_mask & (1 << k) != 0 {
                            format!("{:X}", k)
                        } else {
                            ".".to_string()
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PC: {:04X}  I: {:04X}  SP: {:X}", self.pc, self.i, self.sp)?;
        if let (Ok(dt), Ok(st)) = (self.timers.delay(), self.timers.sound()) {
            writeln!(f, "DT: {:02X}  ST: {:02X}", dt, st)?;
        }
        for (n, chunk) in self.v.chunks(8).enumerate() {
            let regs: Vec<String> = chunk
                .iter()
                .enumerate()
                .map(|(r, val)| format!("V{:X}={:02X}", n * 8 + r, val))
                .collect();
            writeln!(f, "{}", regs.join(" "))?;
        }
        for (slot, addr) in self.stack.iter().enumerate() {
            let marker = if slot == self.sp as usize { '>' } else { ' ' };
            writeln!(f, "{}{:X}: {:04X}", marker, slot, addr)?;
        }
        Ok(())
    }
}
