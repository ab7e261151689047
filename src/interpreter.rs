//! # interpreter
//!
//! Fetches, decodes and executes one opcode per [`Chip8Interpreter::step`].
//! Opcodes, by class (high nibble):
//!  0. 00E0 CLS, 00EE RET, 0000 halt; 00Cn/00FB-00FF are SUPER-CHIP and unsupported
//!  1. JP nnn
//!  2. CALL nnn
//!  3. SE Vx, kk
//!  4. SNE Vx, kk
//!  5. SE/SGT/SLT/SNE Vx, Vy (low nibble 0-3)
//!  6. LD Vx, kk
//!  7. ADD Vx, kk (no carry)
//!  8. LD/OR/AND/XOR/ADD/SUB/SHR/SUBN/SHL Vx, Vy (low nibble 0-7, E)
//!  9. SNE/MUL/DIV/BCD Vx, Vy (low nibble 0-3)
//!  A. LD I, nnn
//!  B. JP V0, nnn
//!  C. RND Vx, kk
//!  D. DRW Vx, Vy, n
//!  E. SKP/SKNP Vx (9E, A1)
//!  F. timers, keys, I arithmetic, fonts, BCD, register dumps, RPL flags
//!
//! Known quirks kept on purpose:
//!  * the stack pointer wraps at 16 in both directions
//!  * DIV by zero leaves Vx = 0xFF and VF = the dividend
//!  * LD R, Vx / LD Vx, R move (x + 1) & 3 registers, so x = 3 moves none
//!  * Fx55 / Fx65 leave I where it was
//!  * 0000 halts quietly rather than reporting an invalid opcode, so a program
//!    that runs off into zeroed RAM stops as if it had finished
use crate::bcd::{bcd16, bcd8};
use crate::display::{draw_sprite, Display};
use crate::error::Error;
use crate::font;
use crate::input::Input;
use crate::instruction::{ExecutionResult, Instruction};
use crate::machine::{MachineState, VF};
use crate::memory::MemoryMap;
use crate::sound::Sound;
use crate::timer::{Timers, TIMER_HZ};
use log::{info, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io;
use std::time::{Duration, Instant};

pub struct Chip8Interpreter<'a> {
    state: MachineState,
    display: &'a mut dyn Display,
    input: &'a mut dyn Input,
    rng: StdRng,
}

impl<'a> Chip8Interpreter<'a> {
    pub fn new(
        display: &'a mut dyn Display,
        input: &'a mut dyn Input,
        sound: Box<dyn Sound + Send>,
    ) -> Chip8Interpreter<'a> {
        Chip8Interpreter {
            state: MachineState::new(Timers::new(sound)),
            display,
            input,
            rng: StdRng::from_entropy(),
        }
    }

    /// make RND reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// load a chip8 program
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, Error> {
        let len = self.state.memory.load_program(reader)?;
        info!("loaded {} byte program", len);
        Ok(len)
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut MachineState {
        &mut self.state
    }

    /// handle on the timers, for whoever drives the 60Hz tick
    pub fn timers(&self) -> Timers {
        self.state.timers.clone()
    }

    /// external 60Hz interrupt
    pub fn tick(&self) -> Result<(), Error> {
        self.state.timers.tick()
    }

    /// run until the program stops, as fast as the host calls us
    pub fn run(&mut self) -> Result<ExecutionResult, Error> {
        loop {
            let result = self.step()?;
            if result != ExecutionResult::Continue {
                info!("program stopped: {}", result);
                return Ok(result);
            }
        }
    }

    /// run `cycles_per_frame` instructions per 60th of a second, refreshing
    /// the display after each batch
    pub fn main_loop(&mut self, cycles_per_frame: usize) -> Result<ExecutionResult, Error> {
        let frame = Duration::from_secs(1) / TIMER_HZ;
        let mut next_frame = Instant::now() + frame;
        loop {
            for _ in 0..cycles_per_frame {
                let result = self.step()?;
                if result != ExecutionResult::Continue {
                    self.display.refresh()?;
                    info!("program stopped: {}", result);
                    return Ok(result);
                }
            }
            self.display.refresh()?;
            let now = Instant::now();
            if next_frame > now {
                spin_sleep::sleep(next_frame - now);
                next_frame += frame;
            } else {
                // fell behind (e.g. waiting on a key); don't try to catch up
                next_frame = now + frame;
            }
        }
    }

    /// fetch, decode and execute one instruction. PC has already moved past
    /// the instruction by the time it executes; unsupported and invalid
    /// opcodes change nothing else.
    pub fn step(&mut self) -> Result<ExecutionResult, Error> {
        let addr = self.state.pc();
        let op = Instruction::decode(self.state.fetch());
        trace!("{:03x}: {}", addr, op);

        let result = match op.class {
            0x0 => self.system(op),
            0x8 => self.arithmetic(op),
            0x9 => self.extended(op),
            0xE => self.keys(op)?,
            0xF => self.misc(op)?,
            _ => self.basic(op),
        };
        match result {
            ExecutionResult::UnsupportedOpcode(opcode) => {
                warn!("unsupported opcode {:04x} at {:03x}", opcode, addr)
            }
            ExecutionResult::InvalidOpcode(opcode) => {
                warn!("invalid opcode {:04x} at {:03x}", opcode, addr)
            }
            _ => {}
        }
        Ok(result)
    }

    /// 0nnn
    fn system(&mut self, op: Instruction) -> ExecutionResult {
        match op.opcode {
            0x0000 => return ExecutionResult::Halt,
            0x00E0 => self.display.clear(),
            0x00EE => {
                let ret = self.state.pop();
                self.state.set_pc(ret);
            }
            // scroll down, scroll right/left, exit, low/high res
            0x00C0..=0x00CF | 0x00FB..=0x00FF => {
                return ExecutionResult::UnsupportedOpcode(op.opcode)
            }
            _ => return ExecutionResult::InvalidOpcode(op.opcode),
        }
        ExecutionResult::Continue
    }

    /// the single-form classes: jumps, calls, immediates, RND and DRW
    fn basic(&mut self, op: Instruction) -> ExecutionResult {
        let Instruction { x, y, n, nn, nnn, .. } = op;
        let s = &mut self.state;
        match op.class {
            0x1 => s.set_pc(nnn),
            0x2 => {
                let ret = s.pc();
                s.push(ret);
                s.set_pc(nnn);
            }
            0x3 => {
                if s.v[x] == nn {
                    s.skip();
                }
            }
            0x4 => {
                if s.v[x] != nn {
                    s.skip();
                }
            }
            0x5 => {
                let (vx, vy) = (s.v[x], s.v[y]);
                let skip = match n {
                    0x0 => vx == vy,
                    0x1 => vx > vy,
                    0x2 => vx < vy,
                    0x3 => vx != vy,
                    _ => return ExecutionResult::InvalidOpcode(op.opcode),
                };
                if skip {
                    s.skip();
                }
            }
            0x6 => s.v[x] = nn,
            0x7 => s.v[x] = s.v[x].wrapping_add(nn),
            0xA => s.set_i(nnn),
            0xB => s.set_pc(nnn + s.v[0] as u16),
            0xC => s.v[x] = self.rng.gen::<u8>() & nn,
            0xD => {
                let mut rows = vec![0u8; n as usize];
                s.memory.read_into(s.i(), &mut rows);
                s.v[VF] = draw_sprite(&mut *self.display, s.v[x], s.v[y], &rows);
            }
            _ => unreachable!("class {:x} is dispatched elsewhere", op.class),
        }
        ExecutionResult::Continue
    }

    /// 8xyn; the flag is computed from the operands before anything is
    /// stored, and written after the result so 8Fyn leaves the flag in VF
    fn arithmetic(&mut self, op: Instruction) -> ExecutionResult {
        let s = &mut self.state;
        let (vx, vy) = (s.v[op.x], s.v[op.y]);
        let (result, flag) = match op.n {
            0x0 => (vy, None),
            0x1 => (vx | vy, None),
            0x2 => (vx & vy, None),
            0x3 => (vx ^ vy, None),
            0x4 => {
                let (sum, carry) = vx.overflowing_add(vy);
                (sum, Some(carry as u8))
            }
            0x5 => (vx.wrapping_sub(vy), Some((vx >= vy) as u8)),
            0x6 => (vx >> 1, Some(vx & 0x01)),
            0x7 => (vy.wrapping_sub(vx), Some((vy >= vx) as u8)),
            0xE => (vx << 1, Some(vx >> 7)),
            _ => return ExecutionResult::InvalidOpcode(op.opcode),
        };
        s.v[op.x] = result;
        if let Some(flag) = flag {
            s.v[VF] = flag;
        }
        ExecutionResult::Continue
    }

    /// 9xyn
    fn extended(&mut self, op: Instruction) -> ExecutionResult {
        let s = &mut self.state;
        let (vx, vy) = (s.v[op.x], s.v[op.y]);
        match op.n {
            0x0 => {
                if vx != vy {
                    s.skip();
                }
            }
            0x1 => {
                let product = vx as u16 * vy as u16;
                s.v[op.x] = product as u8;
                s.v[VF] = (product >> 8) as u8;
            }
            0x2 => {
                let (quotient, remainder) = match vx.checked_div(vy) {
                    Some(q) => (q, vx % vy),
                    None => (0xFF, vx),
                };
                s.v[op.x] = quotient;
                s.v[VF] = remainder;
            }
            0x3 => {
                let word = u16::from_be_bytes([vx, vy]);
                let i = s.i();
                s.memory.write(&bcd16(word), i);
            }
            _ => return ExecutionResult::InvalidOpcode(op.opcode),
        }
        ExecutionResult::Continue
    }

    /// Exnn
    fn keys(&mut self, op: Instruction) -> Result<ExecutionResult, Error> {
        let want_down = match op.nn {
            0x9E => true,
            0xA1 => false,
            _ => return Ok(ExecutionResult::InvalidOpcode(op.opcode)),
        };
        let key = self.state.v[op.x] & 0x0f;
        self.state.note_key_request(key);
        if self.input.is_key_down(key)? == want_down {
            self.state.skip();
        }
        Ok(ExecutionResult::Continue)
    }

    /// Fxnn
    fn misc(&mut self, op: Instruction) -> Result<ExecutionResult, Error> {
        let x = op.x;
        let s = &mut self.state;
        let vx = s.v[x];
        match op.nn {
            0x07 => s.v[x] = s.timers.delay()?,
            0x0A => {
                // the run loop stops here; the timers keep ticking
                let key = self.input.wait_for_key()?;
                s.v[x] = key & 0x0f;
            }
            0x15 => s.timers.set_delay(vx)?,
            0x18 => s.timers.set_sound(vx)?,
            0x1E => {
                let sum = s.i() + vx as u16;
                s.set_i(sum);
                s.v[VF] = (sum > 0x0FFF) as u8;
            }
            0x29 => s.set_i(font::small_glyph_addr(vx)),
            0x30 => s.set_i(font::large_glyph_addr(vx)),
            0x33 => {
                let i = s.i();
                s.memory.write(&bcd8(vx), i);
            }
            0x55 => {
                let i = s.i();
                s.memory.write(&s.v[..=x], i);
            }
            0x65 => {
                let i = s.i();
                s.memory.read_into(i, &mut s.v[..=x]);
            }
            0x75 => {
                let count = (x + 1) & 0x03;
                s.rpl[..count].copy_from_slice(&s.v[..count]);
            }
            0x85 => {
                let count = (x + 1) & 0x03;
                s.v[..count].copy_from_slice(&s.rpl[..count]);
            }
            // load ASCII glyph
            0x94 => return Ok(ExecutionResult::UnsupportedOpcode(op.opcode)),
            _ => return Ok(ExecutionResult::InvalidOpcode(op.opcode)),
        }
        Ok(ExecutionResult::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::Bitmap;
    use crate::input::DummyInput;
    use crate::sound::Mute;
    use crate::timer::tests::ToneLog;
    use crate::timer::Ticker;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    /// collaborators outlive the interpreter so tests can look at them after
    struct Rig {
        display: Bitmap,
        input: DummyInput,
    }

    impl Rig {
        fn new() -> Self {
            Rig {
                display: Bitmap::default(),
                input: DummyInput::new(&[]),
            }
        }

        fn with_input(input: DummyInput) -> Self {
            Rig {
                display: Bitmap::default(),
                input,
            }
        }

        fn vm(&mut self, program: &[u16]) -> Chip8Interpreter<'_> {
            self.vm_with_sound(program, Box::new(Mute::new()))
        }

        fn vm_with_sound(
            &mut self,
            program: &[u16],
            sound: Box<dyn Sound + Send>,
        ) -> Chip8Interpreter<'_> {
            let mut vm =
                Chip8Interpreter::new(&mut self.display, &mut self.input, sound).with_seed(8);
            let bytes: Vec<u8> = program.iter().flat_map(|w| w.to_be_bytes()).collect();
            vm.load_program(&mut bytes.as_slice()).unwrap();
            vm
        }
    }

    /// run a single instruction at 0x200 with the given V registers
    fn exec(vm: &mut Chip8Interpreter, regs: &[(usize, u8)]) -> ExecutionResult {
        exec_at(vm, 0x200, regs)
    }

    #[test]
    fn test_add_operation() -> Result<(), Error> {
        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0x8014, 0x8024, 0x8034, 0x0000]);
        vm.state_mut().v[..4].copy_from_slice(&[5, 10, 10, 10]);
        assert_eq!(vm.run()?, ExecutionResult::Halt);
        assert_eq!(vm.state().v[0], 35);
        assert_eq!(vm.state().v[VF], 0);
        Ok(())
    }

    #[test]
    fn test_call_and_ret_operations() -> Result<(), Error> {
        let mut rig = Rig::new();
        let mut vm = rig.vm(&[
            0x2300, // CALL 0x300
            0x2300, // CALL 0x300
            0x0000, // HALT
        ]);
        vm.state_mut().memory.write(&[0x80, 0x14, 0x80, 0x14, 0x00, 0xEE], 0x300);
        vm.state_mut().v[0] = 5;
        vm.state_mut().v[1] = 10;
        assert_eq!(vm.run()?, ExecutionResult::Halt);
        assert_eq!(vm.state().v[0], 45);
        assert_eq!(vm.state().sp(), 0);
        assert_eq!(vm.state().pc(), 0x206);
        Ok(())
    }

    #[test]
    fn test_add_sets_carry_for_every_pair() {
        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0x8124]);
        for a in 0..=255u8 {
            for b in 0..=255u8 {
                exec(&mut vm, &[(1, a), (2, b)]);
                let sum = a as u16 + b as u16;
                assert_eq!(vm.state().v[1], (sum % 256) as u8);
                assert_eq!(vm.state().v[VF], (sum > 255) as u8, "{} + {}", a, b);
            }
        }
    }

    #[test]
    fn test_sub_sets_not_borrow_for_every_pair() {
        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0x8125]);
        for a in 0..=255u8 {
            for b in 0..=255u8 {
                exec(&mut vm, &[(1, a), (2, b)]);
                assert_eq!(vm.state().v[1], a.wrapping_sub(b));
                assert_eq!(vm.state().v[VF], (a >= b) as u8, "{} - {}", a, b);
            }
        }
    }

    #[test]
    fn test_subn() {
        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0x8127]);
        exec(&mut vm, &[(1, 10), (2, 30)]);
        assert_eq!((vm.state().v[1], vm.state().v[VF]), (20, 1));
        exec(&mut vm, &[(1, 30), (2, 10)]);
        assert_eq!((vm.state().v[1], vm.state().v[VF]), (236, 0));
        // equal operands don't borrow
        exec(&mut vm, &[(1, 7), (2, 7)]);
        assert_eq!((vm.state().v[1], vm.state().v[VF]), (0, 1));
    }

    #[test]
    fn test_shifts_move_displaced_bit_into_vf() {
        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0x8106]);
        exec(&mut vm, &[(1, 0b1000_0011)]);
        assert_eq!((vm.state().v[1], vm.state().v[VF]), (0b0100_0001, 1));
        exec(&mut vm, &[(1, 0b0000_0010)]);
        assert_eq!((vm.state().v[1], vm.state().v[VF]), (0b0000_0001, 0));

        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0x810E]);
        exec(&mut vm, &[(1, 0b1000_0011)]);
        assert_eq!((vm.state().v[1], vm.state().v[VF]), (0b0000_0110, 1));
        exec(&mut vm, &[(1, 0b0100_0000)]);
        assert_eq!((vm.state().v[1], vm.state().v[VF]), (0b1000_0000, 0));
    }

    #[test]
    fn test_flag_wins_when_vf_is_the_target() {
        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0x8F14]);
        exec(&mut vm, &[(VF, 200), (1, 100)]);
        assert_eq!(vm.state().v[VF], 1);

        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0x8F16]);
        exec(&mut vm, &[(VF, 0b10)]);
        assert_eq!(vm.state().v[VF], 0);
    }

    #[test]
    fn test_bitwise_and_load() {
        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0x8121, 0x8122, 0x8123, 0x8120]);
        vm.state_mut().v[1] = 0b1100;
        vm.state_mut().v[2] = 0b1010;
        vm.state_mut().v[VF] = 0x55;
        vm.step().unwrap();
        assert_eq!(vm.state().v[1], 0b1110);
        vm.step().unwrap();
        assert_eq!(vm.state().v[1], 0b1010);
        vm.step().unwrap();
        assert_eq!(vm.state().v[1], 0);
        vm.step().unwrap();
        assert_eq!(vm.state().v[1], 0b1010);
        // none of these touch the flag
        assert_eq!(vm.state().v[VF], 0x55);
    }

    #[test]
    fn test_immediates() {
        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0x63F5, 0x7312]);
        vm.step().unwrap();
        assert_eq!(vm.state().v[3], 0xF5);
        vm.step().unwrap();
        // wraps without a carry
        assert_eq!(vm.state().v[3], 0x07);
        assert_eq!(vm.state().v[VF], 0);
    }

    #[test]
    fn test_multiply_splits_product() {
        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0x9121]);
        exec(&mut vm, &[(1, 200), (2, 100)]);
        // 20000 = 0x4E20
        assert_eq!((vm.state().v[1], vm.state().v[VF]), (0x20, 0x4E));
        exec(&mut vm, &[(1, 255), (2, 255)]);
        assert_eq!((vm.state().v[1], vm.state().v[VF]), (0x01, 0xFE));
    }

    #[test]
    fn test_divide_with_remainder() {
        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0x9122]);
        exec(&mut vm, &[(1, 200), (2, 7)]);
        assert_eq!((vm.state().v[1], vm.state().v[VF]), (28, 4));
        exec(&mut vm, &[(1, 3), (2, 9)]);
        assert_eq!((vm.state().v[1], vm.state().v[VF]), (0, 3));
    }

    #[test]
    fn test_divide_by_zero_does_not_crash() {
        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0x9122]);
        assert_eq!(exec(&mut vm, &[(1, 42), (2, 0)]), ExecutionResult::Continue);
        assert_eq!((vm.state().v[1], vm.state().v[VF]), (0xFF, 42));
    }

    #[test]
    fn test_bcd16() {
        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0xA400, 0x9123]);
        // 12345 = 0x3039
        vm.state_mut().v[1] = 0x30;
        vm.state_mut().v[2] = 0x39;
        vm.step().unwrap();
        vm.step().unwrap();
        let mut digits = [0u8; 5];
        vm.state().memory.read_into(0x400, &mut digits);
        assert_eq!(digits, [1, 2, 3, 4, 5]);
        assert_eq!(vm.state().i(), 0x400);
    }

    #[test]
    fn test_bcd8() {
        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0xA400, 0xF133]);
        vm.state_mut().v[1] = 157;
        vm.step().unwrap();
        vm.step().unwrap();
        let mut digits = [0u8; 3];
        vm.state().memory.read_into(0x400, &mut digits);
        assert_eq!(digits, [1, 5, 7]);
        assert_eq!(vm.state().i(), 0x400);
    }

    #[test]
    fn test_register_dump_round_trip() {
        for k in 0..16usize {
            let mut rig = Rig::new();
            let store = 0xF055 | ((k as u16) << 8);
            let load = 0xF065 | ((k as u16) << 8);
            let mut vm = rig.vm(&[0xA500, store, load]);
            let original: Vec<u8> = (0..16).map(|r| (r as u8 * 17) ^ 0x5a).collect();
            vm.state_mut().v.copy_from_slice(&original);
            vm.step().unwrap();
            vm.step().unwrap();
            assert_eq!(vm.state().i(), 0x500);
            // scribble over the registers, then load them back
            vm.state_mut().v = [0xEE; 16];
            vm.step().unwrap();
            assert_eq!(&vm.state().v[..=k], &original[..=k], "k = {}", k);
            assert!(vm.state().v[k + 1..].iter().all(|&r| r == 0xEE));
            assert_eq!(vm.state().i(), 0x500);
        }
    }

    #[test]
    fn test_add_to_index() {
        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0xAFF0, 0xF11E]);
        vm.step().unwrap();
        exec_at(&mut vm, 0x202, &[(1, 0x0F)]);
        assert_eq!(vm.state().i(), 0xFFF);
        assert_eq!(vm.state().v[VF], 0);
        exec_at(&mut vm, 0x202, &[(1, 0x02)]);
        assert_eq!(vm.state().i(), 0x001);
        assert_eq!(vm.state().v[VF], 1);
    }

    fn exec_at(vm: &mut Chip8Interpreter, pc: u16, regs: &[(usize, u8)]) -> ExecutionResult {
        vm.state_mut().set_pc(pc);
        for &(r, val) in regs {
            vm.state_mut().v[r] = val;
        }
        vm.step().unwrap()
    }

    #[test]
    fn test_font_addresses() {
        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0xF129]);
        exec(&mut vm, &[(1, 0xA)]);
        assert_eq!(vm.state().i(), 50);

        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0xF130]);
        exec(&mut vm, &[(1, 0x2)]);
        assert_eq!(vm.state().i(), 100);
        let mut glyph = [0u8; 10];
        vm.state().memory.read_into(vm.state().i(), &mut glyph);
        assert_eq!(&glyph[..], &font::LARGE_FONT[20..30]);
    }

    #[test]
    fn test_rpl_flags_transfer_is_capped() {
        // (x + 1) & 3 registers move: 1, 2, 3, then 0 for x = 3
        for (x, moved) in [(0usize, 1usize), (1, 2), (2, 3), (3, 0), (6, 3), (7, 0), (15, 0)] {
            let mut rig = Rig::new();
            let save = 0xF075 | ((x as u16) << 8);
            let restore = 0xF085 | ((x as u16) << 8);
            let mut vm = rig.vm(&[save, restore]);
            vm.state_mut().v = [0x11; 16];
            vm.step().unwrap();
            let saved = vm.state().rpl.iter().filter(|&&f| f == 0x11).count();
            assert_eq!(saved, moved, "save x = {}", x);

            vm.state_mut().v = [0; 16];
            vm.step().unwrap();
            let restored = vm.state().v.iter().filter(|&&r| r == 0x11).count();
            assert_eq!(restored, moved, "restore x = {}", x);
        }
    }

    #[test]
    fn test_conditional_skips() {
        let cases: [(u16, u8, u8, bool); 14] = [
            (0x3142, 0x42, 0, true),
            (0x3142, 0x41, 0, false),
            (0x4142, 0x41, 0, true),
            (0x4142, 0x42, 0, false),
            (0x5120, 9, 9, true),
            (0x5120, 9, 8, false),
            (0x5121, 9, 8, true),
            (0x5121, 8, 8, false),
            (0x5122, 7, 8, true),
            (0x5122, 8, 8, false),
            (0x5123, 7, 8, true),
            (0x5123, 8, 8, false),
            (0x9120, 7, 8, true),
            (0x9120, 8, 8, false),
        ];
        for (opcode, v1, v2, skips) in cases {
            let mut rig = Rig::new();
            let mut vm = rig.vm(&[opcode]);
            exec(&mut vm, &[(1, v1), (2, v2)]);
            let expected = if skips { 0x204 } else { 0x202 };
            assert_eq!(vm.state().pc(), expected, "{:04x} with {} {}", opcode, v1, v2);
        }
    }

    #[test]
    fn test_jumps() {
        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0x1ABC]);
        vm.step().unwrap();
        assert_eq!(vm.state().pc(), 0xABC);

        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0xB300]);
        exec(&mut vm, &[(0, 4)]);
        assert_eq!(vm.state().pc(), 0x304);

        // nnn + V0 wraps at the top of RAM
        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0xBFF0]);
        exec(&mut vm, &[(0, 0x20)]);
        assert_eq!(vm.state().pc(), 0x010);
    }

    #[test]
    fn test_random_is_masked() {
        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0xC10F]);
        for _ in 0..64 {
            exec(&mut vm, &[]);
            assert!(vm.state().v[1] <= 0x0F);
        }
        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0xC100]);
        exec(&mut vm, &[(1, 0xAA)]);
        assert_eq!(vm.state().v[1], 0);
    }

    #[test]
    fn test_random_is_reproducible_with_seed() {
        let mut first = Rig::new();
        let mut second = Rig::new();
        let mut a = first.vm(&[0xC1FF, 0xC2FF, 0xC3FF]);
        let mut b = second.vm(&[0xC1FF, 0xC2FF, 0xC3FF]);
        for _ in 0..3 {
            a.step().unwrap();
            b.step().unwrap();
        }
        assert_eq!(a.state().v, b.state().v);
    }

    #[test]
    fn test_draw_wraps_and_second_draw_erases() {
        let mut rig = Rig::new();
        {
            let mut vm = rig.vm(&[
                0x603C, // LD V0, 60
                0x611C, // LD V1, 28
                0xA300, // LD I, 0x300
                0xD015, // DRW V0, V1, 5
                0x0000,
            ]);
            vm.state_mut().memory.write(&[0xFF; 5], 0x300);
            assert_eq!(vm.run().unwrap(), ExecutionResult::Halt);
            assert_eq!(vm.state().v[VF], 0);
        }
        assert_eq!(rig.display.lit_pixels(), 40);
        assert!(rig.display.get_pixel(3, 0));
        assert!(rig.display.get_pixel(60, 31));

        {
            let mut vm = rig.vm(&[0x603C, 0x611C, 0xA300, 0xD015, 0x0000]);
            vm.state_mut().memory.write(&[0xFF; 5], 0x300);
            vm.run().unwrap();
            assert_eq!(vm.state().v[VF], 1);
        }
        assert_eq!(rig.display.lit_pixels(), 0);
    }

    #[test]
    fn test_draw_glyph_and_clear() {
        let mut rig = Rig::new();
        {
            let mut vm = rig.vm(&[0x6008, 0xF029, 0xD005, 0x0000]);
            vm.run().unwrap();
        }
        // "8" is 0xF0, 0x90, 0xF0, 0x90, 0xF0: 4 + 2 + 4 + 2 + 4 pixels
        assert_eq!(rig.display.lit_pixels(), 16);
        assert!(rig.display.get_pixel(0, 0));
        assert!(!rig.display.get_pixel(1, 1));

        {
            let mut vm = rig.vm(&[0x00E0, 0x0000]);
            vm.run().unwrap();
        }
        assert_eq!(rig.display.lit_pixels(), 0);
    }

    #[test]
    fn test_key_skips_and_request_mask() {
        let mut rig = Rig::with_input(DummyInput::new(&[0x5]));
        let mut vm = rig.vm(&[0xE19E]);
        exec(&mut vm, &[(1, 0x5)]);
        assert_eq!(vm.state().pc(), 0x204);
        exec(&mut vm, &[(1, 0x6)]);
        assert_eq!(vm.state().pc(), 0x202);
        assert_eq!(vm.state().key_request_mask(), 0b0110_0000);

        let mut rig = Rig::with_input(DummyInput::new(&[0x5]));
        let mut vm = rig.vm(&[0xE1A1]);
        exec(&mut vm, &[(1, 0x5)]);
        assert_eq!(vm.state().pc(), 0x202);
        exec(&mut vm, &[(1, 0x6)]);
        assert_eq!(vm.state().pc(), 0x204);
    }

    #[test]
    fn test_wait_for_key() -> Result<(), Error> {
        let mut rig = Rig::with_input(DummyInput::new(&[]).with_presses(&[0xB]));
        let mut vm = rig.vm(&[0xF30A, 0xF40A]);
        vm.step()?;
        assert_eq!(vm.state().v[3], 0xB);
        // nobody left at the keyboard
        assert!(matches!(vm.step(), Err(Error::Interrupted)));
        assert_eq!(vm.state().v[4], 0);
        Ok(())
    }

    /// takes its time answering a key wait
    struct SlowInput {
        key: u8,
        delay: Duration,
    }

    impl Input for SlowInput {
        fn is_key_down(&mut self, _key: u8) -> Result<bool, Error> {
            Ok(false)
        }

        fn wait_for_key(&mut self) -> Result<u8, Error> {
            std::thread::sleep(self.delay);
            Ok(self.key)
        }
    }

    #[test]
    fn test_timers_run_while_waiting_for_key() -> Result<(), Error> {
        let mut display = Bitmap::default();
        let mut input = SlowInput {
            key: 0x7,
            delay: Duration::from_millis(300),
        };
        let mut vm = Chip8Interpreter::new(&mut display, &mut input, Box::new(Mute::new()));
        let program: Vec<u8> = [
            0x60FFu16, // LD V0, ff
            0xF015,    // LD DT, V0
            0xF10A,    // LD V1, K
            0xF207,    // LD V2, DT
        ]
        .iter()
        .flat_map(|w| w.to_be_bytes())
        .collect();
        vm.load_program(&mut program.as_slice())?;

        let ticker = Ticker::spawn(vm.timers(), TIMER_HZ)?;
        for _ in 0..4 {
            assert_eq!(vm.step()?, ExecutionResult::Continue);
        }
        drop(ticker);

        assert_eq!(vm.state().v[1], 0x7);
        // 300ms is about 18 ticks at 60Hz
        assert!(vm.state().v[2] <= 0xF5, "delay only reached {}", vm.state().v[2]);
        assert_eq!(vm.state().pc(), 0x208);
        Ok(())
    }

    #[test]
    fn test_timers_from_program() -> Result<(), Error> {
        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0x6105, 0xF115, 0xF207]);
        vm.step()?;
        vm.step()?;
        vm.tick()?;
        vm.tick()?;
        vm.step()?;
        assert_eq!(vm.state().v[2], 3);
        Ok(())
    }

    #[test]
    fn test_sound_timer_drives_tone() -> Result<(), Error> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut rig = Rig::new();
        let mut vm = rig.vm_with_sound(&[0x6102, 0xF118], Box::new(ToneLog(Arc::clone(&log))));
        vm.step()?;
        vm.step()?;
        assert_eq!(*log.lock()?, vec![true]);
        let timers = vm.timers();
        timers.tick()?;
        timers.tick()?;
        assert_eq!(*log.lock()?, vec![true, false]);
        Ok(())
    }

    #[test]
    fn test_invalid_opcode_leaves_state_alone() {
        for opcode in [0x5004, 0x5124, 0x8008, 0x800F, 0x9004, 0xE000, 0xF0FF, 0x0123, 0x00E1] {
            let mut rig = Rig::new();
            let mut vm = rig.vm(&[opcode]);
            vm.state_mut().v = [3; 16];
            assert_eq!(vm.step().unwrap(), ExecutionResult::InvalidOpcode(opcode));
            assert_eq!(vm.state().pc(), 0x202);
            assert_eq!(vm.state().v, [3; 16]);
            assert_eq!(vm.state().i(), 0);
        }
    }

    #[test]
    fn test_extension_opcodes_are_unsupported() {
        for opcode in [0x00C4, 0x00FB, 0x00FC, 0x00FD, 0x00FE, 0x00FF, 0xF194] {
            let mut rig = Rig::new();
            let mut vm = rig.vm(&[opcode]);
            assert_eq!(vm.step().unwrap(), ExecutionResult::UnsupportedOpcode(opcode));
            assert_eq!(vm.state().pc(), 0x202);
        }
    }

    #[test]
    fn test_exit_is_not_a_halt() -> Result<(), Error> {
        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0x00FD]);
        assert_eq!(vm.run()?, ExecutionResult::UnsupportedOpcode(0x00FD));
        Ok(())
    }

    #[test]
    fn test_run_surfaces_invalid_opcode() -> Result<(), Error> {
        let mut rig = Rig::new();
        let mut vm = rig.vm(&[0x6001, 0x7001, 0x5004]);
        assert_eq!(vm.run()?, ExecutionResult::InvalidOpcode(0x5004));
        assert_eq!(vm.state().v[0], 2);
        assert_eq!(vm.state().pc(), 0x206);
        Ok(())
    }

    #[test]
    fn test_main_loop_paces_and_stops() -> Result<(), Error> {
        let mut rig = Rig::new();
        let mut vm = rig.vm(&[
            0x7001, // ADD V0, 1
            0x3010, // SE V0, 16
            0x1200, // JP 0x200
            0x0000,
        ]);
        let started = Instant::now();
        assert_eq!(vm.main_loop(10)?, ExecutionResult::Halt);
        assert_eq!(vm.state().v[0], 16);
        // 16 passes of 3 instructions is 48 steps, so at least 4 frames went by
        assert!(started.elapsed() >= Duration::from_millis(60));
        Ok(())
    }
}
