use std::fmt;

/// One opcode split into its operand fields. Worked example for 0x73EE:
///
/// Var,  Bit-length, Location,                  Description,
/// class 4           high byte, high nibble     opcode group
/// x     4           high byte, low nibble      CPU register
/// y     4           low byte, high nibble      CPU register
/// n     4           low byte, low nibble       opcode subgroup / sprite rows
/// nn    8           low byte, both nibbles     integer
/// nnn   12          high byte, low nibble      memory address
///                   and low byte, both nibbles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u16,
    pub class: u8,
    pub x: usize,
    pub y: usize,
    pub n: u8,
    pub nn: u8,
    pub nnn: u16,
}

impl Instruction {
    pub fn decode(opcode: u16) -> Self {
        Instruction {
            opcode,
            class: ((opcode & 0xF000) >> 12) as u8,
            x: ((opcode & 0x0F00) >> 8) as usize,
            y: ((opcode & 0x00F0) >> 4) as usize,
            n: (opcode & 0x000F) as u8,
            nn: (opcode & 0x00FF) as u8,
            nnn: opcode & 0x0FFF,
        }
    }

    /// assembler-style rendering, for trace logs and crash reports. Anything
    /// outside the opcode table comes out as `??? xxxx`
    pub fn mnemonic(&self) -> String {
        let Instruction {
            opcode,
            class,
            x,
            y,
            n,
            nn,
            nnn,
        } = *self;
        match (class, n) {
            (0x0, _) => match opcode {
                0x0000 => "HALT".to_string(),
                0x00E0 => "CLS".to_string(),
                0x00EE => "RET".to_string(),
                0x00C0..=0x00CF => format!("SCD {}", n),
                0x00FB => "SCR".to_string(),
                0x00FC => "SCL".to_string(),
                0x00FD => "EXIT".to_string(),
                0x00FE => "LOW".to_string(),
                0x00FF => "HIGH".to_string(),
                _ => format!("??? {:04x}", opcode),
            },
            (0x1, _) => format!("JP {:03x}", nnn),
            (0x2, _) => format!("CALL {:03x}", nnn),
            (0x3, _) => format!("SE V{:X}, {:02x}", x, nn),
            (0x4, _) => format!("SNE V{:X}, {:02x}", x, nn),
            (0x5, 0x0) => format!("SE V{:X}, V{:X}", x, y),
            (0x5, 0x1) => format!("SGT V{:X}, V{:X}", x, y),
            (0x5, 0x2) => format!("SLT V{:X}, V{:X}", x, y),
            (0x5, 0x3) => format!("SNE V{:X}, V{:X}", x, y),
            (0x6, _) => format!("LD V{:X}, {:02x}", x, nn),
            (0x7, _) => format!("ADD V{:X}, {:02x}", x, nn),
            (0x8, 0x0) => format!("LD V{:X}, V{:X}", x, y),
            (0x8, 0x1) => format!("OR V{:X}, V{:X}", x, y),
            (0x8, 0x2) => format!("AND V{:X}, V{:X}", x, y),
            (0x8, 0x3) => format!("XOR V{:X}, V{:X}", x, y),
            (0x8, 0x4) => format!("ADD V{:X}, V{:X}", x, y),
            (0x8, 0x5) => format!("SUB V{:X}, V{:X}", x, y),
            (0x8, 0x6) => format!("SHR V{:X}", x),
            (0x8, 0x7) => format!("SUBN V{:X}, V{:X}", x, y),
            (0x8, 0xE) => format!("SHL V{:X}", x),
            (0x9, 0x0) => format!("SNE V{:X}, V{:X}", x, y),
            (0x9, 0x1) => format!("MUL V{:X}, V{:X}", x, y),
            (0x9, 0x2) => format!("DIV V{:X}, V{:X}", x, y),
            (0x9, 0x3) => format!("BCD V{:X}, V{:X}", x, y),
            (0xA, _) => format!("LD I, {:03x}", nnn),
            (0xB, _) => format!("JP V0, {:03x}", nnn),
            (0xC, _) => format!("RND V{:X}, {:02x}", x, nn),
            (0xD, _) => format!("DRW V{:X}, V{:X}, {}", x, y, n),
            (0xE, _) if nn == 0x9E => format!("SKP V{:X}", x),
            (0xE, _) if nn == 0xA1 => format!("SKNP V{:X}", x),
            (0xF, _) => match nn {
                0x07 => format!("LD V{:X}, DT", x),
                0x0A => format!("LD V{:X}, K", x),
                0x15 => format!("LD DT, V{:X}", x),
                0x18 => format!("LD ST, V{:X}", x),
                0x1E => format!("ADD I, V{:X}", x),
                0x29 => format!("LD F, V{:X}", x),
                0x30 => format!("LD HF, V{:X}", x),
                0x33 => format!("LD B, V{:X}", x),
                0x55 => format!("LD [I], V{:X}", x),
                0x65 => format!("LD V{:X}, [I]", x),
                0x75 => format!("LD R, V{:X}", x),
                0x85 => format!("LD V{:X}, R", x),
                0x94 => format!("LD ASCII, V{:X}", x),
                _ => format!("??? {:04x}", opcode),
            },
            _ => format!("??? {:04x}", opcode),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x} {}", self.opcode, self.mnemonic())
    }
}

/// what happened when the interpreter executed one instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionResult {
    /// keep going
    Continue,
    /// the program asked to stop
    Halt,
    /// a known extension opcode this interpreter doesn't implement
    UnsupportedOpcode(u16),
    /// matches nothing in the opcode table
    InvalidOpcode(u16),
}

impl ExecutionResult {
    /// the offending opcode, for anything that wasn't a clean stop
    pub fn opcode(&self) -> Option<u16> {
        match *self {
            ExecutionResult::UnsupportedOpcode(op) | ExecutionResult::InvalidOpcode(op) => {
                Some(op)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionResult::Continue => write!(f, "running"),
            ExecutionResult::Halt => write!(f, "halted"),
            ExecutionResult::UnsupportedOpcode(op) => write!(f, "Unsupported opcode: {:04X}", op),
            ExecutionResult::InvalidOpcode(op) => write!(f, "Unknown opcode: {:04X}", op),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_fields() {
        let i = Instruction::decode(0xD7B5);
        assert_eq!(i.class, 0xD);
        assert_eq!(i.x, 0x7);
        assert_eq!(i.y, 0xB);
        assert_eq!(i.n, 0x5);
        assert_eq!(i.nn, 0xB5);
        assert_eq!(i.nnn, 0x7B5);
    }

    #[test]
    fn test_mnemonics() {
        let cases = [
            (0x00E0, "CLS"),
            (0x00EE, "RET"),
            (0x00FD, "EXIT"),
            (0x2456, "CALL 456"),
            (0x342A, "SE V4, 2a"),
            (0x5AE1, "SGT VA, VE"),
            (0x8264, "ADD V2, V6"),
            (0x8E0E, "SHL VE"),
            (0x9121, "MUL V1, V2"),
            (0xD7B0, "DRW V7, VB, 0"),
            (0xECA1, "SKNP VC"),
            (0xF230, "LD HF, V2"),
            (0xF175, "LD R, V1"),
            (0xF485, "LD V4, R"),
            (0x5004, "??? 5004"),
            (0xE000, "??? e000"),
        ];
        for (opcode, text) in cases {
            assert_eq!(Instruction::decode(opcode).mnemonic(), text);
        }
    }

    #[test]
    fn test_result_reports_opcode() {
        assert_eq!(ExecutionResult::Continue.opcode(), None);
        assert_eq!(ExecutionResult::Halt.opcode(), None);
        assert_eq!(ExecutionResult::InvalidOpcode(0x5004).opcode(), Some(0x5004));
        assert_eq!(
            ExecutionResult::UnsupportedOpcode(0x00fd).to_string(),
            "Unsupported opcode: 00FD"
        );
    }
}
