//! Binary encoding of A- and C-instructions
//!
//! C-instruction layout: `111a cccc ccdd djjj`.

/// `(mnemonic, zx nx zy ny f no)` with `A` as the y operand; the same rows
/// with `M` for `A` set the a-bit
const COMP_TABLE: [(&str, u16); 23] = [
    ("0", 0b101010),
    ("1", 0b111111),
    ("-1", 0b111010),
    ("D", 0b001100),
    ("A", 0b110000),
    ("!D", 0b001101),
    ("!A", 0b110001),
    ("-D", 0b001111),
    ("-A", 0b110011),
    ("D+1", 0b011111),
    ("1+D", 0b011111),
    ("A+1", 0b110111),
    ("1+A", 0b110111),
    ("D-1", 0b001110),
    ("A-1", 0b110010),
    ("D+A", 0b000010),
    ("A+D", 0b000010),
    ("D-A", 0b010011),
    ("A-D", 0b000111),
    ("D&A", 0b000000),
    ("A&D", 0b000000),
    ("D|A", 0b010101),
    ("A|D", 0b010101),
];

const JUMP_TABLE: [(&str, u16); 7] = [
    ("JGT", 0b001),
    ("JEQ", 0b010),
    ("JGE", 0b011),
    ("JLT", 0b100),
    ("JNE", 0b101),
    ("JLE", 0b110),
    ("JMP", 0b111),
];

/// a-bit plus the six comp bits
pub fn comp_bits(comp: &str) -> Option<u16> {
    let uses_memory = comp.contains('M');
    if uses_memory && comp.contains('A') {
        return None;
    }
    let as_register = comp.replace('M', "A");
    COMP_TABLE
        .iter()
        .find(|(mnemonic, _)| *mnemonic == as_register)
        .map(|(_, bits)| (u16::from(uses_memory) << 6) | bits)
}

/// Any order of `A`, `D`, `M`, each at most once
pub fn dest_bits(dest: &str) -> Option<u16> {
    let mut bits = 0;
    for c in dest.chars() {
        let bit = match c {
            'A' => 0b100,
            'D' => 0b010,
            'M' => 0b001,
            _ => return None,
        };
        if bits & bit != 0 {
            return None;
        }
        bits |= bit;
    }
    Some(bits)
}

pub fn jump_bits(jump: &str) -> Option<u16> {
    JUMP_TABLE
        .iter()
        .find(|(mnemonic, _)| *mnemonic == jump)
        .map(|(_, bits)| *bits)
}

pub fn encode_address(value: u16) -> u16 {
    value & 0x7FFF
}

pub fn encode_compute(comp: u16, dest: u16, jump: u16) -> u16 {
    0b111 << 13 | comp << 6 | dest << 3 | jump
}

/// Sixteen `0`/`1` characters
pub fn to_binary(word: u16) -> String {
    format!("{:016b}", word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comp_a_bit() {
        assert_eq!(comp_bits("D+A"), Some(0b0_000010));
        assert_eq!(comp_bits("D+M"), Some(0b1_000010));
        assert_eq!(comp_bits("M+D"), Some(0b1_000010));
        assert_eq!(comp_bits("!M"), Some(0b1_110001));
        assert_eq!(comp_bits("0"), Some(0b0_101010));
        assert_eq!(comp_bits("A+M"), None);
        assert_eq!(comp_bits("D*A"), None);
    }

    #[test]
    fn test_dest_any_order() {
        assert_eq!(dest_bits("AMD"), Some(0b111));
        assert_eq!(dest_bits("MD"), Some(0b011));
        assert_eq!(dest_bits("DM"), Some(0b011));
        assert_eq!(dest_bits("AM"), Some(0b101));
        assert_eq!(dest_bits("MM"), None);
        assert_eq!(dest_bits("X"), None);
    }

    #[test]
    fn test_known_words() {
        // D=M
        let word = encode_compute(comp_bits("M").unwrap(), dest_bits("D").unwrap(), 0);
        assert_eq!(to_binary(word), "1111110000010000");
        // 0;JMP
        let word = encode_compute(comp_bits("0").unwrap(), 0, jump_bits("JMP").unwrap());
        assert_eq!(to_binary(word), "1110101010000111");
        // AM=M-1
        let word = encode_compute(comp_bits("M-1").unwrap(), dest_bits("AM").unwrap(), 0);
        assert_eq!(to_binary(word), "1111110010101000");
        assert_eq!(to_binary(encode_address(21)), "0000000000010101");
        assert_eq!(jump_bits("JXX"), None);
    }
}
