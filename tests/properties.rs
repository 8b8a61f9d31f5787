use lc3::cpu::{decode, encode};
use lc3::{sign_extend, Condition, Cpu, Image, Registers, Word};
use proptest::prelude::*;

fn cpu_with(words: Vec<Word>) -> Cpu {
    let mut cpu = Cpu::new();
    cpu.load_image(&Image::new(0x3000, words)).unwrap();
    cpu
}

proptest! {
    #[test]
    fn sign_extend_keeps_low_bits(x in any::<u16>(), bits in 1u32..16) {
        let mask: u16 = (1 << bits) - 1;
        let extended = sign_extend(x & mask, bits);

        prop_assert_eq!(extended & mask, x & mask);

        let value = extended as i16 as i32;
        let half = 1i32 << (bits - 1);
        prop_assert!(value >= -half && value < half, "x={x:#x} bits={bits} -> {value}");
    }

    #[test]
    fn flags_follow_sign_of_result(value in any::<u16>(), index in 0u8..8) {
        let mut regs = Registers::new();
        regs.set(index, value);
        regs.update_flags(index);

        let expected = match value as i16 {
            v if v < 0 => Condition::Negative,
            0 => Condition::Zero,
            _ => Condition::Positive,
        };
        prop_assert_eq!(regs.cond, expected);
    }

    #[test]
    fn pc_relative_wraps(pc in any::<u16>(), offset in any::<u16>()) {
        let mut regs = Registers::new();
        regs.pc = pc;
        prop_assert_eq!(regs.pc_relative(offset), pc.wrapping_add(offset));
    }

    #[test]
    fn decode_is_stable_through_encode(word in any::<u16>()) {
        let instr = decode(word);
        prop_assert_eq!(decode(encode(&instr)), instr);
    }

    #[test]
    fn add_immediate_wraps(start in any::<u16>(), imm in 0u16..32) {
        // ADD R1, R1, #imm5
        let mut cpu = cpu_with(vec![0x1260 | imm]);
        cpu.regs.set(1, start);
        cpu.step().unwrap();

        prop_assert_eq!(cpu.regs.get(1), start.wrapping_add(sign_extend(imm, 5)));
        prop_assert_eq!(cpu.regs.pc, 0x3001);
    }

    #[test]
    fn not_is_an_involution(value in any::<u16>()) {
        // NOT R2, R2 twice
        let mut cpu = cpu_with(vec![0x94BF, 0x94BF]);
        cpu.regs.set(2, value);

        cpu.step().unwrap();
        prop_assert_eq!(cpu.regs.get(2), !value);
        cpu.step().unwrap();
        prop_assert_eq!(cpu.regs.get(2), value);
    }

    #[test]
    fn store_then_load_round_trips(value in any::<u16>()) {
        // ST R3, #1 ; LD R4, #0 ; .FILL 0
        let mut cpu = cpu_with(vec![0x3601, 0x2800, 0x0000]);
        cpu.regs.set(3, value);

        cpu.step().unwrap();
        cpu.step().unwrap();

        prop_assert_eq!(cpu.mem.peek(0x3002), value);
        prop_assert_eq!(cpu.regs.get(4), value);
    }
}
