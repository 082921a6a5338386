/// core-lib/src/cpu/cb.rs
///
/// CB-prefixed instructions, decoded entirely by bit pattern: the low three
/// bits pick the operand, bits 5-3 the rotate kind or bit number, and the
/// top two bits the group (shift/rotate, BIT, RES, SET).
use super::Cpu;
use crate::bus::Bus;

impl Cpu {
    /// Executes one CB-prefixed instruction; the returned count covers the
    /// prefix fetch as well.
    pub(crate) fn execute_cb(&mut self, bus: &mut dyn Bus) -> u32 {
        let opcode = self.fetch_byte(bus);
        let target = opcode & 0x07;
        let selector = (opcode >> 3) & 0x07;
        let value = self.read_operand(target, bus);

        match opcode >> 6 {
            0 => {
                let result = match selector {
                    0 => self.rot_rlc(value),
                    1 => self.rot_rrc(value),
                    2 => self.rot_rl(value),
                    3 => self.rot_rr(value),
                    4 => self.shift_sla(value),
                    5 => self.shift_sra(value),
                    6 => self.shift_swap(value),
                    _ => self.shift_srl(value),
                };
                self.write_operand(target, bus, result);
                if target == 6 {
                    16
                } else {
                    8
                }
            }
            1 => {
                // BIT n: Z from the tested bit, carry untouched.
                let carry = self.flag_c();
                self.set_flags_znhc(value & (1 << selector) == 0, false, true, carry);
                if target == 6 {
                    12
                } else {
                    8
                }
            }
            2 => {
                self.write_operand(target, bus, value & !(1 << selector));
                if target == 6 {
                    16
                } else {
                    8
                }
            }
            _ => {
                self.write_operand(target, bus, value | 1 << selector);
                if target == 6 {
                    16
                } else {
                    8
                }
            }
        }
    }
}
