/// core-lib/src/cpu/opcodes.rs
///
/// Unprefixed instruction decode and execution. The 0x40..=0xBF block is
/// decoded by bit pattern (operand index in the low three bits, operation
/// in the next three); everything else is dispatched explicitly. Each arm
/// evaluates to the T-cycles consumed, with conditional branches yielding
/// their taken/not-taken counts.
use super::Cpu;
use crate::bus::Bus;

impl Cpu {
    pub(crate) fn fetch_byte(&mut self, bus: &mut dyn Bus) -> u8 {
        let value = bus.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    pub(crate) fn fetch_word(&mut self, bus: &mut dyn Bus) -> u16 {
        let lo = u16::from(self.fetch_byte(bus));
        let hi = u16::from(self.fetch_byte(bus));
        (hi << 8) | lo
    }

    pub(crate) fn push_word(&mut self, bus: &mut dyn Bus, value: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.write(self.regs.sp, (value >> 8) as u8);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.write(self.regs.sp, value as u8);
    }

    pub(crate) fn pop_word(&mut self, bus: &mut dyn Bus) -> u16 {
        let lo = u16::from(bus.read(self.regs.sp));
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let hi = u16::from(bus.read(self.regs.sp));
        self.regs.sp = self.regs.sp.wrapping_add(1);
        (hi << 8) | lo
    }

    /// Operand read by table index: B, C, D, E, H, L, (HL), A.
    pub(crate) fn read_operand(&self, index: u8, bus: &mut dyn Bus) -> u8 {
        match index & 0x07 {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => self.regs.h,
            5 => self.regs.l,
            6 => bus.read(self.regs.hl()),
            _ => self.regs.a,
        }
    }

    /// Operand write by table index: B, C, D, E, H, L, (HL), A.
    pub(crate) fn write_operand(&mut self, index: u8, bus: &mut dyn Bus, value: u8) {
        match index & 0x07 {
            0 => self.regs.b = value,
            1 => self.regs.c = value,
            2 => self.regs.d = value,
            3 => self.regs.e = value,
            4 => self.regs.h = value,
            5 => self.regs.l = value,
            6 => bus.write(self.regs.hl(), value),
            _ => self.regs.a = value,
        }
    }

    // Arithmetic and logic.

    fn alu_add(&mut self, value: u8, with_carry: bool) {
        let carry = u8::from(with_carry && self.flag_c());
        let a = self.regs.a;
        let result = a.wrapping_add(value).wrapping_add(carry);
        let half = (a & 0x0F) + (value & 0x0F) + carry > 0x0F;
        let full = u16::from(a) + u16::from(value) + u16::from(carry) > 0xFF;
        self.set_flags_znhc(result == 0, false, half, full);
        self.regs.a = result;
    }

    /// Shared by SUB, SBC, and CP (which drops the result).
    fn alu_sub(&mut self, value: u8, with_carry: bool, write_back: bool) {
        let carry = u8::from(with_carry && self.flag_c());
        let a = self.regs.a;
        let result = a.wrapping_sub(value).wrapping_sub(carry);
        let half = (a & 0x0F) < (value & 0x0F) + carry;
        let full = u16::from(a) < u16::from(value) + u16::from(carry);
        self.set_flags_znhc(result == 0, true, half, full);
        if write_back {
            self.regs.a = result;
        }
    }

    fn alu_and(&mut self, value: u8) {
        self.regs.a &= value;
        self.set_flags_znhc(self.regs.a == 0, false, true, false);
    }

    fn alu_xor(&mut self, value: u8) {
        self.regs.a ^= value;
        self.set_flags_znhc(self.regs.a == 0, false, false, false);
    }

    fn alu_or(&mut self, value: u8) {
        self.regs.a |= value;
        self.set_flags_znhc(self.regs.a == 0, false, false, false);
    }

    /// INC r leaves the carry flag alone.
    fn alu_inc(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        let carry = self.flag_c();
        self.set_flags_znhc(result == 0, false, (value & 0x0F) + 1 > 0x0F, carry);
        result
    }

    /// DEC r leaves the carry flag alone.
    fn alu_dec(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        let carry = self.flag_c();
        self.set_flags_znhc(result == 0, true, value & 0x0F == 0, carry);
        result
    }

    /// ADD HL,rr: the zero flag is untouched.
    fn alu_add_hl(&mut self, value: u16) {
        let hl = self.regs.hl();
        let zero = self.flag_z();
        let half = (hl & 0x0FFF) + (value & 0x0FFF) > 0x0FFF;
        let full = u32::from(hl) + u32::from(value) > 0xFFFF;
        self.set_flags_znhc(zero, false, half, full);
        self.regs.set_hl(hl.wrapping_add(value));
    }

    /// ADD SP,e / LD HL,SP+e: carries computed on the low byte with the
    /// offset taken as unsigned, the sum taken as signed.
    fn sp_plus_offset(&mut self, bus: &mut dyn Bus) -> u16 {
        let offset = self.fetch_byte(bus);
        let sp = self.regs.sp;
        let half = (sp & 0x0F) + u16::from(offset & 0x0F) > 0x0F;
        let full = (sp & 0xFF) + u16::from(offset) > 0xFF;
        self.set_flags_znhc(false, false, half, full);
        sp.wrapping_add(offset as i8 as u16)
    }

    /// BCD adjust after an addition or subtraction.
    fn alu_daa(&mut self) {
        let mut a = self.regs.a;
        let mut carry = self.flag_c();
        if self.flag_n() {
            if carry {
                a = a.wrapping_sub(0x60);
            }
            if self.flag_h() {
                a = a.wrapping_sub(0x06);
            }
        } else {
            if carry || a > 0x99 {
                a = a.wrapping_add(0x60);
                carry = true;
            }
            if self.flag_h() || a & 0x0F > 0x09 {
                a = a.wrapping_add(0x06);
            }
        }
        let subtract = self.flag_n();
        self.set_flags_znhc(a == 0, subtract, false, carry);
        self.regs.a = a;
    }

    // Rotates and shifts. These set Z from the result, as the CB block
    // wants; the accumulator forms clear Z afterwards.

    pub(crate) fn rot_rlc(&mut self, value: u8) -> u8 {
        let result = value.rotate_left(1);
        self.set_flags_znhc(result == 0, false, false, value & 0x80 != 0);
        result
    }

    pub(crate) fn rot_rrc(&mut self, value: u8) -> u8 {
        let result = value.rotate_right(1);
        self.set_flags_znhc(result == 0, false, false, value & 0x01 != 0);
        result
    }

    pub(crate) fn rot_rl(&mut self, value: u8) -> u8 {
        let result = value << 1 | u8::from(self.flag_c());
        self.set_flags_znhc(result == 0, false, false, value & 0x80 != 0);
        result
    }

    pub(crate) fn rot_rr(&mut self, value: u8) -> u8 {
        let result = value >> 1 | u8::from(self.flag_c()) << 7;
        self.set_flags_znhc(result == 0, false, false, value & 0x01 != 0);
        result
    }

    pub(crate) fn shift_sla(&mut self, value: u8) -> u8 {
        let result = value << 1;
        self.set_flags_znhc(result == 0, false, false, value & 0x80 != 0);
        result
    }

    pub(crate) fn shift_sra(&mut self, value: u8) -> u8 {
        let result = value >> 1 | (value & 0x80);
        self.set_flags_znhc(result == 0, false, false, value & 0x01 != 0);
        result
    }

    pub(crate) fn shift_swap(&mut self, value: u8) -> u8 {
        let result = value.rotate_left(4);
        self.set_flags_znhc(result == 0, false, false, false);
        result
    }

    pub(crate) fn shift_srl(&mut self, value: u8) -> u8 {
        let result = value >> 1;
        self.set_flags_znhc(result == 0, false, false, value & 0x01 != 0);
        result
    }

    // Control flow. The operand is always consumed; the branch decides the
    // cycle count.

    fn op_jr(&mut self, bus: &mut dyn Bus, taken: bool) -> u32 {
        let offset = self.fetch_byte(bus) as i8;
        if taken {
            self.regs.pc = self.regs.pc.wrapping_add(offset as u16);
            12
        } else {
            8
        }
    }

    fn op_jp(&mut self, bus: &mut dyn Bus, taken: bool) -> u32 {
        let target = self.fetch_word(bus);
        if taken {
            self.regs.pc = target;
            16
        } else {
            12
        }
    }

    fn op_call(&mut self, bus: &mut dyn Bus, taken: bool) -> u32 {
        let target = self.fetch_word(bus);
        if taken {
            self.push_word(bus, self.regs.pc);
            self.regs.pc = target;
            24
        } else {
            12
        }
    }

    fn op_ret_cond(&mut self, bus: &mut dyn Bus, taken: bool) -> u32 {
        if taken {
            self.regs.pc = self.pop_word(bus);
            20
        } else {
            8
        }
    }

    fn op_rst(&mut self, bus: &mut dyn Bus, vector: u16) -> u32 {
        self.push_word(bus, self.regs.pc);
        self.regs.pc = vector;
        16
    }

    fn op_halt(&mut self, bus: &mut dyn Bus) -> u32 {
        if !self.ime && bus.pending_interrupts() != 0 {
            // HALT bug: the following byte executes twice.
            self.halt_bug = true;
        } else {
            self.halted = true;
        }
        4
    }

    /// Executes one fetched opcode and returns its T-cycle count.
    #[allow(clippy::too_many_lines)]
    pub(crate) fn execute(&mut self, opcode: u8, bus: &mut dyn Bus) -> u32 {
        match opcode {
            // Loads, 16-bit loads, and register-pair arithmetic.
            0x00 => 4, // NOP
            0x01 => {
                let value = self.fetch_word(bus);
                self.regs.set_bc(value);
                12
            }
            0x02 => {
                bus.write(self.regs.bc(), self.regs.a);
                8
            }
            0x03 => {
                self.regs.set_bc(self.regs.bc().wrapping_add(1));
                8
            }
            0x04 => {
                self.regs.b = self.alu_inc(self.regs.b);
                4
            }
            0x05 => {
                self.regs.b = self.alu_dec(self.regs.b);
                4
            }
            0x06 => {
                self.regs.b = self.fetch_byte(bus);
                8
            }
            0x07 => {
                let result = self.rot_rlc(self.regs.a);
                self.regs.a = result;
                self.regs.f &= !super::FLAG_Z;
                4
            }
            0x08 => {
                let target = self.fetch_word(bus);
                bus.write_word(target, self.regs.sp);
                20
            }
            0x09 => {
                self.alu_add_hl(self.regs.bc());
                8
            }
            0x0A => {
                self.regs.a = bus.read(self.regs.bc());
                8
            }
            0x0B => {
                self.regs.set_bc(self.regs.bc().wrapping_sub(1));
                8
            }
            0x0C => {
                self.regs.c = self.alu_inc(self.regs.c);
                4
            }
            0x0D => {
                self.regs.c = self.alu_dec(self.regs.c);
                4
            }
            0x0E => {
                self.regs.c = self.fetch_byte(bus);
                8
            }
            0x0F => {
                let result = self.rot_rrc(self.regs.a);
                self.regs.a = result;
                self.regs.f &= !super::FLAG_Z;
                4
            }
            0x10 => {
                // STOP behaves as HALT here; there is no speed switch.
                self.stopped = true;
                self.halted = true;
                4
            }
            0x11 => {
                let value = self.fetch_word(bus);
                self.regs.set_de(value);
                12
            }
            0x12 => {
                bus.write(self.regs.de(), self.regs.a);
                8
            }
            0x13 => {
                self.regs.set_de(self.regs.de().wrapping_add(1));
                8
            }
            0x14 => {
                self.regs.d = self.alu_inc(self.regs.d);
                4
            }
            0x15 => {
                self.regs.d = self.alu_dec(self.regs.d);
                4
            }
            0x16 => {
                self.regs.d = self.fetch_byte(bus);
                8
            }
            0x17 => {
                let result = self.rot_rl(self.regs.a);
                self.regs.a = result;
                self.regs.f &= !super::FLAG_Z;
                4
            }
            0x18 => self.op_jr(bus, true),
            0x19 => {
                self.alu_add_hl(self.regs.de());
                8
            }
            0x1A => {
                self.regs.a = bus.read(self.regs.de());
                8
            }
            0x1B => {
                self.regs.set_de(self.regs.de().wrapping_sub(1));
                8
            }
            0x1C => {
                self.regs.e = self.alu_inc(self.regs.e);
                4
            }
            0x1D => {
                self.regs.e = self.alu_dec(self.regs.e);
                4
            }
            0x1E => {
                self.regs.e = self.fetch_byte(bus);
                8
            }
            0x1F => {
                let result = self.rot_rr(self.regs.a);
                self.regs.a = result;
                self.regs.f &= !super::FLAG_Z;
                4
            }
            0x20 => {
                let taken = !self.flag_z();
                self.op_jr(bus, taken)
            }
            0x21 => {
                let value = self.fetch_word(bus);
                self.regs.set_hl(value);
                12
            }
            0x22 => {
                bus.write(self.regs.hl(), self.regs.a);
                self.regs.set_hl(self.regs.hl().wrapping_add(1));
                8
            }
            0x23 => {
                self.regs.set_hl(self.regs.hl().wrapping_add(1));
                8
            }
            0x24 => {
                self.regs.h = self.alu_inc(self.regs.h);
                4
            }
            0x25 => {
                self.regs.h = self.alu_dec(self.regs.h);
                4
            }
            0x26 => {
                self.regs.h = self.fetch_byte(bus);
                8
            }
            0x27 => {
                self.alu_daa();
                4
            }
            0x28 => {
                let taken = self.flag_z();
                self.op_jr(bus, taken)
            }
            0x29 => {
                self.alu_add_hl(self.regs.hl());
                8
            }
            0x2A => {
                self.regs.a = bus.read(self.regs.hl());
                self.regs.set_hl(self.regs.hl().wrapping_add(1));
                8
            }
            0x2B => {
                self.regs.set_hl(self.regs.hl().wrapping_sub(1));
                8
            }
            0x2C => {
                self.regs.l = self.alu_inc(self.regs.l);
                4
            }
            0x2D => {
                self.regs.l = self.alu_dec(self.regs.l);
                4
            }
            0x2E => {
                self.regs.l = self.fetch_byte(bus);
                8
            }
            0x2F => {
                // CPL: only N and H are set.
                self.regs.a = !self.regs.a;
                self.regs.f |= super::FLAG_N | super::FLAG_H;
                4
            }
            0x30 => {
                let taken = !self.flag_c();
                self.op_jr(bus, taken)
            }
            0x31 => {
                self.regs.sp = self.fetch_word(bus);
                12
            }
            0x32 => {
                bus.write(self.regs.hl(), self.regs.a);
                self.regs.set_hl(self.regs.hl().wrapping_sub(1));
                8
            }
            0x33 => {
                self.regs.sp = self.regs.sp.wrapping_add(1);
                8
            }
            0x34 => {
                let value = bus.read(self.regs.hl());
                let result = self.alu_inc(value);
                bus.write(self.regs.hl(), result);
                12
            }
            0x35 => {
                let value = bus.read(self.regs.hl());
                let result = self.alu_dec(value);
                bus.write(self.regs.hl(), result);
                12
            }
            0x36 => {
                let value = self.fetch_byte(bus);
                bus.write(self.regs.hl(), value);
                12
            }
            0x37 => {
                // SCF: Z is untouched.
                let zero = self.flag_z();
                self.set_flags_znhc(zero, false, false, true);
                4
            }
            0x38 => {
                let taken = self.flag_c();
                self.op_jr(bus, taken)
            }
            0x39 => {
                self.alu_add_hl(self.regs.sp);
                8
            }
            0x3A => {
                self.regs.a = bus.read(self.regs.hl());
                self.regs.set_hl(self.regs.hl().wrapping_sub(1));
                8
            }
            0x3B => {
                self.regs.sp = self.regs.sp.wrapping_sub(1);
                8
            }
            0x3C => {
                self.regs.a = self.alu_inc(self.regs.a);
                4
            }
            0x3D => {
                self.regs.a = self.alu_dec(self.regs.a);
                4
            }
            0x3E => {
                self.regs.a = self.fetch_byte(bus);
                8
            }
            0x3F => {
                // CCF: Z is untouched, C inverts.
                let zero = self.flag_z();
                let carry = self.flag_c();
                self.set_flags_znhc(zero, false, false, !carry);
                4
            }
            0x76 => self.op_halt(bus),
            // LD r, r' block: destination in bits 5-3, source in bits 2-0.
            0x40..=0x7F => {
                let dst = (opcode >> 3) & 0x07;
                let src = opcode & 0x07;
                let value = self.read_operand(src, bus);
                self.write_operand(dst, bus, value);
                if dst == 6 || src == 6 {
                    8
                } else {
                    4
                }
            }
            // ALU block: operation in bits 5-3, operand in bits 2-0.
            0x80..=0xBF => {
                let operand = self.read_operand(opcode & 0x07, bus);
                match (opcode >> 3) & 0x07 {
                    0 => self.alu_add(operand, false),
                    1 => self.alu_add(operand, true),
                    2 => self.alu_sub(operand, false, true),
                    3 => self.alu_sub(operand, true, true),
                    4 => self.alu_and(operand),
                    5 => self.alu_xor(operand),
                    6 => self.alu_or(operand),
                    _ => self.alu_sub(operand, false, false),
                }
                if opcode & 0x07 == 6 {
                    8
                } else {
                    4
                }
            }
            0xC0 => {
                let taken = !self.flag_z();
                self.op_ret_cond(bus, taken)
            }
            0xC1 => {
                let value = self.pop_word(bus);
                self.regs.set_bc(value);
                12
            }
            0xC2 => {
                let taken = !self.flag_z();
                self.op_jp(bus, taken)
            }
            0xC3 => self.op_jp(bus, true),
            0xC4 => {
                let taken = !self.flag_z();
                self.op_call(bus, taken)
            }
            0xC5 => {
                self.push_word(bus, self.regs.bc());
                16
            }
            0xC6 => {
                let value = self.fetch_byte(bus);
                self.alu_add(value, false);
                8
            }
            0xC7 => self.op_rst(bus, 0x00),
            0xC8 => {
                let taken = self.flag_z();
                self.op_ret_cond(bus, taken)
            }
            0xC9 => {
                self.regs.pc = self.pop_word(bus);
                16
            }
            0xCA => {
                let taken = self.flag_z();
                self.op_jp(bus, taken)
            }
            0xCB => self.execute_cb(bus),
            0xCC => {
                let taken = self.flag_z();
                self.op_call(bus, taken)
            }
            0xCD => self.op_call(bus, true),
            0xCE => {
                let value = self.fetch_byte(bus);
                self.alu_add(value, true);
                8
            }
            0xCF => self.op_rst(bus, 0x08),
            0xD0 => {
                let taken = !self.flag_c();
                self.op_ret_cond(bus, taken)
            }
            0xD1 => {
                let value = self.pop_word(bus);
                self.regs.set_de(value);
                12
            }
            0xD2 => {
                let taken = !self.flag_c();
                self.op_jp(bus, taken)
            }
            0xD4 => {
                let taken = !self.flag_c();
                self.op_call(bus, taken)
            }
            0xD5 => {
                self.push_word(bus, self.regs.de());
                16
            }
            0xD6 => {
                let value = self.fetch_byte(bus);
                self.alu_sub(value, false, true);
                8
            }
            0xD7 => self.op_rst(bus, 0x10),
            0xD8 => {
                let taken = self.flag_c();
                self.op_ret_cond(bus, taken)
            }
            0xD9 => {
                // RETI enables interrupts with no delay.
                self.regs.pc = self.pop_word(bus);
                self.ime = true;
                16
            }
            0xDA => {
                let taken = self.flag_c();
                self.op_jp(bus, taken)
            }
            0xDC => {
                let taken = self.flag_c();
                self.op_call(bus, taken)
            }
            0xDE => {
                let value = self.fetch_byte(bus);
                self.alu_sub(value, true, true);
                8
            }
            0xDF => self.op_rst(bus, 0x18),
            0xE0 => {
                let offset = self.fetch_byte(bus);
                bus.write(0xFF00 | u16::from(offset), self.regs.a);
                12
            }
            0xE1 => {
                let value = self.pop_word(bus);
                self.regs.set_hl(value);
                12
            }
            0xE2 => {
                bus.write(0xFF00 | u16::from(self.regs.c), self.regs.a);
                8
            }
            0xE5 => {
                self.push_word(bus, self.regs.hl());
                16
            }
            0xE6 => {
                let value = self.fetch_byte(bus);
                self.alu_and(value);
                8
            }
            0xE7 => self.op_rst(bus, 0x20),
            0xE8 => {
                let result = self.sp_plus_offset(bus);
                self.regs.sp = result;
                16
            }
            0xE9 => {
                self.regs.pc = self.regs.hl();
                4
            }
            0xEA => {
                let target = self.fetch_word(bus);
                bus.write(target, self.regs.a);
                16
            }
            0xEE => {
                let value = self.fetch_byte(bus);
                self.alu_xor(value);
                8
            }
            0xEF => self.op_rst(bus, 0x28),
            0xF0 => {
                let offset = self.fetch_byte(bus);
                self.regs.a = bus.read(0xFF00 | u16::from(offset));
                12
            }
            0xF1 => {
                // POP AF forces the low nibble of F to zero.
                let value = self.pop_word(bus);
                self.regs.set_af(value);
                12
            }
            0xF2 => {
                self.regs.a = bus.read(0xFF00 | u16::from(self.regs.c));
                8
            }
            0xF3 => {
                // DI is immediate and cancels a pending EI.
                self.ime = false;
                self.ime_pending = false;
                4
            }
            0xF5 => {
                self.push_word(bus, self.regs.af());
                16
            }
            0xF6 => {
                let value = self.fetch_byte(bus);
                self.alu_or(value);
                8
            }
            0xF7 => self.op_rst(bus, 0x30),
            0xF8 => {
                let result = self.sp_plus_offset(bus);
                self.regs.set_hl(result);
                12
            }
            0xF9 => {
                self.regs.sp = self.regs.hl();
                8
            }
            0xFA => {
                let source = self.fetch_word(bus);
                self.regs.a = bus.read(source);
                16
            }
            0xFB => {
                // IME turns on after the next instruction.
                self.ime_pending = true;
                4
            }
            0xFE => {
                let value = self.fetch_byte(bus);
                self.alu_sub(value, false, false);
                8
            }
            0xFF => self.op_rst(bus, 0x38),
            // Holes in the opcode map: four idle cycles.
            0xD3 | 0xDB | 0xDD | 0xE3 | 0xE4 | 0xEB | 0xEC | 0xED | 0xF4 | 0xFC | 0xFD => 4,
        }
    }
}
