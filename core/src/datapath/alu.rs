//! Pure combinational functions for the 33-bit adder, logic unit and flag
//! generation (spec.md §4.1 "ALU computes a 33-bit sum/difference...").
//!
//! Kept as free functions over plain `u32`s rather than methods on
//! [`super::Datapath`] so they can be unit-tested in isolation, matching
//! Design Note 2 ("Deeply connected combinational nets ... translate to
//! pure functions over the snapshot").

/// Result of the 33-bit adder: the wrapped 32-bit sum/difference plus the
/// 33rd bit, used as the LT flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adder33 {
    pub sum: u32,
    pub bit32: bool,
}

/// Sign-extend `a` and `b` to 33 bits and add (`subtract = false`) or
/// compute `b - a` (`subtract = true`, matching spec.md's "LT (borrow bit
/// of B-A, signed)"). The low 32 bits of the wide result is the ordinary
/// two's-complement wrapped sum/difference used by `iadd`/`isub`; bit 32 is
/// the sign/borrow bit.
pub fn add_sub_33(a: u32, b: u32, subtract: bool) -> Adder33 {
    let ea = i64::from(a as i32);
    let eb = i64::from(b as i32);
    let wide = if subtract { eb - ea } else { ea + eb };
    Adder33 {
        sum: wide as u32,
        bit32: ((wide >> 32) & 1) != 0,
    }
}

/// Combinational flag generation from A and from A±B (spec.md §3
/// "Registers"): ZF = (A==0), NF = sign bit of A, EQ = (A==B), LT = borrow
/// bit of B-A (signed).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Flags {
    pub zf: bool,
    pub nf: bool,
    pub eq: bool,
    pub lt: bool,
}

pub fn compute_flags(a: u32, b: u32) -> Flags {
    let cmp = add_sub_33(a, b, true);
    Flags {
        zf: a == 0,
        nf: (a as i32) < 0,
        eq: a == b,
        lt: cmp.bit32,
    }
}

/// Logic unit select (spec.md §4.1: "pass-through of B / AND / OR / XOR
/// over (A, B)").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicOp {
    PassB,
    And,
    Or,
    Xor,
}

pub fn logic_unit(op: LogicOp, a: u32, b: u32) -> u32 {
    match op {
        LogicOp::PassB => b,
        LogicOp::And => a & b,
        LogicOp::Or => a | b,
        LogicOp::Xor => a ^ b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_wraps_like_iadd() {
        let r = add_sub_33(1, u32::MAX, false);
        assert_eq!(r.sum, 0);
    }

    #[test]
    fn lt_flag_set_when_b_less_than_a() {
        let f = compute_flags(10, 3);
        assert!(f.lt);
        let f = compute_flags(3, 10);
        assert!(!f.lt);
    }

    #[test]
    fn eq_and_zf() {
        let f = compute_flags(0, 0);
        assert!(f.zf);
        assert!(f.eq);
    }

    #[test]
    fn logic_ops() {
        assert_eq!(logic_unit(LogicOp::And, 0b1100, 0b1010), 0b1000);
        assert_eq!(logic_unit(LogicOp::Or, 0b1100, 0b1010), 0b1110);
        assert_eq!(logic_unit(LogicOp::Xor, 0b1100, 0b1010), 0b0110);
        assert_eq!(logic_unit(LogicOp::PassB, 0xDEAD, 0xBEEF), 0xBEEF);
    }
}
