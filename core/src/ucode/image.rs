//! The microcode ROM image: the bytecode-routine content that would, on
//! real hardware, be produced by the microcode assembler (out of scope,
//! spec.md §1). Built here as plain data so the engine has something to
//! execute end to end; addresses match [`crate::jump_table`]'s entries.

use super::MicroWord;
use super::ROM_SIZE;
use super::decode::{BranchCond, MemOp, UOp};
use crate::datapath::alu::LogicOp;
use crate::datapath::muxes::{ImmMode, MemDataSel, ReadAddrSel, SpMuxSel, WriteAddrSel};
use crate::datapath::shifter::ShiftOp;

/// Stack-RAM constant-region image (spec.md §3 "Reset-initialisable from a
/// static image"), indexed by the `slot` carried in [`UOp::LdConst`].
pub const CONST_IMAGE: [u32; 7] = [
    0,          // slot 0: 0 / null
    0xFFFF_FFFF, // slot 1: -1
    1,          // slot 2: 1
    2,          // slot 3: 2
    3,          // slot 4: 3
    4,          // slot 5: 4
    5,          // slot 6: 5
];

fn place(rom: &mut [MicroWord; ROM_SIZE], addr: u16, words: &[MicroWord]) {
    for (i, w) in words.iter().enumerate() {
        rom[addr as usize + i] = *w;
    }
}

const fn w(op: UOp) -> MicroWord {
    MicroWord::new(op)
}

/// Last word of a routine whose bytecode carries no operand bytes.
const fn f(op: UOp) -> MicroWord {
    MicroWord::fetch(op)
}

/// Last word of a routine whose bytecode also carries operand bytes that
/// the next fetch must latch (e.g. a constant-pool index or local slot).
const fn fo(op: UOp) -> MicroWord {
    MicroWord::fetch_with_opd(op)
}

/// A leading word that pulls in the second operand byte of a 16-bit
/// immediate before anything reads `opd` (the first byte rode in on the
/// previous routine's closing `fo` pulse alongside this bytecode's jfetch).
const fn xo(op: UOp) -> MicroWord {
    MicroWord::opd_fetch(op)
}

/// Assemble the default ROM image covering every bytecode mapped in
/// [`crate::jump_table::JUMP_TABLE`].
pub fn build_default_rom() -> [MicroWord; ROM_SIZE] {
    let mut rom = [f(UOp::Trap); ROM_SIZE];

    place(&mut rom, 0x001, &[f(UOp::Trap)]); // UNIMPLEMENTED_ENTRY
    place(&mut rom, 0x002, &[f(UOp::Trap)]); // EXCEPTION_ENTRY
    place(&mut rom, 0x003, &[f(UOp::Trap)]); // INTERRUPT_ENTRY

    place(&mut rom, 0x010, &[f(UOp::Nop)]); // nop

    place(&mut rom, 0x018, &[w(UOp::LdConst { slot: 0 }), f(UOp::Push)]); // aconst_null
    place(&mut rom, 0x020, &[w(UOp::LdConst { slot: 1 }), f(UOp::Push)]); // iconst_m1
    place(&mut rom, 0x028, &[w(UOp::LdConst { slot: 0 }), f(UOp::Push)]); // iconst_0
    place(&mut rom, 0x030, &[w(UOp::LdConst { slot: 2 }), f(UOp::Push)]); // iconst_1
    place(&mut rom, 0x038, &[w(UOp::LdConst { slot: 3 }), f(UOp::Push)]); // iconst_2
    place(&mut rom, 0x040, &[w(UOp::LdConst { slot: 4 }), f(UOp::Push)]); // iconst_3
    place(&mut rom, 0x048, &[w(UOp::LdConst { slot: 5 }), f(UOp::Push)]); // iconst_4
    place(&mut rom, 0x050, &[w(UOp::LdConst { slot: 6 }), f(UOp::Push)]); // iconst_5

    place(&mut rom, 0x058, &[w(UOp::LdImm { mode: ImmMode::S8 }), fo(UOp::Push)]); // bipush
    place(&mut rom, 0x060, &[xo(UOp::Nop), w(UOp::LdImm { mode: ImmMode::S16 }), fo(UOp::Push)]); // sipush

    place(&mut rom, 0x068, &[w(UOp::Ld { addr: ReadAddrSel::VpOpd }), fo(UOp::Push)]); // iload
    place(&mut rom, 0x070, &[w(UOp::Ld { addr: ReadAddrSel::Vp0 }), f(UOp::Push)]); // iload_0
    place(&mut rom, 0x078, &[w(UOp::Ld { addr: ReadAddrSel::Vp1 }), f(UOp::Push)]); // iload_1
    place(&mut rom, 0x080, &[w(UOp::Ld { addr: ReadAddrSel::Vp2 }), f(UOp::Push)]); // iload_2
    place(&mut rom, 0x088, &[w(UOp::Ld { addr: ReadAddrSel::Vp3 }), f(UOp::Push)]); // iload_3

    place(
        &mut rom,
        0x090,
        &[
            w(UOp::Pop), // index
            w(UOp::LdAr),
            w(UOp::Pop), // arrayref
            w(UOp::Mem { op: MemOp::IaLoad }),
            w(UOp::LdDin),
            f(UOp::Push),
        ],
    ); // iaload

    place(
        &mut rom,
        0x098,
        &[w(UOp::Pop), w(UOp::St { addr: WriteAddrSel::VpOpd, data: MemDataSel::A, sp: SpMuxSel::Hold }), fo(UOp::Nop)],
    ); // istore
    place(
        &mut rom,
        0x0a0,
        &[w(UOp::Pop), w(UOp::St { addr: WriteAddrSel::Vp0, data: MemDataSel::A, sp: SpMuxSel::Hold }), f(UOp::Nop)],
    ); // istore_0
    place(
        &mut rom,
        0x0a8,
        &[w(UOp::Pop), w(UOp::St { addr: WriteAddrSel::Vp1, data: MemDataSel::A, sp: SpMuxSel::Hold }), f(UOp::Nop)],
    ); // istore_1
    place(
        &mut rom,
        0x0b0,
        &[w(UOp::Pop), w(UOp::St { addr: WriteAddrSel::Vp2, data: MemDataSel::A, sp: SpMuxSel::Hold }), f(UOp::Nop)],
    ); // istore_2
    place(
        &mut rom,
        0x0b8,
        &[w(UOp::Pop), w(UOp::St { addr: WriteAddrSel::Vp3, data: MemDataSel::A, sp: SpMuxSel::Hold }), f(UOp::Nop)],
    ); // istore_3

    place(
        &mut rom,
        0x0c0,
        &[
            w(UOp::Pop), // value
            w(UOp::LdAr),
            w(UOp::Pop), // index
            w(UOp::Pop), // arrayref
            w(UOp::Mem { op: MemOp::IaStore }),
            f(UOp::Nop),
        ],
    ); // iastore

    place(&mut rom, 0x0c8, &[f(UOp::Pop)]); // pop (drop into A, discarded)
    place(
        &mut rom,
        0x0d0,
        &[w(UOp::Ld { addr: ReadAddrSel::Sp }), f(UOp::Push)],
    ); // dup (re-read TOS, push again)

    place(&mut rom, 0x0d8, &[w(UOp::Pop), w(UOp::Alu { subtract: false }), f(UOp::Push)]); // iadd
    place(&mut rom, 0x0e0, &[w(UOp::Pop), w(UOp::Alu { subtract: true }), f(UOp::Push)]); // isub
    place(&mut rom, 0x0e8, &[w(UOp::Pop), w(UOp::StMul)]); // imul (cycle 1 of 2)
    place(&mut rom, 0x0e9, &[w(UOp::LdMul), f(UOp::Push)]); // imul settle + retire
    place(&mut rom, 0x0f0, &[w(UOp::Pop), f(UOp::Trap)]); // idiv: software/Java-level, not hardware (spec.md Non-goals)
    place(&mut rom, 0x0f8, &[w(UOp::Pop), f(UOp::Trap)]); // irem: ditto

    place(
        &mut rom,
        0x100,
        &[w(UOp::LdConst { slot: 0 }), w(UOp::Alu { subtract: true }), f(UOp::Push)],
    ); // ineg (0 - TOS)

    place(&mut rom, 0x108, &[w(UOp::Pop), w(UOp::Shift { op: ShiftOp::Shl }), f(UOp::Push)]); // ishl
    place(&mut rom, 0x110, &[w(UOp::Pop), w(UOp::Shift { op: ShiftOp::Shr }), f(UOp::Push)]); // ishr
    place(&mut rom, 0x118, &[w(UOp::Pop), w(UOp::Shift { op: ShiftOp::Ushr }), f(UOp::Push)]); // iushr
    place(&mut rom, 0x120, &[w(UOp::Pop), w(UOp::Logic { op: LogicOp::And }), f(UOp::Push)]); // iand
    place(&mut rom, 0x128, &[w(UOp::Pop), w(UOp::Logic { op: LogicOp::Or }), f(UOp::Push)]); // ior
    place(&mut rom, 0x130, &[w(UOp::Pop), w(UOp::Logic { op: LogicOp::Xor }), f(UOp::Push)]); // ixor

    place(
        &mut rom,
        0x138,
        &[w(UOp::Pop), f(UOp::Branch { offset: 0, cond: BranchCond::Zf })],
    ); // ifeq (offset patched by a real assembler; placeholder here)
    place(
        &mut rom,
        0x140,
        &[w(UOp::Pop), f(UOp::Branch { offset: 0, cond: BranchCond::Nz })],
    ); // ifne
    place(
        &mut rom,
        0x148,
        &[
            w(UOp::Pop),
            w(UOp::Pop),
            w(UOp::Alu { subtract: true }),
            f(UOp::Branch { offset: 0, cond: BranchCond::Zf }),
        ],
    ); // if_icmpeq
    place(&mut rom, 0x150, &[f(UOp::Branch { offset: 0, cond: BranchCond::Always })]); // goto

    place(&mut rom, 0x158, &[w(UOp::Pop), w(UOp::StJpc), f(UOp::Push)]); // ireturn
    place(&mut rom, 0x160, &[w(UOp::StJpc), f(UOp::Nop)]); // return

    place(
        &mut rom,
        0x168,
        &[
            xo(UOp::Nop),
            w(UOp::LdImm { mode: ImmMode::U16 }),
            w(UOp::LdAr),
            w(UOp::Mem { op: MemOp::Rd }),
            w(UOp::LdDin),
            fo(UOp::Push),
        ],
    ); // getstatic
    place(
        &mut rom,
        0x170,
        &[
            xo(UOp::Nop),
            w(UOp::LdImm { mode: ImmMode::U16 }),
            w(UOp::LdAr),
            w(UOp::Pop),
            w(UOp::Mem { op: MemOp::Wr }),
            fo(UOp::Nop),
        ],
    ); // putstatic

    place(
        &mut rom,
        0x178,
        &[
            w(UOp::LdImm { mode: ImmMode::U8 }),
            w(UOp::Pop), // objref
            w(UOp::LdAr),
            w(UOp::Mem { op: MemOp::GetField }),
            w(UOp::LdDin),
            fo(UOp::Push),
        ],
    ); // getfield
    place(
        &mut rom,
        0x180,
        &[
            w(UOp::Pop), // value
            w(UOp::LdImm { mode: ImmMode::U8 }),
            w(UOp::Pop), // objref
            w(UOp::LdAr),
            w(UOp::Mem { op: MemOp::PutField }),
            fo(UOp::Nop),
        ],
    ); // putfield

    place(&mut rom, 0x188, &[w(UOp::Pop), w(UOp::LdVp), w(UOp::Pop), w(UOp::StJpc), fo(UOp::Nop)]); // invokevirtual
    place(&mut rom, 0x190, &[w(UOp::Pop), w(UOp::LdVp), w(UOp::Pop), w(UOp::StJpc), fo(UOp::Nop)]); // invokespecial
    place(&mut rom, 0x198, &[w(UOp::Pop), w(UOp::LdVp), w(UOp::Pop), w(UOp::StJpc), fo(UOp::Nop)]); // invokestatic

    place(
        &mut rom,
        0x1a0,
        &[w(UOp::Pop), w(UOp::LdAr), w(UOp::Mem { op: MemOp::PutRef }), w(UOp::LdDin), fo(UOp::Push)],
    ); // new
    place(
        &mut rom,
        0x1a8,
        &[w(UOp::Pop), w(UOp::LdAr), w(UOp::Mem { op: MemOp::PutRef }), w(UOp::LdDin), fo(UOp::Push)],
    ); // newarray
    place(
        &mut rom,
        0x1b0,
        &[w(UOp::Pop), w(UOp::LdAr), w(UOp::Mem { op: MemOp::Rdf }), w(UOp::LdDin), f(UOp::Push)],
    ); // arraylength

    place(&mut rom, 0x1b8, &[w(UOp::Pop), f(UOp::Trap)]); // athrow: hands off to the exception entry

    place(&mut rom, 0x1c0, &[w(UOp::Pop), w(UOp::LdAr), w(UOp::Mem { op: MemOp::AtmStart }), f(UOp::Nop)]); // monitorenter
    place(&mut rom, 0x1c8, &[w(UOp::Pop), w(UOp::LdAr), w(UOp::Mem { op: MemOp::AtmEnd }), f(UOp::Nop)]); // monitorexit

    rom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn const_image_matches_ldconst_slots() {
        assert_eq!(CONST_IMAGE[0], 0);
        assert_eq!(CONST_IMAGE[1] as i32, -1);
        assert_eq!(CONST_IMAGE[6], 5);
    }

    #[test]
    fn nop_entry_is_a_real_routine_not_the_trap_filler() {
        let rom = build_default_rom();
        assert!(!matches!(rom[0x010].op, UOp::Trap));
        assert!(rom[0x010].jfetch);
    }

    #[test]
    fn unreached_rom_region_stays_the_trap_filler() {
        let rom = build_default_rom();
        assert!(matches!(rom[0x700].op, UOp::Trap));
    }
}
