//! Generates per-bytecode randomized test vectors for the stack/arithmetic/
//! branch bytecodes that never touch the memory controller, mirroring
//! `gen_m6809_tests`'s per-opcode generation loop. Bytecodes that reach the
//! memory controller (array/field/invoke/new/monitor ops) need a populated
//! main-memory image and are exercised at the `variants` level instead.

use std::fs;
use std::path::Path;

use jvmcore::memctl::AddressTranslation;
use jvmcore::pipeline::{Engine, EngineConfig};
use jvmcore_validation::{BmbCycle, BmbOp, BytecodeTestCase, PipelineState, TracingBmb};
use rand::Rng;

const NUM_TESTS: usize = 200;
const STACK_WINDOW: i16 = 3;

/// `(bytecode, encoded instruction length in bytes)` for bytecodes whose
/// routines never assert a memory-controller op.
const BYTECODES: &[(u8, u8)] = &[
    (0x00, 1), // nop
    (0x01, 1), // aconst_null
    (0x02, 1), // iconst_m1
    (0x03, 1), // iconst_0
    (0x04, 1), // iconst_1
    (0x05, 1), // iconst_2
    (0x06, 1), // iconst_3
    (0x07, 1), // iconst_4
    (0x08, 1), // iconst_5
    (0x10, 2), // bipush
    (0x11, 3), // sipush
    (0x57, 1), // pop
    (0x59, 1), // dup
    (0x60, 1), // iadd
    (0x64, 1), // isub
    (0x68, 1), // imul
    // idiv/irem are Java-level software routines on real hardware and trap
    // here (spec.md Non-goals) — no single-cycle test vector to generate.
    (0x74, 1), // ineg
    (0x78, 1), // ishl
    (0x7a, 1), // ishr
    (0x7c, 1), // iushr
    (0x7e, 1), // iand
    (0x80, 1), // ior
    (0x82, 1), // ixor
    (0xb1, 1), // return
];

fn stack_window(engine: &Engine) -> Vec<(u8, u32)> {
    let sp = engine.datapath.regs.sp as i16;
    (-STACK_WINDOW..=STACK_WINDOW)
        .map(|off| {
            let addr = (sp + off).rem_euclid(256) as u8;
            (addr, engine.datapath.ram.read(addr))
        })
        .collect()
}

fn snapshot(engine: &Engine, jpc: u32) -> PipelineState {
    PipelineState {
        jpc,
        sp: engine.datapath.regs.sp,
        a: engine.datapath.regs.a,
        b: engine.datapath.regs.b,
        ar: engine.datapath.regs.ar,
        vp: engine.datapath.regs.vp,
        exception: engine.exceptions.read().as_u32(),
        stack_window: stack_window(engine),
    }
}

/// Build a big-endian word-aligned bytecode buffer long enough to hold one
/// instance of `opcode` plus random trailing bytes, so `bipush`/`sipush`
/// exercise real operand values instead of always reading zero.
fn build_program(rng: &mut impl Rng, opcode: u8, instr_len: u8) -> Vec<u8> {
    let mut bytes = vec![0u8; 8];
    rng.fill(&mut bytes[..]);
    bytes[0] = opcode;
    let _ = instr_len;
    bytes
}

fn run_one(rng: &mut impl Rng, opcode: u8, instr_len: u8) -> BytecodeTestCase {
    let program = build_program(rng, opcode, instr_len);

    let config = EngineConfig {
        core_id: 0,
        translation: AddressTranslation::GcCopyOnly,
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(config);

    let mut word = [0u8; 4];
    word.copy_from_slice(&program[0..4]);
    engine.jbc.queue_word_write(0, u32::from_be_bytes(word));
    let mut word2 = [0u8; 4];
    word2.copy_from_slice(&program[4..8]);
    engine.jbc.queue_word_write(1, u32::from_be_bytes(word2));
    engine.jbc.tick();

    let mut bus = TracingBmb::new(0x100);

    // Cycle 1: the boot fetch (spec.md §4.3 reset behavior) translates
    // opcode 0 and loads its routine; nothing pipeline-visible changes yet.
    engine.step(&mut bus);
    let initial = snapshot(&engine, 0);
    bus.clear_cycles();

    let mut all_cycles: Vec<BmbCycle> = Vec::new();
    loop {
        let before = bus.cycles.len();
        let outputs = engine.step(&mut bus);
        if bus.cycles.len() > before {
            all_cycles.extend(bus.cycles[before..].iter().cloned());
        } else {
            all_cycles.push(BmbCycle {
                address: 0,
                data: 0,
                op: BmbOp::Internal,
            });
        }
        if outputs.retired_bytecode || engine.is_halted() {
            break;
        }
    }

    let final_state = snapshot(&engine, instr_len as u32);

    let name = program[..instr_len as usize]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ");

    BytecodeTestCase {
        name,
        initial,
        final_state,
        cycles: all_cycles,
    }
}

fn generate_and_write(rng: &mut impl Rng, opcode: u8, instr_len: u8, out_dir: &Path) {
    let tests: Vec<BytecodeTestCase> = (0..NUM_TESTS).map(|_| run_one(rng, opcode, instr_len)).collect();
    let out_path = out_dir.join(format!("{opcode:02x}.json"));
    let json = serde_json::to_string_pretty(&tests).expect("failed to serialize test cases");
    fs::write(&out_path, json).expect("failed to write output file");
    println!("generated {} tests for 0x{opcode:02x} -> {}", tests.len(), out_path.display());
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("usage: gen_bytecode_tests <opcode_hex | all>");
        std::process::exit(1);
    }

    let out_dir = Path::new("test_data/bytecode");
    fs::create_dir_all(out_dir).expect("failed to create output directory");

    let mut rng = rand::thread_rng();

    if args[1] == "all" {
        for &(opcode, instr_len) in BYTECODES {
            generate_and_write(&mut rng, opcode, instr_len, out_dir);
        }
    } else {
        let opcode_str = args[1].trim_start_matches("0x").trim_start_matches("0X");
        let opcode = u8::from_str_radix(opcode_str, 16).unwrap_or_else(|_| {
            eprintln!("invalid hex opcode: {}", args[1]);
            std::process::exit(1);
        });
        let instr_len = BYTECODES
            .iter()
            .find(|&&(op, _)| op == opcode)
            .map(|&(_, len)| len)
            .unwrap_or_else(|| {
                eprintln!("opcode {opcode:#04x} not supported for test generation");
                std::process::exit(1);
            });
        generate_and_write(&mut rng, opcode, instr_len, out_dir);
    }
}
