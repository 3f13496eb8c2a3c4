use jvmcore::memctl::AddressTranslation;
use jvmcore::pipeline::{Engine, EngineConfig};
use jvmcore_validation::{BmbOp, BytecodeTestCase, TracingBmb};

fn run_test_case(tc: &BytecodeTestCase, opcode: u8) {
    let config = EngineConfig {
        core_id: 0,
        translation: AddressTranslation::GcCopyOnly,
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(config);

    let mut word = [0u8; 4];
    word[0] = opcode;
    engine.jbc.queue_word_write(0, u32::from_be_bytes(word));
    engine.jbc.tick();

    let mut bus = TracingBmb::new(0x100);
    engine.step(&mut bus); // boot fetch

    assert_eq!(engine.datapath.regs.sp, tc.initial.sp, "{}: initial sp", tc.name);
    assert_eq!(engine.datapath.regs.a, tc.initial.a, "{}: initial a", tc.name);

    let mut recorded = Vec::new();
    loop {
        let before = bus.cycles.len();
        let outputs = engine.step(&mut bus);
        if bus.cycles.len() == before {
            recorded.push(BmbOp::Internal);
        } else {
            recorded.extend(bus.cycles[before..].iter().map(|c| c.op));
        }
        if outputs.retired_bytecode || engine.is_halted() {
            break;
        }
    }

    assert_eq!(engine.datapath.regs.sp, tc.final_state.sp, "{}: final sp", tc.name);
    assert_eq!(engine.datapath.regs.a, tc.final_state.a, "{}: final a", tc.name);
    assert_eq!(engine.datapath.regs.b, tc.final_state.b, "{}: final b", tc.name);
    assert_eq!(
        engine.exceptions.read().as_u32(),
        tc.final_state.exception,
        "{}: final exception",
        tc.name
    );
    assert_eq!(recorded.len(), tc.cycles.len(), "{}: cycle count", tc.name);
}

fn load_cases(opcode: u8) -> Vec<BytecodeTestCase> {
    let path = format!("test_data/bytecode/{opcode:02x}.json");
    let json = std::fs::read_to_string(&path).unwrap_or_else(|_| {
        panic!("missing test data at {path}. Run: cargo run --bin gen_bytecode_tests -- 0x{opcode:02x}")
    });
    serde_json::from_str(&json).expect("malformed test vector json")
}

macro_rules! bytecode_test {
    ($name:ident, $opcode:expr) => {
        #[test]
        fn $name() {
            let cases = load_cases($opcode);
            assert!(!cases.is_empty(), "test file is empty");
            for tc in &cases {
                run_test_case(tc, $opcode);
            }
        }
    };
}

bytecode_test!(test_opcode_00_nop, 0x00);
bytecode_test!(test_opcode_05_iconst_2, 0x05);
bytecode_test!(test_opcode_60_iadd, 0x60);
bytecode_test!(test_opcode_64_isub, 0x64);
bytecode_test!(test_opcode_68_imul, 0x68);
bytecode_test!(test_opcode_78_ishl, 0x78);
bytecode_test!(test_opcode_7e_iand, 0x7e);
bytecode_test!(test_opcode_59_dup, 0x59);
