//! The state sum type for C11 (spec.md §4.5), per Design Note 3: "model the
//! controller as an explicit enum with a match in `step`, not a bag of
//! stall flags".

use crate::ucode::decode::MemOp;

/// One outstanding request from microcode to the memory controller.
#[derive(Clone, Copy, Debug)]
pub struct MemRequest {
    pub op: MemOp,
    /// Object/array handle (AR), or a raw address for `Rd`/`Wr`/`Rdf`/`Wrf`.
    pub handle: u32,
    /// Field index (`GetField`/`PutField`) or array index (`IaLoad`/
    /// `IaStore`).
    pub index_or_field: u32,
    /// Store value (A), unused for loads.
    pub value: u32,
}

#[derive(Clone, Copy, Debug)]
pub enum State {
    Idle,
    /// C11 checking the method cache before committing to a BC_FILL burst.
    BcCacheCheck {
        handle: u32,
        base_addr: u32,
        length_words: u16,
    },
    /// Streaming a method's bytecode into JBC RAM, one beat per cycle.
    BcFill {
        handle: u32,
        base_addr: u32,
        length_words: u16,
        word_idx: u16,
    },
    /// HANDLE_READ/HANDLE_WAIT: dereferencing `request.handle` to get `H[0]`
    /// (the object's data pointer) ahead of a `GetField`/`PutField`/
    /// `IaLoad`/`IaStore`. Object/array cache hits on a read short-circuit
    /// before this is ever entered (spec.md §4.5, §8 scenario 5).
    HandleRead { request: MemRequest, context: u32 },
    /// HANDLE_BOUND_READ/HANDLE_BOUND_WAIT: dereferencing `H[1]` (array
    /// length) to bounds-check `request.index_or_field` before the element
    /// access (spec.md §4.5, §8 "Bounds").
    HandleBoundRead {
        request: MemRequest,
        context: u32,
        data_ptr: u32,
    },
    /// HANDLE_CALC/AC_FILL/HANDLE_ACCESS/HANDLE_DATA_WAIT: the resolved
    /// access — `data_ptr + index_or_field * 4` for a handle dereference, or
    /// `request.handle` directly for a plain `Rd`/`Wr`/`Rdf`/`Wrf`/atomic op —
    /// waiting on the BMB response.
    HandleDataWait {
        request: MemRequest,
        context: u32,
        data_ptr: u32,
    },
    /// Hardware-detected null pointer; resolved same cycle, non-stalling.
    NpExc,
    /// Hardware-detected array-bounds violation; resolved same cycle.
    AbExc,
    /// GC block-copy in progress (spec.md §6): read beat outstanding.
    GcCopy {
        src: u32,
        dst: u32,
        words_left: u32,
    },
    /// GC block-copy: read beat landed, re-driving the write beat until it
    /// fires (spec.md §3 Invariant 3 — a command must not change mid-retry).
    GcCopyWrite {
        src: u32,
        dst: u32,
        words_left: u32,
        data: u32,
    },
    /// AC_FILL_CMD/AC_FILL_WAIT: an array-cache miss bursts the 4-word-
    /// aligned line containing the missed index, one beat per cycle, so the
    /// whole line is resident after a single miss instead of one slot at a
    /// time (spec.md §5 "Array Cache").
    ArrayFill {
        request: MemRequest,
        context: u32,
        data_ptr: u32,
        /// Address of word 0 of the 4-word-aligned line.
        base_addr: u32,
        word_idx: u8,
        words: [u32; 4],
    },
}
