//! C11: the memory controller (spec.md §4.5) — object/array handle
//! dereference, method-cache-backed bytecode fill, GC block copy, and the
//! two hardware-detected exceptions. Everything here is driven by
//! [`MemController::step`], called once per engine cycle regardless of
//! whether a request is outstanding (Design Note 1).

pub mod state;

use crate::cache::array::ArrayCache;
use crate::cache::method::MethodCache;
use crate::cache::object::ObjectCache;
use crate::core::bus::{Bmb, BmbCommand, BmbOpcode, BusMaster, is_io_address};
use crate::exception::{ExceptionCode, ExceptionRegister};
use crate::io::IoRegion;
use crate::jbc_ram::JbcRam;
use crate::lock::GlobalLock;
use crate::snoop::{SnoopBus, SnoopMessage};
use crate::ucode::decode::MemOp;
pub use state::{MemRequest, State};

/// Resolved open question (SPEC_FULL.md §4 / DESIGN.md): whether GC-copy
/// address translation is applied only while `GcCopy` is in flight
/// (single-core) or on every handle dereference (multi-core, where a
/// concurrent GC on another core can move an object between the snoop and
/// the dereference completing).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressTranslation {
    GcCopyOnly,
    EveryAccess,
}

pub struct MemController {
    core: usize,
    state: State,
    translation: AddressTranslation,
    next_context: u32,
}

/// What one `step` produces for the rest of the pipeline this cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepResult {
    Idle,
    Busy,
    Done { data: u32 },
    Exception(ExceptionCode),
}

impl MemController {
    pub fn new(core: usize, translation: AddressTranslation) -> Self {
        Self {
            core,
            state: State::Idle,
            translation,
            next_context: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    /// `true` when this cycle's state needs a BMB transaction, i.e. the
    /// bus arbiter should consider this core a requester. `NpExc`/`AbExc`
    /// resolve same-cycle without touching the bus (spec.md §4.5).
    pub fn wants_bus(&self) -> bool {
        matches!(
            self.state,
            State::BcFill { .. }
                | State::HandleRead { .. }
                | State::HandleBoundRead { .. }
                | State::HandleDataWait { .. }
                | State::GcCopy { .. }
                | State::GcCopyWrite { .. }
                | State::ArrayFill { .. }
        )
    }

    fn fresh_context(&mut self) -> u32 {
        let c = self.next_context;
        self.next_context = self.next_context.wrapping_add(1);
        c
    }

    /// Accept a new request from microcode. Caller must only call this when
    /// [`MemController::is_idle`].
    ///
    /// `GetField`/`PutField`/`IaLoad`/`IaStore` dereference a handle: the
    /// null check fires here before any bus transaction (spec.md §4.5), and
    /// a negative captured index fails the bounds check the same way — both
    /// are hardware-detected same-cycle, no round trip needed. A valid
    /// handle moves to `HandleRead` to fetch `H[0]` (spec.md §3); everything
    /// else (`Rd`/`Wr`/`Rdf`/`Wrf`/atomics) addresses main memory directly,
    /// with `data_ptr` equal to the raw handle/address, no indirection.
    pub fn begin(&mut self, request: MemRequest) {
        debug_assert!(self.is_idle(), "memory controller issued a new request while busy");

        let needs_handle = matches!(
            request.op,
            MemOp::GetField | MemOp::PutField | MemOp::IaLoad | MemOp::IaStore
        );
        if needs_handle && request.handle == 0 {
            self.state = State::NpExc;
            return;
        }
        let is_array = matches!(request.op, MemOp::IaLoad | MemOp::IaStore);
        if is_array && (request.index_or_field as i32) < 0 {
            self.state = State::AbExc;
            return;
        }

        let context = self.fresh_context();
        self.state = if needs_handle {
            State::HandleRead { request, context }
        } else {
            State::HandleDataWait {
                request,
                context,
                data_ptr: request.handle,
            }
        };
    }

    /// Begin a method-cache-backed bytecode fill for `handle` (spec.md §6
    /// BC_CACHE_CHECK / BC_FILL).
    pub fn begin_bc_fetch(&mut self, handle: u32, base_addr: u32, length_words: u16) {
        debug_assert!(self.is_idle());
        self.state = State::BcCacheCheck {
            handle,
            base_addr,
            length_words,
        };
    }

    /// Begin a GC block copy (spec.md §6).
    pub fn begin_gc_copy(&mut self, src: u32, dst: u32, words: u32) {
        debug_assert!(self.is_idle());
        self.state = State::GcCopy {
            src,
            dst,
            words_left: words,
        };
    }

    pub fn translation_mode(&self) -> AddressTranslation {
        self.translation
    }

    /// Advance one cycle. Call unconditionally; returns `Idle` when there is
    /// nothing outstanding.
    #[allow(clippy::too_many_arguments)]
    pub fn step(
        &mut self,
        bus: &mut dyn Bmb,
        jbc: &mut JbcRam,
        method_cache: &mut MethodCache,
        object_cache: &mut ObjectCache,
        array_cache: &mut ArrayCache,
        snoop_out: &mut SnoopBus,
        exceptions: &mut ExceptionRegister,
        io: &mut IoRegion,
        lock: &mut GlobalLock,
    ) -> StepResult {
        match self.state {
            State::Idle => StepResult::Idle,

            State::NpExc => {
                log::warn!("core {}: null pointer dereference", self.core);
                exceptions.raise(ExceptionCode::NullPointer);
                self.state = State::Idle;
                StepResult::Exception(ExceptionCode::NullPointer)
            }

            State::AbExc => {
                log::warn!("core {}: array bounds violation", self.core);
                exceptions.raise(ExceptionCode::ArrayBounds);
                self.state = State::Idle;
                StepResult::Exception(ExceptionCode::ArrayBounds)
            }

            State::BcCacheCheck {
                handle,
                base_addr,
                length_words,
            } => {
                if let Some(loc) = method_cache.lookup(handle) {
                    self.state = State::Idle;
                    return StepResult::Done {
                        data: loc.base_addr,
                    };
                }
                log::debug!("method cache miss for handle {handle:#x}, filling {length_words} words from {base_addr:#x}");
                self.state = State::BcFill {
                    handle,
                    base_addr,
                    length_words,
                    word_idx: 0,
                };
                StepResult::Busy
            }

            State::BcFill {
                handle,
                base_addr,
                length_words,
                word_idx,
            } => {
                let cmd = BmbCommand {
                    address: base_addr + u32::from(word_idx) * 4,
                    opcode: BmbOpcode::Read,
                    length_bytes: 3,
                    data: 0,
                    mask: 0,
                    source: BusMaster::BcFill(self.core),
                    context: u32::from(word_idx),
                };
                if !bus.try_command(&cmd) {
                    return StepResult::Busy;
                }
                if let Some(resp) = bus.poll_response() {
                    jbc.queue_word_write(base_addr / 4 + u32::from(word_idx), resp.data);
                    let next_idx = word_idx + 1;
                    if next_idx >= length_words {
                        method_cache.insert(handle, base_addr, length_words);
                        self.state = State::Idle;
                        return StepResult::Done { data: base_addr };
                    }
                    self.state = State::BcFill {
                        handle,
                        base_addr,
                        length_words,
                        word_idx: next_idx,
                    };
                }
                StepResult::Busy
            }

            State::HandleRead { request, context } => self.step_handle_read(bus, object_cache, array_cache, request, context),

            State::HandleBoundRead { request, context, data_ptr } => self.step_handle_bound_read(bus, request, context, data_ptr),

            State::HandleDataWait { request, context, data_ptr } => self.step_handle_request(
                bus,
                object_cache,
                array_cache,
                snoop_out,
                io,
                lock,
                exceptions,
                request,
                context,
                data_ptr,
            ),

            State::GcCopy { src, dst, words_left } => {
                if words_left == 0 {
                    self.state = State::Idle;
                    return StepResult::Done { data: dst };
                }
                let read = BmbCommand {
                    address: src,
                    opcode: BmbOpcode::Read,
                    length_bytes: 3,
                    data: 0,
                    mask: 0,
                    source: BusMaster::GcCopy(self.core),
                    context: 0,
                };
                if !bus.try_command(&read) {
                    return StepResult::Busy;
                }
                if let Some(resp) = bus.poll_response() {
                    self.state = State::GcCopyWrite {
                        src,
                        dst,
                        words_left,
                        data: resp.data,
                    };
                }
                StepResult::Busy
            }

            State::GcCopyWrite { src, dst, words_left, data } => {
                let write = BmbCommand {
                    address: dst,
                    opcode: BmbOpcode::Write,
                    length_bytes: 3,
                    data,
                    mask: 0xF,
                    source: BusMaster::GcCopy(self.core),
                    context: 0,
                };
                // Re-offer the same write every cycle until it fires — the
                // read beat already landed, so `data` must not be dropped
                // (spec.md §3 Invariant 3).
                if !bus.try_command(&write) {
                    return StepResult::Busy;
                }
                method_cache.invalidate_all();
                self.state = State::GcCopy {
                    src: src + 4,
                    dst: dst + 4,
                    words_left: words_left - 1,
                };
                StepResult::Busy
            }

            State::ArrayFill {
                request,
                context,
                data_ptr,
                base_addr,
                word_idx,
                mut words,
            } => {
                let cmd = BmbCommand {
                    address: base_addr + u32::from(word_idx) * 4,
                    opcode: BmbOpcode::Read,
                    length_bytes: 3,
                    data: 0,
                    mask: 0,
                    source: BusMaster::AcFill(self.core),
                    context,
                };
                if !bus.try_command(&cmd) {
                    return StepResult::Busy;
                }
                match bus.poll_response() {
                    Some(resp) => {
                        words[word_idx as usize] = resp.data;
                        let next_idx = word_idx + 1;
                        if next_idx >= 4 {
                            array_cache.complete_fill(request.handle, words);
                            let data = words[(request.index_or_field & 3) as usize];
                            self.state = State::Idle;
                            return StepResult::Done { data };
                        }
                        self.state = State::ArrayFill {
                            request,
                            context,
                            data_ptr,
                            base_addr,
                            word_idx: next_idx,
                            words,
                        };
                    }
                    None => {
                        self.state = State::ArrayFill {
                            request,
                            context,
                            data_ptr,
                            base_addr,
                            word_idx,
                            words,
                        };
                    }
                }
                StepResult::Busy
            }
        }
    }

    /// HANDLE_READ/HANDLE_WAIT: fetch `H[0]` at `request.handle`. A read
    /// that already hits its cache resolves here without ever touching the
    /// bus (spec.md §8 scenario 5: "zero main-memory reads ... served from
    /// cache"); a write always proceeds, since it must write through to
    /// memory and therefore needs the real address.
    fn step_handle_read(
        &mut self,
        bus: &mut dyn Bmb,
        object_cache: &mut ObjectCache,
        array_cache: &mut ArrayCache,
        request: MemRequest,
        context: u32,
    ) -> StepResult {
        match request.op {
            MemOp::GetField => {
                if let Some(data) = object_cache.lookup(request.handle, request.index_or_field as u8) {
                    self.state = State::Idle;
                    return StepResult::Done { data };
                }
            }
            MemOp::IaLoad => {
                if let Some(data) = array_cache.lookup(request.handle, request.index_or_field) {
                    self.state = State::Idle;
                    return StepResult::Done { data };
                }
            }
            _ => {}
        }

        let cmd = BmbCommand {
            address: request.handle,
            opcode: BmbOpcode::Read,
            length_bytes: 3,
            data: 0,
            mask: 0,
            source: BusMaster::Core(self.core),
            context,
        };
        if !bus.try_command(&cmd) {
            self.state = State::HandleRead { request, context };
            return StepResult::Busy;
        }

        match bus.poll_response() {
            Some(resp) => {
                let data_ptr = resp.data;
                self.state = if matches!(request.op, MemOp::IaLoad | MemOp::IaStore) {
                    State::HandleBoundRead { request, context, data_ptr }
                } else {
                    State::HandleDataWait { request, context, data_ptr }
                };
                StepResult::Busy
            }
            None => {
                self.state = State::HandleRead { request, context };
                StepResult::Busy
            }
        }
    }

    /// HANDLE_BOUND_READ/HANDLE_BOUND_WAIT: fetch `H[1]` (array length) and
    /// compare it against the captured index before the element access goes
    /// out (spec.md §8 "Bounds").
    fn step_handle_bound_read(&mut self, bus: &mut dyn Bmb, request: MemRequest, context: u32, data_ptr: u32) -> StepResult {
        let cmd = BmbCommand {
            address: request.handle.wrapping_add(4),
            opcode: BmbOpcode::Read,
            length_bytes: 3,
            data: 0,
            mask: 0,
            source: BusMaster::Core(self.core),
            context,
        };
        if !bus.try_command(&cmd) {
            self.state = State::HandleBoundRead { request, context, data_ptr };
            return StepResult::Busy;
        }

        match bus.poll_response() {
            Some(resp) => {
                self.state = if request.index_or_field >= resp.data {
                    State::AbExc
                } else {
                    State::HandleDataWait { request, context, data_ptr }
                };
                StepResult::Busy
            }
            None => {
                self.state = State::HandleBoundRead { request, context, data_ptr };
                StepResult::Busy
            }
        }
    }

    /// HANDLE_CALC/AC_FILL/HANDLE_ACCESS/HANDLE_DATA_WAIT: the resolved
    /// access, `data_ptr + index_or_field * 4` for a handle dereference or
    /// the raw address otherwise, including the I/O-region bypass (routed on
    /// the post-addition address, since a hardware-object field is only
    /// known to live in the I/O region once its `H[0]` has been read).
    #[allow(clippy::too_many_arguments)]
    fn step_handle_request(
        &mut self,
        bus: &mut dyn Bmb,
        object_cache: &mut ObjectCache,
        array_cache: &mut ArrayCache,
        snoop_out: &mut SnoopBus,
        io: &mut IoRegion,
        lock: &mut GlobalLock,
        exceptions: &mut ExceptionRegister,
        request: MemRequest,
        context: u32,
        data_ptr: u32,
    ) -> StepResult {
        let is_write = matches!(
            request.op,
            MemOp::PutField | MemOp::IaStore | MemOp::Wr | MemOp::Wrf | MemOp::PutStatic | MemOp::PutRef
        );

        // The lock never reaches the bus: it resolves against in-core state
        // the same cycle it's issued.
        match request.op {
            MemOp::AtmStart => {
                lock.request(self.core);
                if lock.held_by(self.core) {
                    self.state = State::Idle;
                    return StepResult::Done { data: 0 };
                }
                return StepResult::Busy;
            }
            MemOp::AtmEnd => {
                lock.release(self.core);
                self.state = State::Idle;
                return StepResult::Done { data: 0 };
            }
            _ => {}
        }

        let address = data_ptr.wrapping_add(request.index_or_field * 4);

        if matches!(request.op, MemOp::Rd | MemOp::Wr) && is_io_address(address) {
            let data = if is_write {
                io.write(address, request.value, lock);
                request.value
            } else {
                io.read(address, exceptions, lock)
            };
            self.state = State::Idle;
            return StepResult::Done { data };
        }

        match request.op {
            MemOp::GetField => {
                if let Some(data) = object_cache.lookup(request.handle, request.index_or_field as u8) {
                    self.state = State::Idle;
                    return StepResult::Done { data };
                }
            }
            MemOp::PutField => {
                object_cache.write_through(request.handle, request.index_or_field as u8, request.value);
            }
            MemOp::IaLoad => {
                if let Some(data) = array_cache.lookup(request.handle, request.index_or_field) {
                    self.state = State::Idle;
                    return StepResult::Done { data };
                }
                array_cache.start_fill(request.handle, request.index_or_field);
                let base_addr = data_ptr.wrapping_add((request.index_or_field & !3) * 4);
                self.state = State::ArrayFill {
                    request,
                    context,
                    data_ptr,
                    base_addr,
                    word_idx: 0,
                    words: [0; 4],
                };
                return StepResult::Busy;
            }
            MemOp::IaStore => {
                array_cache.write_through(request.handle, request.index_or_field, request.value);
            }
            _ => {}
        }

        let cmd = BmbCommand {
            address,
            opcode: if is_write { BmbOpcode::Write } else { BmbOpcode::Read },
            length_bytes: 3,
            data: request.value,
            mask: if is_write { 0xF } else { 0 },
            source: BusMaster::Core(self.core),
            context,
        };
        if !bus.try_command(&cmd) {
            self.state = State::HandleDataWait { request, context, data_ptr };
            return StepResult::Busy;
        }

        if is_write {
            match request.op {
                MemOp::IaStore => {
                    snoop_out.broadcast(SnoopMessage::ArrayStore {
                        handle: request.handle,
                        index: request.index_or_field,
                    });
                }
                MemOp::PutField => {
                    snoop_out.broadcast(SnoopMessage::ObjectFieldStore {
                        handle: request.handle,
                        field_index: request.index_or_field as u8,
                    });
                }
                _ => {}
            }
            self.state = State::Idle;
            return StepResult::Done { data: request.value };
        }

        match bus.poll_response() {
            Some(resp) => {
                if let MemOp::GetField = request.op {
                    object_cache.insert(request.handle, request.index_or_field as u8, resp.data);
                }
                self.state = State::Idle;
                StepResult::Done { data: resp.data }
            }
            None => {
                self.state = State::HandleDataWait { request, context, data_ptr };
                StepResult::Busy
            }
        }
    }
}
