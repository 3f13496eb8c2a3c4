//! I/O region router (spec.md §6): addresses with their top two bits set
//! are routed by 8-bit sub-address instead of reaching main memory — SYS at
//! 0x80-0x8F, UART at 0x90-0x93.

use crate::core::bus::{io_sub_address, is_io_address};
use crate::device::sys_regs::SysRegs;
use crate::device::uart::Uart;
use crate::exception::ExceptionRegister;
use crate::lock::GlobalLock;

pub struct IoRegion {
    pub sys: SysRegs,
    pub uart: Uart,
}

impl IoRegion {
    pub fn new(core_id: u32) -> Self {
        Self {
            sys: SysRegs::new(core_id),
            uart: Uart::new(),
        }
    }

    /// Route an I/O read. Panics if `address` is not an I/O address —
    /// callers are expected to check [`is_io_address`] first.
    pub fn read(&mut self, address: u32, exceptions: &ExceptionRegister, lock: &GlobalLock) -> u32 {
        debug_assert!(is_io_address(address));
        let sub = io_sub_address(address);
        match sub {
            s if (crate::device::sys_regs::CORE_ID..=0x8F).contains(&s) => self.sys.read(s, exceptions, lock),
            s if (crate::device::uart::STATUS..=crate::device::uart::DATA).contains(&s) => self.uart.read(s),
            _ => 0,
        }
    }

    pub fn write(&mut self, address: u32, data: u32, lock: &mut GlobalLock) {
        debug_assert!(is_io_address(address));
        let sub = io_sub_address(address);
        match sub {
            s if (crate::device::sys_regs::CORE_ID..=0x8F).contains(&s) => self.sys.write(s, data, lock),
            s if (crate::device::uart::STATUS..=crate::device::uart::DATA).contains(&s) => self.uart.write(s, data),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sys_and_uart_routed_by_sub_address() {
        let mut io = IoRegion::new(1);
        let exc = ExceptionRegister::new();
        let mut lock = GlobalLock::new();

        let sys_addr = 0xC000_0080u32;
        assert!(is_io_address(sys_addr));
        assert_eq!(io.read(sys_addr, &exc, &lock), 1);

        let uart_data_addr = 0xC000_0091u32;
        io.write(uart_data_addr, b'X' as u32, &mut lock);
        assert_eq!(io.uart.drain_tx(), vec![b'X']);
    }
}
