//! ATA PIO disk driver
//!
//! Polled programmed I/O against the primary IDE channel, master drive,
//! 28-bit LBA. Per command: wait for BSY to clear, program drive select,
//! sector count and the LBA bytes, issue the command, then once per sector
//! wait for BSY/DRQ and move 256 little-endian words through the data port.
//!
//! The wait loops have no timeout and the ERROR bit is never inspected: a
//! device that never clears BSY or never raises DRQ hangs the calling
//! context. The port mutex below serializes register access so the
//! shared-receiver read path is sound; it does not arbitrate concurrent
//! filesystem use, which callers must keep to a single execution context.

use bitflags::bitflags;
use spin::Mutex;
use x86_64::instructions::port::Port;

use crate::filesys::{BlockDevice, FsError, SECTOR_SIZE};

/// Primary channel I/O port base.
pub const PRIMARY_IO_BASE: u16 = 0x1F0;

/// Register offsets from the channel base.
pub mod ata_reg {
    pub const DATA: u16 = 0;
    pub const SECTOR_COUNT: u16 = 2;
    pub const LBA_LO: u16 = 3;
    pub const LBA_MID: u16 = 4;
    pub const LBA_HI: u16 = 5;
    pub const DRIVE: u16 = 6;
    pub const STATUS: u16 = 7; // Read
    pub const COMMAND: u16 = 7; // Write
}

/// ATA commands
pub mod ata_cmd {
    pub const READ_PIO: u8 = 0x20;
    pub const WRITE_PIO: u8 = 0x30;
}

bitflags! {
    /// Status register bits.
    #[derive(Debug, Clone, Copy)]
    pub struct AtaStatus: u8 {
        const ERR = 0x01;
        const IDX = 0x02;
        const CORR = 0x04;
        const DRQ = 0x08;
        const SRV = 0x10;
        const DF = 0x20;
        const RDY = 0x40;
        const BSY = 0x80;
    }
}

struct AtaPorts {
    data: Port<u16>,
    sector_count: Port<u8>,
    lba_lo: Port<u8>,
    lba_mid: Port<u8>,
    lba_hi: Port<u8>,
    drive: Port<u8>,
    status: Port<u8>,
    command: Port<u8>,
}

impl AtaPorts {
    const fn new(base: u16) -> Self {
        AtaPorts {
            data: Port::new(base + ata_reg::DATA),
            sector_count: Port::new(base + ata_reg::SECTOR_COUNT),
            lba_lo: Port::new(base + ata_reg::LBA_LO),
            lba_mid: Port::new(base + ata_reg::LBA_MID),
            lba_hi: Port::new(base + ata_reg::LBA_HI),
            drive: Port::new(base + ata_reg::DRIVE),
            status: Port::new(base + ata_reg::STATUS),
            command: Port::new(base + ata_reg::COMMAND),
        }
    }

    fn status(&mut self) -> AtaStatus {
        AtaStatus::from_bits_truncate(unsafe { self.status.read() })
    }

    /// Spins until BSY clears. Unbounded.
    fn wait_not_busy(&mut self) {
        while self.status().contains(AtaStatus::BSY) {
            core::hint::spin_loop();
        }
    }

    /// Spins until DRQ asserts. Unbounded.
    fn wait_data_request(&mut self) {
        while !self.status().contains(AtaStatus::DRQ) {
            core::hint::spin_loop();
        }
    }

    /// Programs drive select, sector count and the 28-bit LBA, then issues
    /// `command`. The LBA's top nibble folds into the drive-select byte.
    fn issue(&mut self, lba: u32, count: u8, command: u8) {
        self.wait_not_busy();
        unsafe {
            self.drive.write(0xE0 | ((lba >> 24) & 0x0F) as u8);
            self.sector_count.write(count);
            self.lba_lo.write(lba as u8);
            self.lba_mid.write((lba >> 8) as u8);
            self.lba_hi.write((lba >> 16) as u8);
            self.command.write(command);
        }
    }
}

/// Master drive on the primary IDE channel.
pub struct AtaDrive {
    ports: Mutex<AtaPorts>,
}

impl AtaDrive {
    /// Driver bound to the fixed primary-master drive.
    pub const fn primary() -> Self {
        AtaDrive {
            ports: Mutex::new(AtaPorts::new(PRIMARY_IO_BASE)),
        }
    }
}

impl BlockDevice for AtaDrive {
    fn read_sectors(&self, lba: u32, count: u8, buf: &mut [u8]) -> Result<(), FsError> {
        if buf.len() != count as usize * SECTOR_SIZE {
            return Err(FsError::DeviceError);
        }

        let mut ports = self.ports.lock();
        ports.issue(lba, count, ata_cmd::READ_PIO);
        for sector in buf.chunks_exact_mut(SECTOR_SIZE) {
            ports.wait_not_busy();
            ports.wait_data_request();
            for pair in sector.chunks_exact_mut(2) {
                let word = unsafe { ports.data.read() };
                pair[0] = word as u8;
                pair[1] = (word >> 8) as u8;
            }
        }
        Ok(())
    }

    fn write_sectors(&mut self, lba: u32, count: u8, buf: &[u8]) -> Result<(), FsError> {
        if buf.len() != count as usize * SECTOR_SIZE {
            return Err(FsError::DeviceError);
        }

        let mut ports = self.ports.lock();
        ports.issue(lba, count, ata_cmd::WRITE_PIO);
        for sector in buf.chunks_exact(SECTOR_SIZE) {
            ports.wait_not_busy();
            ports.wait_data_request();
            for pair in sector.chunks_exact(2) {
                let word = u16::from_le_bytes([pair[0], pair[1]]);
                unsafe { ports.data.write(word) };
            }
        }
        Ok(())
    }
}
