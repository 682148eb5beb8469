use bus_dev::{BusDevice, BusMode, Preemption};

/// 不接任何线路的总线，只记下发出的字节
#[derive(Debug)]
pub struct TraceBus {
    bytes: Vec<u8>,
    /// `send_block`的调用次数
    blocks: usize,
    mode: BusMode,
    interrupts: bool,
}

impl Default for TraceBus {
    fn default() -> Self {
        Self {
            bytes: Vec::new(),
            blocks: 0,
            mode: BusMode::Normal,
            interrupts: true,
        }
    }
}

impl TraceBus {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn blocks(&self) -> usize {
        self.blocks
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.interrupts
    }
}

impl BusDevice for TraceBus {
    fn mode(&self) -> BusMode {
        self.mode
    }

    fn set_mode(&mut self, mode: BusMode) {
        log::trace!("bus mode {mode:?}");
        self.mode = mode;
    }

    fn send_byte(&mut self, byte: u8) {
        if self.interrupts {
            log::warn!("byte {byte:#04x} sent outside a critical section");
        }
        self.bytes.push(byte);
    }

    fn send_block(&mut self, data: &[u8]) {
        log::trace!("block of {} bytes", data.len());
        self.blocks += 1;
        self.bytes.extend_from_slice(data);
    }
}

impl Preemption for TraceBus {
    fn disable(&mut self) -> bool {
        core::mem::replace(&mut self.interrupts, false)
    }

    fn enable(&mut self) {
        self.interrupts = true;
    }
}
