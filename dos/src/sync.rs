use core::ops::{Deref, DerefMut};

use bus_dev::{BusDevice, BusMode, Preemption};

/// 快速传输的临界区。
///
/// 进入时屏蔽中断并把总线切到快速模式，离开时按相反的顺序恢复原状。
/// 可以嵌套：只有进入前中断处于启用状态，离开时才重新启用。
pub struct CriticalSection<'a, B: BusDevice + Preemption> {
    bus: &'a mut B,
    /// 进入之前的总线模式
    mode_before: BusMode,
    /// 屏蔽之前的中断使能
    enabled_before: bool,
}

impl<'a, B: BusDevice + Preemption> CriticalSection<'a, B> {
    pub fn enter(bus: &'a mut B) -> Self {
        let enabled_before = bus.disable();
        let mode_before = bus.mode();
        bus.set_mode(BusMode::Fast);
        Self {
            bus,
            mode_before,
            enabled_before,
        }
    }
}

impl<B: BusDevice + Preemption> Drop for CriticalSection<'_, B> {
    fn drop(&mut self) {
        self.bus.set_mode(self.mode_before);
        if self.enabled_before {
            self.bus.enable();
        }
    }
}

impl<B: BusDevice + Preemption> Deref for CriticalSection<'_, B> {
    type Target = B;

    fn deref(&self) -> &Self::Target {
        self.bus
    }
}

impl<B: BusDevice + Preemption> DerefMut for CriticalSection<'_, B> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.bus
    }
}
