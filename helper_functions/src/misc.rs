use core::ops::Range;

use arithmetic::U64Ext as _;
use types::{
    config::Config,
    primitives::{Epoch, Slot},
};

#[must_use]
pub fn compute_epoch_at_slot(config: &Config, slot: Slot) -> Epoch {
    slot / config.slots_per_epoch
}

#[must_use]
pub const fn compute_start_slot_at_epoch(config: &Config, epoch: Epoch) -> Slot {
    epoch.saturating_mul(config.slots_per_epoch.get())
}

#[must_use]
pub fn is_epoch_start(config: &Config, slot: Slot) -> bool {
    slot.is_divisible_by(config.slots_per_epoch)
}

#[must_use]
pub const fn slots_in_epoch(config: &Config, epoch: Epoch) -> Range<Slot> {
    compute_start_slot_at_epoch(config, epoch)
        ..compute_start_slot_at_epoch(config, epoch.saturating_add(1))
}
