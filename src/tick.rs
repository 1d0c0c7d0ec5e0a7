use crate::block_position::BlockPosition;
use crate::nbt::{get_int_lenient, read_xyz};
use quartz_nbt::NbtCompound;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TickKind {
    Block,
    Fluid,
}

impl TickKind {
    /// Key holding the target id in a stored tick entry.
    pub fn target_key(self) -> &'static str {
        match self {
            TickKind::Block => "Block",
            TickKind::Fluid => "Fluid",
        }
    }

    /// Target value meaning "nothing scheduled" for this kind.
    pub fn empty_target(self) -> &'static str {
        match self {
            TickKind::Block => "minecraft:air",
            TickKind::Fluid => "minecraft:empty",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum TickPriority {
    ExtremelyHigh,
    VeryHigh,
    High,
    #[default]
    Normal,
    Low,
    VeryLow,
    ExtremelyLow,
}

impl TickPriority {
    pub fn value(self) -> i32 {
        self as i32 - 3
    }

    /// Out-of-range values clamp to the nearest priority.
    pub fn from_value(value: i32) -> TickPriority {
        match value.clamp(-3, 3) {
            -3 => TickPriority::ExtremelyHigh,
            -2 => TickPriority::VeryHigh,
            -1 => TickPriority::High,
            0 => TickPriority::Normal,
            1 => TickPriority::Low,
            2 => TickPriority::VeryLow,
            _ => TickPriority::ExtremelyLow,
        }
    }
}

/// A pending block or fluid update. `position` is relative to the region's
/// minimum corner; `delay` counts the ticks that were left at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduledTick {
    pub kind: TickKind,
    pub target: SmolStr,
    pub position: BlockPosition,
    pub delay: i32,
    pub priority: TickPriority,
}

impl ScheduledTick {
    pub fn key(&self) -> (TickKind, BlockPosition) {
        (self.kind, self.position)
    }

    pub fn to_nbt(&self) -> NbtCompound {
        let mut compound = NbtCompound::new();
        compound.insert(self.kind.target_key(), self.target.to_string());
        compound.insert("Priority", self.priority.value());
        compound.insert("Time", self.delay);
        compound.insert("x", self.position.x);
        compound.insert("y", self.position.y);
        compound.insert("z", self.position.z);
        compound
    }

    /// `None` for entries that target the kind's empty value or are incomplete.
    pub fn from_nbt(kind: TickKind, nbt: &NbtCompound) -> Option<ScheduledTick> {
        let target = nbt.get::<_, &str>(kind.target_key()).ok()?;
        if target == kind.empty_target() {
            return None;
        }
        let (x, y, z) = read_xyz(nbt)?;
        let delay = get_int_lenient(nbt, "Time")?;
        let priority = get_int_lenient(nbt, "Priority").unwrap_or(0);
        Some(ScheduledTick {
            kind,
            target: SmolStr::new(target),
            position: BlockPosition::new(x, y, z),
            delay: delay.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
            priority: TickPriority::from_value(priority.clamp(-3, 3) as i32),
        })
    }
}
