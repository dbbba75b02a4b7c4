//! Per-field mutation application.
//!
//! The rules are uniform across every mutation variant, so they live in a
//! handful of generic helpers instead of per-event code:
//! - a field is written iff the mutation carries it,
//! - millisecond fields widen to `Duration`,
//! - 32-bit integers widen to the host's 64-bit fields,
//! - list fields replace the host list,
//! - references are re-resolved; unresolved entries leave the host value
//!   untouched.

use std::time::Duration;

use strata_core::{EngineServices, ItemStack};

/// Write `value` over `target` when present.
pub(crate) fn apply<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

/// Widen a milliseconds field into the host duration.
pub(crate) fn apply_ms(target: &mut Duration, ms: Option<u64>) {
    if let Some(ms) = ms {
        *target = Duration::from_millis(ms);
    }
}

/// Widen a 32-bit wire integer into the host's 64-bit field.
pub(crate) fn apply_widened(target: &mut i64, value: Option<i32>) {
    if let Some(value) = value {
        *target = i64::from(value);
    }
}

/// Replace a drop list, re-resolving each stack against the engine's item
/// registry. Entries with an empty name, a non-positive count, or an
/// unresolvable item are skipped; the remainder replaces the host list.
pub(crate) fn apply_drops(
    target: &mut Vec<ItemStack>,
    drops: Option<Vec<ItemStack>>,
    engine: &dyn EngineServices,
) {
    let Some(drops) = drops else {
        return;
    };
    *target = drops
        .into_iter()
        .filter(|stack| {
            !stack.name.is_empty() && stack.count > 0 && engine.resolve_item(&stack.name, stack.meta)
        })
        .collect();
}
