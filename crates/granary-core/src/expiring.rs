//! Tick-expiring records.
//!
//! Permits, rumors, evidence dossiers, scry reports, intercepts, relics, and
//! projects all count down once per tick and disappear at zero. They share
//! one countdown sweep: [`sweep`] decrements every record in a collection
//! and hands back the ones that reached zero, and [`sweep_with`] runs a
//! per-kind expiry callback on each of them against the whole aggregate.

use std::collections::BTreeMap;

use granary_types::{Evidence, Intercept, Permit, Project, Relic, Rumor, ScryReport};

use crate::state::GameState;

/// A record that lives for a fixed number of ticks.
pub trait Expiring {
    /// Ticks remaining before expiry.
    fn ticks_left(&self) -> u32;

    /// Mutable access to the countdown.
    fn ticks_left_mut(&mut self) -> &mut u32;

    /// Count down one tick. Returns `true` once the record has expired.
    fn count_down(&mut self) -> bool {
        let left = self.ticks_left_mut();
        *left = left.saturating_sub(1);
        *left == 0
    }
}

macro_rules! impl_expiring {
    ($($ty:ty => $field:ident),* $(,)?) => {
        $(
            impl Expiring for $ty {
                fn ticks_left(&self) -> u32 {
                    self.$field
                }

                fn ticks_left_mut(&mut self) -> &mut u32 {
                    &mut self.$field
                }
            }
        )*
    };
}

impl_expiring! {
    Permit => ticks_left,
    Rumor => decay_ticks,
    Evidence => ticks_left,
    ScryReport => ticks_left,
    Intercept => ticks_left,
    Relic => ticks_left,
    Project => ticks_left,
}

/// Count every record down one tick and remove those that expired.
///
/// Expired records are returned in key order.
pub fn sweep<K: Ord + Copy, V: Expiring>(records: &mut BTreeMap<K, V>) -> Vec<V> {
    let expired: Vec<K> = records
        .iter_mut()
        .filter_map(|(key, record)| record.count_down().then_some(*key))
        .collect();
    expired
        .into_iter()
        .filter_map(|key| records.remove(&key))
        .collect()
}

/// Sweep the collection chosen by `select`, then run `on_expire` for each
/// expired record with full access to the aggregate.
///
/// Returns the number of records that expired.
pub fn sweep_with<K, V, F>(
    state: &mut GameState,
    select: fn(&mut GameState) -> &mut BTreeMap<K, V>,
    mut on_expire: F,
) -> usize
where
    K: Ord + Copy,
    V: Expiring,
    F: FnMut(&mut GameState, V),
{
    let expired = sweep(select(state));
    let count = expired.len();
    for record in expired {
        on_expire(state, record);
    }
    count
}

#[cfg(test)]
mod tests {
    use granary_types::{PermitId, PlayerId, PlayerRef};

    use super::*;
    use crate::state::test_support;

    fn permit(id: u64, ticks_left: u32) -> Permit {
        Permit {
            id: PermitId(id),
            holder: PlayerRef {
                id: PlayerId::new(),
                name: "Mara".to_owned(),
            },
            ticks_left,
        }
    }

    #[test]
    fn sweep_removes_only_expired() {
        let mut permits = BTreeMap::new();
        permits.insert(PermitId(1), permit(1, 1));
        permits.insert(PermitId(2), permit(2, 3));

        let expired = sweep(&mut permits);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired.first().map(|p| p.id), Some(PermitId(1)));
        assert_eq!(permits.get(&PermitId(2)).map(Expiring::ticks_left), Some(2));
    }

    #[test]
    fn zero_ticks_expires_immediately() {
        let mut permits = BTreeMap::new();
        permits.insert(PermitId(1), permit(1, 0));
        assert_eq!(sweep(&mut permits).len(), 1);
        assert!(permits.is_empty());
    }

    #[test]
    fn sweep_with_runs_callback_per_record() {
        let mut state = test_support::state();
        state.permits.insert(PermitId(1), permit(1, 1));
        state.permits.insert(PermitId(2), permit(2, 1));

        let mut seen = Vec::new();
        let n = sweep_with(&mut state, |s| &mut s.permits, |_, p| seen.push(p.id));
        assert_eq!(n, 2);
        assert_eq!(seen, vec![PermitId(1), PermitId(2)]);
        assert!(state.permits.is_empty());
    }
}
