//! Daily retention cleanup.
//!
//! Prunes append-only logs past their retention windows, drops closed debts
//! and finished contracts, and retires idle players in two stages: a soft
//! delete after `soft_delete_days` of silence and a redacting hard delete
//! after `hard_delete_days`. Running it twice at the same instant changes
//! nothing the second time.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use granary_types::ContractStatus;

use crate::state::GameState;

/// Name left on a redacted player.
pub const REDACTED_NAME: &str = "Departed citizen";

/// What one cleanup run removed or retired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Events pruned.
    pub events: usize,
    /// Chat messages pruned.
    pub chat: usize,
    /// Diplomatic letters pruned.
    pub diplomatic: usize,
    /// Closed loans and obligations dropped.
    pub debts: usize,
    /// Finished contracts dropped.
    pub contracts: usize,
    /// Players soft-deleted.
    pub soft_deleted: usize,
    /// Players redacted.
    pub hard_deleted: usize,
}

fn days_before(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    Duration::try_days(i64::from(days))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn retain_counted<T>(items: &mut Vec<T>, keep: impl Fn(&T) -> bool) -> usize {
    let before = items.len();
    items.retain(keep);
    before.saturating_sub(items.len())
}

/// Run the daily cleanup against the aggregate.
pub fn run_daily_cleanup(state: &mut GameState, now: DateTime<Utc>) -> CleanupReport {
    let retention = state.config.retention.clone();
    let mut report = CleanupReport::default();

    let cutoff = days_before(now, retention.events_days);
    report.events = retain_counted(&mut state.events, |e| e.created_at >= cutoff);
    let cutoff = days_before(now, retention.chat_days);
    report.chat = retain_counted(&mut state.chat, |m| m.created_at >= cutoff);
    let cutoff = days_before(now, retention.diplomatic_days);
    report.diplomatic = retain_counted(&mut state.diplomatic, |m| m.created_at >= cutoff);

    let cutoff = days_before(now, retention.debts_days);
    let stale = |closed_at: Option<DateTime<Utc>>| closed_at.is_some_and(|at| at < cutoff);
    let loans = state.loans.len();
    state.loans.retain(|_, l| !stale(l.terms.closed_at));
    let obligations = state.obligations.len();
    state.obligations.retain(|_, o| !stale(o.terms.closed_at));
    report.debts = loans
        .saturating_sub(state.loans.len())
        .saturating_add(obligations.saturating_sub(state.obligations.len()));

    let contracts = state.contracts.len();
    state.contracts.retain(|_, c| {
        !matches!(
            c.status,
            ContractStatus::Completed | ContractStatus::Failed | ContractStatus::Cancelled
        )
    });
    report.contracts = contracts.saturating_sub(state.contracts.len());

    let soft_cutoff = days_before(now, retention.soft_delete_days);
    let hard_cutoff = days_before(now, retention.hard_delete_days);
    let mut retired = Vec::new();
    for player in state.players.values_mut() {
        if player.hard_deleted_at.is_none() && player.last_seen_at < hard_cutoff {
            REDACTED_NAME.clone_into(&mut player.name);
            player.gold = 0;
            player.grain = 0;
            player.rep = 0;
            player.heat = 0;
            player.rumors = 0;
            player.travel = None;
            player.bribed_until_tick = None;
            player.hard_deleted_at = Some(now);
            if player.soft_deleted_at.is_none() {
                player.soft_deleted_at = Some(now);
            }
            report.hard_deleted = report.hard_deleted.saturating_add(1);
            retired.push(player.id);
        } else if player.soft_deleted_at.is_none() && player.last_seen_at < soft_cutoff {
            player.soft_deleted_at = Some(now);
            report.soft_deleted = report.soft_deleted.saturating_add(1);
            retired.push(player.id);
        }
    }
    for seat in state.seats.values_mut() {
        if seat.holder.as_ref().is_some_and(|h| retired.contains(&h.id)) {
            seat.holder = None;
        }
    }

    info!(
        events = report.events,
        chat = report.chat,
        diplomatic = report.diplomatic,
        debts = report.debts,
        contracts = report.contracts,
        soft_deleted = report.soft_deleted,
        hard_deleted = report.hard_deleted,
        "Daily cleanup complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use granary_types::{ChatMessage, ChatMessageId, EventKind, SeatKind};

    use super::*;
    use crate::actions::institutions::install;
    use crate::state::test_support::*;

    fn ago(days: i64) -> DateTime<Utc> {
        now() - Duration::days(days)
    }

    #[test]
    fn events_outside_the_window_are_pruned() {
        let mut s = state();
        s.log_event(EventKind::Notice, "old", None, ago(15));
        s.log_event(EventKind::Notice, "recent", None, ago(2));
        let report = run_daily_cleanup(&mut s, now());
        assert_eq!(report.events, 1);
        let texts: Vec<_> = s.events.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["recent"]);
    }

    #[test]
    fn chat_has_a_shorter_window() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 0);
        let author = player(&s, p).to_ref();
        s.chat.push(ChatMessage {
            id: ChatMessageId(1),
            author,
            text: "eight days ago".to_owned(),
            created_at: ago(8),
        });
        assert_eq!(run_daily_cleanup(&mut s, now()).chat, 1);
        assert!(s.chat.is_empty());
    }

    #[test]
    fn idle_players_are_retired_in_stages() {
        let mut s = state();
        let idle = add_player(&mut s, "Mara", 50);
        let gone = add_player(&mut s, "Tomas", 50);
        let active = add_player(&mut s, "Ilse", 50);
        player_mut(&mut s, idle).last_seen_at = ago(31);
        let departing = player_mut(&mut s, gone);
        departing.last_seen_at = ago(91);
        departing.rep = 40;
        departing.heat = 9;
        departing.grain = 6;
        departing.rumors = 2;
        let _ = install(&mut s, SeatKind::Magistrate, idle, now());

        let report = run_daily_cleanup(&mut s, now());
        assert_eq!(report.soft_deleted, 1);
        assert_eq!(report.hard_deleted, 1);
        assert!(player(&s, idle).soft_deleted_at.is_some());
        assert_eq!(player(&s, gone).name, REDACTED_NAME);
        let redacted = player(&s, gone);
        assert_eq!(
            (redacted.gold, redacted.grain, redacted.rep, redacted.heat, redacted.rumors),
            (0, 0, 0, 0, 0)
        );
        assert!(!player(&s, active).is_deleted());
        assert!(!s.holds_seat(idle, SeatKind::Magistrate));
    }

    #[test]
    fn cleanup_is_idempotent() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 50);
        player_mut(&mut s, p).last_seen_at = ago(91);
        s.log_event(EventKind::Notice, "old", None, ago(20));
        let _ = run_daily_cleanup(&mut s, now());
        let snapshot = (s.events.clone(), s.players.clone());
        let second = run_daily_cleanup(&mut s, now());
        assert_eq!(second, CleanupReport::default());
        assert_eq!((s.events.clone(), s.players.clone()), snapshot);
    }
}
