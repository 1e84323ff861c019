//! Integration tests driving the world through the shared [`Game`] handle.
//!
//! These exercise the properties that only show up across modules: lock
//! serialization of concurrent actions, seat-gated policy, delivery
//! idempotence, retention cleanup, and scalar bounds over long runs.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use granary_core::actions::admin::AdminCommand;
use granary_core::actions::contracts;
use granary_core::config::GameConfig;
use granary_core::{Action, Game};
use granary_types::{
    ContractId, ContractStatus, ContractType, EventKind, PlayerId, SeatKind, Stance,
};

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().unwrap()
}

fn game() -> Game {
    Game::from_config(GameConfig::default(), epoch()).unwrap()
}

async fn join(game: &Game, name: &str) -> PlayerId {
    game.join(name, epoch()).await.player.expect("join accepted")
}

async fn issue(game: &Game, kind: ContractType) -> ContractId {
    game.with_state_mut(|s| match kind {
        ContractType::Smuggling => contracts::issue_smuggling(s, epoch()).unwrap(),
        _ => contracts::issue_emergency(s, epoch()),
    })
    .await
}

#[tokio::test]
async fn concurrent_accepts_admit_exactly_one() {
    let game = game();
    let a = join(&game, "Mara").await;
    let b = join(&game, "Tomas").await;
    let id = issue(&game, ContractType::Emergency).await;

    let accept = |actor| {
        let game = game.clone();
        tokio::spawn(async move {
            game.act(
                actor,
                Action::Accept {
                    contract: id,
                    stance: Stance::Careful,
                },
                epoch(),
            )
            .await
        })
    };
    let (first, second) = tokio::join!(accept(a), accept(b));
    let accepted = [first.unwrap(), second.unwrap()]
        .iter()
        .filter(|o| o.accepted)
        .count();
    assert_eq!(accepted, 1);

    let owners = game
        .with_state(|s| s.contracts.get(&id).and_then(|c| c.owner.clone()))
        .await;
    assert!(owners.is_some());
}

#[tokio::test]
async fn one_accepted_contract_per_player() {
    let game = game();
    let a = join(&game, "Mara").await;
    let first = issue(&game, ContractType::Emergency).await;
    let second = issue(&game, ContractType::Emergency).await;
    let accept = |contract| Action::Accept {
        contract,
        stance: Stance::Careful,
    };
    assert!(game.act(a, accept(first), epoch()).await.accepted);
    assert!(!game.act(a, accept(second), epoch()).await.accepted);
}

#[tokio::test]
async fn embargo_blocks_smuggling_until_seat_granted() {
    let game = game();
    let a = join(&game, "Mara").await;
    let id = issue(&game, ContractType::Smuggling).await;
    game.with_state_mut(|s| s.policy.embargo_ticks = 10).await;

    let accept = Action::Accept {
        contract: id,
        stance: Stance::Quiet,
    };
    assert!(!game.act(a, accept.clone(), epoch()).await.accepted);
    let status = game
        .with_state(|s| s.contracts.get(&id).map(|c| c.status))
        .await;
    assert_eq!(status, Some(ContractStatus::Issued));

    let grant = AdminCommand::GrantSeat {
        seat: SeatKind::HarborMaster,
        player: a,
    };
    assert!(game.admin(true, grant, epoch()).await.accepted);
    assert!(game.act(a, accept, epoch()).await.accepted);
}

#[tokio::test]
async fn delivering_twice_changes_nothing() {
    let game = game();
    let a = join(&game, "Mara").await;
    let id = issue(&game, ContractType::Emergency).await;
    let accept = Action::Accept {
        contract: id,
        stance: Stance::Careful,
    };
    assert!(game.act(a, accept, epoch()).await.accepted);
    assert!(
        game.act(a, Action::Deliver { contract: id }, epoch())
            .await
            .accepted
    );
    let standing = |s: &granary_core::GameState| {
        s.players
            .get(&a)
            .map(|p| (p.gold, p.rep, p.heat, p.completed_contracts))
    };
    let before = game.with_state(standing).await;

    let again = game.act(a, Action::Deliver { contract: id }, epoch()).await;
    assert!(!again.accepted);
    assert_eq!(game.with_state(standing).await, before);
}

#[tokio::test]
async fn cleanup_respects_event_retention() {
    let game = game();
    let now = epoch();
    game.with_state_mut(|s| {
        s.log_event(EventKind::Notice, "fifteen days old", None, now - Duration::days(15));
        s.log_event(EventKind::Notice, "two days old", None, now - Duration::days(2));
    })
    .await;
    let report = game.run_daily_cleanup(now).await;
    assert_eq!(report.events, 1);
    let texts = game
        .with_state(|s| s.events.iter().map(|e| e.text.clone()).collect::<Vec<_>>())
        .await;
    assert_eq!(texts, vec!["two days old".to_owned()]);
}

#[tokio::test]
async fn scalars_stay_in_bounds_over_a_long_run() {
    let game = game();
    let _ = join(&game, "Mara").await;
    let later = epoch() + Duration::days(40);
    let ran = game.advance(later).await.unwrap();
    assert!(ran > 0);
    let (unrest, heat_ok, rep_ok) = game
        .with_state(|s| {
            (
                s.world.unrest,
                s.players.values().all(|p| p.heat <= granary_types::HEAT_MAX),
                s.players
                    .values()
                    .all(|p| (granary_types::REP_MIN..=granary_types::REP_MAX).contains(&p.rep)),
            )
        })
        .await;
    assert!(unrest <= 100);
    assert!(heat_ok && rep_ok);
}

#[tokio::test]
async fn unprivileged_admin_is_refused() {
    let game = game();
    let outcome = game.admin(false, AdminCommand::ForceTick, epoch()).await;
    assert!(!outcome.accepted);
    assert_eq!(game.with_state(|s| s.tick()).await, 0);
}
