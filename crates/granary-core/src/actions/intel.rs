//! Espionage: rumors, evidence, scrying, interception, and relics.
//!
//! Every record created here counts down in the intel pass and disappears
//! at zero. Rumors decay in credibility and spread further each tick unless
//! a ward network is up; a widely spread rumor leaves heat on its subject
//! when it fades. Relics apply their effect when their power runs out.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info};

use granary_types::{
    BudgetKind, CooldownKind, EventKind, Evidence, EvidenceId, Intercept, InterceptId, PlayerId,
    Relic, RelicId, RelicKind, Rumor, RumorId, ScryReport, ScryReportId,
};

use crate::catalog::{
    CROWN_SHARD_REP, HARVEST_IDOL_UNITS, QUIET_MASK_COOLING, relic_def, relic_for_roll,
    total_relic_weight,
};
use crate::expiring::sweep_with;
use crate::state::{Denial, GameState, HandlerResult, Toast, bump};

/// Credibility of a freshly spread rumor.
const RUMOR_CREDIBILITY: u8 = 60;

/// Credibility a rumor loses per tick.
const RUMOR_CREDIBILITY_DECAY: u8 = 5;

/// Spread at or above which a fading rumor sticks to its subject.
const RUMOR_STICKY_SPREAD: u8 = 4;

/// Longest rumor kept.
const MAX_RUMOR_LEN: usize = 200;

/// Reputation a target loses per point of published evidence.
const PUBLISH_REP_PER_STRENGTH: i32 = -2;

/// Evidence strength at which publishing against a seat holder restricts
/// the markets.
const SANCTION_STRENGTH: u32 = 3;

fn other_player(state: &GameState, actor: PlayerId, target: PlayerId) -> Result<(), Denial> {
    state.live_player(actor)?;
    if actor == target {
        return Err(Denial::new("You cannot do that to yourself."));
    }
    state.live_player(target)?;
    Ok(())
}

fn clamp_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

// ---------------------------------------------------------------------------
// Rumors
// ---------------------------------------------------------------------------

/// Listen in the taverns for a rumor token.
pub fn gather_rumor(state: &mut GameState, actor: PlayerId, now: DateTime<Utc>) -> HandlerResult {
    state.live_player(actor)?;
    state.take_cooldown(actor, CooldownKind::GatherRumor, now)?;
    let player = state.live_player_mut(actor)?;
    player.rumors = player.rumors.saturating_add(1);
    Ok(Toast::success("You overhear something worth repeating."))
}

/// Spend a rumor token to set a rumor loose.
pub fn spread_rumor(
    state: &mut GameState,
    actor: PlayerId,
    subject: Option<PlayerId>,
    text: &str,
    now: DateTime<Utc>,
) -> HandlerResult {
    let text: String = text.trim().chars().take(MAX_RUMOR_LEN).collect();
    if text.is_empty() {
        return Err(Denial::new("Say what the rumor is."));
    }
    let subject = match subject {
        Some(id) => Some(state.live_player(id)?.to_ref()),
        None => None,
    };
    let player = state.live_player_mut(actor)?;
    if player.rumors == 0 {
        return Err(Denial::new("You have nothing to spread."));
    }
    player.rumors = player.rumors.saturating_sub(1);
    let author = player.to_ref();

    let id = RumorId(bump(&mut state.counters.next_rumor_id));
    state.rumors.insert(
        id,
        Rumor {
            id,
            author,
            subject,
            text,
            credibility: RUMOR_CREDIBILITY,
            spread: 1,
            decay_ticks: state.config.intel.rumor_decay_ticks,
        },
    );
    debug!(rumor_id = %id, player = %actor, "Rumor spread");
    Ok(Toast::success("The rumor is loose."))
}

// ---------------------------------------------------------------------------
// Evidence
// ---------------------------------------------------------------------------

/// Build up a dossier on another player.
///
/// A second investigation of the same target strengthens the dossier and
/// resets its expiry.
pub fn investigate(
    state: &mut GameState,
    actor: PlayerId,
    target: PlayerId,
    now: DateTime<Utc>,
) -> HandlerResult {
    other_player(state, actor, target)?;
    state.take_cooldown(actor, CooldownKind::Investigate, now)?;
    let ticks = state.config.intel.evidence_ticks;
    let existing = state
        .evidence
        .values_mut()
        .find(|e| e.holder.id == actor && e.target.id == target);
    let strength = if let Some(dossier) = existing {
        dossier.strength = dossier.strength.saturating_add(1);
        dossier.ticks_left = ticks;
        dossier.strength
    } else {
        let holder = state.live_player(actor)?.to_ref();
        let target = state.live_player(target)?.to_ref();
        let id = EvidenceId(bump(&mut state.counters.next_evidence_id));
        state.evidence.insert(
            id,
            Evidence {
                id,
                holder,
                target,
                strength: 1,
                ticks_left: ticks,
            },
        );
        1
    };
    Ok(Toast::success(format!(
        "Your dossier grows. Strength {strength}."
    )))
}

/// Make a dossier public.
///
/// The daily budget is charged only when the actor actually holds evidence
/// on the target.
pub fn publish_evidence(
    state: &mut GameState,
    actor: PlayerId,
    target: PlayerId,
    now: DateTime<Utc>,
) -> HandlerResult {
    other_player(state, actor, target)?;
    let (id, strength) = state
        .evidence
        .values()
        .filter(|e| e.holder.id == actor && e.target.id == target)
        .max_by_key(|e| e.strength)
        .map(|e| (e.id, e.strength))
        .ok_or_else(|| Denial::new("You hold no evidence on them."))?;
    state.consume_budget(actor, BudgetKind::PublishEvidence)?;
    state.evidence.remove(&id);

    let sanctioned = state.holds_any_seat(target) && strength >= SANCTION_STRENGTH;
    let target_player = state.live_player_mut(target)?;
    target_player.adjust_rep(PUBLISH_REP_PER_STRENGTH.saturating_mul(clamp_i32(strength)));
    target_player.adjust_heat(clamp_i32(strength));
    let target_name = target_player.name.clone();
    if sanctioned {
        let ticks = state.config.institutions.restriction_ticks;
        state.world.restricted_markets_ticks = state.world.restricted_markets_ticks.max(ticks);
    }
    state.notify(
        target,
        Toast::error("Evidence against you has been made public."),
    );
    info!(player = %actor, target = %target, strength, sanctioned, "Evidence published");
    let text = if sanctioned {
        format!("Evidence against {target_name} is posted in the square. The markets close in outrage.")
    } else {
        format!("Evidence against {target_name} is posted in the square.")
    };
    state.log_event(EventKind::Intel, text, Some(target), now);
    Ok(Toast::success(format!("You publish your dossier on {target_name}.")))
}

// ---------------------------------------------------------------------------
// Scrying and interception
// ---------------------------------------------------------------------------

/// Pay a seer for a glimpse of another player's circumstances.
pub fn scry(
    state: &mut GameState,
    actor: PlayerId,
    target: PlayerId,
    now: DateTime<Utc>,
) -> HandlerResult {
    other_player(state, actor, target)?;
    let cost = state.config.intel.scry_cost;
    if state.live_player(actor)?.gold < cost {
        return Err(Denial::new(format!("The seer asks {cost} gold.")));
    }
    state.take_cooldown(actor, CooldownKind::Scry, now)?;
    let player = state.live_player_mut(actor)?;
    player.gold = player.gold.saturating_sub(cost);
    let holder = player.to_ref();
    let seen = state.live_player(target)?;
    let (seen_ref, gold_seen, location_seen, heat_seen) =
        (seen.to_ref(), seen.gold, seen.location, seen.heat);
    let report = ScryReport {
        id: ScryReportId(bump(&mut state.counters.next_scry_id)),
        holder,
        target: seen_ref,
        gold_seen,
        location_seen,
        heat_seen,
        ticks_left: state.config.intel.scry_ticks,
    };
    let text = format!(
        "You see {} in the {:?} with {} gold and heat {}.",
        report.target.name, report.location_seen, report.gold_seen, report.heat_seen
    );
    state.scry_reports.insert(report.id, report);
    Ok(Toast::success(text))
}

/// Copy the latest letter another player sent.
pub fn intercept(
    state: &mut GameState,
    actor: PlayerId,
    target: PlayerId,
    now: DateTime<Utc>,
) -> HandlerResult {
    other_player(state, actor, target)?;
    let letter = state
        .diplomatic
        .iter()
        .rev()
        .find(|m| m.from.id == target)
        .cloned()
        .ok_or_else(|| Denial::new("They have sent nothing worth reading."))?;
    state.take_cooldown(actor, CooldownKind::Intercept, now)?;
    let holder = state.live_player(actor)?.to_ref();
    let id = InterceptId(bump(&mut state.counters.next_intercept_id));
    state.intercepts.insert(
        id,
        Intercept {
            id,
            holder,
            from: letter.from.clone(),
            to: letter.to.clone(),
            text: letter.text.clone(),
            ticks_left: state.config.intel.intercept_ticks,
        },
    );
    debug!(intercept_id = %id, player = %actor, target = %target, "Letter intercepted");
    Ok(Toast::success(format!(
        "You copy a letter from {} to {}.",
        letter.from.name, letter.to.name
    )))
}

// ---------------------------------------------------------------------------
// Relics
// ---------------------------------------------------------------------------

/// Dig through the old quarters for a relic.
pub fn search_relic(state: &mut GameState, actor: PlayerId, now: DateTime<Utc>) -> HandlerResult {
    let cost = state.config.intel.relic_search_cost;
    if state.live_player(actor)?.gold < cost {
        return Err(Denial::new(format!("A dig costs {cost} gold.")));
    }
    state.take_cooldown(actor, CooldownKind::SearchRelic, now)?;
    let player = state.live_player_mut(actor)?;
    player.gold = player.gold.saturating_sub(cost);
    let holder = player.to_ref();

    let roll: u32 = state.rng.random_range(0..100);
    if roll >= state.config.intel.relic_find_pct {
        return Ok(Toast::info("You find nothing but dust."));
    }
    let pick: u32 = state.rng.random_range(0..total_relic_weight());
    let def = relic_def(relic_for_roll(pick));
    let id = RelicId(bump(&mut state.counters.next_relic_id));
    state.relics.insert(
        id,
        Relic {
            id,
            kind: def.kind,
            holder,
            ticks_left: def.duration_ticks,
        },
    );
    info!(relic_id = %id, kind = ?def.kind, player = %actor, "Relic found");
    state.log_event(
        EventKind::Relic,
        format!("A {} surfaces in the old quarter.", def.name.to_lowercase()),
        Some(actor),
        now,
    );
    Ok(Toast::success(format!("You unearth a {}!", def.name.to_lowercase())))
}

fn relic_fades(state: &mut GameState, relic: Relic, now: DateTime<Utc>) {
    let holder = relic.holder.id;
    match relic.kind {
        RelicKind::HarvestIdol => state.world.add_grain(HARVEST_IDOL_UNITS),
        RelicKind::QuietMask => {
            if let Some(p) = state.players.get_mut(&holder) {
                p.adjust_heat(QUIET_MASK_COOLING.saturating_neg());
            }
        }
        RelicKind::CrownShard => {
            if let Some(p) = state.players.get_mut(&holder) {
                p.adjust_rep(CROWN_SHARD_REP);
            }
        }
    }
    let name = relic_def(relic.kind).name;
    state.notify(holder, Toast::info(format!("Your {} fades.", name.to_lowercase())));
    state.log_event(
        EventKind::Relic,
        format!("The {} held by {} loses its power.", name.to_lowercase(), relic.holder.name),
        Some(holder),
        now,
    );
}

// ---------------------------------------------------------------------------
// Tick pass
// ---------------------------------------------------------------------------

/// Intel pass: decay rumors and expire every intel record.
pub fn tick_intel(state: &mut GameState, now: DateTime<Utc>) {
    let warded = state.world.ward_network_ticks > 0;
    for rumor in state.rumors.values_mut() {
        rumor.credibility = rumor.credibility.saturating_sub(RUMOR_CREDIBILITY_DECAY);
        if !warded {
            rumor.spread = rumor.spread.saturating_add(1);
        }
    }
    sweep_with(
        state,
        |s| &mut s.rumors,
        |s, rumor| {
            if rumor.spread < RUMOR_STICKY_SPREAD {
                return;
            }
            let Some(subject) = rumor.subject else {
                return;
            };
            if let Some(p) = s.players.get_mut(&subject.id) {
                p.adjust_heat(1);
            }
            debug!(rumor_id = %rumor.id, subject = %subject.id, "Rumor stuck to its subject");
        },
    );
    sweep_with(state, |s| &mut s.evidence, |_, _| {});
    sweep_with(state, |s| &mut s.scry_reports, |_, _| {});
    sweep_with(state, |s| &mut s.intercepts, |_, _| {});
    sweep_with(state, |s| &mut s.relics, |s, relic| relic_fades(s, relic, now));
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use granary_types::{DiplomaticMessage, DiplomaticMessageId, SeatKind};

    use super::*;
    use crate::actions::institutions::install;
    use crate::state::test_support::*;

    fn later(secs: i64) -> DateTime<Utc> {
        now() + Duration::seconds(secs)
    }

    // -----------------------------------------------------------------------
    // Rumors
    // -----------------------------------------------------------------------

    #[test]
    fn gathering_is_rate_limited() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 0);
        assert!(gather_rumor(&mut s, p, now()).is_ok());
        assert!(gather_rumor(&mut s, p, now()).is_err());
        assert_eq!(player(&s, p).rumors, 1);
        assert!(gather_rumor(&mut s, p, later(3_600)).is_ok());
        assert_eq!(player(&s, p).rumors, 2);
    }

    #[test]
    fn spreading_consumes_a_token() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 0);
        assert!(spread_rumor(&mut s, p, None, "the granary is empty", now()).is_err());
        player_mut(&mut s, p).rumors = 1;
        assert!(spread_rumor(&mut s, p, None, "the granary is empty", now()).is_ok());
        assert_eq!(player(&s, p).rumors, 0);
        assert_eq!(s.rumors.len(), 1);
    }

    #[test]
    fn rumors_decay_and_stick_to_subjects() {
        let mut s = state();
        let author = add_player(&mut s, "Mara", 0);
        let subject = add_player(&mut s, "Tomas", 0);
        player_mut(&mut s, author).rumors = 1;
        assert!(spread_rumor(&mut s, author, Some(subject), "hoards grain", now()).is_ok());

        tick_intel(&mut s, now());
        let rumor = s.rumors.get(&RumorId(1));
        assert_eq!(rumor.map(|r| r.credibility), Some(RUMOR_CREDIBILITY - 5));
        assert_eq!(rumor.map(|r| r.spread), Some(2));

        for _ in 0..s.config.intel.rumor_decay_ticks {
            tick_intel(&mut s, now());
        }
        assert!(s.rumors.is_empty());
        assert_eq!(player(&s, subject).heat, 1);
    }

    #[test]
    fn ward_network_stops_spread() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 0);
        player_mut(&mut s, p).rumors = 1;
        assert!(spread_rumor(&mut s, p, None, "whispers", now()).is_ok());
        s.world.ward_network_ticks = 5;
        tick_intel(&mut s, now());
        assert_eq!(s.rumors.get(&RumorId(1)).map(|r| r.spread), Some(1));
    }

    // -----------------------------------------------------------------------
    // Evidence
    // -----------------------------------------------------------------------

    #[test]
    fn investigating_twice_strengthens_one_dossier() {
        let mut s = state();
        let a = add_player(&mut s, "Mara", 0);
        let b = add_player(&mut s, "Tomas", 0);
        assert!(investigate(&mut s, a, b, now()).is_ok());
        assert!(investigate(&mut s, a, b, later(3_600)).is_ok());
        assert_eq!(s.evidence.len(), 1);
        assert_eq!(s.evidence.get(&EvidenceId(1)).map(|e| e.strength), Some(2));
    }

    #[test]
    fn investigating_yourself_is_refused() {
        let mut s = state();
        let a = add_player(&mut s, "Mara", 0);
        assert!(investigate(&mut s, a, a, now()).is_err());
    }

    #[test]
    fn publishing_without_evidence_keeps_budget() {
        let mut s = state();
        let a = add_player(&mut s, "Mara", 0);
        let b = add_player(&mut s, "Tomas", 0);
        let before = s.budget_remaining(a, BudgetKind::PublishEvidence);
        assert!(publish_evidence(&mut s, a, b, now()).is_err());
        assert_eq!(s.budget_remaining(a, BudgetKind::PublishEvidence), before);
    }

    #[test]
    fn publishing_against_a_seat_holder_restricts_markets() {
        let mut s = state();
        let a = add_player(&mut s, "Mara", 0);
        let b = add_player(&mut s, "Tomas", 0);
        let _ = install(&mut s, SeatKind::GrainWarden, b, now());
        for i in 0..3 {
            assert!(investigate(&mut s, a, b, later(i * 3_600)).is_ok());
        }
        assert!(publish_evidence(&mut s, a, b, now()).is_ok());
        assert!(s.world.markets_restricted());
        assert_eq!(player(&s, b).rep, -6);
        assert_eq!(player(&s, b).heat, 3);
        assert!(s.evidence.is_empty());
        assert_eq!(s.budget_remaining(a, BudgetKind::PublishEvidence), 1);
    }

    #[test]
    fn weak_evidence_does_not_sanction() {
        let mut s = state();
        let a = add_player(&mut s, "Mara", 0);
        let b = add_player(&mut s, "Tomas", 0);
        let _ = install(&mut s, SeatKind::GrainWarden, b, now());
        assert!(investigate(&mut s, a, b, now()).is_ok());
        assert!(publish_evidence(&mut s, a, b, now()).is_ok());
        assert!(!s.world.markets_restricted());
    }

    // -----------------------------------------------------------------------
    // Scrying, interception, relics
    // -----------------------------------------------------------------------

    #[test]
    fn scry_reports_target_and_expires() {
        let mut s = state();
        let a = add_player(&mut s, "Mara", 100);
        let b = add_player(&mut s, "Tomas", 77);
        assert!(scry(&mut s, a, b, now()).is_ok());
        assert_eq!(player(&s, a).gold, 100 - s.config.intel.scry_cost);
        let report = s.scry_reports.get(&ScryReportId(1));
        assert_eq!(report.map(|r| r.gold_seen), Some(77));
        for _ in 0..s.config.intel.scry_ticks {
            tick_intel(&mut s, now());
        }
        assert!(s.scry_reports.is_empty());
    }

    #[test]
    fn intercept_copies_latest_letter() {
        let mut s = state();
        let spy = add_player(&mut s, "Mara", 0);
        let sender = add_player(&mut s, "Tomas", 0);
        let recipient = add_player(&mut s, "Ilse", 0);
        assert!(intercept(&mut s, spy, sender, now()).is_err());
        for (id, text) in [(1, "first"), (2, "second")] {
            s.diplomatic.push(DiplomaticMessage {
                id: DiplomaticMessageId(id),
                from: player(&s, sender).to_ref(),
                to: player(&s, recipient).to_ref(),
                text: text.to_owned(),
                created_at: now(),
            });
        }
        assert!(intercept(&mut s, spy, sender, now()).is_ok());
        let copy = s.intercepts.get(&InterceptId(1));
        assert_eq!(copy.map(|c| c.text.as_str()), Some("second"));
    }

    #[test]
    fn relic_search_charges_and_eventually_finds() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 10_000);
        let cost = s.config.intel.relic_search_cost;
        let mut searches = 0_u64;
        for i in 0..100 {
            assert!(search_relic(&mut s, p, later(i * 7_200)).is_ok());
            searches += 1;
            if !s.relics.is_empty() {
                break;
            }
        }
        assert_eq!(s.relics.len(), 1);
        assert_eq!(player(&s, p).gold, 10_000 - cost * searches);
    }

    #[test]
    fn harvest_idol_returns_grain_when_it_fades() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 0);
        s.relics.insert(
            RelicId(1),
            Relic {
                id: RelicId(1),
                kind: RelicKind::HarvestIdol,
                holder: player(&s, p).to_ref(),
                ticks_left: 1,
            },
        );
        let grain = s.world.grain_supply;
        tick_intel(&mut s, now());
        assert!(s.relics.is_empty());
        assert_eq!(s.world.grain_supply, grain + HARVEST_IDOL_UNITS);
    }
}
