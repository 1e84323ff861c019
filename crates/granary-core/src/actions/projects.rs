//! Civic projects.
//!
//! A sponsor pays up front; the project counts down in the projects pass
//! and applies its effect on completion. At most one project of each kind
//! is under construction at a time.

use chrono::{DateTime, Utc};
use tracing::info;

use granary_types::{EventKind, PlayerId, Project, ProjectId, ProjectKind};

use crate::catalog::{FESTIVAL_CALM, GRAIN_CELLAR_UNITS, WARD_NETWORK_TICKS, project_def};
use crate::expiring::sweep_with;
use crate::state::{Denial, GameState, HandlerResult, Toast, bump};

/// Pay for a civic project.
pub fn fund_project(
    state: &mut GameState,
    actor: PlayerId,
    kind: ProjectKind,
    now: DateTime<Utc>,
) -> HandlerResult {
    let def = project_def(kind);
    if state.projects.values().any(|p| p.kind == kind) {
        return Err(Denial::new(format!(
            "A {} is already being built.",
            def.name.to_lowercase()
        )));
    }
    let player = state.live_player_mut(actor)?;
    if player.gold < def.cost {
        return Err(Denial::new(format!(
            "A {} costs {} gold.",
            def.name.to_lowercase(),
            def.cost
        )));
    }
    player.gold = player.gold.saturating_sub(def.cost);
    let sponsor = player.to_ref();
    let sponsor_name = sponsor.name.clone();

    let id = ProjectId(bump(&mut state.counters.next_project_id));
    state.projects.insert(
        id,
        Project {
            id,
            kind,
            sponsor,
            ticks_left: def.build_ticks,
        },
    );
    info!(project_id = %id, ?kind, player = %actor, "Project funded");
    state.log_event(
        EventKind::Project,
        format!("{sponsor_name} funds a {}.", def.name.to_lowercase()),
        Some(actor),
        now,
    );
    Ok(Toast::success(format!(
        "Work begins on the {}.",
        def.name.to_lowercase()
    )))
}

fn complete(state: &mut GameState, project: Project, now: DateTime<Utc>) {
    let def = project_def(project.kind);
    match project.kind {
        ProjectKind::WardNetwork => {
            state.world.ward_network_ticks =
                state.world.ward_network_ticks.saturating_add(WARD_NETWORK_TICKS);
        }
        ProjectKind::GrainCellar => state.world.add_grain(GRAIN_CELLAR_UNITS),
        ProjectKind::Festival => state.world.lower_unrest(FESTIVAL_CALM),
    }
    if let Some(sponsor) = state.players.get_mut(&project.sponsor.id) {
        sponsor.adjust_rep(def.sponsor_rep);
    }
    state.notify(
        project.sponsor.id,
        Toast::success(format!("Your {} is complete.", def.name.to_lowercase())),
    );
    info!(project_id = %project.id, kind = ?project.kind, "Project completed");
    state.log_event(
        EventKind::Project,
        format!(
            "The {} sponsored by {} is complete.",
            def.name.to_lowercase(),
            project.sponsor.name
        ),
        Some(project.sponsor.id),
        now,
    );
}

/// Projects pass: count construction down and complete finished projects.
pub fn tick_projects(state: &mut GameState, now: DateTime<Utc>) {
    sweep_with(state, |s| &mut s.projects, |s, project| complete(s, project, now));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::*;

    fn build(s: &mut GameState, kind: ProjectKind) {
        for _ in 0..project_def(kind).build_ticks {
            tick_projects(s, now());
        }
    }

    #[test]
    fn one_project_per_kind() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 500);
        assert!(fund_project(&mut s, p, ProjectKind::Festival, now()).is_ok());
        assert!(fund_project(&mut s, p, ProjectKind::Festival, now()).is_err());
        assert!(fund_project(&mut s, p, ProjectKind::GrainCellar, now()).is_ok());
    }

    #[test]
    fn funding_requires_gold() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 1);
        assert!(fund_project(&mut s, p, ProjectKind::WardNetwork, now()).is_err());
        assert!(s.projects.is_empty());
        assert_eq!(player(&s, p).gold, 1);
    }

    #[test]
    fn grain_cellar_releases_grain_and_credits_sponsor() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 500);
        assert!(fund_project(&mut s, p, ProjectKind::GrainCellar, now()).is_ok());
        let grain = s.world.grain_supply;
        build(&mut s, ProjectKind::GrainCellar);
        assert!(s.projects.is_empty());
        assert_eq!(s.world.grain_supply, grain + GRAIN_CELLAR_UNITS);
        assert_eq!(player(&s, p).rep, project_def(ProjectKind::GrainCellar).sponsor_rep);
    }

    #[test]
    fn ward_network_shields_the_city() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 500);
        assert!(fund_project(&mut s, p, ProjectKind::WardNetwork, now()).is_ok());
        build(&mut s, ProjectKind::WardNetwork);
        assert_eq!(s.world.ward_network_ticks, WARD_NETWORK_TICKS);
    }

    #[test]
    fn festival_calms_the_streets() {
        let mut s = state();
        s.world.unrest = 40;
        let p = add_player(&mut s, "Mara", 500);
        assert!(fund_project(&mut s, p, ProjectKind::Festival, now()).is_ok());
        build(&mut s, ProjectKind::Festival);
        assert_eq!(s.world.unrest, 40 - FESTIVAL_CALM);
    }
}
