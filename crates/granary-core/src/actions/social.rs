//! Joining, names, public chat, and diplomatic letters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use granary_types::{
    ChatMessage, ChatMessageId, CooldownKind, DiplomaticMessage, DiplomaticMessageId, EventKind,
    Player, PlayerId,
};

use crate::state::{ActionOutcome, Denial, GameState, HandlerResult, Toast, bump};

/// Longest display name.
pub const MAX_NAME_LEN: usize = 24;

/// Longest chat message.
pub const MAX_CHAT_LEN: usize = 280;

/// Longest diplomatic letter.
pub const MAX_LETTER_LEN: usize = 1_000;

/// Result of joining the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinOutcome {
    /// Messages for the new player.
    pub outcome: ActionOutcome,
    /// The new player's id, when the join went through.
    pub player: Option<PlayerId>,
}

fn clean_name(state: &GameState, name: &str, except: Option<PlayerId>) -> Result<String, Denial> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Denial::new("Choose a name."));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Denial::new(format!(
            "Names are at most {MAX_NAME_LEN} characters."
        )));
    }
    let taken = state
        .players
        .values()
        .filter(|p| !p.is_deleted() && Some(p.id) != except)
        .any(|p| p.name.eq_ignore_ascii_case(name));
    if taken {
        return Err(Denial::new("That name is taken."));
    }
    Ok(name.to_owned())
}

fn clean_text(text: &str, max: usize) -> Result<String, Denial> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Denial::new("Say something."));
    }
    if text.chars().count() > max {
        return Err(Denial::new(format!("Keep it under {max} characters.")));
    }
    Ok(text.to_owned())
}

/// Create a player with the starting purse.
pub fn join(state: &mut GameState, name: &str, now: DateTime<Utc>) -> JoinOutcome {
    let name = match clean_name(state, name, None) {
        Ok(name) => name,
        Err(Denial(text)) => {
            return JoinOutcome {
                outcome: ActionOutcome::denied(text),
                player: None,
            };
        }
    };
    let id = PlayerId::new();
    let gold = state.config.world.starting_gold;
    state.players.insert(id, Player::new(id, &name, gold, now));
    info!(player = %id, %name, "Player joined");
    state.log_event(
        EventKind::Notice,
        format!("{name} arrives in {}.", state.config.world.name),
        Some(id),
        now,
    );
    let welcome = format!("Welcome to {}, {name}.", state.config.world.name);
    JoinOutcome {
        outcome: ActionOutcome::accepted(Toast::success(welcome)),
        player: Some(id),
    }
}

/// Change display name. Existing references keep the old name.
pub fn rename(
    state: &mut GameState,
    actor: PlayerId,
    name: &str,
    _now: DateTime<Utc>,
) -> HandlerResult {
    state.live_player(actor)?;
    let name = clean_name(state, name, Some(actor))?;
    let player = state.live_player_mut(actor)?;
    player.name.clone_from(&name);
    Ok(Toast::success(format!("You are now known as {name}.")))
}

/// Post to public chat.
pub fn chat(state: &mut GameState, actor: PlayerId, text: &str, now: DateTime<Utc>) -> HandlerResult {
    let text = clean_text(text, MAX_CHAT_LEN)?;
    let author = state.live_player(actor)?.to_ref();
    state.take_cooldown(actor, CooldownKind::Chat, now)?;
    let id = ChatMessageId(bump(&mut state.counters.next_chat_id));
    state.chat.push(ChatMessage {
        id,
        author,
        text,
        created_at: now,
    });
    Ok(Toast::info("Said."))
}

/// Send a private letter.
pub fn send_diplomatic(
    state: &mut GameState,
    actor: PlayerId,
    to: PlayerId,
    text: &str,
    now: DateTime<Utc>,
) -> HandlerResult {
    if actor == to {
        return Err(Denial::new("You cannot write to yourself."));
    }
    let text = clean_text(text, MAX_LETTER_LEN)?;
    let from = state.live_player(actor)?.to_ref();
    let recipient = state.live_player(to)?.to_ref();
    let id = DiplomaticMessageId(bump(&mut state.counters.next_diplomatic_id));
    state.notify(to, Toast::info(format!("A letter arrives from {}.", from.name)));
    let recipient_name = recipient.name.clone();
    state.diplomatic.push(DiplomaticMessage {
        id,
        from,
        to: recipient,
        text,
        created_at: now,
    });
    Ok(Toast::success(format!("Your letter to {recipient_name} is sent.")))
}
