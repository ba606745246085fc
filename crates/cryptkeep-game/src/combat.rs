//! Damage application and hit geometry.
//!
//! Damage is edge-triggered: hit points clamp at zero, the hit that reaches
//! zero emits the one death event, and anything after that is a no-op.

use cryptkeep_map::Point;
use cryptkeep_protocol::{GameEvent, MonsterKind, Recipient};
use tracing::debug;

use crate::{Monster, Player};

pub(crate) type Outbox = Vec<(Recipient, GameEvent)>;

/// Applies `amount` to a player. Returns `true` if this hit killed them.
pub(crate) fn damage_player(player: &mut Player, amount: i32, outbox: &mut Outbox) -> bool {
    if !player.is_alive() {
        return false;
    }
    player.hp = (player.hp - amount.max(0)).max(0);
    outbox.push((
        Recipient::All,
        GameEvent::Damage {
            damage: amount,
            target_player_id: Some(player.id()),
            target_monster_id: None,
            hp: player.hp,
        },
    ));
    if player.is_alive() {
        return false;
    }
    debug!(player = %player.id(), "player died");
    outbox.push((
        Recipient::All,
        GameEvent::PlayerDeath {
            client_id: player.id(),
        },
    ));
    true
}

/// Applies `amount` to a monster. Returns the monster's kind if this hit
/// killed it.
pub(crate) fn damage_monster(
    monster: &mut Monster,
    amount: i32,
    outbox: &mut Outbox,
) -> Option<MonsterKind> {
    if !monster.is_alive() {
        return None;
    }
    monster.hp = (monster.hp - amount.max(0)).max(0);
    outbox.push((
        Recipient::All,
        GameEvent::Damage {
            damage: amount,
            target_player_id: None,
            target_monster_id: Some(monster.id),
            hp: monster.hp,
        },
    ));
    if monster.is_alive() {
        return None;
    }
    monster.moving = false;
    monster.attacking = false;
    monster.window.reset();
    debug!(monster = %monster.id, kind = %monster.kind, "monster died");
    outbox.push((
        Recipient::All,
        GameEvent::MonsterDeath {
            monster_id: monster.id,
        },
    ));
    Some(monster.kind)
}

/// Whether `p` lies within `radius` of the segment `a`–`b`.
pub fn capsule_contains(a: Point, b: Point, radius: i32, p: Point) -> bool {
    let (ax, ay) = (a.x as f64, a.y as f64);
    let (bx, by) = (b.x as f64, b.y as f64);
    let (px, py) = (p.x as f64, p.y as f64);
    let (dx, dy) = (bx - ax, by - ay);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    let dist_sq = (px - cx).powi(2) + (py - cy).powi(2);
    let r = radius as f64;
    dist_sq <= r * r
}
