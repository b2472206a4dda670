//! Ping-pong invitations
//!
//! A two-phase handshake. Sending an invite links both agents and schedules a
//! resolution timer carrying each side's invite token; any cancellation in
//! between bumps a token, so the resolution sees the mismatch and aborts
//! instead of acting on stale state.

use tracing::{debug, info};

use super::Office;
use super::agent::{Activity, AgentId, AgentState, InviteLink};
use super::events::SocialKind;
use super::geometry::Zone;
use super::random::RandomSource;
use super::scheduler::TimerKind;

const INVITE_BUBBLE_MS: u64 = 1_500;

impl Office {
    /// Find a partner for a game, or play solo when nobody is around.
    pub(super) fn start_game(&mut self, i: usize) {
        match self.nearest_partner(i) {
            Some(j) => self.send_invite(i, j),
            None => {
                let dwell = self.config.game_dwell_ms.sample(self.rng.as_mut());
                self.visit_zone(i, Zone::Game, Activity::Game, dwell);
            }
        }
    }

    /// Closest socially available agent within the invite radius
    fn nearest_partner(&self, i: usize) -> Option<usize> {
        let me = &self.agents[i];
        let radius = self.config.invite_radius;
        self.agents
            .iter()
            .enumerate()
            .filter(|(j, other)| *j != i && other.is_socially_available())
            .map(|(j, other)| (j, me.pos.distance(other.pos)))
            .filter(|(_, d)| *d <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(j, _)| j)
    }

    fn send_invite(&mut self, i: usize, j: usize) {
        self.cancel_activity(i);
        self.cancel_activity(j);

        let now = self.now;
        let initiator = self.agents[i].id.clone();
        let invitee = self.agents[j].id.clone();
        let initiator_token = self.agents[i].invite_token;
        let invitee_token = self.agents[j].invite_token;

        for (k, link, line) in [
            (
                i,
                InviteLink::Inviting {
                    peer: invitee.clone(),
                    token: initiator_token,
                },
                "Ping-pong?",
            ),
            (
                j,
                InviteLink::Invited {
                    peer: initiator.clone(),
                    token: invitee_token,
                },
                "Hmm...",
            ),
        ] {
            let agent = &mut self.agents[k];
            agent.invite = Some(link);
            agent.state = AgentState::IdleChat;
            agent.activity = Activity::Chat;
            agent.state_until = now + self.config.invite_delay_ms;
            agent.say(line, now, INVITE_BUBBLE_MS);
        }

        self.timers.schedule(
            now + self.config.invite_delay_ms,
            TimerKind::InviteResolution {
                initiator: initiator.clone(),
                initiator_token,
                invitee: invitee.clone(),
                invitee_token,
            },
        );
        debug!(%initiator, %invitee, "game invite sent");
        self.feed.record_social(SocialKind::InviteSent, vec![initiator, invitee], now);
    }

    /// Resolution timer: accept or decline if both sides are still linked
    /// with the tokens captured at send time, abort otherwise.
    pub(super) fn resolve_invite(
        &mut self,
        initiator: &AgentId,
        initiator_token: u64,
        invitee: &AgentId,
        invitee_token: u64,
    ) {
        let (Some(i), Some(j)) = (self.index_of(initiator), self.index_of(invitee)) else {
            return;
        };
        let now = self.now;

        let inviting = match &self.agents[i].invite {
            Some(InviteLink::Inviting { peer, token }) => {
                peer == invitee && *token == initiator_token
            }
            _ => false,
        };
        let invited = match &self.agents[j].invite {
            Some(InviteLink::Invited { peer, token }) => {
                peer == initiator && *token == invitee_token
            }
            _ => false,
        };
        let valid = inviting
            && invited
            && self.agents[i].invite_token == initiator_token
            && self.agents[j].invite_token == invitee_token;

        if !valid {
            debug!(%initiator, %invitee, "invite no longer valid, aborting");
            self.abort_invite(i, invitee);
            self.abort_invite(j, initiator);
            self.feed.record_social(
                SocialKind::InviteCancelled,
                vec![initiator.clone(), invitee.clone()],
                now,
            );
            return;
        }

        self.agents[i].invite = None;
        self.agents[j].invite = None;

        if self.rng.chance(self.config.invite_accept_probability) {
            self.release_spot(i);
            self.release_spot(j);
            let pool = self.layout.pool(Zone::Game);
            match self.spots.reserve_pair(Zone::Game, pool, initiator, invitee) {
                Some((a, b)) => {
                    let dwell = self.config.game_dwell_ms.sample(self.rng.as_mut());
                    self.agents[i].reserved = Some(a.key);
                    self.agents[j].reserved = Some(b.key);
                    self.go_to(i, a.spot, Activity::Game, Some(dwell));
                    self.go_to(j, b.spot, Activity::Game, Some(dwell));
                    self.agents[j].say("Let's go!", now, INVITE_BUBBLE_MS);
                    info!(%initiator, %invitee, "ping-pong game on");
                    self.feed.record_social(
                        SocialKind::InviteAccepted,
                        vec![initiator.clone(), invitee.clone()],
                        now,
                    );
                }
                None => {
                    debug!(%initiator, %invitee, "no free table, invite declined");
                    self.decline_invite(i, j);
                }
            }
        } else {
            self.decline_invite(i, j);
        }
    }

    fn decline_invite(&mut self, i: usize, j: usize) {
        let now = self.now;
        self.agents[j].say("Maybe later", now, INVITE_BUBBLE_MS);
        self.return_to_idle(i);
        self.return_to_idle(j);
        let agents = vec![self.agents[i].id.clone(), self.agents[j].id.clone()];
        self.feed.record_social(SocialKind::InviteDeclined, agents, now);
    }

    /// Undo one side of a dead handshake. Only touches the agent if it is
    /// still linked to `peer`; an agent that moved on is left alone.
    fn abort_invite(&mut self, i: usize, peer: &AgentId) {
        let agent = &mut self.agents[i];
        if agent.invite.as_ref().is_none_or(|link| link.peer() != peer) {
            return;
        }
        agent.invite = None;
        agent.invite_token += 1;
        if agent.state == AgentState::IdleChat {
            self.return_to_idle(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::office::OfficeConfig;
    use crate::office::Window;
    use crate::office::random::ScriptedRandom;

    fn office_with(p: f64) -> Office {
        let config = OfficeConfig {
            meeting_interval_ms: Window::new(10_000_000, 10_000_000),
            invite_accept_probability: p,
            invite_radius: 2_000.0,
            ..OfficeConfig::default()
        };
        Office::with_random(config, Box::new(ScriptedRandom::constant(0.0))).unwrap()
    }

    #[test]
    fn test_invite_links_both_agents() {
        let mut office = office_with(1.0);
        assert!(office.begin_activity("coder", Activity::Game).unwrap());

        let coder = office.agent("coder").unwrap();
        let peer = coder.invite.as_ref().unwrap().peer().clone();
        assert!(matches!(coder.invite, Some(InviteLink::Inviting { .. })));
        let invitee = office.agent(peer.as_str()).unwrap();
        assert!(matches!(
            &invitee.invite,
            Some(InviteLink::Invited { peer, .. }) if peer.as_str() == "coder"
        ));
        assert_eq!(invitee.state, AgentState::IdleChat);
        assert_eq!(office.pending_timers(), 2);
    }

    #[test]
    fn test_accepted_invite_reserves_adjacent_pair() {
        let mut office = office_with(1.0);
        office.begin_activity("coder", Activity::Game).unwrap();
        let peer = office.agent("coder").unwrap().invite.as_ref().unwrap().peer().clone();

        office.run_for(1_600);
        let a = office.spots().held_by(&AgentId::from("coder")).unwrap();
        let b = office.spots().held_by(&peer).unwrap();
        assert_eq!(a.zone, Zone::Game);
        assert_eq!(a.slot / 2, b.slot / 2);
        assert_ne!(a.slot, b.slot);
        assert_eq!(office.agent("coder").unwrap().activity, Activity::Game);
        assert!(office.agent("coder").unwrap().invite.is_none());
    }

    #[test]
    fn test_declined_invite_returns_both_to_desk() {
        let mut office = office_with(0.0);
        office.begin_activity("coder", Activity::Game).unwrap();
        office.run_for(1_600);

        assert!(office.spots().is_empty());
        for agent in office.agents() {
            assert!(agent.invite.is_none());
            assert_eq!(agent.activity, Activity::Desk);
        }
    }
}
