//! Case-solving card game.
//!
//! A group works through a shuffled sequence of cases. Every case assigns the
//! five card roles round-robin across the roster, rotated by the case index so
//! responsibilities move between members. The team solves a case by playing
//! four cards whose code matches the case id; a wrong board grants one retry
//! before the case fails.

use std::sync::Arc;

use rand::seq::SliceRandom;
use serde::Serialize;

use crate::{
    dao::{
        broker_store::BrokerStore,
        models::{
            CaseEntity, CaseMemberEntity, CaseRole, CaseSummaryEntity, MemberEntity,
            PlayedCardEntity, SlotState, SummaryState,
        },
    },
    error::{DomainError, ServiceError},
};

/// Case codes, which double as the winning card codes.
pub const CASES: [&str; 5] = ["john", "natalia", "hermes", "santiago", "nairobi"];

/// Matching cards required to pass a case.
const REQUIRED_MATCHES: usize = 4;
/// A case fails after this many attempts.
const MAX_ATTEMPTS: u8 = 2;

/// Resolution of [`CaseGame::end_current_case`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseOutcome {
    /// Enough matching cards: the case passed and the next one activated.
    Passed,
    /// Board was wrong on the first attempt; the team may retry the same case.
    Retry,
    /// Board was wrong on the last attempt; the case failed and the next one activated.
    Failed,
}

/// Snapshot returned to clients on `gamestate`.
#[derive(Debug, Clone, Serialize)]
pub struct CasesStateView {
    pub state: SummaryState,
    /// Number of passed cases.
    pub points: usize,
    pub cases: Vec<CaseEntity>,
    /// Cards on the board of the active case, if any.
    pub playedcards: Vec<PlayedCardEntity>,
}

/// Case-game engine bound to one group summary.
pub struct CaseGame {
    store: Arc<dyn BrokerStore>,
    summary: CaseSummaryEntity,
}

impl CaseGame {
    /// Load the summary for a group, creating and persisting a fresh one on
    /// first access.
    pub async fn load(
        store: Arc<dyn BrokerStore>,
        groupid: i64,
        members: &[MemberEntity],
    ) -> Result<Self, ServiceError> {
        let summary = match store.find_case_summary(groupid).await? {
            Some(summary) => summary,
            None => {
                let summary = Self::initial_summary(groupid, members);
                store.save_case_summary(summary.clone()).await?;
                summary
            }
        };
        Ok(Self { store, summary })
    }

    /// Build a fresh summary: shuffled case order, first case active, roles
    /// rotated per case.
    fn initial_summary(groupid: i64, members: &[MemberEntity]) -> CaseSummaryEntity {
        let mut order: Vec<&str> = CASES.to_vec();
        order.shuffle(&mut rand::rng());

        let cases = order
            .iter()
            .enumerate()
            .map(|(index, code)| CaseEntity {
                id: (*code).to_string(),
                state: if index == 0 {
                    SlotState::Active
                } else {
                    SlotState::Locked
                },
                attempt: 1,
                lastattempt: 0,
                team: Self::assign_roles(members, index),
            })
            .collect();

        CaseSummaryEntity {
            groupid,
            state: SummaryState::Active,
            cases,
        }
    }

    /// Distribute the five roles over the roster, rotated by the case index so
    /// the same member does not keep the same role across cases.
    fn assign_roles(members: &[MemberEntity], case_index: usize) -> Vec<CaseMemberEntity> {
        let mut team: Vec<CaseMemberEntity> = members
            .iter()
            .map(|member| CaseMemberEntity {
                id: member.id,
                name: member.name.clone(),
                roles: Vec::new(),
            })
            .collect();

        if team.is_empty() {
            return team;
        }

        for (role_index, role) in CaseRole::ALL.iter().enumerate() {
            let member_index = (case_index + role_index) % team.len();
            team[member_index].roles.push(*role);
        }

        team
    }

    /// The persisted summary.
    pub fn summary(&self) -> &CaseSummaryEntity {
        &self.summary
    }

    /// The case currently being solved, if the game has not ended.
    pub fn current_case(&self) -> Option<&CaseEntity> {
        self.summary
            .cases
            .iter()
            .find(|case| case.state == SlotState::Active)
    }

    fn current_case_required(&self) -> Result<&CaseEntity, ServiceError> {
        self.current_case()
            .ok_or_else(|| ServiceError::NotFound("no active case".to_owned()))
    }

    /// Place or replace a card on the active case's board.
    pub async fn play_card(
        &mut self,
        userid: i64,
        cardtype: &str,
        cardcode: &str,
        now: i64,
    ) -> Result<PlayedCardEntity, ServiceError> {
        if !CASES.contains(&cardcode) {
            return Err(DomainError::InvalidCardCode.into());
        }
        let role = CaseRole::parse(cardtype).ok_or(DomainError::InvalidCardType)?;

        let current = self.current_case_required()?;
        let member = current
            .team
            .iter()
            .find(|member| member.id == userid)
            .ok_or(DomainError::UserNotInGroup)?;
        if !member.roles.contains(&role) {
            return Err(DomainError::TypeNotAllowed.into());
        }

        let card = PlayedCardEntity {
            groupid: self.summary.groupid,
            userid,
            caseid: current.id.clone(),
            attempt: current.attempt,
            cardtype: role,
            cardcode: cardcode.to_owned(),
            timemodify: now,
        };
        self.store.upsert_played_card(card.clone()).await?;
        Ok(card)
    }

    /// Take a card of the given type off the active case's board.
    pub async fn unplay_card(&mut self, cardtype: &str) -> Result<(), ServiceError> {
        let role = CaseRole::parse(cardtype).ok_or(DomainError::InvalidCardType)?;
        let current = self.current_case_required()?;

        let removed = self
            .store
            .delete_played_card(
                self.summary.groupid,
                current.id.clone(),
                current.attempt,
                role,
            )
            .await?;
        if !removed {
            return Err(DomainError::CardNotPlayed.into());
        }
        Ok(())
    }

    /// Resolve the active case's board and advance the game.
    pub async fn end_current_case(&mut self, now: i64) -> Result<CaseOutcome, ServiceError> {
        let (case_id, attempt) = {
            let current = self.current_case_required()?;
            (current.id.clone(), current.attempt)
        };

        let cards = self
            .store
            .find_played_cards(self.summary.groupid, case_id.clone(), attempt)
            .await?;
        let points = cards
            .iter()
            .filter(|card| card.cardcode == case_id)
            .count();

        let outcome = {
            let current = self
                .summary
                .cases
                .iter_mut()
                .find(|case| case.id == case_id)
                .ok_or_else(|| ServiceError::Internal("active case vanished".to_owned()))?;
            current.lastattempt = now;

            if points >= REQUIRED_MATCHES {
                current.state = SlotState::Passed;
                CaseOutcome::Passed
            } else if current.attempt < MAX_ATTEMPTS {
                current.attempt += 1;
                CaseOutcome::Retry
            } else {
                current.state = SlotState::Failed;
                CaseOutcome::Failed
            }
        };

        if outcome != CaseOutcome::Retry {
            self.activate_next();
        }
        self.store.save_case_summary(self.summary.clone()).await?;
        Ok(outcome)
    }

    /// Unlock the next case, or end the game when none remain.
    fn activate_next(&mut self) {
        match self
            .summary
            .cases
            .iter_mut()
            .find(|case| case.state == SlotState::Locked)
        {
            Some(next) => next.state = SlotState::Active,
            None => self.summary.state = SummaryState::Ended,
        }
    }

    /// Snapshot for the `gamestate` payload.
    pub async fn state(&self) -> Result<CasesStateView, ServiceError> {
        let playedcards = match self.current_case() {
            Some(current) => {
                self.store
                    .find_played_cards(self.summary.groupid, current.id.clone(), current.attempt)
                    .await?
            }
            None => Vec::new(),
        };

        Ok(CasesStateView {
            state: self.summary.state,
            points: self
                .summary
                .cases
                .iter()
                .filter(|case| case.state == SlotState::Passed)
                .count(),
            cases: self.summary.cases.clone(),
            playedcards,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::broker_store::memory::MemoryStore;

    fn roster(n: i64) -> Vec<MemberEntity> {
        (1..=n)
            .map(|id| MemberEntity {
                id,
                name: format!("member {id}"),
            })
            .collect()
    }

    async fn game_with(members: &[MemberEntity]) -> (Arc<MemoryStore>, CaseGame) {
        let store = Arc::new(MemoryStore::new());
        let game = CaseGame::load(store.clone(), 1, members).await.unwrap();
        (store, game)
    }

    /// Play a full matching board for the current case.
    async fn play_winning_board(game: &mut CaseGame) {
        let current = game.current_case().unwrap().clone();
        let plays: Vec<(i64, CaseRole)> = current
            .team
            .iter()
            .flat_map(|member| member.roles.iter().map(|role| (member.id, *role)))
            .take(REQUIRED_MATCHES)
            .collect();
        for (userid, role) in plays {
            game.play_card(userid, role.as_str(), &current.id, 50)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn fresh_summary_has_one_active_case_and_all_roles() {
        let (_, game) = game_with(&roster(3)).await;
        let summary = game.summary();

        let active = summary
            .cases
            .iter()
            .filter(|c| c.state == SlotState::Active)
            .count();
        assert_eq!(active, 1);
        assert_eq!(summary.cases.len(), CASES.len());

        for case in &summary.cases {
            let mut roles: Vec<CaseRole> =
                case.team.iter().flat_map(|m| m.roles.clone()).collect();
            roles.sort_by_key(|r| r.as_str());
            let mut all = CaseRole::ALL.to_vec();
            all.sort_by_key(|r| r.as_str());
            assert_eq!(roles, all);
        }
    }

    #[tokio::test]
    async fn roles_rotate_between_cases() {
        let (_, game) = game_with(&roster(5)).await;
        let cases = &game.summary().cases;
        let first_planner = cases[0].team.iter().position(|m| m.roles.contains(&CaseRole::Planner));
        let second_planner = cases[1].team.iter().position(|m| m.roles.contains(&CaseRole::Planner));
        assert_ne!(first_planner, second_planner);
    }

    #[tokio::test]
    async fn play_card_rejects_wrong_role() {
        let (_, mut game) = game_with(&roster(5)).await;
        let current = game.current_case().unwrap().clone();
        let planner = current
            .team
            .iter()
            .find(|m| m.roles.contains(&CaseRole::Planner))
            .unwrap();
        let err = game
            .play_card(planner.id, "tech", &current.id, 10)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::TypeNotAllowed)
        ));
    }

    #[tokio::test]
    async fn play_card_rejects_unknown_code_and_type() {
        let (_, mut game) = game_with(&roster(2)).await;
        let err = game.play_card(1, "tech", "nosuchcase", 10).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::InvalidCardCode)
        ));

        let current_id = game.current_case().unwrap().id.clone();
        let err = game.play_card(1, "wizard", &current_id, 10).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::InvalidCardType)
        ));
    }

    #[tokio::test]
    async fn winning_board_passes_case_and_activates_next() {
        let (_, mut game) = game_with(&roster(4)).await;
        let first_id = game.current_case().unwrap().id.clone();

        play_winning_board(&mut game).await;
        let outcome = game.end_current_case(100).await.unwrap();

        assert_eq!(outcome, CaseOutcome::Passed);
        let summary = game.summary();
        let first = summary.cases.iter().find(|c| c.id == first_id).unwrap();
        assert_eq!(first.state, SlotState::Passed);
        assert_eq!(first.lastattempt, 100);
        assert!(game.current_case().is_some());
    }

    #[tokio::test]
    async fn wrong_board_grants_one_retry_then_fails() {
        let (_, mut game) = game_with(&roster(4)).await;
        let first_id = game.current_case().unwrap().id.clone();

        let outcome = game.end_current_case(100).await.unwrap();
        assert_eq!(outcome, CaseOutcome::Retry);
        assert_eq!(game.current_case().unwrap().id, first_id);
        assert_eq!(game.current_case().unwrap().attempt, 2);

        let outcome = game.end_current_case(200).await.unwrap();
        assert_eq!(outcome, CaseOutcome::Failed);
        let failed = game
            .summary()
            .cases
            .iter()
            .find(|c| c.id == first_id)
            .unwrap();
        assert_eq!(failed.state, SlotState::Failed);
        assert_ne!(game.current_case().map(|c| c.id.clone()), Some(first_id));
    }

    #[tokio::test]
    async fn retry_starts_with_an_empty_board() {
        let (_, mut game) = game_with(&roster(4)).await;
        play_winning_board(&mut game).await;
        // Overwrite one card with a wrong code so the board misses a match.
        let current = game.current_case().unwrap().clone();
        let member = current.team.iter().find(|m| !m.roles.is_empty()).unwrap();
        let wrong = CASES.iter().find(|c| **c != current.id).unwrap();
        game.play_card(member.id, member.roles[0].as_str(), wrong, 60)
            .await
            .unwrap();

        game.end_current_case(100).await.unwrap();
        let view = game.state().await.unwrap();
        assert!(view.playedcards.is_empty());
    }

    #[tokio::test]
    async fn exhausting_all_cases_ends_the_game() {
        let (_, mut game) = game_with(&roster(4)).await;
        for _ in 0..CASES.len() {
            // Fail both attempts of every case.
            game.end_current_case(10).await.unwrap();
            game.end_current_case(20).await.unwrap();
        }
        assert_eq!(game.summary().state, SummaryState::Ended);
        assert!(game.current_case().is_none());
        assert!(matches!(
            game.end_current_case(30).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn unplay_card_requires_a_played_card() {
        let (_, mut game) = game_with(&roster(4)).await;
        let err = game.unplay_card("tech").await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::CardNotPlayed)
        ));

        let current = game.current_case().unwrap().clone();
        let techie = current
            .team
            .iter()
            .find(|m| m.roles.contains(&CaseRole::Tech))
            .unwrap();
        game.play_card(techie.id, "tech", &current.id, 10)
            .await
            .unwrap();
        game.unplay_card("tech").await.unwrap();
        let view = game.state().await.unwrap();
        assert!(view.playedcards.is_empty());
    }

    #[tokio::test]
    async fn state_counts_passed_cases_as_points() {
        let (_, mut game) = game_with(&roster(4)).await;
        play_winning_board(&mut game).await;
        game.end_current_case(100).await.unwrap();

        let view = game.state().await.unwrap();
        assert_eq!(view.points, 1);
        assert_eq!(view.state, SummaryState::Active);
    }

    #[tokio::test]
    async fn summary_round_trips_through_store() {
        let members = roster(3);
        let store = Arc::new(MemoryStore::new());
        let game = CaseGame::load(store.clone(), 7, &members).await.unwrap();
        let original = game.summary().clone();

        let reloaded = CaseGame::load(store, 7, &members).await.unwrap();
        let loaded = reloaded.summary();
        assert_eq!(loaded.groupid, original.groupid);
        let ids: Vec<&String> = loaded.cases.iter().map(|c| &c.id).collect();
        let original_ids: Vec<&String> = original.cases.iter().map(|c| &c.id).collect();
        assert_eq!(ids, original_ids);
    }
}
