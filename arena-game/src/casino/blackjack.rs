//! Blackjack: `betting -> dealing -> player turn -> dealer turn -> resolved`.

use serde::{Deserialize, Serialize};

use super::{CasinoConfig, CasinoGame, CasinoSettlement, settle, validate_bet};
use crate::error::{GameResult, StateError};
use crate::numbers::{floor_f64_to_u64, usize_to_f64};
use crate::player::Player;
use crate::rng::RandomSource;

const BUST_THRESHOLD: u32 = 21;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    pub const ALL: [Self; 4] = [Self::Clubs, Self::Diamonds, Self::Hearts, Self::Spades];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Self; 13] = [
        Self::Two,
        Self::Three,
        Self::Four,
        Self::Five,
        Self::Six,
        Self::Seven,
        Self::Eight,
        Self::Nine,
        Self::Ten,
        Self::Jack,
        Self::Queen,
        Self::King,
        Self::Ace,
    ];

    /// Face value; aces count 11 here and are reduced by [`hand_value`].
    #[must_use]
    pub const fn value(self) -> u32 {
        match self {
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            Self::Eight => 8,
            Self::Nine => 9,
            Self::Ten | Self::Jack | Self::Queen | Self::King => 10,
            Self::Ace => 11,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    #[must_use]
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }
}

/// Best total for a hand, counting aces as 1 where 11 would bust.
#[must_use]
pub fn hand_value(cards: &[Card]) -> u32 {
    let mut total: u32 = cards.iter().map(|card| card.rank.value()).sum();
    let mut soft_aces = cards.iter().filter(|card| card.rank == Rank::Ace).count();
    while total > BUST_THRESHOLD && soft_aces > 0 {
        total -= 10;
        soft_aces -= 1;
    }
    total
}

/// Standard 52-card deck drawn from the end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// Unshuffled deck in suit-major order.
    #[must_use]
    pub fn standard() -> Self {
        let cards = Suit::ALL
            .iter()
            .flat_map(|suit| Rank::ALL.iter().map(move |rank| Card::new(*rank, *suit)))
            .collect();
        Self { cards }
    }

    /// Fisher-Yates shuffle of a fresh deck.
    pub fn shuffled(rng: &mut impl RandomSource) -> Self {
        let mut deck = Self::standard();
        for i in (1..deck.cards.len()).rev() {
            let bound = usize_to_f64(i + 1);
            let j = usize::try_from(floor_f64_to_u64(rng.uniform() * bound))
                .unwrap_or(i)
                .min(i);
            deck.cards.swap(i, j);
        }
        deck
    }

    /// Deck with a known draw order; the first card is drawn first.
    #[must_use]
    pub fn stacked(mut draw_order: Vec<Card>) -> Self {
        draw_order.reverse();
        Self { cards: draw_order }
    }

    /// # Errors
    ///
    /// `DeckExhausted` when no cards remain.
    pub fn draw(&mut self) -> GameResult<Card> {
        self.cards.pop().ok_or_else(|| StateError::DeckExhausted.into())
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.cards.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlackjackResult {
    PlayerBust,
    DealerBust,
    PlayerHigher,
    DealerHigher,
    Push,
}

impl BlackjackResult {
    /// Gross payout for `bet`: a win pays double, a push returns the bet.
    #[must_use]
    pub const fn payout(self, bet: u64) -> u64 {
        match self {
            Self::DealerBust | Self::PlayerHigher => bet.saturating_mul(2),
            Self::Push => bet,
            Self::PlayerBust | Self::DealerHigher => 0,
        }
    }

    #[must_use]
    pub const fn player_won(self) -> bool {
        matches!(self, Self::DealerBust | Self::PlayerHigher)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlackjackPhase {
    Betting,
    PlayerTurn,
    DealerTurn,
    Resolved(BlackjackResult),
}

impl BlackjackPhase {
    const fn label(self) -> &'static str {
        match self {
            Self::Betting => "betting",
            Self::PlayerTurn => "on the player turn",
            Self::DealerTurn => "on the dealer turn",
            Self::Resolved(_) => "resolved",
        }
    }
}

/// One blackjack round. The dealing step runs inside [`BlackjackRound::deal`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackjackRound {
    bet: u64,
    dealer_stand: u32,
    phase: BlackjackPhase,
    deck: Deck,
    player_hand: Vec<Card>,
    dealer_hand: Vec<Card>,
    settled: bool,
}

impl BlackjackRound {
    /// Open a round after validating the bet against the player's gold.
    ///
    /// # Errors
    ///
    /// Bet validation errors.
    pub fn open(bet: u64, player: &Player, cfg: &CasinoConfig) -> GameResult<Self> {
        validate_bet(bet, player, cfg)?;
        Ok(Self {
            bet,
            dealer_stand: cfg.dealer_stand,
            phase: BlackjackPhase::Betting,
            deck: Deck::standard(),
            player_hand: Vec::new(),
            dealer_hand: Vec::new(),
            settled: false,
        })
    }

    #[must_use]
    pub const fn bet(&self) -> u64 {
        self.bet
    }

    #[must_use]
    pub const fn phase(&self) -> BlackjackPhase {
        self.phase
    }

    #[must_use]
    pub fn player_hand(&self) -> &[Card] {
        &self.player_hand
    }

    #[must_use]
    pub fn dealer_hand(&self) -> &[Card] {
        &self.dealer_hand
    }

    #[must_use]
    pub fn player_total(&self) -> u32 {
        hand_value(&self.player_hand)
    }

    #[must_use]
    pub fn dealer_total(&self) -> u32 {
        hand_value(&self.dealer_hand)
    }

    /// The dealer's face-up card while the player is deciding.
    #[must_use]
    pub fn dealer_upcard(&self) -> Option<&Card> {
        self.dealer_hand.first()
    }

    fn invalid(&self, action: &'static str) -> crate::error::GameError {
        StateError::InvalidTransition {
            phase: self.phase.label(),
            action,
        }
        .into()
    }

    /// Shuffle a fresh deck and deal two cards to the player, then two to
    /// the dealer.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside `betting`.
    pub fn deal(&mut self, rng: &mut impl RandomSource) -> GameResult<()> {
        self.deal_from(Deck::shuffled(rng))
    }

    /// Deal from a caller-supplied deck.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside `betting`, `DeckExhausted` on a short deck.
    pub fn deal_from(&mut self, deck: Deck) -> GameResult<()> {
        if self.phase != BlackjackPhase::Betting {
            return Err(self.invalid("deal"));
        }
        let mut deck = deck;
        let player_hand = vec![deck.draw()?, deck.draw()?];
        let dealer_hand = vec![deck.draw()?, deck.draw()?];
        self.deck = deck;
        self.player_hand = player_hand;
        self.dealer_hand = dealer_hand;
        self.phase = BlackjackPhase::PlayerTurn;
        Ok(())
    }

    /// Draw a card for the player; going over 21 loses immediately.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside the player turn.
    pub fn hit(&mut self) -> GameResult<Card> {
        if self.phase != BlackjackPhase::PlayerTurn {
            return Err(self.invalid("hit"));
        }
        let card = self.deck.draw()?;
        self.player_hand.push(card);
        if self.player_total() > BUST_THRESHOLD {
            self.phase = BlackjackPhase::Resolved(BlackjackResult::PlayerBust);
        }
        Ok(card)
    }

    /// End the player turn: the dealer draws below the stand total, then
    /// totals are compared. An exhausted deck ends the dealer's draw early.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside the player turn.
    pub fn stand(&mut self) -> GameResult<BlackjackResult> {
        if self.phase != BlackjackPhase::PlayerTurn {
            return Err(self.invalid("stand"));
        }
        self.phase = BlackjackPhase::DealerTurn;
        while self.dealer_total() < self.dealer_stand {
            let Ok(card) = self.deck.draw() else {
                break;
            };
            self.dealer_hand.push(card);
        }
        let player = self.player_total();
        let dealer = self.dealer_total();
        let result = if dealer > BUST_THRESHOLD {
            BlackjackResult::DealerBust
        } else if player > dealer {
            BlackjackResult::PlayerHigher
        } else if player == dealer {
            BlackjackResult::Push
        } else {
            BlackjackResult::DealerHigher
        };
        self.phase = BlackjackPhase::Resolved(result);
        Ok(result)
    }

    /// Move gold for a resolved round. Only the net result touches the player.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` before resolution, `RoundSettled` on repeat,
    /// `InsufficientResource` if the player no longer covers the bet.
    pub fn settle(&mut self, player: &mut Player) -> GameResult<CasinoSettlement> {
        let BlackjackPhase::Resolved(result) = self.phase else {
            return Err(self.invalid("settle"));
        };
        if self.settled {
            return Err(StateError::RoundSettled.into());
        }
        let settlement = settle(player, CasinoGame::Blackjack, self.bet, result.payout(self.bet))?;
        self.settled = true;
        Ok(settlement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GameError;
    use crate::player::PlayerId;
    use crate::rng::{RngSource, ScriptedSource};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    fn card(rank: Rank) -> Card {
        Card::new(rank, Suit::Spades)
    }

    fn rich_player() -> Player {
        let mut player = Player::new(PlayerId::new(1), "dealer-bait").unwrap();
        player.gold = 1_000;
        player
    }

    #[test]
    fn aces_reduce_to_avoid_bust() {
        assert_eq!(hand_value(&[card(Rank::Ace), card(Rank::King)]), 21);
        assert_eq!(
            hand_value(&[card(Rank::Ace), card(Rank::Ace), card(Rank::Nine)]),
            21
        );
        assert_eq!(hand_value(&[card(Rank::Ace), card(Rank::Ace)]), 12);
        assert_eq!(
            hand_value(&[card(Rank::King), card(Rank::Queen), card(Rank::Two)]),
            22
        );
    }

    #[test]
    fn shuffled_deck_is_a_permutation() {
        let mut rng = RngSource::new(ChaCha8Rng::seed_from_u64(11));
        let mut deck = Deck::shuffled(&mut rng);
        assert_eq!(deck.remaining(), 52);
        let mut seen = HashSet::new();
        while let Ok(card) = deck.draw() {
            assert!(seen.insert(card));
        }
        assert_eq!(seen.len(), 52);
        assert_eq!(deck.draw(), Err(GameError::InvalidState(StateError::DeckExhausted)));
    }

    #[test]
    fn shuffle_with_constant_draws_stays_valid() {
        let deck = Deck::shuffled(&mut ScriptedSource::constant(0.999));
        assert_eq!(deck.remaining(), 52);
    }

    #[test]
    fn player_bust_on_hit_loses_bet() {
        let mut player = rich_player();
        let mut round = BlackjackRound::open(100, &player, &CasinoConfig::default()).unwrap();
        round
            .deal_from(Deck::stacked(vec![
                card(Rank::King),
                card(Rank::Six),
                card(Rank::Nine),
                card(Rank::Eight),
                card(Rank::Queen),
            ]))
            .unwrap();
        assert_eq!(round.player_total(), 16);
        round.hit().unwrap();
        assert_eq!(
            round.phase(),
            BlackjackPhase::Resolved(BlackjackResult::PlayerBust)
        );
        assert!(round.stand().is_err());
        let settlement = round.settle(&mut player).unwrap();
        assert_eq!(settlement.net, -100);
        assert_eq!(player.gold, 900);
        assert_eq!(
            round.settle(&mut player),
            Err(GameError::InvalidState(StateError::RoundSettled))
        );
    }

    #[test]
    fn dealer_draws_to_seventeen_and_busts() {
        let mut player = rich_player();
        let mut round = BlackjackRound::open(200, &player, &CasinoConfig::default()).unwrap();
        round
            .deal_from(Deck::stacked(vec![
                card(Rank::Ten),
                card(Rank::Eight),
                card(Rank::Ten),
                card(Rank::Six),
                card(Rank::Nine),
            ]))
            .unwrap();
        assert_eq!(round.dealer_upcard(), Some(&card(Rank::Ten)));
        let result = round.stand().unwrap();
        assert_eq!(result, BlackjackResult::DealerBust);
        assert_eq!(round.dealer_hand().len(), 3);
        let settlement = round.settle(&mut player).unwrap();
        assert_eq!(settlement.payout, 400);
        assert_eq!(player.gold, 1_200);
    }

    #[test]
    fn equal_totals_push() {
        let mut player = rich_player();
        let mut round = BlackjackRound::open(50, &player, &CasinoConfig::default()).unwrap();
        round
            .deal_from(Deck::stacked(vec![
                card(Rank::Ten),
                card(Rank::Eight),
                card(Rank::Nine),
                card(Rank::Nine),
            ]))
            .unwrap();
        assert_eq!(round.stand().unwrap(), BlackjackResult::Push);
        assert_eq!(round.settle(&mut player).unwrap().net, 0);
        assert_eq!(player.gold, 1_000);
    }

    #[test]
    fn dealer_higher_wins() {
        let mut player = rich_player();
        let mut round = BlackjackRound::open(50, &player, &CasinoConfig::default()).unwrap();
        round
            .deal_from(Deck::stacked(vec![
                card(Rank::Ten),
                card(Rank::Seven),
                card(Rank::Ten),
                card(Rank::Nine),
            ]))
            .unwrap();
        assert_eq!(round.stand().unwrap(), BlackjackResult::DealerHigher);
        assert_eq!(round.settle(&mut player).unwrap().net, -50);
    }

    #[test]
    fn short_deck_resolves_on_current_totals() {
        let mut player = rich_player();
        let mut round = BlackjackRound::open(50, &player, &CasinoConfig::default()).unwrap();
        round
            .deal_from(Deck::stacked(vec![
                card(Rank::Ten),
                card(Rank::Eight),
                card(Rank::Ten),
                card(Rank::Six),
            ]))
            .unwrap();
        assert_eq!(round.stand().unwrap(), BlackjackResult::PlayerHigher);
        assert_eq!(round.dealer_hand().len(), 2);
        assert_eq!(
            round.phase(),
            BlackjackPhase::Resolved(BlackjackResult::PlayerHigher)
        );
        assert_eq!(round.settle(&mut player).unwrap().net, 50);
    }

    #[test]
    fn actions_out_of_order_are_rejected() {
        let player = rich_player();
        let mut round = BlackjackRound::open(50, &player, &CasinoConfig::default()).unwrap();
        assert!(round.hit().is_err());
        assert!(round.stand().is_err());
        let mut rng = ScriptedSource::new(vec![0.3, 0.6, 0.1]);
        round.deal(&mut rng).unwrap();
        assert!(round.deal(&mut rng).is_err());
        assert_eq!(round.player_hand().len(), 2);
        assert_eq!(round.dealer_hand().len(), 2);
    }
}
