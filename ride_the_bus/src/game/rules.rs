//! Guess resolution.
//!
//! Each rule only looks at cards that have been turned over. `revealed` must
//! contain at least as many cards as the round number being judged, with the
//! judged card last among them.

use super::entities::{Card, Guess, RoundKind};

/// Whether `guess` is right for the card that resolves round `kind`. Returns
/// `false` for guesses outside the round's domain or if too few cards are known.
pub fn is_correct(kind: RoundKind, revealed: &[Card], guess: Guess) -> bool {
    let idx = usize::from(kind.round()) - 1;
    let Some(card) = revealed.get(idx) else {
        return false;
    };
    match (kind, guess) {
        (RoundKind::RedBlack, Guess::Red) => card.suit.is_red(),
        (RoundKind::RedBlack, Guess::Black) => !card.suit.is_red(),
        (RoundKind::HigherLower, Guess::Higher) => card.rank > revealed[0].rank,
        (RoundKind::HigherLower, Guess::Lower) => card.rank < revealed[0].rank,
        (RoundKind::BetweenOutside, Guess::Between | Guess::Outside) => {
            let (low, high) = bounds(revealed[0], revealed[1]);
            let between = low < card.rank && card.rank < high;
            if guess == Guess::Between {
                between
            } else {
                !between
            }
        }
        (RoundKind::Suit, Guess::Suit(suit)) => card.suit == suit,
        _ => false,
    }
}

fn bounds(a: Card, b: Card) -> (u8, u8) {
    (a.rank.min(b.rank), a.rank.max(b.rank))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Suit;

    fn c(rank: u8, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    #[test]
    fn test_red_black() {
        let cards = [c(7, Suit::Heart)];
        assert!(is_correct(RoundKind::RedBlack, &cards, Guess::Red));
        assert!(!is_correct(RoundKind::RedBlack, &cards, Guess::Black));
        let cards = [c(2, Suit::Club)];
        assert!(is_correct(RoundKind::RedBlack, &cards, Guess::Black));
    }

    #[test]
    fn test_higher_lower() {
        let cards = [c(7, Suit::Heart), c(10, Suit::Spade)];
        assert!(is_correct(RoundKind::HigherLower, &cards, Guess::Higher));
        assert!(!is_correct(RoundKind::HigherLower, &cards, Guess::Lower));
    }

    #[test]
    fn test_higher_lower_tie_loses_both_ways() {
        let cards = [c(9, Suit::Heart), c(9, Suit::Club)];
        assert!(!is_correct(RoundKind::HigherLower, &cards, Guess::Higher));
        assert!(!is_correct(RoundKind::HigherLower, &cards, Guess::Lower));
    }

    #[test]
    fn test_between_outside() {
        let cards = [c(7, Suit::Heart), c(10, Suit::Spade), c(3, Suit::Diamond)];
        assert!(!is_correct(RoundKind::BetweenOutside, &cards, Guess::Between));
        assert!(is_correct(RoundKind::BetweenOutside, &cards, Guess::Outside));

        let cards = [c(10, Suit::Heart), c(7, Suit::Spade), c(8, Suit::Diamond)];
        assert!(is_correct(RoundKind::BetweenOutside, &cards, Guess::Between));
    }

    #[test]
    fn test_between_outside_edges_count_as_outside() {
        let cards = [c(7, Suit::Heart), c(10, Suit::Spade), c(10, Suit::Diamond)];
        assert!(is_correct(RoundKind::BetweenOutside, &cards, Guess::Outside));
        assert!(!is_correct(RoundKind::BetweenOutside, &cards, Guess::Between));
    }

    #[test]
    fn test_between_outside_pair_is_always_outside() {
        let cards = [c(5, Suit::Heart), c(5, Suit::Spade), c(5, Suit::Diamond)];
        assert!(is_correct(RoundKind::BetweenOutside, &cards, Guess::Outside));
        let cards = [c(5, Suit::Heart), c(5, Suit::Spade), c(12, Suit::Diamond)];
        assert!(is_correct(RoundKind::BetweenOutside, &cards, Guess::Outside));
    }

    #[test]
    fn test_suit() {
        let cards = [
            c(7, Suit::Heart),
            c(10, Suit::Spade),
            c(3, Suit::Diamond),
            c(12, Suit::Club),
        ];
        assert!(is_correct(RoundKind::Suit, &cards, Guess::Suit(Suit::Club)));
        assert!(!is_correct(RoundKind::Suit, &cards, Guess::Suit(Suit::Heart)));
    }

    #[test]
    fn test_unknown_card_is_never_correct() {
        let cards = [c(7, Suit::Heart)];
        assert!(!is_correct(RoundKind::HigherLower, &cards, Guess::Higher));
        assert!(!is_correct(RoundKind::HigherLower, &cards, Guess::Lower));
    }

    #[test]
    fn test_out_of_domain_guess_is_incorrect() {
        let cards = [c(7, Suit::Heart)];
        assert!(!is_correct(RoundKind::RedBlack, &cards, Guess::Suit(Suit::Heart)));
    }
}
