/// Property-based tests for snapshot projection and card hiding
///
/// Random rides are driven through the engine with random guesses, tap-outs,
/// hand-outs and timeouts. After every step the snapshot must not expose the
/// face-down card and its projection must be stable.
use chrono::{TimeDelta, Utc};
use proptest::prelude::*;
use ride_the_bus::{
    GameSettings, Session, SessionSnapshot,
    entities::{Card, Deck, Player, PlayerId, Suit},
    project,
};
use std::collections::{BTreeMap, BTreeSet};

const CHOICES: [&str; 12] = [
    "red", "black", "higher", "lower", "between", "outside", "inside", "hearts", "diamonds",
    "clubs", "spades", "purple",
];

// Strategy to generate a valid card
fn card_strategy() -> impl Strategy<Value = Card> {
    (1u8..=13, 0usize..4).prop_map(|(rank, suit_idx)| Card::new(rank, Suit::ALL[suit_idx]))
}

// Strategy to generate the four cards a ride will deal, no duplicates
fn ride_cards_strategy() -> impl Strategy<Value = Vec<Card>> {
    prop::collection::vec(card_strategy(), 4).prop_filter("Cards must be unique", |cards| {
        let set: BTreeSet<_> = cards.iter().collect();
        set.len() == cards.len()
    })
}

#[derive(Clone, Debug)]
enum Step {
    Guess { player: usize, choice: usize },
    TapOut { player: usize },
    HandOut { player: usize, target: usize },
    Timeout,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        6 => (0usize..5, 0usize..CHOICES.len())
            .prop_map(|(player, choice)| Step::Guess { player, choice }),
        1 => (0usize..5).prop_map(|player| Step::TapOut { player }),
        2 => (0usize..5, 0usize..5).prop_map(|(player, target)| Step::HandOut { player, target }),
        1 => Just(Step::Timeout),
    ]
}

fn new_ride(cards: &[Card], guests: usize) -> (Session, Vec<PlayerId>) {
    let settings = GameSettings::default();
    let host = Player::new(PlayerId::host(), "Host".to_string());
    let host_id = host.id.clone();
    let mut session = Session::new("PROP".to_string(), host, Utc::now());
    let ids: Vec<_> = (0..guests)
        .map(|i| session.join(&format!("p{i}"), None, &settings).unwrap())
        .collect();
    session
        .start_game_with_deck(&host_id, Deck::stacked(cards.to_vec()), Utc::now(), &settings)
        .unwrap();
    (session, ids)
}

fn apply(session: &mut Session, ids: &[PlayerId], step: &Step) {
    let settings = GameSettings::default();
    let now = Utc::now();
    match step {
        Step::Guess { player, choice } => {
            let id = &ids[player % ids.len()];
            let _ = session.submit_guess(id, CHOICES[*choice], None, now, &settings);
        }
        Step::TapOut { player } => {
            let _ = session.request_tap_out(&ids[player % ids.len()]);
        }
        Step::HandOut { player, target } => {
            let giver = &ids[player % ids.len()];
            let target = &ids[target % ids.len()];
            let left = session
                .game
                .give_out_remaining
                .get(giver)
                .copied()
                .unwrap_or(0);
            let _ = session.submit_distribution(giver, &BTreeMap::from([(target.clone(), left)]));
        }
        Step::Timeout => {
            let far_future = now + TimeDelta::hours(1);
            let _ = session.handle_deadline(far_future, &settings);
        }
    }
}

fn assert_hidden(snapshot: &SessionSnapshot, cards: &[Card]) -> Result<(), TestCaseError> {
    let game = &snapshot.game;
    let guessing = game.started && !game.finished && !game.distribution_active;
    let expected = if guessing {
        usize::from(game.round) - 1
    } else {
        usize::from(game.round)
    };
    prop_assert_eq!(game.shared.len(), expected);
    prop_assert_eq!(&game.shared[..], &cards[..expected]);
    Ok(())
}

proptest! {
    #[test]
    fn test_face_down_card_never_in_snapshot(
        cards in ride_cards_strategy(),
        guests in 1usize..5,
        steps in prop::collection::vec(step_strategy(), 0..40),
    ) {
        let (mut session, ids) = new_ride(&cards, guests);
        assert_hidden(&session.snapshot(), &cards)?;
        let mut revealed: Vec<Card> = Vec::new();

        for step in &steps {
            apply(&mut session, &ids, step);
            let snapshot = session.snapshot();
            assert_hidden(&snapshot, &cards)?;

            // Revealed cards only ever grow
            prop_assert!(snapshot.game.shared.starts_with(&revealed));
            revealed = snapshot.game.shared.clone();

            let json = serde_json::to_string(&snapshot).unwrap();
            for card in &cards[snapshot.game.shared.len()..] {
                let needle = serde_json::to_string(card).unwrap();
                prop_assert!(!json.contains(&needle), "{} leaked", card);
            }
        }
    }

    #[test]
    fn test_projection_is_deterministic(
        cards in ride_cards_strategy(),
        guests in 1usize..5,
        steps in prop::collection::vec(step_strategy(), 0..40),
    ) {
        let (mut session, ids) = new_ride(&cards, guests);
        for step in &steps {
            apply(&mut session, &ids, step);
        }

        let snapshot = session.snapshot();
        let view = project(&snapshot);
        prop_assert_eq!(&view, &project(&snapshot));

        // A client that resubscribes gets the same snapshot over the wire
        let wire = serde_json::to_string(&snapshot).unwrap();
        let resynced: SessionSnapshot = serde_json::from_str(&wire).unwrap();
        prop_assert_eq!(&view, &project(&resynced));
        prop_assert_eq!(wire, serde_json::to_string(&resynced).unwrap());
    }

    #[test]
    fn test_invariants_hold_after_every_step(
        cards in ride_cards_strategy(),
        guests in 1usize..5,
        steps in prop::collection::vec(step_strategy(), 0..40),
    ) {
        let (mut session, ids) = new_ride(&cards, guests);
        for step in &steps {
            apply(&mut session, &ids, step);
            prop_assert_eq!(session.game.check_invariants(), Ok(()));
            prop_assert!(!(session.game.finished && session.game.distribution_active));
            prop_assert!(session.game.pending_tap_out.is_subset(&session.game.active_players));
        }
    }
}
