use clue_core::belief::Location;
use clue_core::error::{ClueError, Conflict};
use clue_core::game::{ClueGameManager, Outcome, SuggestionEvent};
use clue_core::model::card::Card;
use clue_core::model::category::Category;
use clue_core::model::player::PlayerId;
use clue_core::model::universe::CardUniverse;
use std::collections::BTreeMap;

const YOU: PlayerId = PlayerId(0);
const ALICE: PlayerId = PlayerId(1);
const BOB: PlayerId = PlayerId(2);

fn card(name: &str) -> Card {
    CardUniverse::standard()
        .card(name)
        .unwrap_or_else(|| panic!("unknown card {name}"))
}

fn cards(names: [&str; 3]) -> [Card; 3] {
    names.map(card)
}

fn three_player_game(my_hand: &[&str]) -> ClueGameManager {
    let players = vec!["You".to_string(), "Alice".to_string(), "Bob".to_string()];
    let sizes: BTreeMap<String, usize> = players.iter().map(|name| (name.clone(), 6)).collect();
    let hand = my_hand.iter().map(|name| card(name)).collect();
    ClueGameManager::new_game(players, sizes, hand).unwrap()
}

fn assert_consistent(game: &ClueGameManager) {
    for distribution in game.envelope_distribution() {
        assert!(
            (distribution.sum() - 1.0).abs() < 1e-9,
            "{} sums to {}",
            distribution.category,
            distribution.sum()
        );
    }
    for card in game.universe().cards() {
        let total = game.total_mass(card);
        assert!((total - 1.0).abs() < 1e-9, "{card} has total mass {total}");
    }
}

#[test]
fn nobody_refuting_pins_the_envelope() {
    let mut game = three_player_game(&[]);
    let suggested = cards(["Scarlett", "Pipe", "Study"]);
    let event = SuggestionEvent::new(YOU, suggested)
        .passed(ALICE)
        .passed(BOB);
    game.record_suggestion(event).unwrap();

    for category in Category::ALL {
        for (card, prob) in game.category_distribution(category).iter() {
            let expected = if suggested.contains(card) { 1.0 } else { 0.0 };
            assert_eq!(*prob, expected, "{card}");
        }
    }
    for card in suggested {
        assert_eq!(game.known_cards().location(card), Some(Location::Envelope));
        assert_eq!(game.player_probability(ALICE, card).unwrap(), 0.0);
    }
    assert_eq!(
        game.suggestions()[0].outcome,
        Outcome::NoRefutation
    );
    assert!(game.envelope_solution().is_some());
    assert_consistent(&game);
}

#[test]
fn unseen_refutation_discounts_suggested_cards() {
    let mut game = three_player_game(&[]);
    let event = SuggestionEvent::new(YOU, cards(["Scarlett", "Pipe", "Study"])).refuted(ALICE, None);
    let snapshot = game.record_suggestion(event).unwrap();

    let scarlett = game.envelope_probability(card("Scarlett"));
    assert!((scarlett - 0.1374).abs() < 1e-3, "scarlett = {scarlett}");
    for other in ["Mustard", "White", "Green", "Peacock", "Plum"] {
        let prob = game.envelope_probability(card(other));
        assert!((prob - 0.1725).abs() < 1e-3, "{other} = {prob}");
    }
    assert_eq!(
        snapshot.envelope_probability("Miss Scarlett"),
        Some(scarlett)
    );
    assert!(
        game.player_probability(ALICE, card("Scarlett")).unwrap()
            > game.player_probability(BOB, card("Scarlett")).unwrap()
    );
    assert_consistent(&game);
}

#[test]
fn frequent_refuter_never_outgrows_their_hand() {
    let mut game = three_player_game(&[]);
    let universe = CardUniverse::standard();
    let suspects: Vec<Card> = universe.cards_in(Category::Suspect).collect();
    let weapons: Vec<Card> = universe.cards_in(Category::Weapon).collect();
    let rooms: Vec<Card> = universe.cards_in(Category::Room).collect();
    for round in 0..36 {
        let suggested = [suspects[round % 6], weapons[round % 4], rooms[round % 5]];
        let event = SuggestionEvent::new(YOU, suggested).refuted(ALICE, None);
        game.record_suggestion(event).unwrap();
    }

    for player in [YOU, ALICE, BOB] {
        let belief = game.player_belief(player).unwrap();
        let expected = belief.expected_cards();
        assert!(expected <= 6.0 + 1e-6, "{player} expects {expected} cards");
    }
    let alice = game.most_likely_cards(ALICE, 6).unwrap();
    assert_eq!(alice.len(), 6);
    assert!(alice.iter().all(|(card, _)| {
        game.refutation_count(ALICE, *card) > 0
    }));
    assert!(game.high_probability_cards(ALICE, 0.99).unwrap().is_empty());
    assert_consistent(&game);
}

#[test]
fn contradiction_leaves_previous_state_intact() {
    let mut game = three_player_game(&[]);
    let first = SuggestionEvent::new(YOU, cards(["Scarlett", "Pipe", "Study"]))
        .passed(ALICE)
        .passed(BOB);
    game.record_suggestion(first).unwrap();
    let before = game.snapshot();

    let second = SuggestionEvent::new(YOU, cards(["Scarlett", "Rope", "Hall"]))
        .refuted(ALICE, Some(card("Scarlett")));
    let err = game.record_suggestion(second).unwrap_err();
    assert!(matches!(
        err,
        ClueError::ConstraintViolation {
            conflict: Conflict::TwoLocations { .. }
        }
    ));
    let message = err.describe(game.universe(), game.roster());
    assert!(message.contains("Miss Scarlett"), "{message}");

    assert_eq!(game.snapshot(), before);
    assert_eq!(game.suggestions().len(), 1);
    assert_eq!(game.envelope_probability(card("Scarlett")), 1.0);
}

#[test]
fn malformed_event_is_rejected_before_any_update() {
    let mut game = three_player_game(&[]);
    let before = game.snapshot();
    let event = SuggestionEvent::new(ALICE, cards(["Scarlett", "Pipe", "Study"]))
        .passed(BOB)
        .passed(BOB);
    let err = game.record_suggestion(event).unwrap_err();
    assert!(matches!(err, ClueError::InvalidEvent { .. }), "{err}");
    assert_eq!(game.snapshot(), before);
}

#[test]
fn repeating_known_facts_changes_nothing() {
    let mut game = three_player_game(&[]);
    let suggested = cards(["Plum", "Rope", "Hall"]);
    let event = SuggestionEvent::new(YOU, suggested)
        .passed(ALICE)
        .refuted(BOB, Some(card("Hall")));
    game.record_suggestion(event.clone()).unwrap();
    let envelope = game.envelope_distribution();
    let alice = game.player_belief(ALICE).unwrap();

    game.record_suggestion(event).unwrap();
    assert_eq!(game.envelope_distribution(), envelope);
    assert_eq!(game.player_belief(ALICE).unwrap(), alice);
    assert_eq!(game.suggestions().len(), 2);
}

#[test]
fn local_hand_is_located_immediately() {
    let game = three_player_game(&["Plum", "Rope", "Hall"]);
    for name in ["Plum", "Rope", "Hall"] {
        let card = card(name);
        assert_eq!(game.envelope_probability(card), 0.0);
        assert_eq!(game.player_probability(YOU, card).unwrap(), 1.0);
        assert_eq!(game.player_probability(ALICE, card).unwrap(), 0.0);
        assert_eq!(game.player_probability(BOB, card).unwrap(), 0.0);
        assert_eq!(game.known_cards().location(card), Some(Location::Player(YOU)));
    }
    let belief = game.player_belief(BOB).unwrap();
    assert!(belief.known_not_has.contains(&card("Plum")));
    assert_consistent(&game);
}

#[test]
fn full_local_hand_rules_out_everything_else() {
    let game = three_player_game(&["Plum", "Rope", "Hall", "Green", "Dagger", "Kitchen"]);
    let belief = game.player_belief(YOU).unwrap();
    assert_eq!(belief.known_has.len(), 6);
    assert_eq!(belief.known_not_has.len(), 15);
    assert!((belief.expected_cards() - 6.0).abs() < 1e-9);
    assert_consistent(&game);
}

#[test]
fn seen_card_moves_into_the_refuters_hand() {
    let mut game = three_player_game(&[]);
    let event = SuggestionEvent::new(YOU, cards(["Green", "Wrench", "Lounge"]))
        .refuted(ALICE, Some(card("Wrench")));
    game.record_suggestion(event).unwrap();
    assert_eq!(game.player_probability(ALICE, card("Wrench")).unwrap(), 1.0);
    assert_eq!(game.envelope_probability(card("Wrench")), 0.0);
    assert_eq!(
        game.known_cards().location(card("Wrench")),
        Some(Location::Player(ALICE))
    );
    assert_consistent(&game);
}

#[test]
fn refutation_clause_resolves_once_two_cards_are_excluded() {
    let mut game = three_player_game(&[]);
    let suggested = cards(["Peacock", "Candlestick", "Library"]);
    let ambiguous = SuggestionEvent::new(BOB, suggested)
        .passed(YOU)
        .refuted(ALICE, None);
    game.record_suggestion(ambiguous).unwrap();
    assert_eq!(game.refutation_clauses(ALICE), vec![suggested]);
    assert_eq!(game.refutation_count(ALICE, card("Library")), 1);

    let pass = SuggestionEvent::new(YOU, cards(["Peacock", "Rope", "Hall"]))
        .passed(ALICE)
        .refuted(BOB, None);
    game.record_suggestion(pass).unwrap();
    assert!(!game.known_cards().contains(card("Library")));

    let pass = SuggestionEvent::new(YOU, cards(["Mustard", "Candlestick", "Kitchen"]))
        .passed(ALICE)
        .refuted(BOB, None);
    game.record_suggestion(pass).unwrap();
    assert_eq!(
        game.known_cards().location(card("Library")),
        Some(Location::Player(ALICE))
    );
    assert_eq!(game.envelope_probability(card("Library")), 0.0);
    assert_consistent(&game);
}

#[test]
fn two_player_game_solves_after_one_unrefuted_suggestion() {
    let players = vec!["You".to_string(), "Rival".to_string()];
    let sizes: BTreeMap<String, usize> = players.iter().map(|name| (name.clone(), 9)).collect();
    let hand = [
        "Mustard",
        "White",
        "Green",
        "Candlestick",
        "Dagger",
        "Kitchen",
        "Ballroom",
        "Conservatory",
        "Dining Room",
    ]
    .iter()
    .map(|name| card(name))
    .collect();
    let mut game = ClueGameManager::new_game(players, sizes, hand).unwrap();
    assert!(!game.is_solved());

    let event = SuggestionEvent::new(YOU, cards(["Scarlett", "Pipe", "Study"])).passed(PlayerId(1));
    let snapshot = game.record_suggestion(event).unwrap();

    assert!(game.is_solved());
    assert!(snapshot.solved);
    let solution = game.solution().unwrap();
    assert_eq!(solution.cards(), cards(["Scarlett", "Pipe", "Study"]));
    assert_eq!(game.known_cards().len(), 21);
    assert_eq!(
        game.player_belief(PlayerId(1)).unwrap().known_has.len(),
        9
    );
    assert!(game.is_solution_confident(0.99));
    assert!(!game.is_solution_confident(1.0));
    assert!(game.metrics().envelope_entropy().abs() < 1e-12);
}
