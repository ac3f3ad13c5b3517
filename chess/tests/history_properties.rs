//! Property-based tests for the game store using proptest.

use chess::{GameRules, GameStore, ViewCursor};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Move(usize),
    Prev,
    Next,
    Start,
    Live,
    GoTo(isize),
    Attach(u32),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<usize>().prop_map(Op::Move),
        1 => Just(Op::Prev),
        1 => Just(Op::Next),
        1 => Just(Op::Start),
        1 => Just(Op::Live),
        1 => (-3isize..40).prop_map(Op::GoTo),
        1 => (1u32..30).prop_map(Op::Attach),
    ]
}

fn apply(store: &mut GameStore, op: &Op) {
    match op {
        Op::Move(pick) => {
            let Some(fen) = store.live_position().map(|p| p.fen.clone()) else {
                return;
            };
            let moves = store.rules().candidate_moves(&fen).unwrap();
            if moves.is_empty() {
                return;
            }
            let token = moves[pick % moves.len()].token.clone();
            store.make_move(&token).unwrap();
        }
        Op::Prev => {
            store.view_prev();
        }
        Op::Next => {
            store.view_next();
        }
        Op::Start => {
            store.go_to_start();
        }
        Op::Live => {
            store.go_to_live();
        }
        Op::GoTo(i) => {
            store.go_to_move(*i);
        }
        Op::Attach(depth) => {
            store.attach_search_info_to_last_move(chess::SearchInfo {
                depth: *depth,
                ..Default::default()
            });
        }
    }
}

proptest! {
    /// Property: replaying the full history always reproduces the live position.
    #[test]
    fn prop_replay_matches_live(picks in prop::collection::vec(any::<usize>(), 0..40)) {
        let mut store = GameStore::standard();
        store.init();

        for pick in picks {
            apply(&mut store, &Op::Move(pick));
            let live = store.live_position().unwrap().fen.clone();
            let replayed = store.replay(ViewCursor::live(store.history().len())).unwrap();
            prop_assert_eq!(replayed, live);
            prop_assert!(store.is_viewing_live());
        }
    }

    /// Property: the cursor stays in bounds and the viewed position is the replay up to it,
    /// while the live position is never disturbed by navigation.
    #[test]
    fn prop_cursor_in_bounds(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let mut store = GameStore::standard();
        store.init();

        for op in &ops {
            let history_before = store.history().len();
            let live_before = store.live_position().unwrap().fen.clone();

            apply(&mut store, op);

            let len = store.history().len() as isize;
            let cursor = store.cursor().value();
            prop_assert!((-1..len).contains(&cursor) || (len == 0 && cursor == -1));
            prop_assert_eq!(store.viewed_fen(), store.replay(store.cursor()).unwrap());

            if !matches!(op, Op::Move(_)) {
                prop_assert_eq!(store.history().len(), history_before);
                prop_assert_eq!(&store.live_position().unwrap().fen, &live_before);
            }
        }
    }

    /// Property: attaching search info only ever changes the final entry.
    #[test]
    fn prop_attach_only_touches_last(picks in prop::collection::vec(any::<usize>(), 1..20), depth in 1u32..50) {
        let mut store = GameStore::standard();
        store.init();
        for pick in picks {
            apply(&mut store, &Op::Move(pick));
        }
        let before = store.history().to_vec();
        let attached = store.attach_search_info_to_last_move(chess::SearchInfo {
            depth,
            ..Default::default()
        });
        let after = store.history();

        prop_assert_eq!(attached, !before.is_empty());
        prop_assert_eq!(before.len(), after.len());
        if let Some((last, rest)) = after.split_last() {
            prop_assert_eq!(rest, &before[..before.len() - 1]);
            prop_assert_eq!(last.search.as_ref().map(|s| s.depth), Some(depth));
            prop_assert_eq!(&last.token, &before[before.len() - 1].token);
        }
    }
}
