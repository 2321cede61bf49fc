#![no_main]

//! Session fuzzer.
//!
//! Plays arbitrary action sequences against the built-in content:
//! placing, dragging, merging, tapping, opening chests, selling, buying,
//! completing gates and saving/restoring. After every action the engine
//! invariants must hold, and no action may fail with anything other than
//! the documented data errors for ids or cells that do not exist.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mergeboard::content::{default_catalog, default_config};
use mergeboard::{Coord, EngineError, GameSession, ItemId, ManualClock};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// A fuzzer-generated player action.
#[derive(Arbitrary, Debug, Clone)]
enum Action {
    Place { type_index: u8, x: u8, y: u8 },
    Drop { item: u8, x: u8, y: u8 },
    Merge { source: u8, target: u8 },
    Tap { item: u8 },
    OpenChest { item: u8 },
    Sell { item: u8 },
    Buy { offer: u8 },
    CompleteGate { gate: u8 },
    Wait { seconds: u16 },
    SaveAndRestore,
}

/// Structured input for session fuzzing.
#[derive(Arbitrary, Debug)]
struct SessionInput {
    seed: u64,
    actions: Vec<Action>,
}

fn pick<C: mergeboard::Clock>(session: &GameSession<C, StdRng>, index: u8) -> Option<ItemId> {
    let ids: Vec<ItemId> = session.board().iter().map(|item| item.id).collect();
    if ids.is_empty() {
        None
    } else {
        Some(ids[usize::from(index) % ids.len()])
    }
}

/// Errors an action may legitimately return for bad coordinates.
fn expected(err: &EngineError) -> bool {
    matches!(err, EngineError::Grid(_) | EngineError::EmptyCell(_))
}

fuzz_target!(|input: SessionInput| {
    let (Ok(catalog), Ok(config)) = (default_catalog(), default_config()) else {
        return;
    };
    let types: Vec<_> = catalog.iter().map(|def| def.id.clone()).collect();
    let clock = ManualClock::new(1_700_000_000_000);
    let Ok(mut session) = GameSession::new(
        catalog.clone(),
        config.clone(),
        &clock,
        StdRng::seed_from_u64(input.seed),
    ) else {
        return;
    };

    for action in input.actions.into_iter().take(300) {
        let result = match action {
            Action::Place { type_index, x, y } => {
                let item_type = &types[usize::from(type_index) % types.len()];
                session
                    .place(item_type, Coord::new(u16::from(x % 10), u16::from(y % 10)))
                    .map(drop)
            }
            Action::Drop { item, x, y } => match pick(&session, item) {
                Some(id) => session
                    .drop_item(id, Coord::new(u16::from(x % 10), u16::from(y % 10)))
                    .map(drop),
                None => Ok(()),
            },
            Action::Merge { source, target } => {
                match (pick(&session, source), pick(&session, target)) {
                    (Some(a), Some(b)) => session.try_merge(a, b).map(drop),
                    _ => Ok(()),
                }
            }
            Action::Tap { item } => match pick(&session, item) {
                Some(id) => session.tap(id).map(drop),
                None => Ok(()),
            },
            Action::OpenChest { item } => match pick(&session, item) {
                Some(id) => session.open_chest(id).map(drop),
                None => Ok(()),
            },
            Action::Sell { item } => match pick(&session, item) {
                Some(id) => session.sell(id).map(drop),
                None => Ok(()),
            },
            Action::Buy { offer } => {
                let index = usize::from(offer) % config.shop.len().max(1);
                session.purchase(index).map(drop)
            }
            Action::CompleteGate { gate } => match config.gates.get(usize::from(gate) % 4) {
                Some(gate) => session.complete_gate(&gate.id).map(drop),
                None => Ok(()),
            },
            Action::Wait { seconds } => {
                clock.advance(u64::from(seconds) * 1_000);
                session.regenerate_energy();
                Ok(())
            }
            Action::SaveAndRestore => {
                let snapshot = session.snapshot();
                let json = snapshot.to_json().map_err(|e| e.to_string());
                let reloaded = json.and_then(|json| {
                    mergeboard::Snapshot::from_json(&json).map_err(|e| e.to_string())
                });
                assert_eq!(reloaded.as_ref(), Ok(&snapshot), "snapshot JSON round-trip");
                match GameSession::restore(
                    snapshot.clone(),
                    catalog.clone(),
                    config.clone(),
                    &clock,
                    StdRng::seed_from_u64(input.seed),
                ) {
                    Ok(restored) => {
                        assert_eq!(restored.snapshot(), snapshot, "restore changed state");
                        session = restored;
                    }
                    Err(e) => panic!("restore of a live session failed: {e}"),
                }
                Ok(())
            }
        };

        if let Err(e) = result {
            assert!(expected(&e), "unexpected engine error: {e}");
        }

        let violations = session.check_invariants();
        assert!(violations.is_empty(), "invariants violated: {violations:?}");
    }
});
