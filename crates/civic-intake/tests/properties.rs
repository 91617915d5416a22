// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Randomised conversations: step order and the photo cap.

use civic_core::{ButtonAction, Command};
use civic_intake::{Step, MAX_PHOTOS};
use civic_test_utils::{TestHarness, INSIDE, OUTSIDE};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Inside,
    Outside,
    Text(usize),
    Category,
    Photo,
    Done,
    Anonymous(bool),
    Confirm,
    StaleRaw,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        1 => Just(Op::Inside),
        1 => Just(Op::Outside),
        1 => (0usize..120).prop_map(Op::Text),
        1 => Just(Op::Category),
        3 => Just(Op::Photo),
        1 => Just(Op::Done),
        1 => any::<bool>().prop_map(Op::Anonymous),
        1 => Just(Op::Confirm),
        1 => Just(Op::StaleRaw),
    ]
}

async fn apply(h: &TestHarness, id: &str, op: &Op) {
    match op {
        Op::Inside => h.location(id, INSIDE).await,
        Op::Outside => h.location(id, OUTSIDE).await,
        Op::Text(len) => h.text(id, &"x".repeat(*len)).await,
        Op::Category => {
            h.press(id, &ButtonAction::Category("1".into())).await;
        }
        Op::Photo => h.photo(id, "p").await,
        Op::Done => h.command(id, Command::Done).await,
        Op::Anonymous(yes) => {
            let action = if *yes {
                ButtonAction::AnonymousYes
            } else {
                ButtonAction::AnonymousNo
            };
            h.press(id, &action).await;
        }
        Op::Confirm => {
            h.press(id, &ButtonAction::ConfirmYes).await;
        }
        Op::StaleRaw => {
            h.press_raw(id, "category_999").await;
        }
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn steps_advance_one_at_a_time_and_photos_stay_capped(
        ops in proptest::collection::vec(op(), 1..60)
    ) {
        runtime().block_on(async {
            let h = TestHarness::new();
            h.link("p");
            h.command("p", Command::NewReport).await;
            let mut previous = Step::Location;

            for op in &ops {
                apply(&h, "p", op).await;
                let Some(session) = h.session("p") else {
                    // Only confirmation ends a conversation here.
                    prop_assert_eq!(previous, Step::Confirm);
                    break;
                };
                let step = session.step();
                prop_assert!(step >= previous, "{} regressed to {}", previous, step);
                prop_assert!(
                    step.number() <= previous.number() + 1,
                    "{} skipped to {}",
                    previous,
                    step
                );
                if let Some(photos) = session.photos() {
                    prop_assert!(photos.len() <= MAX_PHOTOS);
                }
                if matches!(op, Op::Outside) {
                    prop_assert!(step != Step::Title || previous == Step::Title);
                }
                previous = step;
            }
            Ok(())
        })?;
    }
}
