//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use crate::pricing::{estimate, Quality, Service};
use crate::tree::{parse_tree, ChoiceOption, ConversationTree, BUNDLED_TREE};
use proptest::prelude::*;
use std::collections::BTreeMap;

// ============================================================================
// Test Helpers
// ============================================================================

fn tree() -> ConversationTree {
    parse_tree(BUNDLED_TREE).expect("bundled tree parses")
}

/// Drive pending pacer ticks until the machine stops scheduling.
fn settle(tree: &ConversationTree, mut session: ChatSession) -> ChatSession {
    let ctx = ChatContext::default();
    for _ in 0..64 {
        let seq = match &session.phase {
            Phase::Typing { seq, .. }
            | Phase::Delivering { seq, .. }
            | Phase::Concluding { seq, .. } => *seq,
            _ => return session,
        };
        let r = transition(&session, tree, &ctx, Event::PacerElapsed { seq })
            .expect("pacer ticks never error");
        session = r.session;
    }
    session
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_service() -> impl Strategy<Value = Service> {
    prop_oneof![
        Just(Service::WindowsDoors),
        Just(Service::Facades),
        Just(Service::Railings),
        Just(Service::Brises),
    ]
}

fn arb_quality() -> impl Strategy<Value = Quality> {
    prop_oneof![
        Just(Quality::Standard),
        Just(Quality::Premium),
        Just(Quality::Luxury),
    ]
}

fn arb_event(tree: &ConversationTree) -> impl Strategy<Value = Event> {
    let targets: Vec<String> = tree.node_ids().map(String::from).collect();
    prop_oneof![
        Just(Event::Started),
        Just(Event::Opened),
        Just(Event::Closed),
        Just(Event::Reset),
        (0u64..32).prop_map(|seq| Event::PacerElapsed { seq }),
        ("[A-Za-z ]{1,12}", prop::sample::select(targets))
            .prop_map(|(label, target)| Event::OptionSelected { label, target }),
        "[a-z0-9 ]{0,16}".prop_map(|text| Event::TextSubmitted { text }),
        (
            "[a-z]{1,8}\\.(png|exe)",
            0u64..20_000_000,
            prop::sample::select(vec![
                "image/png".to_string(),
                "image/jpeg".to_string(),
                "application/pdf".to_string(),
                "text/html".to_string(),
            ]),
        )
            .prop_map(|(name, size_bytes, mime_type)| Event::FileSubmitted {
                name,
                size_bytes,
                mime_type,
            }),
    ]
}

// ============================================================================
// Estimator Properties
// ============================================================================

proptest! {
    /// More area never costs less, for every service/quality pair.
    #[test]
    fn estimate_total_monotonic_in_area(
        service in arb_service(),
        quality in arb_quality(),
        area in 1.0f64..500.0,
        bump in 1.0f64..100.0,
    ) {
        let small = estimate(service, area, quality).unwrap();
        let large = estimate(service, area + bump, quality).unwrap();
        prop_assert!(large.total >= small.total);
        prop_assert!(large.estimated_days >= small.estimated_days);
    }

    /// Higher finish tiers never undercut lower ones at the same area.
    #[test]
    fn estimate_total_ordered_by_quality(
        service in arb_service(),
        area in 1.0f64..500.0,
    ) {
        let standard = estimate(service, area, Quality::Standard).unwrap();
        let premium = estimate(service, area, Quality::Premium).unwrap();
        let luxury = estimate(service, area, Quality::Luxury).unwrap();
        prop_assert!(standard.total < premium.total);
        prop_assert!(premium.total < luxury.total);
    }

    /// Component costs always add up under the fixed margin.
    #[test]
    fn estimate_components_consistent(
        service in arb_service(),
        quality in arb_quality(),
        area in 0.5f64..1000.0,
    ) {
        let e = estimate(service, area, quality).unwrap();
        let expected = (e.material_cost + e.labor_cost) * 1.25;
        prop_assert!((e.total - expected).abs() < 1e-6);
        prop_assert!(e.estimated_days >= 1);
    }
}

// ============================================================================
// Option Ranking Properties
// ============================================================================

proptest! {
    /// Ranking permutes, never invents or drops, and orders by count.
    #[test]
    fn rank_options_is_an_ordered_permutation(
        labels in prop::collection::vec("[a-z]{1,6}", 1..8),
        counts in prop::collection::vec(0u32..50, 1..8),
    ) {
        let options: Vec<ChoiceOption> = labels
            .iter()
            .enumerate()
            .map(|(i, l)| ChoiceOption {
                label: l.clone(),
                target: format!("node_{i}"),
                icon: None,
                value: None,
            })
            .collect();
        let click_counts: BTreeMap<String, u32> = counts
            .iter()
            .enumerate()
            .map(|(i, c)| (format!("node_{i}"), *c))
            .collect();

        let ranked = rank_options(&options, &click_counts);
        prop_assert_eq!(ranked.len(), options.len());

        let count_of = |o: &ChoiceOption| click_counts.get(&o.target).copied().unwrap_or(0);
        for pair in ranked.windows(2) {
            prop_assert!(count_of(&pair[0]) >= count_of(&pair[1]));
        }

        // Ties keep tree order: equal-count neighbors preserve their
        // original relative position.
        let index_of = |o: &ChoiceOption| {
            options.iter().position(|x| x.target == o.target).unwrap()
        };
        for pair in ranked.windows(2) {
            if count_of(&pair[0]) == count_of(&pair[1]) {
                prop_assert!(index_of(&pair[0]) < index_of(&pair[1]));
            }
        }
    }
}

// ============================================================================
// Event Sequence Properties
// ============================================================================

proptest! {
    /// No event sequence panics, and the session always stays on a phase
    /// consistent with its position in the tree.
    #[test]
    fn arbitrary_event_sequences_never_panic(
        events in prop::collection::vec(arb_event(&tree()), 0..30),
    ) {
        let tree = tree();
        let ctx = ChatContext::default();
        let mut session = ChatSession::fresh("start");
        let r = transition(&session, &tree, &ctx, Event::Started).unwrap();
        session = r.session;

        for event in events {
            match transition(&session, &tree, &ctx, event) {
                Ok(r) => session = r.session,
                // Rejections leave the session untouched by contract.
                Err(_) => {}
            }
            prop_assert!(
                !session.current_node_id.is_empty(),
                "session always points at a node id"
            );
        }
    }

    /// Reset always lands on a fresh session at the entry node, no matter
    /// how tangled the prior history was.
    #[test]
    fn reset_always_restores_entry(
        events in prop::collection::vec(arb_event(&tree()), 0..20),
    ) {
        let tree = tree();
        let ctx = ChatContext::default();
        let mut session = ChatSession::fresh("start");

        for event in events {
            if let Ok(r) = transition(&session, &tree, &ctx, event) {
                session = r.session;
            }
        }

        let r = transition(&session, &tree, &ctx, Event::Reset).unwrap();
        let session = settle(&tree, r.session);
        prop_assert_eq!(session.current_node_id.as_str(), "main_menu");
        prop_assert!(session.collected_data.is_empty());
        prop_assert!(session.history.len() <= 1);
        prop_assert!(session.context.click_counts.is_empty());
    }

    /// Delivered messages are append-only under pacing: ticking never
    /// rewrites or removes what was already shown.
    #[test]
    fn pacing_is_append_only(seed_ticks in 0usize..6) {
        let tree = tree();
        let ctx = ChatContext::default();
        let mut session = ChatSession::fresh("start");
        let r = transition(&session, &tree, &ctx, Event::Started).unwrap();
        session = r.session;

        let mut seen: Vec<Option<String>> = Vec::new();
        let mut ticks = 0usize;
        while session.phase.is_paced() && ticks < 32 {
            let seq = match &session.phase {
                Phase::Typing { seq, .. }
                | Phase::Delivering { seq, .. }
                | Phase::Concluding { seq, .. } => *seq,
                _ => unreachable!(),
            };
            // Interleave stale ticks; they must not disturb delivery.
            if ticks == seed_ticks {
                let r = transition(&session, &tree, &ctx, Event::PacerElapsed { seq: seq + 100 })
                    .unwrap();
                session = r.session;
            }
            let r = transition(&session, &tree, &ctx, Event::PacerElapsed { seq }).unwrap();
            session = r.session;

            let texts: Vec<Option<String>> =
                session.messages.iter().map(|m| m.text.clone()).collect();
            prop_assert!(texts.len() >= seen.len());
            prop_assert_eq!(&texts[..seen.len()], &seen[..]);
            seen = texts;
            ticks += 1;
        }
        prop_assert_eq!(session.phase, Phase::AwaitingOption);
    }
}
