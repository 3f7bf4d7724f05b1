use core_state::{History, Recall};
use proptest::prelude::*;

fn cps(s: &str) -> Vec<char> {
    s.chars().collect()
}

proptest! {
    #[test]
    fn recall_walk_restores_draft(
        lines in prop::collection::vec("[a-z]{1,6}", 1..8),
        draft in "[a-z ]{0,6}",
    ) {
        let mut h = History::new();
        for l in &lines {
            h.begin_read();
            h.commit(&cps(l));
            h.set_recall(false);
        }
        h.begin_read();
        let n = h.len();
        let mut shown = cps(&draft);
        for _ in 0..n - 1 {
            if let Some(e) = h.recall(Recall::Older, &shown) {
                shown = e;
            }
            h.set_recall(true);
        }
        for _ in 0..n - 1 {
            if let Some(e) = h.recall(Recall::Newer, &shown) {
                shown = e;
            }
            h.set_recall(true);
        }
        // A draft equal to the newest entry collapses into it, which shows the same text.
        prop_assert_eq!(shown, cps(&draft));
    }

    #[test]
    fn distinct_draft_survives_a_recall_round_trip(
        lines in prop::collection::vec("[a-z]{1,6}", 1..8),
        draft in "[A-Z]{1,6}",
    ) {
        let mut h = History::new();
        for l in &lines {
            h.begin_read();
            h.commit(&cps(l));
            h.set_recall(false);
        }
        h.begin_read();
        let older = h.recall(Recall::Older, &cps(&draft));
        prop_assert_eq!(older, Some(cps(lines.last().unwrap())));
        h.set_recall(true);
        let back = h.recall(Recall::Newer, &cps(lines.last().unwrap()));
        prop_assert_eq!(back, Some(cps(&draft)));
    }

    #[test]
    fn consecutive_duplicates_never_stored(lines in prop::collection::vec("[ab]{1,2}", 0..20)) {
        let mut h = History::new();
        for l in &lines {
            h.push(&cps(l));
        }
        let texts: Vec<String> = h.iter_text().collect();
        prop_assert!(texts.windows(2).all(|w| w[0] != w[1]));
    }
}
