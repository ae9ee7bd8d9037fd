//! Property tests for ordering, lane layout and index/remove symmetry.

use std::collections::BTreeSet;

use calendar_index::range::{RangeManager, MAX_LANES, MAX_LANE_DURATION_DAYS};
use calendar_index::{DateKey, Document, IndexService, RangeRecord};
use proptest::prelude::*;

fn base() -> DateKey {
    DateKey::from_ymd(2024, 2, 20).unwrap()
}

fn day(offset: i64) -> DateKey {
    base().add_days(offset).unwrap()
}

/// (start offset, inclusive length) pairs inside a six-week window.
fn spans() -> impl Strategy<Value = Vec<(i64, i64)>> {
    prop::collection::vec((0i64..35, 1i64..9), 0..14)
}

fn build_ranges(spans: &[(i64, i64)]) -> RangeManager {
    let mut mgr = RangeManager::new();
    for (i, (start, len)) in spans.iter().enumerate() {
        let record = RangeRecord::new(format!("r{i}.md"), format!("r{i}"), day(*start), day(start + len - 1))
            .unwrap();
        mgr.add_range(record);
    }
    mgr
}

#[derive(Debug, Clone)]
enum Facet {
    Point(i64),
    Range(i64, i64),
    Task(i64, Option<i64>),
}

fn facet() -> impl Strategy<Value = Facet> {
    prop_oneof![
        (0i64..20).prop_map(Facet::Point),
        (0i64..20, 1i64..8).prop_map(|(s, l)| Facet::Range(s, l)),
        (0i64..20, prop::option::of(0i64..20)).prop_map(|(s, d)| Facet::Task(s, d)),
    ]
}

fn to_document(path: &str, facet: &Facet) -> Document {
    let doc = Document::new(path);
    match facet {
        Facet::Point(d) => doc.with("date", day(*d).to_string()),
        Facet::Range(s, l) => doc
            .with("dateStart", day(*s).to_string())
            .with("dateEnd", day(s + l - 1).to_string()),
        Facet::Task(s, due) => {
            let doc = doc.with("tags", "task").with("scheduled", day(*s).to_string());
            match due {
                Some(d) => doc.with("due", day(*d).to_string()),
                None => doc,
            }
        }
    }
}

fn snapshot(index: &IndexService) -> Vec<serde_json::Value> {
    (-2..32)
        .map(|offset| serde_json::to_value(index.get_day(day(offset))).unwrap())
        .collect()
}

proptest! {
    #[test]
    fn prop_string_order_matches_chronology(a in 0i64..3_000_000, b in 0i64..3_000_000) {
        let first = DateKey::from_ymd(1, 1, 1).unwrap();
        let (x, y) = (first.add_days(a).unwrap(), first.add_days(b).unwrap());
        prop_assert_eq!(x.cmp(&y), x.to_string().cmp(&y.to_string()));
    }

    #[test]
    fn prop_lanes_never_collide(spans in spans()) {
        let mgr = build_ranges(&spans);
        for offset in 0..45 {
            let date = day(offset);
            let lanes = mgr.get_lane_assignments(date);
            let distinct: BTreeSet<u8> = lanes.values().copied().collect();
            prop_assert_eq!(distinct.len(), lanes.len(), "collision on {}", date);
            prop_assert!(lanes.values().all(|lane| *lane < MAX_LANES));

            let slots = mgr.get_range_slots(date);
            for (path, lane) in &slots {
                prop_assert_eq!(lanes.get(path), Some(lane));
            }
        }
    }

    #[test]
    fn prop_long_ranges_never_hold_a_lane(spans in spans()) {
        let mgr = build_ranges(&spans);
        for offset in 0..45 {
            let date = day(offset);
            for path in mgr.get_lane_assignments(date).keys() {
                let range = mgr.get_range(path).unwrap();
                prop_assert!(range.duration_days() <= MAX_LANE_DURATION_DAYS);
            }
        }
    }

    #[test]
    fn prop_every_active_range_is_drawn_or_counted(spans in spans()) {
        let mgr = build_ranges(&spans);
        for offset in 0..45 {
            let date = day(offset);
            let active: BTreeSet<String> =
                mgr.get_ranges_for_date(date).into_iter().map(|r| r.path.clone()).collect();
            let mut shown: BTreeSet<String> = mgr.get_range_slots(date).into_keys().collect();
            shown.extend(mgr.get_overflow(date));
            prop_assert_eq!(active, shown);
        }
    }

    #[test]
    fn prop_index_then_remove_restores_state(
        existing in prop::collection::vec(facet(), 0..6),
        added in facet(),
    ) {
        let mut index = IndexService::default();
        for (i, f) in existing.iter().enumerate() {
            index.index_file(&to_document(&format!("doc{i}.md"), f));
        }
        let before = snapshot(&index);

        index.index_file(&to_document("added.md", &added));
        index.remove_file("added.md");

        prop_assert_eq!(snapshot(&index), before);
    }
}
