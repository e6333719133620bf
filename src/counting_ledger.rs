// src/counting_ledger.rs
//
// Running in/out tallies per class plus the full ordered event log behind
// them. Purely additive for the life of a session.

use crate::crossing_engine::CrossingEvent;
use crate::geometry::FlowDirection;
use crate::types::ClassLabel;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct DirectionTally {
    counts: HashMap<ClassLabel, u64>,
    events: HashMap<ClassLabel, Vec<CrossingEvent>>,
    /// Classes in the order they were first counted
    order: Vec<ClassLabel>,
}

#[derive(Debug, Default)]
pub struct CountingLedger {
    inbound: DirectionTally,
    outbound: DirectionTally,
}

impl CountingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn tally(&self, direction: FlowDirection) -> &DirectionTally {
        match direction {
            FlowDirection::In => &self.inbound,
            FlowDirection::Out => &self.outbound,
        }
    }

    pub fn record(&mut self, event: CrossingEvent) {
        let tally = match event.direction {
            FlowDirection::In => &mut self.inbound,
            FlowDirection::Out => &mut self.outbound,
        };
        let class = event.class_label.clone();
        if !tally.counts.contains_key(&class) {
            tally.order.push(class.clone());
        }
        *tally.counts.entry(class.clone()).or_insert(0) += 1;
        tally.events.entry(class).or_default().push(event);
    }

    pub fn count(&self, class_label: &ClassLabel, direction: FlowDirection) -> u64 {
        self.tally(direction)
            .counts
            .get(class_label)
            .copied()
            .unwrap_or(0)
    }

    /// Events in arrival order.
    pub fn events_for(&self, class_label: &ClassLabel, direction: FlowDirection) -> &[CrossingEvent] {
        self.tally(direction)
            .events
            .get(class_label)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn totals(&self, direction: FlowDirection) -> u64 {
        self.tally(direction).counts.values().sum()
    }

    /// `(class, count)` pairs in first-counted order.
    pub fn classes(&self, direction: FlowDirection) -> Vec<(ClassLabel, u64)> {
        let tally = self.tally(direction);
        tally
            .order
            .iter()
            .map(|class| (class.clone(), tally.counts[class]))
            .collect()
    }

    pub fn summary(&self) -> LedgerSummary {
        let side = |direction: FlowDirection| -> Vec<ClassCount> {
            self.classes(direction)
                .into_iter()
                .map(|(class, count)| ClassCount {
                    class_label: class.to_string(),
                    count,
                })
                .collect()
        };
        LedgerSummary {
            total_in: self.totals(FlowDirection::In),
            total_out: self.totals(FlowDirection::Out),
            entering: side(FlowDirection::In),
            leaving: side(FlowDirection::Out),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassCount {
    pub class_label: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerSummary {
    pub total_in: u64,
    pub total_out: u64,
    pub entering: Vec<ClassCount>,
    pub leaving: Vec<ClassCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(track_id: u32, class: ClassLabel, direction: FlowDirection, frame_id: u64) -> CrossingEvent {
        CrossingEvent {
            track_id,
            speed_kmh: 40,
            direction,
            lane_index: 1,
            class_label: class,
            frame_id,
            timestamp_ms: frame_id as f64 * 33.3,
            against_flow: false,
        }
    }

    #[test]
    fn test_counts_per_class_and_direction() {
        let mut ledger = CountingLedger::new();
        ledger.record(event(1, ClassLabel::Car, FlowDirection::In, 1));
        ledger.record(event(2, ClassLabel::Car, FlowDirection::In, 2));
        ledger.record(event(3, ClassLabel::Bus, FlowDirection::Out, 3));

        assert_eq!(ledger.count(&ClassLabel::Car, FlowDirection::In), 2);
        assert_eq!(ledger.count(&ClassLabel::Car, FlowDirection::Out), 0);
        assert_eq!(ledger.count(&ClassLabel::Bus, FlowDirection::Out), 1);
        assert_eq!(ledger.totals(FlowDirection::In), 2);
        assert_eq!(ledger.count(&ClassLabel::Truck, FlowDirection::In), 0);
    }

    #[test]
    fn test_events_keep_arrival_order_without_dedup() {
        let mut ledger = CountingLedger::new();
        ledger.record(event(9, ClassLabel::Truck, FlowDirection::Out, 5));
        ledger.record(event(4, ClassLabel::Truck, FlowDirection::Out, 6));
        ledger.record(event(9, ClassLabel::Truck, FlowDirection::Out, 7));

        let ids: Vec<u32> = ledger
            .events_for(&ClassLabel::Truck, FlowDirection::Out)
            .iter()
            .map(|e| e.track_id)
            .collect();
        assert_eq!(ids, vec![9, 4, 9]);
        assert!(ledger.events_for(&ClassLabel::Truck, FlowDirection::In).is_empty());
    }

    #[test]
    fn test_summary_lists_classes_in_first_seen_order() {
        let mut ledger = CountingLedger::new();
        ledger.record(event(1, ClassLabel::Motorcycle, FlowDirection::In, 1));
        ledger.record(event(2, ClassLabel::Car, FlowDirection::In, 2));
        ledger.record(event(3, ClassLabel::Motorcycle, FlowDirection::In, 3));

        let summary = ledger.summary();
        assert_eq!(summary.total_in, 3);
        assert_eq!(summary.total_out, 0);
        let names: Vec<&str> = summary.entering.iter().map(|c| c.class_label.as_str()).collect();
        assert_eq!(names, vec!["motorcycle", "car"]);
        assert_eq!(summary.entering[0].count, 2);
    }
}
