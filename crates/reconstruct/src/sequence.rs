//! Page sequence extraction and revisit counting.

use std::collections::HashMap;

use engine_core::{EventType, LoopVisit, PageVisit};

use crate::sort::SortedEvents;

/// Page views in visit order. Page views without a URL are skipped.
pub fn page_sequence(events: &SortedEvents) -> Vec<PageVisit> {
    events
        .iter()
        .filter(|e| e.event_type == EventType::PageView)
        .filter_map(|e| {
            e.page_url.as_ref().map(|url| PageVisit {
                url: url.clone(),
                timestamp: e.at,
            })
        })
        .collect()
}

/// URLs visited more than once.
///
/// A URL enters the list on its second visit and keeps its position; its
/// count keeps rising with later visits.
pub fn detect_loops(pages: &[PageVisit]) -> Vec<LoopVisit> {
    let mut seen: HashMap<&str, u32> = HashMap::new();
    let mut slot: HashMap<&str, usize> = HashMap::new();
    let mut loops: Vec<LoopVisit> = Vec::new();

    for page in pages {
        let count = seen.entry(page.url.as_str()).or_insert(0);
        *count += 1;

        match slot.get(page.url.as_str()) {
            Some(&idx) => loops[idx].visit_count = *count,
            None if *count >= 2 => {
                slot.insert(page.url.as_str(), loops.len());
                loops.push(LoopVisit {
                    url: page.url.clone(),
                    visit_count: *count,
                });
            }
            None => {}
        }
    }

    loops
}
