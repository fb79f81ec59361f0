//! Fuzzy picker for reference fields.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use ledgerdesk_core::{ReferenceOption, Resource};

/// Most matches shown at once.
const MAX_MATCHES: usize = 10;

/// Picker state for one reference field.
pub struct Picker {
    /// Draft field the choice is written to.
    pub field: &'static str,
    pub target: Resource,
    pub query: String,
    pub matches: Vec<ReferenceOption>,
    pub selected: usize,
}

impl Picker {
    pub fn new(field: &'static str, target: Resource, options: &[ReferenceOption]) -> Self {
        let mut picker = Self {
            field,
            target,
            query: String::new(),
            matches: Vec::new(),
            selected: 0,
        };
        picker.refilter(options);
        picker
    }

    /// Recompute matches for the current query. An empty query lists every
    /// option in service order.
    pub fn refilter(&mut self, options: &[ReferenceOption]) {
        self.selected = 0;

        if self.query.trim().is_empty() {
            self.matches = options.iter().take(MAX_MATCHES).cloned().collect();
            return;
        }

        let matcher = SkimMatcherV2::default();
        let mut scored: Vec<_> = options
            .iter()
            .filter_map(|option| {
                matcher
                    .fuzzy_match(&option.label, &self.query)
                    .map(|score| (score, option))
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        self.matches = scored
            .into_iter()
            .take(MAX_MATCHES)
            .map(|(_, option)| option.clone())
            .collect();
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < self.matches.len() {
            self.selected += 1;
        }
    }

    pub fn current(&self) -> Option<&ReferenceOption> {
        self.matches.get(self.selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<ReferenceOption> {
        ["Fuel", "Food", "Office supplies", "Repairs"]
            .iter()
            .enumerate()
            .map(|(i, label)| ReferenceOption {
                id: format!("c{}", i + 1),
                label: label.to_string(),
            })
            .collect()
    }

    #[test]
    fn empty_query_lists_everything() {
        let picker = Picker::new("category", Resource::ExpenseCategory, &options());
        assert_eq!(picker.matches.len(), 4);
        assert_eq!(picker.current().unwrap().label, "Fuel");
    }

    #[test]
    fn query_narrows_and_ranks() {
        let options = options();
        let mut picker = Picker::new("category", Resource::ExpenseCategory, &options);
        picker.query = "fu".to_string();
        picker.refilter(&options);

        assert_eq!(picker.current().unwrap().id, "c1");
        assert!(picker.matches.iter().all(|o| o.label != "Repairs"));

        picker.query = "zzz".to_string();
        picker.refilter(&options);
        assert!(picker.current().is_none());
    }

    #[test]
    fn selection_stays_in_bounds() {
        let mut picker = Picker::new("category", Resource::ExpenseCategory, &options());
        picker.move_up();
        assert_eq!(picker.selected, 0);
        for _ in 0..10 {
            picker.move_down();
        }
        assert_eq!(picker.selected, 3);
    }
}
