//! Notes grouped by page

use std::collections::BTreeMap;

use super::types::Note;

/// Per-page view of a document's notes
///
/// Rebuilt from the note list whenever it changes; within a page, notes keep
/// the order they had in the list.
#[derive(Debug, Clone, Default)]
pub struct AnchorIndex {
    by_page: BTreeMap<u32, Vec<Note>>,
}

impl AnchorIndex {
    pub fn build(notes: &[Note]) -> Self {
        let mut by_page: BTreeMap<u32, Vec<Note>> = BTreeMap::new();
        for note in notes {
            by_page.entry(note.page_num).or_default().push(note.clone());
        }
        Self { by_page }
    }

    /// Notes anchored on `page_num` (empty if none)
    pub fn notes_for_page(&self, page_num: u32) -> &[Note] {
        self.by_page
            .get(&page_num)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn count_for_page(&self, page_num: u32) -> usize {
        self.notes_for_page(page_num).len()
    }

    /// Pages that carry at least one note, ascending
    pub fn pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.by_page.keys().copied()
    }

    pub fn total(&self) -> usize {
        self.by_page.values().map(Vec::len).sum()
    }
}

/// Notes ordered for the side list: by page, then top to bottom
///
/// The sort is stable, so notes at the same position keep their input order.
pub fn sorted_for_list(notes: &[Note]) -> Vec<Note> {
    let mut sorted = notes.to_vec();
    sorted.sort_by(|a, b| {
        a.page_num
            .cmp(&b.page_num)
            .then_with(|| a.y_percent.total_cmp(&b.y_percent))
    });
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn note(id: i64, page_num: u32, y_percent: f64) -> Note {
        Note {
            id,
            doc_id: "doc-1".to_string(),
            content: format!("note {}", id),
            page_num,
            x_percent: 50.0,
            y_percent,
            category: String::new(),
            updated_at: NaiveDateTime::default(),
        }
    }

    #[test]
    fn test_sorted_for_list() {
        let notes = vec![note(1, 2, 50.0), note(2, 1, 90.0), note(3, 1, 10.0)];
        let ids: Vec<i64> = sorted_for_list(&notes).iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_positions() {
        let notes = vec![note(5, 1, 20.0), note(4, 1, 20.0), note(6, 1, 20.0)];
        let ids: Vec<i64> = sorted_for_list(&notes).iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![5, 4, 6]);
    }

    #[test]
    fn test_index_groups_by_page() {
        let notes = vec![note(1, 2, 50.0), note(2, 1, 90.0), note(3, 2, 10.0)];
        let index = AnchorIndex::build(&notes);

        assert_eq!(index.count_for_page(1), 1);
        assert_eq!(index.count_for_page(2), 2);
        // input order within a page
        let ids: Vec<i64> = index.notes_for_page(2).iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(index.pages().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(index.total(), 3);
    }

    #[test]
    fn test_empty_page() {
        let index = AnchorIndex::build(&[note(1, 2, 50.0)]);
        assert!(index.notes_for_page(7).is_empty());
        assert_eq!(index.count_for_page(7), 0);
        assert!(AnchorIndex::default().notes_for_page(1).is_empty());
    }
}
