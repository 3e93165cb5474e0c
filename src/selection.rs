use std::collections::HashMap;

use tracing::{debug, warn};

use unsplash_gallery_api_structs::{Photo, PhotoId};

use crate::api::ApiError;

/// The photo currently shown in the detail overlay, if any.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selection {
    selected: Option<PhotoId>,
}

impl Selection {
    pub fn open(&mut self, id: impl Into<PhotoId>) {
        self.selected = Some(id.into());
    }

    pub fn close(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.selected.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DetailState<'a> {
    Idle,
    Loading,
    Loaded(&'a Photo),
    Error(&'a str),
}

#[derive(Debug)]
enum Entry {
    Loading,
    Loaded(Photo),
    Failed(String),
}

/// Single-photo fetches, cached per id and only issued for the selected photo.
#[derive(Debug, Default)]
pub struct PhotoDetail {
    entries: HashMap<PhotoId, Entry>,
}

impl PhotoDetail {
    /// Returns the id to fetch, if a photo is selected and neither cached nor
    /// already being fetched. Failed fetches are retried.
    pub fn begin_fetch(&mut self, selection: &Selection) -> Option<PhotoId> {
        let id = selection.selected()?;
        match self.entries.get(id) {
            Some(Entry::Loading) | Some(Entry::Loaded(_)) => None,
            Some(Entry::Failed(_)) | None => {
                self.entries.insert(id.to_string(), Entry::Loading);
                Some(id.to_string())
            },
        }
    }

    /// Caches the result for `id` and returns whether it is the one on display.
    pub fn complete(
        &mut self,
        selection: &Selection,
        id: &str,
        result: Result<Photo, ApiError>,
    ) -> bool {
        let entry = match result {
            Ok(photo) => Entry::Loaded(photo),
            Err(err) => {
                warn!(photo_id = id, error = %err, "Photo detail fetch failed");
                Entry::Failed(err.to_string())
            },
        };
        self.entries.insert(id.to_string(), entry);

        let shown = selection.selected() == Some(id);
        if !shown {
            debug!(photo_id = id, "Photo detail arrived after selection changed");
        }
        shown
    }

    pub fn state(&self, selection: &Selection) -> DetailState<'_> {
        let id = match selection.selected() {
            Some(id) => id,
            None => return DetailState::Idle,
        };

        match self.entries.get(id) {
            None | Some(Entry::Loading) => DetailState::Loading,
            Some(Entry::Loaded(photo)) => DetailState::Loaded(photo),
            Some(Entry::Failed(message)) => DetailState::Error(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::detailed;

    #[test]
    fn at_most_one_selected() {
        let mut selection = Selection::default();
        assert!(!selection.is_open());

        selection.open("a");
        selection.open("b");
        assert_eq!(selection.selected(), Some("b"));

        selection.close();
        assert_eq!(selection.selected(), None);
    }

    #[test]
    fn idle_without_selection() {
        let mut detail = PhotoDetail::default();
        let selection = Selection::default();

        assert_eq!(detail.begin_fetch(&selection), None);
        assert_eq!(detail.state(&selection), DetailState::Idle);
    }

    #[test]
    fn fetches_selected_photo_once() {
        let mut detail = PhotoDetail::default();
        let mut selection = Selection::default();
        selection.open("a");

        assert_eq!(detail.begin_fetch(&selection).as_deref(), Some("a"));
        assert_eq!(detail.begin_fetch(&selection), None);
        assert_eq!(detail.state(&selection), DetailState::Loading);

        let photo = detailed("a", 1200, "Oslo");
        assert!(detail.complete(&selection, "a", Ok(photo.clone())));
        assert_eq!(detail.state(&selection), DetailState::Loaded(&photo));

        selection.close();
        selection.open("a");
        assert_eq!(detail.begin_fetch(&selection), None);
    }

    #[test]
    fn late_result_is_cached_but_not_shown() {
        let mut detail = PhotoDetail::default();
        let mut selection = Selection::default();
        selection.open("a");
        detail.begin_fetch(&selection);
        selection.open("b");

        assert!(!detail.complete(&selection, "a", Ok(detailed("a", 1, "Rome"))));
        assert_eq!(detail.state(&selection), DetailState::Loading);

        selection.open("a");
        assert!(matches!(detail.state(&selection), DetailState::Loaded(p) if p.id == "a"));
    }

    #[test]
    fn failure_is_shown_and_retried() {
        let mut detail = PhotoDetail::default();
        let mut selection = Selection::default();
        selection.open("gone");
        detail.begin_fetch(&selection);

        let error = ApiError::Status {
            status: 404,
            message: "Couldn't find Photo".to_string(),
        };
        detail.complete(&selection, "gone", Err(error.clone()));
        assert_eq!(
            detail.state(&selection),
            DetailState::Error(&error.to_string())
        );

        assert_eq!(detail.begin_fetch(&selection).as_deref(), Some("gone"));
    }
}
