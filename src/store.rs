use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, warn};

use crate::models::{reconcile_primary, DraftField, DraftPatch, PropertyDraft};
use crate::scheduler::lock;
use crate::wizard::WizardStep;

/// What a mutation did, delivered to listeners after the store lock is released.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DraftChange<'a> {
    Fields(&'a [DraftField]),
    Step(WizardStep),
    Reset,
}

/// Reacts synchronously to store mutations (autosave, geocoding).
pub trait DraftListener: Send + Sync {
    fn on_draft_change(&self, handle: &DraftHandle, change: DraftChange<'_>);
}

/// Single owner of the listing-in-progress and the active step.
///
/// Field writes go through [`DraftStore::update_property_data`], which also
/// re-establishes the image and coordinate invariants after every merge.
#[derive(Debug, Clone, Default)]
pub struct DraftStore {
    draft: PropertyDraft,
    current_step: WizardStep,
    revision: u64,
    resets: u64,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded from a restored record.
    pub fn restored(mut draft: PropertyDraft, current_step: WizardStep) -> Self {
        normalize(&mut draft, &[]);
        Self {
            draft,
            current_step,
            ..Self::default()
        }
    }

    pub fn draft(&self) -> &PropertyDraft {
        &self.draft
    }

    pub fn current_step(&self) -> WizardStep {
        self.current_step
    }

    /// Incremented on every mutation, including step changes and resets.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of times the draft has been discarded.
    pub fn resets(&self) -> u64 {
        self.resets
    }

    /// Shallow-merges `patch` and returns the fields that changed.
    pub fn update_property_data(&mut self, patch: DraftPatch) -> Vec<DraftField> {
        let mut changed = patch.apply_to(&mut self.draft);
        if changed.is_empty() {
            return changed;
        }

        for field in normalize(&mut self.draft, &changed) {
            if !changed.contains(&field) {
                changed.push(field);
            }
        }

        self.revision += 1;
        debug!(revision = self.revision, fields = ?changed, "Draft updated");
        changed
    }

    /// Restores the default empty draft at the first step.
    pub fn reset(&mut self) {
        self.draft = PropertyDraft::default();
        self.current_step = WizardStep::first();
        self.revision += 1;
        self.resets += 1;
    }

    pub(crate) fn set_current_step(&mut self, step: WizardStep) -> bool {
        if self.current_step == step {
            return false;
        }
        self.current_step = step;
        self.revision += 1;
        true
    }
}

/// Shared, explicitly passed reference to a [`DraftStore`].
///
/// Every mutation made through the handle notifies subscribed listeners in
/// subscription order. Listeners are held weakly so background tasks that
/// keep a handle never keep their owner alive.
#[derive(Clone, Default)]
pub struct DraftHandle {
    store: Arc<Mutex<DraftStore>>,
    listeners: Arc<Mutex<Vec<Weak<dyn DraftListener>>>>,
}

impl std::fmt::Debug for DraftHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftHandle")
            .field("store", &*lock(&self.store))
            .finish_non_exhaustive()
    }
}

impl DraftHandle {
    pub fn new(store: DraftStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            listeners: Arc::default(),
        }
    }

    pub fn subscribe(&self, listener: Weak<dyn DraftListener>) {
        lock(&self.listeners).push(listener);
    }

    /// Runs `f` against the store under its lock.
    pub fn read<R>(&self, f: impl FnOnce(&DraftStore) -> R) -> R {
        f(&*lock(&self.store))
    }

    pub fn snapshot(&self) -> PropertyDraft {
        self.read(|store| store.draft().clone())
    }

    pub fn current_step(&self) -> WizardStep {
        self.read(DraftStore::current_step)
    }

    /// The single mutation entrypoint for draft fields.
    pub fn update_property_data(&self, patch: DraftPatch) -> Vec<DraftField> {
        let changed = lock(&self.store).update_property_data(patch);
        if !changed.is_empty() {
            self.notify(DraftChange::Fields(&changed));
        }
        changed
    }

    /// Builds a patch from the current draft and applies it under one lock,
    /// so read-modify-write sequences cannot interleave with other edits.
    pub fn try_update<E>(
        &self,
        build: impl FnOnce(&PropertyDraft) -> Result<DraftPatch, E>,
    ) -> Result<Vec<DraftField>, E> {
        let changed = {
            let mut store = lock(&self.store);
            let patch = build(store.draft())?;
            store.update_property_data(patch)
        };
        if !changed.is_empty() {
            self.notify(DraftChange::Fields(&changed));
        }
        Ok(changed)
    }

    /// Applies `patch` only if the draft has not been reset since `resets` was
    /// observed. `None` when the draft was discarded in between.
    pub fn update_unless_reset(&self, resets: u64, patch: DraftPatch) -> Option<Vec<DraftField>> {
        let changed = {
            let mut store = lock(&self.store);
            if store.resets() != resets {
                return None;
            }
            store.update_property_data(patch)
        };
        if !changed.is_empty() {
            self.notify(DraftChange::Fields(&changed));
        }
        Some(changed)
    }

    /// Applies a step transition; `f` returns whether the step changed.
    pub fn navigate(&self, f: impl FnOnce(&mut DraftStore) -> bool) -> bool {
        let (moved, step) = {
            let mut store = lock(&self.store);
            let moved = f(&mut *store);
            (moved, store.current_step())
        };
        if moved {
            self.notify(DraftChange::Step(step));
        }
        moved
    }

    pub fn reset(&self) {
        lock(&self.store).reset();
        self.notify(DraftChange::Reset);
    }

    fn notify(&self, change: DraftChange<'_>) {
        let listeners: Vec<Arc<dyn DraftListener>> = {
            let mut listeners = lock(&self.listeners);
            listeners.retain(|weak| weak.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in listeners {
            listener.on_draft_change(self, change);
        }
    }
}

/// Repairs invariants a merge may have broken and returns fields it touched.
fn normalize(draft: &mut PropertyDraft, changed: &[DraftField]) -> Vec<DraftField> {
    let mut touched = Vec::new();

    let explicit_index = changed.contains(&DraftField::PrimaryImageIndex)
        && !changed.contains(&DraftField::Images);
    if explicit_index && draft.primary_image_index < draft.images.len() {
        let target = draft.primary_image_index;
        for (index, image) in draft.images.iter_mut().enumerate() {
            image.is_primary = index == target;
        }
        touched.push(DraftField::Images);
    }

    let before: Vec<bool> = draft.images.iter().map(|image| image.is_primary).collect();
    let primary = reconcile_primary(&mut draft.images);
    let flags_changed = draft
        .images
        .iter()
        .zip(&before)
        .any(|(image, was)| image.is_primary != *was);
    if flags_changed && !touched.contains(&DraftField::Images) {
        touched.push(DraftField::Images);
    }
    if draft.primary_image_index != primary {
        draft.primary_image_index = primary;
        touched.push(DraftField::PrimaryImageIndex);
    }

    if !(draft.price.is_finite() && draft.price >= 0.0) {
        warn!(price = draft.price, "Discarding invalid price");
        draft.price = 0.0;
        touched.push(DraftField::Price);
    }
    if draft.bathrooms.is_some_and(|n| !(n.is_finite() && n >= 0.0)) {
        warn!(bathrooms = ?draft.bathrooms, "Discarding invalid bathroom count");
        draft.bathrooms = None;
        touched.push(DraftField::Bathrooms);
    }

    let coordinates_ok = match (draft.latitude, draft.longitude) {
        (None, None) => true,
        _ => draft.has_valid_coordinates(),
    };
    if !coordinates_ok {
        // A lone axis is dropped quietly; only a full out-of-range pair is logged.
        if draft.latitude.is_some() && draft.longitude.is_some() {
            warn!(
                latitude = ?draft.latitude,
                longitude = ?draft.longitude,
                "Discarding out-of-range coordinates"
            );
        }
        draft.latitude = None;
        draft.longitude = None;
        touched.push(DraftField::Latitude);
        touched.push(DraftField::Longitude);
    }

    touched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Image;

    fn image(id: &str, primary: bool) -> Image {
        Image {
            id: id.to_string(),
            url: format!("https://cdn/{id}.jpg"),
            metadata: None,
            is_primary: primary,
        }
    }

    #[test]
    fn merge_applies_patches_in_call_order() {
        let mut store = DraftStore::new();
        store.update_property_data(DraftPatch {
            title: Some("A".to_string()),
            price: Some(100.0),
            ..Default::default()
        });
        store.update_property_data(DraftPatch {
            price: Some(250.0),
            city: Some("Madrid".to_string()),
            ..Default::default()
        });
        store.update_property_data(DraftPatch {
            title: Some("C".to_string()),
            ..Default::default()
        });

        let draft = store.draft();
        assert_eq!(draft.title, "C");
        assert_eq!(draft.price, 250.0);
        assert_eq!(draft.city, "Madrid");
        assert_eq!(store.revision(), 3);
    }

    #[test]
    fn no_op_patch_does_not_bump_revision() {
        let mut store = DraftStore::new();
        let changed = store.update_property_data(DraftPatch {
            title: Some(String::new()),
            ..Default::default()
        });
        assert!(changed.is_empty());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn replacing_images_reconciles_primary() {
        let mut store = DraftStore::new();
        store.update_property_data(DraftPatch {
            images: Some(vec![image("a", false), image("b", true), image("c", true)]),
            ..Default::default()
        });
        let draft = store.draft();
        assert_eq!(draft.primary_image_index, 1);
        assert_eq!(draft.images.iter().filter(|i| i.is_primary).count(), 1);
        assert!(draft.images[1].is_primary);
    }

    #[test]
    fn primary_index_patch_moves_flag() {
        let mut store = DraftStore::new();
        store.update_property_data(DraftPatch {
            images: Some(vec![image("a", true), image("b", false)]),
            ..Default::default()
        });
        let changed = store.update_property_data(DraftPatch {
            primary_image_index: Some(1),
            ..Default::default()
        });
        assert!(changed.contains(&DraftField::Images));
        assert!(store.draft().images[1].is_primary);
        assert!(!store.draft().images[0].is_primary);
    }

    #[test]
    fn out_of_range_primary_index_is_corrected() {
        let mut store = DraftStore::new();
        store.update_property_data(DraftPatch {
            images: Some(vec![image("a", true)]),
            ..Default::default()
        });
        store.update_property_data(DraftPatch {
            primary_image_index: Some(5),
            ..Default::default()
        });
        assert_eq!(store.draft().primary_image_index, 0);
        assert!(store.draft().images[0].is_primary);
    }

    #[test]
    fn coordinates_are_kept_paired() {
        let mut store = DraftStore::new();
        store.update_property_data(DraftPatch {
            latitude: Some(Some(40.4)),
            ..Default::default()
        });
        assert_eq!(store.draft().latitude, None);

        store.update_property_data(DraftPatch {
            latitude: Some(Some(40.4)),
            longitude: Some(Some(-3.7)),
            ..Default::default()
        });
        assert!(store.draft().has_valid_coordinates());

        store.update_property_data(DraftPatch {
            latitude: Some(Some(120.0)),
            ..Default::default()
        });
        assert_eq!(store.draft().latitude, None);
        assert_eq!(store.draft().longitude, None);
    }

    #[test]
    fn negative_or_non_finite_amounts_are_discarded() {
        let mut store = DraftStore::new();
        store.update_property_data(DraftPatch {
            price: Some(250_000.0),
            bathrooms: Some(1.5),
            ..Default::default()
        });

        store.update_property_data(DraftPatch {
            price: Some(-500.0),
            bathrooms: Some(-2.0),
            ..Default::default()
        });
        assert_eq!(store.draft().price, 0.0);
        assert_eq!(store.draft().bathrooms, None);
        assert!(!crate::wizard::is_step_valid(WizardStep::Details, store.draft()));

        store.update_property_data(DraftPatch {
            price: Some(f64::NAN),
            bathrooms: Some(f32::INFINITY),
            ..Default::default()
        });
        assert_eq!(store.draft().price, 0.0);
        assert_eq!(store.draft().bathrooms, None);

        let restored = DraftStore::restored(
            PropertyDraft {
                price: -1.0,
                bathrooms: Some(-0.5),
                ..Default::default()
            },
            WizardStep::Pricing,
        );
        assert_eq!(restored.draft().price, 0.0);
        assert_eq!(restored.draft().bathrooms, None);
    }

    #[test]
    fn update_unless_reset_skips_discarded_drafts() {
        let handle = DraftHandle::default();
        let observed = handle.read(DraftStore::resets);
        let title = |value: &str| DraftPatch {
            title: Some(value.to_string()),
            ..Default::default()
        };

        assert!(handle.update_unless_reset(observed, title("Loft")).is_some());
        handle.reset();
        assert!(handle.update_unless_reset(observed, title("Stale")).is_none());
        assert!(handle.snapshot().title.is_empty());
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl DraftListener for Recorder {
        fn on_draft_change(&self, _handle: &DraftHandle, change: DraftChange<'_>) {
            lock(&self.seen).push(format!("{change:?}"));
        }
    }

    #[test]
    fn handle_notifies_listeners_of_each_mutation() {
        let handle = DraftHandle::default();
        let recorder = Arc::new(Recorder::default());
        let listener: Arc<dyn DraftListener> = recorder.clone();
        handle.subscribe(Arc::downgrade(&listener));

        handle.update_property_data(DraftPatch {
            city: Some("Madrid".to_string()),
            ..Default::default()
        });
        handle.update_property_data(DraftPatch {
            city: Some("Madrid".to_string()),
            ..Default::default()
        });
        handle.navigate(|store| store.set_current_step(WizardStep::Location));
        handle.reset();

        let seen = lock(&recorder.seen).clone();
        assert_eq!(
            seen,
            vec![
                "Fields([City])".to_string(),
                "Step(Location)".to_string(),
                "Reset".to_string()
            ]
        );
    }

    #[test]
    fn dropped_listeners_are_pruned() {
        let handle = DraftHandle::default();
        let listener: Arc<dyn DraftListener> = Arc::new(Recorder::default());
        handle.subscribe(Arc::downgrade(&listener));
        drop(listener);

        handle.update_property_data(DraftPatch {
            title: Some("Loft".to_string()),
            ..Default::default()
        });
        assert!(lock(&handle.listeners).is_empty());
        assert_eq!(handle.snapshot().title, "Loft");
    }

    #[test]
    fn reset_restores_defaults_and_first_step() {
        let mut store = DraftStore::new();
        store.update_property_data(DraftPatch {
            title: Some("Loft".to_string()),
            ..Default::default()
        });
        store.set_current_step(WizardStep::Location);
        store.reset();
        assert_eq!(store.draft(), &PropertyDraft::default());
        assert_eq!(store.current_step(), WizardStep::BasicInfo);
    }
}
