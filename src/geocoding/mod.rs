//! Debounced, race-safe resolution of the draft's address into coordinates.
//!
//! Each issued request carries a generation from a [`GenerationCounter`]; a
//! response is written back only if its generation is still the latest, so
//! responses apply in issue order regardless of arrival order.

pub mod nominatim;
pub mod traits;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::models::{DraftPatch, PropertyDraft};
use crate::scheduler::{lock, Debouncer, GenerationCounter};
use crate::store::{DraftChange, DraftHandle, DraftListener};

pub use nominatim::NominatimGeocoder;
pub use traits::{Coordinates, Geocoder};

/// Transient resolver state shown next to the address form. Never persisted.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum GeocodingStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error(String),
}

/// Whether the draft's address should be sent to the provider.
pub fn needs_resolution(draft: &PropertyDraft) -> bool {
    if !draft.show_exact_address {
        return false;
    }
    if draft.city.trim().is_empty() && draft.address.trim().is_empty() {
        return false;
    }
    // Valid coordinates already on the draft are authoritative.
    !draft.has_valid_coordinates()
}

struct ResolverState {
    geocoder: Arc<dyn Geocoder>,
    generations: GenerationCounter,
    status: Mutex<GeocodingStatus>,
}

impl ResolverState {
    fn set_status(&self, status: GeocodingStatus) {
        *lock(&self.status) = status;
    }

    /// Resolves the address as it stands now and applies the result if this
    /// request is still the latest when it completes.
    async fn resolve_current(self: Arc<Self>, handle: DraftHandle) {
        let draft = handle.snapshot();
        if !needs_resolution(&draft) {
            return;
        }

        let address = draft.composed_address();
        let generation = self.generations.issue();
        self.set_status(GeocodingStatus::Loading);
        info!(
            generation,
            address = %address,
            provider = self.geocoder.provider_name(),
            "Resolving address"
        );

        let result = self.geocoder.resolve(&address).await;

        if !self.generations.is_latest(generation) {
            debug!(
                generation,
                latest = self.generations.latest(),
                "Discarding stale geocoding response"
            );
            return;
        }

        match result {
            Ok(coordinates) => {
                // The address may have been edited while the request was out;
                // a later lookup owns the new address.
                let applied = handle.try_update(|draft| {
                    if !draft.show_exact_address || draft.composed_address() != address {
                        return Err(());
                    }
                    Ok(DraftPatch {
                        latitude: Some(Some(coordinates.latitude)),
                        longitude: Some(Some(coordinates.longitude)),
                        ..Default::default()
                    })
                });
                if applied.is_err() {
                    debug!(generation, address = %address, "Address changed; dropping result");
                    self.set_status(GeocodingStatus::Idle);
                    return;
                }
                debug!(
                    generation,
                    latitude = coordinates.latitude,
                    longitude = coordinates.longitude,
                    "Applied geocoding result"
                );
                self.set_status(GeocodingStatus::Success);
            }
            Err(e) => {
                warn!(generation, address = %address, error = %e, "Geocoding failed");
                self.set_status(GeocodingStatus::Error(e.to_string()));
            }
        }
    }
}

/// Observes address edits and keeps latitude/longitude in step with them.
pub struct GeocodingResolver {
    state: Arc<ResolverState>,
    debouncer: Debouncer,
}

impl GeocodingResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>, delay: Duration) -> Self {
        Self {
            state: Arc::new(ResolverState {
                geocoder,
                generations: GenerationCounter::new(),
                status: Mutex::new(GeocodingStatus::Idle),
            }),
            debouncer: Debouncer::new("geocoding", delay),
        }
    }

    pub fn status(&self) -> GeocodingStatus {
        lock(&self.state.status).clone()
    }

    /// Generation of the most recently issued request, 0 if none.
    pub fn latest_generation(&self) -> u64 {
        self.state.generations.latest()
    }

    pub fn has_pending_request(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Restarts the quiet-period timer if the address needs resolving.
    pub fn on_address_changed(&self, handle: &DraftHandle) {
        if !handle.read(|store| needs_resolution(store.draft())) {
            return;
        }
        let state = Arc::clone(&self.state);
        let handle = handle.clone();
        self.debouncer.schedule(state.resolve_current(handle));
    }

    /// Resolves immediately, skipping the quiet period (e.g. a retry after an error).
    pub async fn resolve_now(&self, handle: &DraftHandle) {
        self.debouncer.cancel();
        Arc::clone(&self.state)
            .resolve_current(handle.clone())
            .await;
    }

    /// Cancels the pending timer and invalidates any request in flight.
    pub fn cancel(&self) {
        self.debouncer.cancel();
        self.state.generations.issue();
    }
}

impl DraftListener for GeocodingResolver {
    fn on_draft_change(&self, handle: &DraftHandle, change: DraftChange<'_>) {
        match change {
            DraftChange::Fields(fields) if fields.iter().any(|f| f.triggers_geocoding()) => {
                self.on_address_changed(handle);
            }
            DraftChange::Reset => {
                self.cancel();
                self.state.set_status(GeocodingStatus::Idle);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeocodingError;
    use crate::store::DraftStore;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::oneshot;

    const DELAY: Duration = Duration::from_millis(1500);

    type Reply = Result<Coordinates, GeocodingError>;

    /// Answers each call with the next queued reply, waiting until it is sent.
    #[derive(Default)]
    struct ScriptedGeocoder {
        calls: Mutex<Vec<String>>,
        replies: Mutex<VecDeque<oneshot::Receiver<Reply>>>,
    }

    impl ScriptedGeocoder {
        fn queue(&self) -> oneshot::Sender<Reply> {
            let (tx, rx) = oneshot::channel();
            lock(&self.replies).push_back(rx);
            tx
        }

        fn calls(&self) -> Vec<String> {
            lock(&self.calls).clone()
        }
    }

    #[async_trait]
    impl Geocoder for ScriptedGeocoder {
        async fn resolve(&self, address: &str) -> Result<Coordinates, GeocodingError> {
            lock(&self.calls).push(address.to_string());
            let reply = lock(&self.replies).pop_front();
            match reply {
                Some(rx) => rx.await.unwrap_or_else(|_| {
                    Err(GeocodingError::NoMatch {
                        address: address.to_string(),
                    })
                }),
                None => Ok(Coordinates {
                    latitude: 40.4168,
                    longitude: -3.7038,
                }),
            }
        }

        fn provider_name(&self) -> &'static str {
            "scripted"
        }
    }

    fn wire(geocoder: Arc<ScriptedGeocoder>) -> (DraftHandle, Arc<GeocodingResolver>) {
        let handle = DraftHandle::new(DraftStore::new());
        let resolver = Arc::new(GeocodingResolver::new(geocoder, DELAY));
        let listener: Arc<dyn DraftListener> = resolver.clone();
        handle.subscribe(Arc::downgrade(&listener));
        (handle, resolver)
    }

    fn address(street: &str) -> DraftPatch {
        DraftPatch {
            address: Some(street.to_string()),
            ..Default::default()
        }
    }

    fn at(latitude: f64, longitude: f64) -> Reply {
        Ok(Coordinates {
            latitude,
            longitude,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn madrid_address_resolves_once_after_quiet_period() {
        let geocoder = Arc::new(ScriptedGeocoder::default());
        let (handle, resolver) = wire(geocoder.clone());

        handle.update_property_data(DraftPatch {
            city: Some("Madrid".to_string()),
            ..Default::default()
        });
        handle.update_property_data(DraftPatch {
            country: Some("Spain".to_string()),
            ..Default::default()
        });
        handle.update_property_data(address("Calle Mayor 1"));

        tokio::time::sleep(Duration::from_millis(1400)).await;
        assert!(geocoder.calls().is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(geocoder.calls(), vec!["Calle Mayor 1, Madrid, Spain"]);

        let draft = handle.snapshot();
        assert_eq!(draft.latitude, Some(40.4168));
        assert_eq!(draft.longitude, Some(-3.7038));
        assert_eq!(resolver.status(), GeocodingStatus::Success);
        assert_eq!(resolver.latest_generation(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_edits_uses_final_address() {
        let geocoder = Arc::new(ScriptedGeocoder::default());
        let (handle, _resolver) = wire(geocoder.clone());

        handle.update_property_data(DraftPatch {
            city: Some("Madrid".to_string()),
            ..Default::default()
        });
        for street in ["C", "Calle", "Calle M", "Calle Mayor", "Calle Mayor 1"] {
            handle.update_property_data(address(street));
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(geocoder.calls(), vec!["Calle Mayor 1, Madrid"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_response_never_overwrites_newer_result() {
        let geocoder = Arc::new(ScriptedGeocoder::default());
        let reply_a = geocoder.queue();
        let reply_b = geocoder.queue();
        let (handle, resolver) = wire(geocoder.clone());

        handle.update_property_data(DraftPatch {
            city: Some("Madrid".to_string()),
            ..Default::default()
        });
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(resolver.latest_generation(), 1);

        handle.update_property_data(address("Calle Mayor 1"));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(resolver.latest_generation(), 2);

        reply_b.send(at(40.4153, -3.7074)).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        reply_a.send(at(40.4168, -3.7038)).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let draft = handle.snapshot();
        assert_eq!(draft.latitude, Some(40.4153));
        assert_eq!(draft.longitude, Some(-3.7074));
        assert_eq!(resolver.status(), GeocodingStatus::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn address_edit_during_lookup_resolves_new_address() {
        let geocoder = Arc::new(ScriptedGeocoder::default());
        let reply_madrid = geocoder.queue();
        let reply_barcelona = geocoder.queue();
        let (handle, resolver) = wire(geocoder.clone());

        handle.update_property_data(DraftPatch {
            address: Some("Calle Mayor 1".to_string()),
            city: Some("Madrid".to_string()),
            ..Default::default()
        });
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(geocoder.calls(), vec!["Calle Mayor 1, Madrid"]);

        handle.update_property_data(DraftPatch {
            address: Some("Rambla 5".to_string()),
            city: Some("Barcelona".to_string()),
            ..Default::default()
        });
        reply_madrid.send(at(40.4, -3.7)).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.snapshot().latitude, None);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(
            geocoder.calls(),
            vec!["Calle Mayor 1, Madrid", "Rambla 5, Barcelona"]
        );
        reply_barcelona.send(at(41.3851, 2.1734)).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let draft = handle.snapshot();
        assert_eq!(draft.latitude, Some(41.3851));
        assert_eq!(draft.longitude, Some(2.1734));
        assert_eq!(resolver.status(), GeocodingStatus::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_sets_error_and_keeps_coordinates_unset() {
        let geocoder = Arc::new(ScriptedGeocoder::default());
        let reply = geocoder.queue();
        let (handle, resolver) = wire(geocoder.clone());

        handle.update_property_data(DraftPatch {
            city: Some("Atlantis".to_string()),
            ..Default::default()
        });
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(resolver.status(), GeocodingStatus::Loading);

        reply
            .send(Err(GeocodingError::NoMatch {
                address: "Atlantis".to_string(),
            }))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(matches!(
            resolver.status(),
            GeocodingStatus::Error(ref m) if m.contains("Atlantis")
        ));
        assert_eq!(handle.snapshot().latitude, None);
    }

    #[tokio::test(start_paused = true)]
    async fn existing_coordinates_and_empty_address_are_skipped() {
        let geocoder = Arc::new(ScriptedGeocoder::default());
        let (handle, resolver) = wire(geocoder.clone());

        handle.update_property_data(DraftPatch {
            country: Some("Spain".to_string()),
            ..Default::default()
        });
        assert!(!resolver.has_pending_request());

        handle.update_property_data(DraftPatch {
            latitude: Some(Some(40.0)),
            longitude: Some(Some(-3.0)),
            ..Default::default()
        });
        handle.update_property_data(address("Calle Mayor 1"));
        assert!(!resolver.has_pending_request());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(geocoder.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn approximate_mode_does_not_observe_address() {
        let geocoder = Arc::new(ScriptedGeocoder::default());
        let (handle, _resolver) = wire(geocoder.clone());

        handle.update_property_data(DraftPatch {
            show_exact_address: Some(false),
            city: Some("Madrid".to_string()),
            ..Default::default()
        });
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(geocoder.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_discards_in_flight_response() {
        let geocoder = Arc::new(ScriptedGeocoder::default());
        let reply = geocoder.queue();
        let (handle, resolver) = wire(geocoder.clone());

        handle.update_property_data(DraftPatch {
            city: Some("Madrid".to_string()),
            ..Default::default()
        });
        tokio::time::sleep(Duration::from_secs(2)).await;
        handle.reset();

        reply.send(at(40.4, -3.7)).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.snapshot().latitude, None);
        assert_eq!(resolver.status(), GeocodingStatus::Idle);
    }

    #[tokio::test]
    async fn resolve_now_skips_the_quiet_period() {
        let geocoder = Arc::new(ScriptedGeocoder::default());
        let (handle, resolver) = wire(geocoder.clone());
        handle.update_property_data(DraftPatch {
            city: Some("Madrid".to_string()),
            ..Default::default()
        });

        resolver.resolve_now(&handle).await;
        assert_eq!(geocoder.calls().len(), 1);
        assert!(handle.snapshot().has_valid_coordinates());
        assert!(!resolver.has_pending_request());
    }
}
