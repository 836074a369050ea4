//! Chooses which lehra recording to load and decides whether a finished load
//! may still become the active buffer. Only the most recent request can
//! commit; anything older that completes late is discarded.

use std::sync::Arc;

use lehra_audio::{AssetLoader, AudioClip, LoadError};
use lehra_domain::{AssetKey, AssetLocator, TempoBand};
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadRequest {
    pub id: RequestId,
    pub key: AssetKey,
    pub file_name: String,
    pub location: String,
}

/// A load that has finished, successfully or not.
#[derive(Clone, Debug)]
pub struct LoadCompletion {
    pub request: LoadRequest,
    pub result: Result<Arc<AudioClip>, LoadError>,
}

#[derive(Clone, Debug)]
pub enum Completion {
    Loaded {
        key: AssetKey,
        file_name: String,
        clip: Arc<AudioClip>,
        reference_tempo: f64,
    },
    NotFound {
        key: AssetKey,
        file_name: String,
        error: LoadError,
    },
    /// Superseded by a newer request; not an error.
    Stale { id: RequestId },
}

pub struct AssetSelector {
    locator: Box<dyn AssetLocator>,
    next_id: u64,
    in_flight: Option<LoadRequest>,
    active: Option<AssetKey>,
}

impl AssetSelector {
    pub fn new(locator: impl AssetLocator + 'static) -> Self {
        Self {
            locator: Box::new(locator),
            next_id: 0,
            in_flight: None,
            active: None,
        }
    }

    pub fn resolve(
        meter_id: &str,
        mode_id: &str,
        instrument_id: &str,
        band: TempoBand,
    ) -> AssetKey {
        AssetKey::new(meter_id, mode_id, instrument_id, band)
    }

    pub fn file_name(&self, key: &AssetKey) -> String {
        self.locator.file_name(key)
    }

    /// Starts a new load, superseding whatever was in flight.
    pub fn request(&mut self, key: AssetKey) -> LoadRequest {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        if let Some(previous) = &self.in_flight {
            debug!(superseded = %previous.file_name, "newer asset request supersedes in-flight load");
        }
        let request = LoadRequest {
            id,
            file_name: self.locator.file_name(&key),
            location: self.locator.locate(&key),
            key,
        };
        self.in_flight = Some(request.clone());
        request
    }

    pub fn in_flight(&self) -> Option<&LoadRequest> {
        self.in_flight.as_ref()
    }

    pub fn active(&self) -> Option<&AssetKey> {
        self.active.as_ref()
    }

    pub fn complete(&mut self, completion: LoadCompletion) -> Completion {
        let LoadCompletion { request, result } = completion;
        let latest = matches!(&self.in_flight, Some(current) if current.id == request.id);
        if !latest {
            debug!(file = %request.file_name, "discarding stale load result");
            return Completion::Stale { id: request.id };
        }
        self.in_flight = None;
        match result {
            Ok(clip) => {
                info!(file = %request.file_name, "lehra asset loaded");
                self.active = Some(request.key.clone());
                Completion::Loaded {
                    reference_tempo: request.key.band.reference_tempo(),
                    key: request.key,
                    file_name: request.file_name,
                    clip,
                }
            }
            Err(error) => {
                warn!(file = %request.file_name, %error, "lehra asset unavailable");
                Completion::NotFound {
                    key: request.key,
                    file_name: request.file_name,
                    error,
                }
            }
        }
    }
}

/// Runs one load against `loader`. This is the only suspension point of the
/// engine; the result goes back through [`AssetSelector::complete`].
pub async fn fetch(loader: &dyn AssetLoader, request: LoadRequest) -> LoadCompletion {
    debug!(location = %request.location, "fetching lehra asset");
    let result = loader.load(&request.location).await;
    LoadCompletion { request, result }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{clip, FakeLoader};
    use lehra_domain::DirectoryLocator;

    fn key(band: TempoBand) -> AssetKey {
        AssetSelector::resolve("teental", "kirwani", "santoor", band)
    }

    #[test]
    fn request_composes_location() {
        let mut selector = AssetSelector::new(DirectoryLocator::default());
        let request = selector.request(key(TempoBand::Medium));
        assert_eq!(request.file_name, "teental_kirwani_madhya_santoor.mp3");
        assert_eq!(
            request.location,
            "assets/audio/teental_kirwani_madhya_santoor.mp3"
        );
        assert_eq!(selector.in_flight(), Some(&request));
    }

    #[test]
    fn latest_request_wins_even_if_it_finishes_first() {
        let mut selector = AssetSelector::new(DirectoryLocator::default());
        let first = selector.request(key(TempoBand::Medium));
        let second = selector.request(key(TempoBand::Fast));

        let outcome = selector.complete(LoadCompletion {
            request: second.clone(),
            result: Ok(clip()),
        });
        assert!(matches!(outcome, Completion::Loaded { reference_tempo, .. } if reference_tempo == 150.0));

        let late = selector.complete(LoadCompletion {
            request: first.clone(),
            result: Ok(clip()),
        });
        assert!(matches!(late, Completion::Stale { id } if id == first.id));
        assert_eq!(selector.active(), Some(&second.key));
    }

    #[test]
    fn superseded_result_arriving_first_is_stale() {
        let mut selector = AssetSelector::new(DirectoryLocator::default());
        let first = selector.request(key(TempoBand::Medium));
        let second = selector.request(key(TempoBand::Slow));
        let early = selector.complete(LoadCompletion {
            request: first,
            result: Ok(clip()),
        });
        assert!(matches!(early, Completion::Stale { .. }));
        assert!(selector.active().is_none());
        assert_eq!(selector.in_flight(), Some(&second));
    }

    #[test]
    fn failure_keeps_previous_active_asset() {
        let mut selector = AssetSelector::new(DirectoryLocator::default());
        let ok = selector.request(key(TempoBand::Medium));
        selector.complete(LoadCompletion {
            request: ok.clone(),
            result: Ok(clip()),
        });
        let missing = selector.request(key(TempoBand::Fast));
        let outcome = selector.complete(LoadCompletion {
            request: missing.clone(),
            result: Err(LoadError::NotFound(missing.location.clone())),
        });
        assert!(matches!(outcome, Completion::NotFound { .. }));
        assert_eq!(selector.active(), Some(&ok.key));
        assert!(selector.in_flight().is_none());
    }

    #[tokio::test]
    async fn fetch_uses_locator_output() {
        let loader = FakeLoader::new();
        loader.missing("assets/audio/teental_kirwani_drut_santoor.mp3");
        let mut selector = AssetSelector::new(DirectoryLocator::default());

        let request = selector.request(key(TempoBand::Fast));
        let completion = fetch(&loader, request).await;
        assert!(matches!(completion.result, Err(LoadError::NotFound(_))));

        let request = selector.request(key(TempoBand::Medium));
        let completion = fetch(&loader, request).await;
        assert!(completion.result.is_ok());
        assert_eq!(
            loader.requested(),
            vec![
                "assets/audio/teental_kirwani_drut_santoor.mp3".to_string(),
                "assets/audio/teental_kirwani_madhya_santoor.mp3".to_string(),
            ]
        );
    }
}
