use std::sync::Arc;

use glam::Vec2;
use half::f16;
use image::ImageFormat;
use log::{info, warn};
use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use crate::config::{SessionConfig, BACKGROUND_TEXTURE, ENVIRONMENT_MAP, NORMAL_TEXTURE};
use crate::material::{Mapping, SharedMaterial, TextureSlot};

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch {location}: {reason}")]
    Fetch { location: String, reason: String },
    #[error("failed to decode {location}: {source}")]
    Decode {
        location: String,
        #[source]
        source: image::ImageError,
    },
    #[error("load of {0} was abandoned")]
    Abandoned(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Srgb,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrap {
    Clamp,
    Repeat,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TexturePixels {
    Rgba8(Vec<u8>),
    Rgba16Float(Vec<f16>),
}

/// Decoded texture ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub pixels: TexturePixels,
    pub color_space: ColorSpace,
    pub wrap: Wrap,
    pub repeat: Vec2,
    pub mapping: Mapping,
}

/// Decodes an 8-bit image (JPEG or PNG) into RGBA.
pub fn decode_image(bytes: &[u8], color_space: ColorSpace) -> Result<TextureData, image::ImageError> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    Ok(TextureData {
        width: image.width(),
        height: image.height(),
        pixels: TexturePixels::Rgba8(image.into_raw()),
        color_space,
        wrap: Wrap::Clamp,
        repeat: Vec2::ONE,
        mapping: Mapping::Uv,
    })
}

/// Decodes a Radiance HDR image into half-float RGBA.
pub fn decode_hdr(bytes: &[u8]) -> Result<TextureData, image::ImageError> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Hdr)?.to_rgba32f();
    let (width, height) = image.dimensions();
    let pixels = image.into_raw().into_iter().map(f16::from_f32).collect();
    Ok(TextureData {
        width,
        height,
        pixels: TexturePixels::Rgba16Float(pixels),
        color_space: ColorSpace::Linear,
        wrap: Wrap::Clamp,
        repeat: Vec2::ONE,
        mapping: Mapping::Uv,
    })
}

fn decode_for(slot: TextureSlot, bytes: &[u8]) -> Result<TextureData, image::ImageError> {
    match slot {
        TextureSlot::Background => decode_image(bytes, ColorSpace::Srgb),
        TextureSlot::Normal => {
            let mut texture = decode_image(bytes, ColorSpace::Linear)?;
            texture.wrap = Wrap::Repeat;
            texture.repeat = Vec2::ONE;
            Ok(texture)
        }
        TextureSlot::Environment => decode_hdr(bytes),
    }
}

enum PendingState<T> {
    Waiting,
    Ready(Result<T, AssetError>),
    Taken,
}

struct PendingSlot<T> {
    state: Mutex<PendingState<T>>,
    ready: Condvar,
}

/// Result of a load that completes out of band. Polled from the UI thread;
/// the result can be taken exactly once.
pub struct Pending<T> {
    slot: Arc<PendingSlot<T>>,
}

/// Write side of a [`Pending`]. Dropping it unresolved reports the load as abandoned.
pub struct Resolver<T> {
    slot: Arc<PendingSlot<T>>,
    location: String,
}

impl<T> Pending<T> {
    pub fn new(location: impl Into<String>) -> (Self, Resolver<T>) {
        let slot = Arc::new(PendingSlot {
            state: Mutex::new(PendingState::Waiting),
            ready: Condvar::new(),
        });
        let resolver = Resolver {
            slot: Arc::clone(&slot),
            location: location.into(),
        };
        (Self { slot }, resolver)
    }

    /// Takes the result if the load has finished and nobody took it yet.
    pub fn poll(&self) -> Option<Result<T, AssetError>> {
        let mut state = self.slot.state.lock();
        match std::mem::replace(&mut *state, PendingState::Taken) {
            PendingState::Ready(result) => Some(result),
            other => {
                *state = other;
                None
            }
        }
    }

    pub fn is_waiting(&self) -> bool {
        matches!(*self.slot.state.lock(), PendingState::Waiting)
    }

    /// Blocks until the load finishes, then takes the result.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn wait(&self) -> Option<Result<T, AssetError>> {
        let mut state = self.slot.state.lock();
        while matches!(*state, PendingState::Waiting) {
            self.slot.ready.wait(&mut state);
        }
        match std::mem::replace(&mut *state, PendingState::Taken) {
            PendingState::Ready(result) => Some(result),
            _ => None,
        }
    }
}

impl<T> Resolver<T> {
    pub fn resolve(self, result: Result<T, AssetError>) {
        self.store(result);
    }

    fn store(&self, result: Result<T, AssetError>) {
        let mut state = self.slot.state.lock();
        if matches!(*state, PendingState::Waiting) {
            *state = PendingState::Ready(result);
            self.slot.ready.notify_all();
        }
    }
}

impl<T> Drop for Resolver<T> {
    fn drop(&mut self) {
        let location = std::mem::take(&mut self.location);
        self.store(Err(AssetError::Abandoned(location)));
    }
}

/// Receives decoded textures, typically the GPU renderer.
pub trait TextureSink {
    fn upload_texture(&mut self, slot: TextureSlot, texture: &TextureData);
}

/// Starts texture loads against the session's asset root.
#[derive(Debug, Clone)]
pub struct AssetLoader {
    config: SessionConfig,
}

impl AssetLoader {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn file_for(slot: TextureSlot) -> &'static str {
        match slot {
            TextureSlot::Background => BACKGROUND_TEXTURE,
            TextureSlot::Normal => NORMAL_TEXTURE,
            TextureSlot::Environment => ENVIRONMENT_MAP,
        }
    }

    pub fn load(&self, slot: TextureSlot) -> Pending<TextureData> {
        let location = self.config.asset_location(Self::file_for(slot));
        let (pending, resolver) = Pending::new(location.clone());
        spawn_load(slot, location, resolver);
        pending
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn_load(slot: TextureSlot, location: String, resolver: Resolver<TextureData>) {
    let worker_location = location.clone();
    let spawned = std::thread::Builder::new()
        .name(format!("load-{}", slot.label().replace(' ', "-")))
        .spawn(move || {
            let result = std::fs::read(&worker_location)
                .map_err(|source| AssetError::Io {
                    location: worker_location.clone(),
                    source,
                })
                .and_then(|bytes| {
                    decode_for(slot, &bytes).map_err(|source| AssetError::Decode {
                        location: worker_location.clone(),
                        source,
                    })
                });
            resolver.resolve(result);
        });
    if let Err(source) = spawned {
        // The resolver moved into the failed closure and reports the load as abandoned.
        warn!("could not start loader for {location}: {source}");
    }
}

#[cfg(target_arch = "wasm32")]
fn spawn_load(slot: TextureSlot, location: String, resolver: Resolver<TextureData>) {
    wasm_bindgen_futures::spawn_local(async move {
        let result = web::fetch_bytes(&location).await.and_then(|bytes| {
            decode_for(slot, &bytes).map_err(|source| AssetError::Decode {
                location: location.clone(),
                source,
            })
        });
        resolver.resolve(result);
    });
}

#[cfg(target_arch = "wasm32")]
mod web {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    use super::AssetError;

    pub(super) async fn fetch_bytes(location: &str) -> Result<Vec<u8>, AssetError> {
        let fail = |reason: String| AssetError::Fetch {
            location: location.to_string(),
            reason,
        };
        let window = web_sys::window().ok_or_else(|| fail("window not available".into()))?;
        let response = JsFuture::from(window.fetch_with_str(location))
            .await
            .map_err(|err| fail(format!("{err:?}")))?;
        let response: web_sys::Response = response
            .dyn_into()
            .map_err(|_| fail("fetch did not return a Response".into()))?;
        if !response.ok() {
            return Err(fail(format!("HTTP {}", response.status())));
        }
        let buffer = response
            .array_buffer()
            .map_err(|err| fail(format!("{err:?}")))?;
        let buffer = JsFuture::from(buffer)
            .await
            .map_err(|err| fail(format!("{err:?}")))?;
        Ok(js_sys::Uint8Array::new(&buffer).to_vec())
    }
}

/// Load state of one texture, as reported in summaries.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetStatus {
    Pending,
    Loaded { width: u32, height: u32 },
    Failed(String),
}

/// The scene's three texture loads.
pub struct SceneAssets {
    loads: Vec<(TextureSlot, Pending<TextureData>, AssetStatus)>,
}

impl SceneAssets {
    pub fn start(loader: &AssetLoader) -> Self {
        let loads = TextureSlot::ALL
            .into_iter()
            .map(|slot| (slot, loader.load(slot), AssetStatus::Pending))
            .collect();
        Self { loads }
    }

    /// Builds from already started loads; used when the caller owns the resolvers.
    pub fn from_pending(loads: Vec<(TextureSlot, Pending<TextureData>)>) -> Self {
        Self {
            loads: loads
                .into_iter()
                .map(|(slot, pending)| (slot, pending, AssetStatus::Pending))
                .collect(),
        }
    }

    pub fn status(&self, slot: TextureSlot) -> Option<&AssetStatus> {
        self.loads
            .iter()
            .find(|(candidate, _, _)| *candidate == slot)
            .map(|(_, _, status)| status)
    }

    pub fn all_settled(&self) -> bool {
        self.loads
            .iter()
            .all(|(_, _, status)| *status != AssetStatus::Pending)
    }

    /// Hands finished loads to the sink. Returns how many settled on this call.
    pub fn poll(&mut self, material: &SharedMaterial, sink: &mut dyn TextureSink) -> usize {
        let mut settled = 0;
        for (slot, pending, status) in &mut self.loads {
            if *status != AssetStatus::Pending {
                continue;
            }
            if let Some(result) = pending.poll() {
                *status = settle(*slot, result, material, sink);
                settled += 1;
            }
        }
        settled
    }

    /// Blocks until every load has settled.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn finish(&mut self, material: &SharedMaterial, sink: &mut dyn TextureSink) {
        for (slot, pending, status) in &mut self.loads {
            if *status != AssetStatus::Pending {
                continue;
            }
            if let Some(result) = pending.wait() {
                *status = settle(*slot, result, material, sink);
            }
        }
    }
}

fn settle(
    slot: TextureSlot,
    result: Result<TextureData, AssetError>,
    material: &SharedMaterial,
    sink: &mut dyn TextureSink,
) -> AssetStatus {
    match result {
        Ok(mut texture) => {
            if slot == TextureSlot::Environment {
                texture.mapping = Mapping::EquirectangularReflection;
                material.update(|m| m.env_mapping = Mapping::EquirectangularReflection);
            }
            info!(
                "loaded {} ({}x{})",
                slot.label(),
                texture.width,
                texture.height
            );
            sink.upload_texture(slot, &texture);
            AssetStatus::Loaded {
                width: texture.width,
                height: texture.height,
            }
        }
        Err(err) => {
            warn!("{} unavailable: {err}", slot.label());
            AssetStatus::Failed(err.to_string())
        }
    }
}
