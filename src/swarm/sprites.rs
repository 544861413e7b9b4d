use bevy::asset::LoadState;
use bevy::prelude::*;
use bevy::render::texture::DEFAULT_IMAGE_HANDLE;

// Sprites are loaded by the asset server in the background, so an entity's picture can be
// in one of three states. Only a fully loaded image is ever drawn; while the image is still
// loading, or after it failed to load, the entity is drawn as a plain colored rectangle.

#[derive(Component, Debug, Clone, PartialEq)]
pub enum SpriteSource {
    Loading(Handle<Image>),
    Loaded(Handle<Image>),
    Fallback,
}

impl SpriteSource {
    /// Next state given what the asset server reports, `None` if nothing changes.
    pub fn resolve(&self, state: LoadState) -> Option<SpriteSource> {
        match (self, state) {
            (SpriteSource::Loading(handle), LoadState::Loaded) => {
                Some(SpriteSource::Loaded(handle.clone()))
            }
            (SpriteSource::Loading(_), LoadState::Failed | LoadState::Unloaded) => {
                Some(SpriteSource::Fallback)
            }
            _ => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, SpriteSource::Loaded(_))
    }
}

/// How big an entity is drawn and which color stands in for its image.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub textured: Vec2,
    pub fallback: Vec2,
    pub fallback_color: Color,
}

/// What actually lands in the entity's `Sprite` and texture handle.
#[derive(Debug, Clone, PartialEq)]
pub struct Appearance {
    pub texture: Handle<Image>,
    pub color: Color,
    pub size: Vec2,
}

impl Footprint {
    pub fn appearance(&self, source: &SpriteSource) -> Appearance {
        match source {
            SpriteSource::Loaded(handle) => Appearance {
                texture: handle.clone(),
                color: Color::WHITE,
                size: self.textured,
            },
            SpriteSource::Loading(_) | SpriteSource::Fallback => Appearance {
                texture: DEFAULT_IMAGE_HANDLE.typed(),
                color: self.fallback_color,
                size: self.fallback,
            },
        }
    }

    pub fn current_size(&self, source: &SpriteSource) -> Vec2 {
        if source.is_loaded() {
            self.textured
        } else {
            self.fallback
        }
    }
}

// Polls the asset server for every sprite that is still loading.
pub fn resolve_sprites(
    asset_server: Res<AssetServer>,
    mut sources: Query<(&mut SpriteSource, Option<&Name>)>,
) {
    for (mut source, name) in sources.iter_mut() {
        let state = match &*source {
            SpriteSource::Loading(handle) => asset_server.get_load_state(handle),
            _ => continue,
        };
        if let Some(next) = source.resolve(state) {
            let name = name.map(Name::as_str).unwrap_or("sprite");
            if next == SpriteSource::Fallback {
                warn!("Failed to load image for {name}, drawing a placeholder instead");
            } else {
                info!("Loaded image for {name}");
            }
            *source = next;
        }
    }
}

// Copies the current appearance into the renderable components whenever the source changes.
pub fn apply_appearance(
    mut sprites: Query<
        (&SpriteSource, &Footprint, &mut Sprite, &mut Handle<Image>),
        Changed<SpriteSource>,
    >,
) {
    for (source, footprint, mut sprite, mut texture) in sprites.iter_mut() {
        let appearance = footprint.appearance(source);
        sprite.color = appearance.color;
        sprite.custom_size = Some(appearance.size);
        *texture = appearance.texture;
    }
}
