use crate::context::AppContext;
use crate::material::{PhysicalMaterial, SharedMaterial};

pub const PANEL_TITLE: &str = "Gettin FROSTY";
pub const PANEL_WIDTH: f32 = 300.0;

/// Material parameters exposed on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialField {
    Roughness,
    Transmission,
    Thickness,
}

impl MaterialField {
    pub fn get(self, material: &PhysicalMaterial) -> f32 {
        match self {
            Self::Roughness => material.roughness,
            Self::Transmission => material.transmission,
            Self::Thickness => material.thickness,
        }
    }

    pub fn set(self, material: &mut PhysicalMaterial, value: f32) {
        match self {
            Self::Roughness => material.roughness = value,
            Self::Transmission => material.transmission = value,
            Self::Thickness => material.thickness = value,
        }
    }
}

/// Bounded numeric slider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialControl {
    pub field: MaterialField,
    pub label: &'static str,
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl MaterialControl {
    /// Snaps to the step grid and clamps into bounds.
    pub fn constrain(&self, value: f32) -> f32 {
        if !value.is_finite() {
            return self.min;
        }
        let snapped = self.min + ((value - self.min) / self.step).round() * self.step;
        snapped.clamp(self.min, self.max)
    }
}

pub const MATERIAL_CONTROLS: [MaterialControl; 3] = [
    MaterialControl {
        field: MaterialField::Roughness,
        label: "roughness",
        min: 0.0,
        max: 1.0,
        step: 0.01,
    },
    MaterialControl {
        field: MaterialField::Transmission,
        label: "transmission",
        min: 0.0,
        max: 1.0,
        step: 0.01,
    },
    MaterialControl {
        field: MaterialField::Thickness,
        label: "thickness",
        min: 0.0,
        max: 5.0,
        step: 0.01,
    },
];

/// Live sliders bound to the shared material. Edits land immediately.
#[derive(Debug, Clone)]
pub struct DebugPanel {
    material: SharedMaterial,
}

impl DebugPanel {
    /// Builds the panel only for debug sessions.
    pub fn for_session(context: &AppContext) -> Option<Self> {
        context.debug().then(|| Self {
            material: context.material.clone(),
        })
    }

    pub fn controls(&self) -> &'static [MaterialControl] {
        &MATERIAL_CONTROLS
    }

    pub fn value(&self, field: MaterialField) -> f32 {
        field.get(&self.material.read())
    }

    /// Writes a constrained value into the material and returns it.
    pub fn set(&self, field: MaterialField, value: f32) -> f32 {
        let value = control_for(field).constrain(value);
        self.material.update(|material| field.set(material, value));
        value
    }

    /// Draws the panel for the current egui frame.
    pub fn show(&self, ctx: &egui::Context) {
        egui::Window::new(PANEL_TITLE)
            .default_width(PANEL_WIDTH)
            .resizable(false)
            .show(ctx, |ui| {
                for control in self.controls() {
                    let mut value = self.value(control.field);
                    let slider = egui::Slider::new(&mut value, control.min..=control.max)
                        .step_by(f64::from(control.step))
                        .text(control.label);
                    if ui.add(slider).changed() {
                        self.set(control.field, value);
                    }
                }
            });
    }
}

fn control_for(field: MaterialField) -> &'static MaterialControl {
    MATERIAL_CONTROLS
        .iter()
        .find(|control| control.field == field)
        .unwrap_or(&MATERIAL_CONTROLS[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::pipeline::EffectComposer;
    use crate::render::HeadlessBackend;
    use crate::scene::SceneBuilder;

    fn context(debug: bool) -> AppContext {
        let fragment = if debug { "#debug" } else { "" };
        AppContext::headless(SessionConfig::from_fragment(fragment))
    }

    #[test]
    fn panel_only_exists_in_debug_sessions() {
        assert!(DebugPanel::for_session(&context(false)).is_none());
        assert!(DebugPanel::for_session(&context(true)).is_some());
    }

    #[test]
    fn exposes_three_bounded_controls() {
        let labels: Vec<_> = MATERIAL_CONTROLS.iter().map(|c| c.label).collect();
        assert_eq!(labels, ["roughness", "transmission", "thickness"]);
        assert_eq!(MATERIAL_CONTROLS[2].max, 5.0);
        assert!(MATERIAL_CONTROLS.iter().all(|c| c.min == 0.0 && c.step == 0.01));
    }

    #[test]
    fn edits_write_through_to_the_shared_material() {
        let context = context(true);
        let panel = DebugPanel::for_session(&context).unwrap();
        panel.set(MaterialField::Roughness, 0.3);
        panel.set(MaterialField::Transmission, 0.5);
        panel.set(MaterialField::Thickness, 4.0);
        let material = context.material.read();
        assert!((material.roughness - 0.3).abs() < 1e-6);
        assert!((material.transmission - 0.5).abs() < 1e-6);
        assert!((material.thickness - 4.0).abs() < 1e-5);
    }

    #[test]
    fn values_are_clamped_and_snapped() {
        let context = context(true);
        let panel = DebugPanel::for_session(&context).unwrap();
        assert_eq!(panel.set(MaterialField::Roughness, 1.7), 1.0);
        assert_eq!(panel.set(MaterialField::Transmission, -0.2), 0.0);
        let thickness = panel.set(MaterialField::Thickness, 2.3449);
        assert!((thickness - 2.34).abs() < 1e-5);
        assert!((panel.value(MaterialField::Thickness) - 2.34).abs() < 1e-5);
    }

    #[test]
    fn next_frame_renders_with_the_edited_material() {
        let context = context(true);
        let scene = SceneBuilder::build(&context);
        let composer = EffectComposer::new(context.viewport.width, context.viewport.height);
        let mut backend = HeadlessBackend::new(context.viewport);
        composer.render(&mut backend, &scene).unwrap();
        assert_eq!(backend.last_material().unwrap().roughness, 0.6);

        let panel = DebugPanel::for_session(&context).unwrap();
        panel.set(MaterialField::Roughness, 0.2345);
        panel.set(MaterialField::Thickness, 9.0);
        composer.render(&mut backend, &scene).unwrap();

        let rendered = backend.last_material().unwrap();
        assert!((rendered.roughness - 0.23).abs() < 1e-6);
        assert_eq!(rendered.thickness, 5.0);
    }
}
