//! Frame-coherent input state.

use glam::FloatExt;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Key state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    /// KeyCode was just pressed this frame
    JustPressed,
    /// KeyCode is being held down
    Held,
    /// KeyCode was just released this frame
    JustReleased,
    /// KeyCode is not pressed
    Released,
}

/// Collects input events from the OS; the application queries key state for
/// the current frame.
pub struct InputManager {
    keys_pressed: HashSet<KeyCode>,
    keys_just_pressed: HashSet<KeyCode>,
    keys_just_released: HashSet<KeyCode>,
    prev_keys_pressed: HashSet<KeyCode>,

    mouse_pressed: HashSet<MouseButton>,
    mouse_just_pressed: HashSet<MouseButton>,
    mouse_just_released: HashSet<MouseButton>,
    prev_mouse_pressed: HashSet<MouseButton>,

    modifiers: ModifiersState,
}

/// Modifier of this frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModifiersState {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub super_key: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            keys_pressed: HashSet::new(),
            keys_just_pressed: HashSet::new(),
            keys_just_released: HashSet::new(),
            prev_keys_pressed: HashSet::new(),

            mouse_pressed: HashSet::new(),
            mouse_just_pressed: HashSet::new(),
            mouse_just_released: HashSet::new(),
            prev_mouse_pressed: HashSet::new(),

            modifiers: ModifiersState::default(),
        }
    }

    /// Receive and process window events.
    pub fn on_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(keycode) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => {
                            // repeat events would re-trigger "just pressed"
                            if !event.repeat {
                                self.keys_pressed.insert(keycode);
                            }
                        }
                        ElementState::Released => {
                            self.keys_pressed.remove(&keycode);
                        }
                    }
                }
            }
            WindowEvent::MouseInput { button, state, .. } => match state {
                ElementState::Pressed => {
                    self.mouse_pressed.insert(*button);
                }
                ElementState::Released => {
                    self.mouse_pressed.remove(button);
                }
            },
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = ModifiersState {
                    shift: modifiers.state().shift_key(),
                    ctrl: modifiers.state().control_key(),
                    alt: modifiers.state().alt_key(),
                    super_key: modifiers.state().super_key(),
                };
            }
            WindowEvent::Focused(false) => {
                // stuck keys across focus loss are worse than dropped ones
                self.clear();
            }
            _ => {}
        }
    }

    /// Roll the per-frame edge sets forward. Call once per frame, before
    /// queries.
    pub fn tick(&mut self) {
        self.keys_just_pressed.clear();
        self.keys_just_released.clear();
        self.mouse_just_pressed.clear();
        self.mouse_just_released.clear();

        for key in &self.keys_pressed {
            if !self.prev_keys_pressed.contains(key) {
                self.keys_just_pressed.insert(*key);
            }
        }
        for key in &self.prev_keys_pressed {
            if !self.keys_pressed.contains(key) {
                self.keys_just_released.insert(*key);
            }
        }

        for button in &self.mouse_pressed {
            if !self.prev_mouse_pressed.contains(button) {
                self.mouse_just_pressed.insert(*button);
            }
        }
        for button in &self.prev_mouse_pressed {
            if !self.mouse_pressed.contains(button) {
                self.mouse_just_released.insert(*button);
            }
        }

        self.prev_keys_pressed = self.keys_pressed.clone();
        self.prev_mouse_pressed = self.mouse_pressed.clone();
    }

    /// Query the state of a key.
    pub fn key_state(&self, key: KeyCode) -> KeyState {
        if self.keys_just_pressed.contains(&key) {
            KeyState::JustPressed
        } else if self.keys_pressed.contains(&key) {
            KeyState::Held
        } else if self.keys_just_released.contains(&key) {
            KeyState::JustReleased
        } else {
            KeyState::Released
        }
    }

    /// Return true if a key is pressed.
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Return true if a key went from unpressed to pressed this frame.
    pub fn is_key_just_pressed(&self, key: KeyCode) -> bool {
        self.keys_just_pressed.contains(&key)
    }

    /// Return true if a key went from pressed to unpressed this frame.
    pub fn is_key_just_released(&self, key: KeyCode) -> bool {
        self.keys_just_released.contains(&key)
    }

    /// Return all pressed keys.
    pub fn pressed_keys(&self) -> &HashSet<KeyCode> {
        &self.keys_pressed
    }

    /// Return true if a mouse button is pressed.
    pub fn is_mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse_pressed.contains(&button)
    }

    /// Return true if a mouse button went from unpressed to pressed this frame.
    pub fn is_mouse_just_pressed(&self, button: MouseButton) -> bool {
        self.mouse_just_pressed.contains(&button)
    }

    /// Return true if a mouse button went from pressed to unpressed this frame.
    pub fn is_mouse_just_released(&self, button: MouseButton) -> bool {
        self.mouse_just_released.contains(&button)
    }

    /// Return the state of modifier keys in this frame.
    pub fn modifiers(&self) -> &ModifiersState {
        &self.modifiers
    }

    /// Clear all inner states.
    pub fn clear(&mut self) {
        self.keys_pressed.clear();
        self.keys_just_pressed.clear();
        self.keys_just_released.clear();
        self.mouse_pressed.clear();
        self.mouse_just_pressed.clear();
        self.mouse_just_released.clear();
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps raw input onto named actions and axes.
///
/// An action is one or more keys treated as a button. An axis is a pair of
/// key sets that pull a float through [-1, 1], with smoothing so movement
/// does not snap.
pub struct InputActionMapper {
    input: InputManager,
    action_mappings: HashMap<String, SmallVec<[KeyCode; 1]>>,
    axis_mappings: HashMap<String, AxisMapping>,
}

/// Directional, non-abrupt mapping useful for movement.
#[derive(Debug, Clone)]
pub struct AxisMapping {
    positive: SmallVec<[KeyCode; 1]>,
    negative: SmallVec<[KeyCode; 1]>,
    axis: f32,
    /// The higher the value, the higher the lagging. Zero falls back to abrupt change.
    smoothing_factor: f32,
}

impl InputActionMapper {
    pub fn new() -> Self {
        Self {
            input: InputManager::new(),
            action_mappings: HashMap::new(),
            axis_mappings: HashMap::new(),
        }
    }

    /// Register an action mapping.
    pub fn register_action(&mut self, action: &str, keys: impl IntoIterator<Item = KeyCode>) {
        self.action_mappings
            .insert(action.to_string(), keys.into_iter().collect());
    }

    /// Register an axis mapping.
    pub fn register_axis(
        &mut self,
        axis: &str,
        positive: impl IntoIterator<Item = KeyCode>,
        negative: impl IntoIterator<Item = KeyCode>,
        smoothing_factor: f32,
    ) {
        self.axis_mappings.insert(
            axis.to_string(),
            AxisMapping {
                positive: positive.into_iter().collect(),
                negative: negative.into_iter().collect(),
                axis: 0.0,
                smoothing_factor,
            },
        );
    }

    /// Receive and process window events.
    #[profiling::function]
    pub fn on_window_event(&mut self, event: &WindowEvent) {
        self.input.on_window_event(event);
    }

    /// Update input mapping states. Call once per frame.
    #[profiling::function]
    pub fn tick(&mut self, delta_time: f32) {
        self.input.tick();

        for mapping in self.axis_mappings.values_mut() {
            let blend_factor = 1.0 - mapping.smoothing_factor.powf(20. * delta_time);

            let mut any_input = false;
            for key in &mapping.positive {
                if self.input.is_key_pressed(*key) {
                    mapping.axis += blend_factor;
                    any_input = true;
                }
            }
            for key in &mapping.negative {
                if self.input.is_key_pressed(*key) {
                    mapping.axis -= blend_factor;
                    any_input = true;
                }
            }
            mapping.axis = mapping.axis.clamp(-1.0, 1.0);

            if !any_input {
                mapping.axis = mapping.axis.lerp(0.0, blend_factor);
            }
        }
    }

    /// Return true if a specific action is pressed.
    pub fn is_action_pressed(&self, action: &str) -> bool {
        self.action_mappings
            .get(action)
            .is_some_and(|keys| keys.iter().any(|key| self.input.is_key_pressed(*key)))
    }

    /// Return true if an action went from unpressed to pressed this frame.
    pub fn is_action_just_pressed(&self, action: &str) -> bool {
        self.action_mappings
            .get(action)
            .is_some_and(|keys| keys.iter().any(|key| self.input.is_key_just_pressed(*key)))
    }

    /// Return a float in [-1, 1] for the direction and strength of an axis
    /// mapping. Unregistered axes read as zero.
    pub fn get_axis(&self, axis: &str) -> f32 {
        self.axis_mappings
            .get(axis)
            .map_or(0.0, |mapping| mapping.axis)
    }

    /// The inner input manager, for querying raw input events.
    pub fn raw_input(&self) -> &InputManager {
        &self.input
    }
}

impl Default for InputActionMapper {
    fn default() -> Self {
        Self::new()
    }
}
