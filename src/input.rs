use winit::event::{ElementState, KeyEvent, MouseButton};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Keyboard and mouse state collected between rendered frames. Held keys
/// become movement axes; single presses latch a request flag until the
/// frame loop takes it.
pub struct InputState {
    forward: bool,
    backward: bool,
    left: bool,
    right: bool,
    up: bool,
    down: bool,
    quit_requested: bool,
    save_frame_requested: bool,
    reset_camera_requested: bool,
    heatmap_cycle_requested: bool,
    pressed_button: Option<MouseButton>,
    last_cursor: Option<(f64, f64)>,
    look_dx: f32,
    look_dy: f32,
    dolly_events: Vec<f32>,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            forward: false,
            backward: false,
            left: false,
            right: false,
            up: false,
            down: false,
            quit_requested: false,
            save_frame_requested: false,
            reset_camera_requested: false,
            heatmap_cycle_requested: false,
            pressed_button: None,
            last_cursor: None,
            look_dx: 0.0,
            look_dy: 0.0,
            dolly_events: Vec::new(),
        }
    }

    pub fn handle_key_event(&mut self, event: &KeyEvent) {
        if let PhysicalKey::Code(code) = event.physical_key {
            self.handle_key(code, event.state.is_pressed());
        }
    }

    pub fn handle_key(&mut self, code: KeyCode, pressed: bool) {
        match code {
            KeyCode::KeyW => self.forward = pressed,
            KeyCode::KeyS => self.backward = pressed,
            KeyCode::KeyA => self.left = pressed,
            KeyCode::KeyD => self.right = pressed,
            KeyCode::KeyQ | KeyCode::ArrowUp => self.up = pressed,
            KeyCode::KeyE | KeyCode::ArrowDown => self.down = pressed,
            KeyCode::Escape => {
                if pressed {
                    self.quit_requested = true;
                }
            }
            KeyCode::KeyP => {
                if pressed {
                    self.save_frame_requested = true;
                }
            }
            KeyCode::KeyR => {
                if pressed {
                    self.reset_camera_requested = true;
                }
            }
            KeyCode::KeyH => {
                if pressed {
                    self.heatmap_cycle_requested = true;
                }
            }
            _ => {}
        }
    }

    pub fn handle_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => self.pressed_button = Some(button),
            ElementState::Released => {
                if self.pressed_button == Some(button) {
                    self.pressed_button = None;
                }
            }
        }
    }

    /// Cursor deltas are normalized by the window size before accumulating,
    /// so a full-window drag reads as 1.0 regardless of resolution.
    pub fn handle_cursor_moved(&mut self, x: f64, y: f64, window_size: (u32, u32)) {
        if let (Some((px, py)), Some(button)) = (self.last_cursor, self.pressed_button) {
            let dx = ((x - px) / window_size.0.max(1) as f64) as f32;
            let dy = ((y - py) / window_size.1.max(1) as f64) as f32;
            match button {
                MouseButton::Left => {
                    self.look_dx += dx;
                    self.look_dy += dy;
                }
                MouseButton::Right => {
                    // Dolly by whichever axis moved furthest, keeping its
                    // sign. Events are kept separate so the camera's
                    // per-event clamp compounds instead of seeing one
                    // summed delta.
                    let dmax = if dx.abs() > dy.abs() { dx } else { dy };
                    self.dolly_events.push(dmax);
                }
                _ => {}
            }
        }
        self.last_cursor = Some((x, y));
    }

    pub fn movement_axes(&self) -> (f32, f32, f32) {
        let forward = (self.forward as i32 - self.backward as i32) as f32;
        let strafe = (self.right as i32 - self.left as i32) as f32;
        let vertical = (self.up as i32 - self.down as i32) as f32;
        (forward, strafe, vertical)
    }

    pub fn take_look_delta(&mut self) -> (f32, f32) {
        let d = (self.look_dx, self.look_dy);
        self.look_dx = 0.0;
        self.look_dy = 0.0;
        d
    }

    pub fn take_dolly_deltas(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.dolly_events)
    }

    pub fn take_quit(&mut self) -> bool {
        let v = self.quit_requested;
        self.quit_requested = false;
        v
    }

    pub fn take_save_frame(&mut self) -> bool {
        let v = self.save_frame_requested;
        self.save_frame_requested = false;
        v
    }

    pub fn take_reset_camera(&mut self) -> bool {
        let v = self.reset_camera_requested;
        self.reset_camera_requested = false;
        v
    }

    pub fn take_heatmap_cycle(&mut self) -> bool {
        let v = self.heatmap_cycle_requested;
        self.heatmap_cycle_requested = false;
        v
    }
}
