//! Shared lifecycle hooks and the input events they receive.
//!
//! Window events are translated into [`InputEvent`]s once and fanned out to
//! every registered component; each one picks out what it cares about.

/// Keys the application reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Escape,
    F,
    S,
    Left,
    Right,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other,
}

/// Window-system independent input event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyPressed(Key),
    MousePressed(MouseButton),
    MouseReleased(MouseButton),
    /// Cursor position in physical pixels
    CursorMoved { x: f32, y: f32 },
    /// Scroll amount in lines; positive scrolls away from the user
    Scroll { lines: f32 },
    Resized { width: u32, height: u32 },
}

/// Lifecycle hooks shared by audio, camera and visualizer.
///
/// Every hook defaults to doing nothing.
pub trait Component {
    fn name(&self) -> &'static str;

    fn handle_input(&mut self, _event: &InputEvent) {}

    fn resize(&mut self, _width: u32, _height: u32) {}

    fn shutdown(&mut self) {}
}

/// Deliver `event` to every component, in order. Resize events also reach
/// each component's `resize` hook.
pub fn dispatch(components: &mut [&mut dyn Component], event: &InputEvent) {
    for component in components.iter_mut() {
        component.handle_input(event);
        if let InputEvent::Resized { width, height } = *event {
            component.resize(width, height);
        }
    }
}

/// Shut every component down, in reverse registration order
pub fn shutdown_all(components: &mut [&mut dyn Component]) {
    for component in components.iter_mut().rev() {
        log::debug!("Shutting down {}", component.name());
        component.shutdown();
    }
}
